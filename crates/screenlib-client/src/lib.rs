//! screenlib-client: persistent client for motorized screen controllers.
//!
//! [`ScreenClient`] logs in to the controller, keeps the connection alive
//! across drops, paces outgoing commands, and delivers decoded controller
//! messages to registered [`MessageObserver`]s.
//!
//! # Architecture
//!
//! - [`supervisor`] -- connection lifecycle and reconnect loop
//! - [`handshake`] -- `User:` / `Password:` / `Connected:` login exchange
//! - [`listener`] -- reads lines and fans them out to observers
//! - [`dispatcher`] -- drains the [`CommandQueue`] onto the wire
//! - [`observers`], [`queue`], [`signal`] -- shared building blocks
//!
//! Each connection gets its own listener and dispatcher task. The listener
//! owns the read half of the stream and the dispatcher owns the write half.

pub mod builder;
pub mod client;
pub mod dispatcher;
pub mod handshake;
pub mod listener;
pub mod observers;
pub mod queue;
pub mod signal;
pub(crate) mod supervisor;

pub use builder::ScreenClientBuilder;
pub use client::ScreenClient;
pub use handshake::{Handshake, HandshakeStage};
pub use observers::{MessageObserver, ObserverRegistry};
pub use queue::CommandQueue;
pub use signal::Signal;
