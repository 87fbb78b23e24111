//! screenlib-core: Core types, traits, and error definitions for screenlib.
//!
//! This crate defines the vocabulary shared by every screenlib crate: motor
//! addresses and keywords of the screen controller protocol, the decoded
//! message type handed to observers, the transport abstraction, and the
//! error type.
//!
//! # Key types
//!
//! - [`ParsedMessage`] -- one decoded line from the controller
//! - [`Motor`], [`CommandKind`], [`EventKind`], [`MotorStatus`] -- protocol vocabulary
//! - [`Transport`] -- opens byte streams to a controller
//! - [`Error`] / [`Result`] -- error handling

pub mod error;
pub mod message;
pub mod transport;
pub mod types;

pub use error::{Error, Result};
pub use message::ParsedMessage;
pub use transport::{ReadHalf, Transport, TransportStreams, WriteHalf};
pub use types::*;
