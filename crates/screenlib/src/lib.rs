//! # screenlib -- Async control of motorized projection screens
//!
//! `screenlib` talks to motorized projection-screen controllers over their
//! telnet text protocol. It logs in, stays connected across network drops,
//! paces outgoing commands, and decodes the `STATUS` and `POSITION` events
//! the controller reports as motors move.
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use screenlib::{Motor, ParsedMessage, ScreenClientBuilder};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let client = ScreenClientBuilder::new()
//!         .host("192.168.1.60")
//!         .username("admin")
//!         .password("secret")
//!         .build()?;
//!     client.connect().await?;
//!
//!     client
//!         .register_state_callback(Arc::new(|message: &ParsedMessage| {
//!             if let Some(status) = message.status() {
//!                 println!("{} is {}", message.motor(), status);
//!             }
//!         }))
//!         .await;
//!
//!     client.recall_preset(2).await;
//!     client.query_position(Motor::A).await;
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! | Crate                 | Purpose                                          |
//! |-----------------------|--------------------------------------------------|
//! | `screenlib-core`      | Types, parsed messages, errors, `Transport` trait |
//! | `screenlib-protocol`  | Wire codec: build commands, parse controller lines |
//! | `screenlib-transport` | TCP transport and CRLF line framing              |
//! | `screenlib-client`    | Login, reconnect supervisor, queue, observers    |
//! | **`screenlib`**       | This facade crate -- re-exports everything       |
//!
//! ## Connection lifecycle
//!
//! [`ScreenClient::connect`] makes one attempt and reports its outcome. Once
//! it has succeeded, the client reconnects on its own after any drop, on a
//! fixed [`reconnect_interval`](ScreenClientBuilder::reconnect_interval),
//! until [`ScreenClient::close`] is called. Commands enqueued while
//! disconnected are discarded when the next connection starts.

pub use screenlib_core::*;

pub use screenlib_client::{
    CommandQueue, MessageObserver, ObserverRegistry, ScreenClient, ScreenClientBuilder, Signal,
};

/// Wire codec for the controller's text protocol.
pub mod protocol {
    pub use screenlib_protocol::*;
}

/// TCP transport and line framing.
pub mod transport {
    pub use screenlib_transport::*;
}

/// Client internals: handshake, listener, dispatcher.
pub mod client {
    pub use screenlib_client::*;
}
