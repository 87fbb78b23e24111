//! Transport trait for controller communication.
//!
//! The [`Transport`] trait abstracts over how a byte stream to the screen
//! controller is opened. The TCP implementation lives in
//! `screenlib-transport`; `screenlib-test-harness` provides an in-memory
//! implementation backed by [`tokio::io::duplex`].
//!
//! A transport hands back the two halves of the stream separately. The
//! client gives the read half to its listener task and the write half to its
//! dispatcher task, so reads and writes never contend for the same handle.

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncWrite};

use crate::error::Result;

/// Boxed read half of an open controller stream.
pub type ReadHalf = Box<dyn AsyncRead + Unpin + Send + 'static>;

/// Boxed write half of an open controller stream.
pub type WriteHalf = Box<dyn AsyncWrite + Unpin + Send + 'static>;

/// The two halves of a freshly opened connection.
///
/// Dropping both halves closes the connection.
pub struct TransportStreams {
    /// Bytes arriving from the controller.
    pub reader: ReadHalf,
    /// Bytes going to the controller.
    pub writer: WriteHalf,
}

impl std::fmt::Debug for TransportStreams {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransportStreams").finish_non_exhaustive()
    }
}

/// Opens byte streams to a screen controller.
///
/// Implementations are reusable: the connection supervisor calls
/// [`open`](Transport::open) once per connection attempt for the lifetime of
/// the client. A returned stream is assumed reliable until the first I/O
/// error; after that the supervisor drops it and opens a new one.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Open a new connection to the controller.
    async fn open(&self) -> Result<TransportStreams>;

    /// Human-readable description of the endpoint, used in log fields.
    fn describe(&self) -> String;
}
