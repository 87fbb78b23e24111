//! Error types for screenlib.
//!
//! All fallible operations across the library return [`Result<T>`], which
//! uses [`Error`] as the error type. Transport-layer, protocol-layer, and
//! session-layer errors are all captured here.

/// The error type for all screenlib operations.
///
/// Every variant except [`Error::Closed`] is recoverable: the connection
/// supervisor treats transport, authentication, and timeout failures alike
/// and retries after the configured reconnect interval.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A transport-level error (TCP connect failure, refused connection).
    #[error("transport error: {0}")]
    Transport(String),

    /// A protocol-level error (a line addressed to a known motor whose
    /// command or event keyword is not recognised).
    #[error("protocol error: {0}")]
    Protocol(String),

    /// The login prompt exchange did not complete.
    ///
    /// Raised when the controller re-prompts for the username after the
    /// credentials were sent. A stream that ends mid-handshake is
    /// [`Error::ConnectionLost`] instead.
    #[error("authentication failed: {0}")]
    Authentication(String),

    /// Timed out waiting for the controller.
    #[error("timeout waiting for response")]
    Timeout,

    /// The connection to the controller was lost unexpectedly.
    #[error("connection lost")]
    ConnectionLost,

    /// An invalid parameter was passed to the client or builder.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// The client was closed and cannot be reconnected.
    #[error("client closed")]
    Closed,

    /// An underlying I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A convenience `Result` alias using [`Error`] as the error type.
pub type Result<T> = std::result::Result<T, Error>;
