//! TCP transport for screen controllers.
//!
//! Controllers such as the Stewart Filmscreen CVM expose a telnet-style
//! command port (TCP 23 by default). [`TcpTransport`] opens a fresh stream on
//! every [`open`](Transport::open) call, filters telnet option negotiation
//! out of it (see [`telnet`](crate::telnet)), and splits it into halves.
//!
//! # Example
//!
//! ```no_run
//! use screenlib_transport::TcpTransport;
//! use screenlib_core::transport::Transport;
//!
//! # async fn example() -> screenlib_core::Result<()> {
//! let transport = TcpTransport::new("192.168.1.60:23");
//! let streams = transport.open().await?;
//! # Ok(())
//! # }
//! ```

use async_trait::async_trait;
use screenlib_core::error::{Error, Result};
use screenlib_core::transport::{Transport, TransportStreams};
use std::time::Duration;
use tokio::net::TcpStream;

use crate::telnet::TelnetStream;

/// Default connection timeout (5 seconds).
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// TCP transport for screen controller communication.
///
/// Holds only the endpoint; no connection exists until
/// [`open`](Transport::open) is called, and each call makes a new one.
#[derive(Debug, Clone)]
pub struct TcpTransport {
    /// `host:port` of the controller.
    addr: String,
    connect_timeout: Duration,
}

impl TcpTransport {
    /// Create a transport for `addr` (a `host:port` string) with the default
    /// connect timeout.
    pub fn new(addr: impl Into<String>) -> Self {
        Self {
            addr: addr.into(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }

    /// Set the maximum time to wait for the TCP connection to be
    /// established.
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Get the address string this transport connects to.
    pub fn addr(&self) -> &str {
        &self.addr
    }

    /// Open a raw, unsplit stream.
    pub async fn connect(&self) -> Result<TcpStream> {
        let addr = self.addr.as_str();
        tracing::debug!(
            addr = %addr,
            timeout_ms = self.connect_timeout.as_millis(),
            "Connecting to TCP endpoint"
        );

        let stream = tokio::time::timeout(self.connect_timeout, TcpStream::connect(addr))
            .await
            .map_err(|_| {
                tracing::error!(addr = %addr, "TCP connection timed out");
                Error::Timeout
            })?
            .map_err(|e| {
                tracing::error!(addr = %addr, error = %e, "TCP connection failed");
                map_connect_error(e, addr)
            })?;

        // Commands are a few bytes each and paced by the client.
        if let Err(e) = stream.set_nodelay(true) {
            tracing::warn!(
                addr = %addr,
                error = %e,
                "Failed to set TCP_NODELAY (continuing anyway)"
            );
        }

        tracing::info!(addr = %addr, "TCP connection established");
        Ok(stream)
    }
}

#[async_trait]
impl Transport for TcpTransport {
    async fn open(&self) -> Result<TransportStreams> {
        let stream = TelnetStream::new(self.connect().await?);
        let (reader, writer) = tokio::io::split(stream);
        Ok(TransportStreams {
            reader: Box::new(reader),
            writer: Box::new(writer),
        })
    }

    fn describe(&self) -> String {
        format!("tcp://{}", self.addr)
    }
}

/// Map a connection-time I/O error to the appropriate [`Error`] variant.
fn map_connect_error(e: std::io::Error, addr: &str) -> Error {
    match e.kind() {
        std::io::ErrorKind::ConnectionRefused => {
            Error::Transport(format!("connection refused: {}", addr))
        }
        _ => Error::Io(e),
    }
}
