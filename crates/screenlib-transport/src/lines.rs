//! Delimiter framing over the two halves of a controller stream.
//!
//! The controller's login prompts end with `:` and everything else ends with
//! `\r\n`, so the reader frames on an arbitrary delimiter and keeps whatever
//! follows it buffered for the next call. The handshake and the listener
//! share one [`LineReader`] per connection so no bytes are lost between them.

use bytes::{Buf, Bytes, BytesMut};
use screenlib_core::error::{Error, Result};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Line terminator used on the wire in both directions.
pub const CRLF: &[u8] = b"\r\n";

/// Longest unterminated run the reader will buffer before giving up.
pub const MAX_LINE_LEN: usize = 4096;

/// Buffered, delimiter-framed reader.
#[derive(Debug)]
pub struct LineReader<R> {
    inner: R,
    buf: BytesMut,
}

impl<R: AsyncRead + Unpin> LineReader<R> {
    /// Wrap a read half.
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(512),
        }
    }

    /// Read up to the next `delim`, returning the bytes before it.
    ///
    /// The delimiter itself is consumed. Bytes after it stay buffered.
    /// Cancel-safe: if the future is dropped, partially read data remains in
    /// the buffer for the next call.
    ///
    /// Fails with [`Error::ConnectionLost`] on EOF, and with
    /// [`Error::Protocol`] if `MAX_LINE_LEN` bytes arrive without a
    /// delimiter.
    pub async fn read_until(&mut self, delim: &[u8]) -> Result<Bytes> {
        if delim.is_empty() {
            return Err(Error::InvalidParameter("empty delimiter".into()));
        }

        loop {
            if let Some(pos) = find(&self.buf, delim) {
                let line = self.buf.split_to(pos).freeze();
                self.buf.advance(delim.len());
                tracing::trace!(bytes = line.len(), data = ?line, "Framed line");
                return Ok(line);
            }

            if self.buf.len() > MAX_LINE_LEN {
                let len = self.buf.len();
                self.buf.clear();
                return Err(Error::Protocol(format!(
                    "no delimiter in {len} buffered bytes"
                )));
            }

            let n = self.inner.read_buf(&mut self.buf).await.map_err(|e| {
                tracing::error!(error = %e, "Failed to read from controller");
                map_io_error(e)
            })?;
            if n == 0 {
                tracing::debug!(buffered = self.buf.len(), "Peer closed connection");
                return Err(Error::ConnectionLost);
            }
        }
    }

    /// Read one `\r\n`-terminated line.
    pub async fn read_line(&mut self) -> Result<Bytes> {
        self.read_until(CRLF).await
    }

    /// Number of bytes received but not yet returned.
    pub fn buffered(&self) -> usize {
        self.buf.len()
    }
}

/// Line writer. Every write is flushed immediately.
#[derive(Debug)]
pub struct LineWriter<W> {
    inner: W,
}

impl<W: AsyncWrite + Unpin> LineWriter<W> {
    /// Wrap a write half.
    pub fn new(inner: W) -> Self {
        Self { inner }
    }

    /// Write `line` followed by `\r\n`, then flush.
    pub async fn write_line(&mut self, line: &str) -> Result<()> {
        tracing::trace!(data = %line, "Sending line");

        let mut out = Vec::with_capacity(line.len() + CRLF.len());
        out.extend_from_slice(line.as_bytes());
        out.extend_from_slice(CRLF);

        self.inner.write_all(&out).await.map_err(|e| {
            tracing::error!(error = %e, "Failed to send line");
            map_io_error(e)
        })?;
        self.inner.flush().await.map_err(|e| {
            tracing::error!(error = %e, "Failed to flush stream");
            map_io_error(e)
        })?;
        Ok(())
    }

    /// Shut down the write direction. Errors are logged, not returned.
    pub async fn shutdown(&mut self) {
        if let Err(e) = self.inner.shutdown().await {
            tracing::debug!(error = %e, "Failed to shut down stream (continuing anyway)");
        }
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

/// Map a data-path I/O error to the appropriate [`Error`] variant.
pub fn map_io_error(e: std::io::Error) -> Error {
    match e.kind() {
        std::io::ErrorKind::ConnectionReset
        | std::io::ErrorKind::BrokenPipe
        | std::io::ErrorKind::NotConnected
        | std::io::ErrorKind::ConnectionAborted
        | std::io::ErrorKind::UnexpectedEof => Error::ConnectionLost,
        _ => Error::Io(e),
    }
}
