//! Scripted controller endpoint.
//!
//! A [`MockDevice`] is the far end of one client connection. Tests drive it
//! line by line: play the login prompts, send events, and assert on the
//! commands the client writes. Every step that waits is bounded by
//! [`STEP_TIMEOUT`] so a misbehaving client fails the test instead of hanging
//! it. Errors are plain strings, ready for `unwrap()` in a test.

use std::time::Duration;

use screenlib_core::transport::{ReadHalf, WriteHalf};
use screenlib_transport::LineReader;
use tokio::io::{AsyncWriteExt, DuplexStream};

/// Upper bound on any single wait in a [`MockDevice`] method.
pub const STEP_TIMEOUT: Duration = Duration::from_secs(2);

/// Result type for harness steps.
pub type StepResult<T> = std::result::Result<T, String>;

/// The device side of one connection.
pub struct MockDevice {
    reader: LineReader<ReadHalf>,
    writer: WriteHalf,
}

impl MockDevice {
    /// Wrap the device end of an in-memory stream.
    pub fn new(stream: DuplexStream) -> Self {
        let (reader, writer) = tokio::io::split(stream);
        Self::from_halves(Box::new(reader), Box::new(writer))
    }

    /// Wrap already-split halves (e.g. from an accepted `TcpStream`).
    pub fn from_halves(reader: ReadHalf, writer: WriteHalf) -> Self {
        Self {
            reader: LineReader::new(reader),
            writer,
        }
    }

    /// Send text exactly as given.
    pub async fn send_raw(&mut self, data: &str) -> StepResult<()> {
        self.send_bytes(data.as_bytes()).await
    }

    /// Send bytes exactly as given, e.g. telnet negotiation.
    pub async fn send_bytes(&mut self, data: &[u8]) -> StepResult<()> {
        self.writer
            .write_all(data)
            .await
            .map_err(|e| format!("write error: {}", e))?;
        self.writer
            .flush()
            .await
            .map_err(|e| format!("flush error: {}", e))
    }

    /// Send `line` followed by `\r\n`.
    pub async fn send_line(&mut self, line: &str) -> StepResult<()> {
        self.send_raw(&format!("{line}\r\n")).await
    }

    /// Next line from the client without a time limit. `None` on EOF.
    pub async fn recv_line(&mut self) -> StepResult<Option<String>> {
        match self.reader.read_line().await {
            Ok(line) => Ok(Some(String::from_utf8_lossy(&line).into_owned())),
            Err(screenlib_core::Error::ConnectionLost) => Ok(None),
            Err(e) => Err(format!("read error: {}", e)),
        }
    }

    /// Next line from the client, failing after [`STEP_TIMEOUT`] or on EOF.
    pub async fn read_line(&mut self) -> StepResult<String> {
        match tokio::time::timeout(STEP_TIMEOUT, self.recv_line()).await {
            Ok(Ok(Some(line))) => Ok(line),
            Ok(Ok(None)) => Err("client closed the connection".to_string()),
            Ok(Err(e)) => Err(e),
            Err(_) => Err(format!("no line from client within {:?}", STEP_TIMEOUT)),
        }
    }

    /// Read one line and check it.
    pub async fn expect_line(&mut self, expected: &str) -> StepResult<()> {
        let line = self.read_line().await?;
        if line != expected {
            return Err(format!("expected {:?}, got {:?}", expected, line));
        }
        Ok(())
    }

    /// Check that the client sends nothing for `window`.
    pub async fn expect_silence(&mut self, window: Duration) -> StepResult<()> {
        match tokio::time::timeout(window, self.recv_line()).await {
            Err(_) => Ok(()),
            Ok(Ok(Some(line))) => Err(format!("unexpected line {:?}", line)),
            Ok(Ok(None)) => Err("client closed the connection".to_string()),
            Ok(Err(e)) => Err(e),
        }
    }

    /// Wait for the client to close its side, discarding anything it sends.
    pub async fn expect_closed(&mut self) -> StepResult<()> {
        let wait = async {
            while self.recv_line().await?.is_some() {}
            Ok::<(), String>(())
        };
        tokio::time::timeout(STEP_TIMEOUT, wait)
            .await
            .map_err(|_| format!("client still connected after {:?}", STEP_TIMEOUT))?
    }

    /// Play the login prompts and check the credentials the client sends.
    pub async fn login(&mut self, username: &str, password: &str) -> StepResult<()> {
        self.send_raw("\r\nUser:").await?;
        self.expect_line(username).await?;
        self.send_raw("\r\nPassword:").await?;
        self.expect_line(password).await?;
        self.send_raw("\r\nConnected: CVM ready\r\n").await
    }

    /// Play the login prompts, then prompt for the user again as a
    /// controller does after a bad password.
    pub async fn reject_login(&mut self) -> StepResult<()> {
        self.send_raw("\r\nUser:").await?;
        self.read_line().await?;
        self.send_raw("\r\nPassword:").await?;
        self.read_line().await?;
        self.send_raw("\r\nLogin incorrect\r\nUser:").await
    }
}

impl std::fmt::Debug for MockDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockDevice")
            .field("buffered", &self.reader.buffered())
            .finish_non_exhaustive()
    }
}
