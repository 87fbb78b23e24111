//! Login prompt exchange.
//!
//! After the stream opens the controller prompts `User:`, then `Password:`,
//! then prints `Connected:` followed by the rest of a greeting line. Each
//! prompt is read as a `:`-terminated token. Anything else it prints before
//! or between the prompts (banners, blank lines) is skipped.

use std::time::Duration;

use screenlib_core::error::{Error, Result};
use screenlib_transport::{LineReader, LineWriter};
use tokio::io::{AsyncRead, AsyncWrite};

pub const USERNAME_PROMPT: &str = "User:";
pub const PASSWORD_PROMPT: &str = "Password:";
pub const CONNECTED_PROMPT: &str = "Connected:";

/// Default limit on the whole exchange.
pub const DEFAULT_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);

/// Progress through the login exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakeStage {
    AwaitUsernamePrompt,
    AwaitPasswordPrompt,
    AwaitConnectedPrompt,
    Done,
    Failed,
}

/// One login attempt over a freshly opened stream.
#[derive(Debug)]
pub struct Handshake<'a> {
    username: &'a str,
    password: &'a str,
    stage: HandshakeStage,
}

impl<'a> Handshake<'a> {
    pub fn new(username: &'a str, password: &'a str) -> Self {
        Self {
            username,
            password,
            stage: HandshakeStage::AwaitUsernamePrompt,
        }
    }

    pub fn stage(&self) -> HandshakeStage {
        self.stage
    }

    /// Run the exchange to completion, bounded by `timeout`.
    ///
    /// On success the reader is positioned just after the greeting line, so
    /// the next line read is the first controller message.
    pub async fn run<R, W>(
        &mut self,
        reader: &mut LineReader<R>,
        writer: &mut LineWriter<W>,
        timeout: Duration,
    ) -> Result<()>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let result = match tokio::time::timeout(timeout, self.exchange(reader, writer)).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(
                    stage = ?self.stage,
                    timeout_ms = timeout.as_millis(),
                    "Login timed out"
                );
                Err(Error::Timeout)
            }
        };
        if result.is_err() {
            self.stage = HandshakeStage::Failed;
        }
        result
    }

    async fn exchange<R, W>(
        &mut self,
        reader: &mut LineReader<R>,
        writer: &mut LineWriter<W>,
    ) -> Result<()>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        loop {
            let raw = reader.read_until(b":").await?;
            let text = String::from_utf8_lossy(&raw);
            // Prompts start a line; banner lines may precede them in the same read.
            let last = text.rsplit(['\r', '\n']).next().unwrap_or_default();
            let token = format!("{}:", last.trim());

            match token.as_str() {
                USERNAME_PROMPT => {
                    if self.stage != HandshakeStage::AwaitUsernamePrompt {
                        tracing::warn!("Controller prompted for user again; credentials rejected");
                        return Err(Error::Authentication("credentials rejected".into()));
                    }
                    tracing::debug!("Received user prompt");
                    writer.write_line(self.username).await?;
                    self.stage = HandshakeStage::AwaitPasswordPrompt;
                }
                PASSWORD_PROMPT => {
                    tracing::debug!("Received password prompt");
                    writer.write_line(self.password).await?;
                    self.stage = HandshakeStage::AwaitConnectedPrompt;
                }
                CONNECTED_PROMPT => {
                    let greeting = reader.read_line().await?;
                    tracing::debug!(
                        greeting = %String::from_utf8_lossy(&greeting).trim(),
                        "Received connected prompt"
                    );
                    self.stage = HandshakeStage::Done;
                    return Ok(());
                }
                other => {
                    tracing::trace!(token = %other, "Skipping banner text");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncWriteExt, DuplexStream, ReadHalf, WriteHalf, duplex, split};

    struct Pair {
        reader: LineReader<ReadHalf<DuplexStream>>,
        writer: LineWriter<WriteHalf<DuplexStream>>,
        device_reader: LineReader<ReadHalf<DuplexStream>>,
        device_writer: WriteHalf<DuplexStream>,
    }

    fn pair() -> Pair {
        let (client, device) = duplex(1024);
        let (cr, cw) = split(client);
        let (dr, dw) = split(device);
        Pair {
            reader: LineReader::new(cr),
            writer: LineWriter::new(cw),
            device_reader: LineReader::new(dr),
            device_writer: dw,
        }
    }

    #[tokio::test]
    async fn sends_credentials_in_order() {
        let Pair {
            mut reader,
            mut writer,
            mut device_reader,
            mut device_writer,
        } = pair();

        let device = tokio::spawn(async move {
            device_writer
                .write_all(b"Stewart CVM v2\r\n\r\nUser:")
                .await
                .unwrap();
            assert_eq!(&device_reader.read_line().await.unwrap()[..], b"admin");
            device_writer.write_all(b"\r\nPassword:").await.unwrap();
            assert_eq!(&device_reader.read_line().await.unwrap()[..], b"secret");
            device_writer
                .write_all(b"\r\nConnected: welcome\r\n!1.1.1.MOTOR.STATUS=HOME;\r\n")
                .await
                .unwrap();
            device_writer
        });

        let mut handshake = Handshake::new("admin", "secret");
        assert_eq!(handshake.stage(), HandshakeStage::AwaitUsernamePrompt);
        handshake
            .run(&mut reader, &mut writer, Duration::from_secs(2))
            .await
            .unwrap();
        assert_eq!(handshake.stage(), HandshakeStage::Done);

        // The first controller line after the greeting is left for the listener.
        assert_eq!(
            &reader.read_line().await.unwrap()[..],
            b"!1.1.1.MOTOR.STATUS=HOME;"
        );
        drop(device.await.unwrap());
    }

    #[tokio::test]
    async fn logs_in_through_telnet_negotiation() {
        use screenlib_transport::TelnetStream;
        use tokio::io::AsyncReadExt;

        let (client, device) = duplex(1024);
        let (cr, cw) = split(TelnetStream::new(client));
        let mut reader = LineReader::new(cr);
        let mut writer = LineWriter::new(cw);
        let (mut device_reader, mut device_writer) = split(device);

        let device = tokio::spawn(async move {
            // IAC WILL ECHO, IAC WILL SUPPRESS-GO-AHEAD ahead of the prompt.
            device_writer
                .write_all(b"\xff\xfb\x01\xff\xfb\x03User:")
                .await
                .unwrap();

            let mut refusals = [0u8; 6];
            device_reader.read_exact(&mut refusals).await.unwrap();
            assert_eq!(refusals, *b"\xff\xfe\x01\xff\xfe\x03");

            let mut device_reader = LineReader::new(device_reader);
            assert_eq!(&device_reader.read_line().await.unwrap()[..], b"admin");
            device_writer.write_all(b"\r\nPassword:").await.unwrap();
            assert_eq!(&device_reader.read_line().await.unwrap()[..], b"secret");
            device_writer
                .write_all(b"\r\nConnected: welcome\r\n")
                .await
                .unwrap();
            device_writer
        });

        let mut handshake = Handshake::new("admin", "secret");
        handshake
            .run(&mut reader, &mut writer, Duration::from_secs(2))
            .await
            .unwrap();
        assert_eq!(handshake.stage(), HandshakeStage::Done);
        drop(device.await.unwrap());
    }

    #[tokio::test]
    async fn rejected_credentials_fail() {
        let Pair {
            mut reader,
            mut writer,
            mut device_reader,
            mut device_writer,
        } = pair();

        let device = tokio::spawn(async move {
            device_writer.write_all(b"User:").await.unwrap();
            device_reader.read_line().await.unwrap();
            device_writer.write_all(b"Password:").await.unwrap();
            device_reader.read_line().await.unwrap();
            device_writer
                .write_all(b"\r\nLogin incorrect\r\nUser:")
                .await
                .unwrap();
            device_writer
        });

        let mut handshake = Handshake::new("admin", "wrong");
        let err = handshake
            .run(&mut reader, &mut writer, Duration::from_secs(2))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Authentication(_)));
        assert_eq!(handshake.stage(), HandshakeStage::Failed);
        drop(device.await.unwrap());
    }

    #[tokio::test]
    async fn silent_device_times_out() {
        let Pair {
            mut reader,
            mut writer,
            device_reader: _device_reader,
            device_writer: _device_writer,
        } = pair();

        let mut handshake = Handshake::new("admin", "secret");
        let err = handshake
            .run(&mut reader, &mut writer, Duration::from_millis(50))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Timeout));
        assert_eq!(handshake.stage(), HandshakeStage::Failed);
    }

    #[tokio::test]
    async fn eof_mid_handshake_fails() {
        let Pair {
            mut reader,
            mut writer,
            device_reader,
            mut device_writer,
        } = pair();

        device_writer.write_all(b"User:").await.unwrap();
        drop(device_reader);
        drop(device_writer);

        let mut handshake = Handshake::new("admin", "secret");
        let result = handshake
            .run(&mut reader, &mut writer, Duration::from_secs(2))
            .await;
        assert!(matches!(result, Err(Error::ConnectionLost)));
        assert_eq!(handshake.stage(), HandshakeStage::Failed);
    }

    #[tokio::test]
    async fn eof_before_any_prompt_is_connection_lost() {
        let Pair {
            mut reader,
            mut writer,
            device_reader,
            device_writer,
        } = pair();
        drop((device_reader, device_writer));

        let mut handshake = Handshake::new("admin", "secret");
        let result = handshake
            .run(&mut reader, &mut writer, Duration::from_secs(2))
            .await;
        assert!(matches!(result, Err(Error::ConnectionLost)));
    }
}
