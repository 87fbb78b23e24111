//! Inbound line listener.
//!
//! Owns the read half of a session's stream. Each `\r\n`-terminated line is
//! decoded and, if it is a recognised message, fanned out to observers.

use std::sync::Arc;

use screenlib_core::error::{Error, Result};
use screenlib_protocol::codec;
use screenlib_transport::LineReader;
use tokio::io::AsyncRead;
use tokio_util::sync::CancellationToken;

use crate::observers::ObserverRegistry;

/// Read and dispatch lines until cancelled or the stream fails.
///
/// Returns `Ok(())` when `cancel` fires and the read error otherwise. The
/// caller decides what a failure means for the connection. An over-long
/// unterminated run is dropped like any malformed line.
pub async fn listen<R>(
    mut reader: LineReader<R>,
    observers: Arc<ObserverRegistry>,
    cancel: CancellationToken,
) -> Result<()>
where
    R: AsyncRead + Unpin,
{
    loop {
        let read = tokio::select! {
            biased;

            _ = cancel.cancelled() => {
                tracing::debug!("Listener cancelled");
                return Ok(());
            }

            read = reader.read_line() => read,
        };

        match read {
            Ok(line) => handle_line(&line, &observers).await,
            // Framing overflow: the reader already discarded the run.
            Err(Error::Protocol(reason)) => {
                tracing::warn!(reason = %reason, "Dropping oversized line");
            }
            Err(e) => return Err(e),
        }
    }
}

async fn handle_line(raw: &[u8], observers: &ObserverRegistry) {
    let text = String::from_utf8_lossy(raw);
    let line = text.trim();
    if line.is_empty() {
        return;
    }

    match codec::parse_message(line) {
        Ok(Some(message)) => {
            tracing::debug!(line = %line, message = %message, "Received message");
            observers.notify(&message).await;
        }
        Ok(None) => {
            tracing::trace!(line = %line, "Ignoring unrecognised line");
        }
        Err(e) => {
            tracing::warn!(error = %e, line = %line, "Dropping malformed line");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observers::MessageObserver;
    use screenlib_core::{CommandKind, EventKind, Motor, ParsedMessage};
    use screenlib_transport::lines::MAX_LINE_LEN;
    use std::sync::Mutex;
    use std::time::Duration;
    use tokio::io::{AsyncWriteExt, duplex};

    async fn recording() -> (Arc<ObserverRegistry>, Arc<Mutex<Vec<ParsedMessage>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let observer: Arc<dyn MessageObserver> = {
            let seen = Arc::clone(&seen);
            Arc::new(move |m: &ParsedMessage| seen.lock().unwrap().push(m.clone()))
        };
        let registry = Arc::new(ObserverRegistry::new());
        registry.register(observer).await;
        (registry, seen)
    }

    #[tokio::test]
    async fn delivers_recognised_lines_and_skips_others() {
        let (mut device, client) = duplex(1024);
        let (registry, seen) = recording().await;
        let cancel = CancellationToken::new();

        let task = tokio::spawn(listen(
            LineReader::new(client),
            Arc::clone(&registry),
            cancel.clone(),
        ));

        device
            .write_all(
                b"Welcome\r\n\
                  \r\n\
                  #1.1.1.MOTOR=JUMP;\r\n\
                  !1.1.1.MOTOR.STATUS=HOME;\r\n\
                  #1.1.0.MOTOR=RECALL,2;\r\n",
            )
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_millis(50)).await;
        cancel.cancel();
        task.await.unwrap().unwrap();

        assert_eq!(
            *seen.lock().unwrap(),
            [
                ParsedMessage::Event {
                    motor: Motor::A,
                    event: EventKind::Status,
                    value: "HOME".into()
                },
                ParsedMessage::Command {
                    motor: Motor::All,
                    command: CommandKind::Recall,
                    argument: Some(2)
                },
            ]
        );
    }

    #[tokio::test]
    async fn oversized_line_is_dropped_without_ending_session() {
        let (mut device, client) = duplex(1024);
        let (registry, seen) = recording().await;
        let cancel = CancellationToken::new();

        let task = tokio::spawn(listen(
            LineReader::new(client),
            Arc::clone(&registry),
            cancel.clone(),
        ));

        let mut flood = vec![b'x'; MAX_LINE_LEN + 1000];
        flood.extend_from_slice(b"\r\n!1.1.1.MOTOR.STATUS=HOME;\r\n");
        device.write_all(&flood).await.unwrap();

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!task.is_finished());

        cancel.cancel();
        task.await.unwrap().unwrap();
        assert_eq!(
            *seen.lock().unwrap(),
            [ParsedMessage::Event {
                motor: Motor::A,
                event: EventKind::Status,
                value: "HOME".into()
            }]
        );
    }

    #[tokio::test]
    async fn eof_returns_error() {
        let (device, client) = duplex(64);
        let (registry, _seen) = recording().await;

        drop(device);
        let result = listen(LineReader::new(client), registry, CancellationToken::new()).await;
        assert!(matches!(result, Err(Error::ConnectionLost)));
    }
}
