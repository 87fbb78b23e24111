//! Outbound command dispatcher.
//!
//! Owns the write half of a session's stream and is the only writer to it.
//! Commands are sent one at a time, each followed by a fixed pause so the
//! controller is not flooded.

use std::sync::Arc;
use std::time::Duration;

use screenlib_core::error::Result;
use screenlib_transport::LineWriter;
use tokio::io::AsyncWrite;
use tokio_util::sync::CancellationToken;

use crate::queue::CommandQueue;

/// Default pause after each command.
pub const DEFAULT_COMMAND_INTERVAL: Duration = Duration::from_secs(1);

/// Drain `queue` into `writer` until cancelled or a write fails.
///
/// Returns `Ok(())` when `cancel` fires and the write error otherwise. The
/// write half is shut down on the way out in both cases.
pub async fn dispatch<W>(
    mut writer: LineWriter<W>,
    queue: Arc<CommandQueue>,
    interval: Duration,
    cancel: CancellationToken,
) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    let result = tokio::select! {
        biased;

        _ = cancel.cancelled() => {
            tracing::debug!("Dispatcher cancelled");
            Ok(())
        }

        result = drain(&mut writer, &queue, interval) => result,
    };

    writer.shutdown().await;
    result
}

async fn drain<W>(writer: &mut LineWriter<W>, queue: &CommandQueue, interval: Duration) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    loop {
        queue.has_work().clear();

        while let Some(command) = queue.pop().await {
            writer.write_line(&command).await?;
            tracing::debug!(command = %command, "Sent command");
            tokio::time::sleep(interval).await;
        }

        queue.has_work().wait().await;
    }
}
