//! [`ScreenClient`]: the public handle to one screen controller.

use std::sync::Arc;

use screenlib_core::error::{Error, Result};
use screenlib_core::transport::Transport;
use screenlib_core::types::{CommandKind, ConnectionState, Credentials, Motor, QueryKind};
use screenlib_protocol::codec;
use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;

use crate::builder::ScreenClientBuilder;
use crate::observers::MessageObserver;
use crate::supervisor::{Shared, Timings, supervise};

/// Persistent client for a motorized screen controller.
///
/// After a successful [`connect`](ScreenClient::connect) the client keeps
/// itself connected: if the controller drops the link it reconnects every
/// `reconnect_interval` until [`close`](ScreenClient::close) is called.
///
/// Command methods never fail because of connectivity. They append to an
/// outbound queue that is drained one command per `command_interval`.
/// Commands still queued when a connection is lost are discarded.
///
/// Dropping the client stops its background tasks; `close` additionally
/// waits for them to finish.
pub struct ScreenClient {
    shared: Arc<Shared>,
    supervisor: Mutex<Option<JoinHandle<()>>>,
}

impl ScreenClient {
    pub(crate) fn new(
        transport: Arc<dyn Transport>,
        credentials: Credentials,
        timings: Timings,
    ) -> Self {
        Self {
            shared: Arc::new(Shared::new(transport, credentials, timings)),
            supervisor: Mutex::new(None),
        }
    }

    /// Start configuring a client.
    pub fn builder() -> ScreenClientBuilder {
        ScreenClientBuilder::new()
    }

    /// Connect and log in, then keep the connection alive in the background.
    ///
    /// Returns the error from this first attempt if it fails; no background
    /// retry is started in that case. Calling `connect` on a running client
    /// is a no-op. Fails with [`Error::Closed`] after `close`, including when
    /// `close` is called while this attempt is still logging in.
    pub async fn connect(&self) -> Result<()> {
        if self.shared.shutdown.is_cancelled() {
            return Err(Error::Closed);
        }

        let mut supervisor = self.supervisor.lock().await;
        if supervisor.is_some() {
            tracing::debug!("connect() called on a running client");
            return Ok(());
        }

        let link = tokio::select! {
            biased;

            _ = self.shared.shutdown.cancelled() => {
                // Abandoned mid-login; make sure state reads Disconnected.
                self.shared.end_session(None).await;
                return Err(Error::Closed);
            }

            link = self.shared.establish() => link?,
        };
        if self.shared.shutdown.is_cancelled() {
            let (_reader, mut writer) = link;
            writer.shutdown().await;
            return Err(Error::Closed);
        }

        self.shared.disconnect.clear();
        self.shared.start_session(link).await;
        *supervisor = Some(tokio::spawn(supervise(Arc::clone(&self.shared))));
        Ok(())
    }

    /// Whether a logged-in connection is currently up.
    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    pub fn state(&self) -> ConnectionState {
        self.shared.state()
    }

    /// Watch connection state changes, including reconnections.
    pub fn state_receiver(&self) -> watch::Receiver<ConnectionState> {
        self.shared.subscribe_state()
    }

    pub fn credentials(&self) -> &Credentials {
        &self.shared.credentials
    }

    /// Deliver every decoded controller message to `observer`.
    ///
    /// Registering the same `Arc` twice has no effect. Returns whether it was
    /// added.
    pub async fn register_state_callback(&self, observer: Arc<dyn MessageObserver>) -> bool {
        self.shared.observers.register(observer).await
    }

    /// Stop delivering messages to `observer`. Returns whether it was
    /// registered.
    pub async fn deregister_state_callback(&self, observer: &Arc<dyn MessageObserver>) -> bool {
        self.shared.observers.deregister(observer).await
    }

    /// Queue a pre-encoded command, e.g. from [`codec::build_command`].
    pub async fn send_command(&self, command: impl Into<String>) {
        self.shared.queue.enqueue(command.into()).await;
    }

    /// Move every motor to stored preset `preset`.
    pub async fn recall_preset(&self, preset: u32) {
        self.send_command(codec::build_command(
            Motor::All,
            CommandKind::Recall,
            Some(preset),
        ))
        .await;
    }

    /// Store the current position of every motor as preset `preset`.
    pub async fn store_preset(&self, preset: u32) {
        self.send_command(codec::build_command(
            Motor::All,
            CommandKind::Store,
            Some(preset),
        ))
        .await;
    }

    /// Queue a motion command (UP, DOWN, STOP, RETRACT) for `motor`.
    ///
    /// Preset commands need a number; use
    /// [`recall_preset`](Self::recall_preset) or
    /// [`store_preset`](Self::store_preset) for those.
    pub async fn move_motor(&self, motor: Motor, command: CommandKind) -> Result<()> {
        if command.takes_argument() {
            return Err(Error::InvalidParameter(format!(
                "{command} needs a preset number"
            )));
        }
        self.send_command(codec::build_command(motor, command, None))
            .await;
        Ok(())
    }

    /// Ask `motor` for its position. The answer arrives as a `POSITION`
    /// event.
    pub async fn query_position(&self, motor: Motor) {
        self.send_command(codec::build_query(motor, QueryKind::Position))
            .await;
    }

    /// Number of commands waiting to be sent.
    pub async fn pending_commands(&self) -> usize {
        self.shared.queue.len().await
    }

    /// Stop reconnecting, drop the connection, and wait for background
    /// tasks to finish. The client cannot be reconnected afterwards.
    pub async fn close(&self) {
        tracing::debug!("Closing screen client");
        self.shared.shutdown.cancel();

        if let Some(task) = self.supervisor.lock().await.take() {
            if let Err(e) = task.await {
                tracing::warn!(error = %e, "Supervisor task ended abnormally");
            }
        }

        for task in self.shared.end_session(None).await {
            if let Err(e) = task.await {
                tracing::warn!(error = %e, "Session task ended abnormally");
            }
        }
    }
}

impl Drop for ScreenClient {
    fn drop(&mut self) {
        self.shared.shutdown.cancel();
    }
}

impl std::fmt::Debug for ScreenClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScreenClient")
            .field("endpoint", &self.shared.transport.describe())
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}
