//! Connection lifecycle: establish, run a session, clean up, reconnect.
//!
//! A *session* is one authenticated connection together with its listener
//! and dispatcher tasks. Sessions are numbered; cleanup requested by a task
//! of a session that has already been replaced is ignored. At most one
//! session exists at a time.
//!
//! The supervisor loop runs from the first successful `connect()` until the
//! client is closed. While disconnected it retries on a fixed interval; while
//! connected it sleeps on the disconnect signal.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use screenlib_core::error::Result;
use screenlib_core::transport::{ReadHalf, Transport, WriteHalf};
use screenlib_core::types::{ConnectionState, Credentials};
use screenlib_transport::{LineReader, LineWriter};
use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::dispatcher::dispatch;
use crate::handshake::Handshake;
use crate::listener::listen;
use crate::observers::ObserverRegistry;
use crate::queue::CommandQueue;
use crate::signal::Signal;

/// An authenticated stream, ready to hand to a session.
pub(crate) type Link = (LineReader<ReadHalf>, LineWriter<WriteHalf>);

/// Timing knobs that apply to every connection.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Timings {
    pub command_interval: Duration,
    pub handshake_timeout: Duration,
}

struct Session {
    id: u64,
    cancel: CancellationToken,
    tasks: Vec<JoinHandle<()>>,
}

/// State shared between the client handle, the supervisor loop and the
/// session tasks.
pub(crate) struct Shared {
    pub transport: Arc<dyn Transport>,
    pub credentials: Credentials,
    pub timings: Timings,
    pub queue: Arc<CommandQueue>,
    pub observers: Arc<ObserverRegistry>,
    /// Set by cleanup; cleared when a new session starts.
    pub disconnect: Signal,
    /// Parent of every session token. Cancelled once, by close or drop.
    pub shutdown: CancellationToken,
    state: watch::Sender<ConnectionState>,
    session: Mutex<Option<Session>>,
    next_session: AtomicU64,
}

impl Shared {
    pub fn new(transport: Arc<dyn Transport>, credentials: Credentials, timings: Timings) -> Self {
        let (state, _) = watch::channel(ConnectionState::Disconnected);
        Self {
            transport,
            credentials,
            timings,
            queue: Arc::new(CommandQueue::new()),
            observers: Arc::new(ObserverRegistry::new()),
            disconnect: Signal::new(),
            shutdown: CancellationToken::new(),
            state,
            session: Mutex::new(None),
            next_session: AtomicU64::new(0),
        }
    }

    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<ConnectionState> {
        self.state.subscribe()
    }

    fn set_state(&self, next: ConnectionState) {
        let prev = self.state.send_replace(next);
        if prev != next {
            tracing::debug!(from = %prev, to = %next, "Connection state changed");
        }
    }

    /// Open the transport and log in.
    ///
    /// State is `Authenticating` while the handshake runs and returns to
    /// `Disconnected` if it fails.
    pub async fn establish(&self) -> Result<Link> {
        let endpoint = self.transport.describe();
        tracing::debug!(endpoint = %endpoint, "Opening connection");

        let streams = self.transport.open().await?;
        self.set_state(ConnectionState::Authenticating);

        let mut reader = LineReader::new(streams.reader);
        let mut writer = LineWriter::new(streams.writer);
        let mut handshake =
            Handshake::new(self.credentials.username(), self.credentials.password());

        if let Err(e) = handshake
            .run(&mut reader, &mut writer, self.timings.handshake_timeout)
            .await
        {
            tracing::debug!(endpoint = %endpoint, error = %e, "Login failed");
            writer.shutdown().await;
            self.set_state(ConnectionState::Disconnected);
            return Err(e);
        }

        Ok((reader, writer))
    }

    /// Start the listener and dispatcher for a freshly established link.
    ///
    /// Commands queued before this point are discarded.
    pub async fn start_session(self: &Arc<Self>, link: Link) {
        let (reader, writer) = link;
        self.queue.reset().await;

        let mut slot = self.session.lock().await;
        if let Some(old) = slot.take() {
            old.cancel.cancel();
        }

        let id = self.next_session.fetch_add(1, Ordering::SeqCst) + 1;
        let cancel = self.shutdown.child_token();
        self.set_state(ConnectionState::Connected);

        let listener = {
            let shared = Arc::clone(self);
            let cancel = cancel.clone();
            tokio::spawn(async move {
                let observers = Arc::clone(&shared.observers);
                if let Err(e) = listen(reader, observers, cancel).await {
                    tracing::warn!(session = id, error = %e, "Read from controller failed");
                    shared.end_session(Some(id)).await;
                }
            })
        };

        let dispatcher = {
            let shared = Arc::clone(self);
            let cancel = cancel.clone();
            tokio::spawn(async move {
                let queue = Arc::clone(&shared.queue);
                let interval = shared.timings.command_interval;
                if let Err(e) = dispatch(writer, queue, interval, cancel).await {
                    tracing::warn!(session = id, error = %e, "Write to controller failed");
                    shared.end_session(Some(id)).await;
                }
            })
        };

        *slot = Some(Session {
            id,
            cancel,
            tasks: vec![listener, dispatcher],
        });
        tracing::info!(
            endpoint = %self.transport.describe(),
            session = id,
            "Connected to controller"
        );
    }

    /// Disconnect cleanup. Idempotent.
    ///
    /// With `Some(id)`, does nothing unless session `id` is the current one.
    /// Returns the ended session's task handles; the caller may await them
    /// unless it is one of those tasks.
    pub async fn end_session(&self, id: Option<u64>) -> Vec<JoinHandle<()>> {
        let mut slot = self.session.lock().await;
        if let Some(id) = id {
            if slot.as_ref().map(|s| s.id) != Some(id) {
                tracing::trace!(session = id, "Ignoring cleanup for a replaced session");
                return Vec::new();
            }
        }

        let session = slot.take();
        self.set_state(ConnectionState::Disconnected);
        self.disconnect.set();
        drop(slot);

        match session {
            Some(session) => {
                session.cancel.cancel();
                tracing::info!(session = session.id, "Disconnected from controller");
                session.tasks
            }
            None => Vec::new(),
        }
    }
}

/// Supervisor loop. Runs until `shared.shutdown` is cancelled.
pub(crate) async fn supervise(shared: Arc<Shared>) {
    let shutdown = shared.shutdown.clone();
    let interval = shared.credentials.reconnect_interval();

    loop {
        tokio::select! {
            biased;
            _ = shutdown.cancelled() => break,
            _ = supervise_once(&shared, interval) => {}
        }
        tokio::select! {
            biased;
            _ = shutdown.cancelled() => break,
            _ = tokio::time::sleep(interval) => {}
        }
    }

    tracing::debug!("Supervisor stopped");
}

async fn supervise_once(shared: &Arc<Shared>, interval: Duration) {
    if shared.state() != ConnectionState::Disconnected {
        shared.disconnect.wait().await;
        return;
    }

    match shared.establish().await {
        Ok(link) => {
            shared.disconnect.clear();
            shared.start_session(link).await;
        }
        Err(e) => {
            tracing::warn!(
                endpoint = %shared.transport.describe(),
                error = %e,
                retry_in_ms = interval.as_millis(),
                "Reconnect failed"
            );
        }
    }
}
