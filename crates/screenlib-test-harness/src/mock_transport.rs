//! In-memory [`Transport`] for client tests.
//!
//! Every [`open`](Transport::open) creates a fresh `tokio::io::duplex` pair:
//! the client side goes back to the caller, and the device side is handed to
//! the test through [`MockDevices`] as a [`MockDevice`].
//!
//! # Example
//!
//! ```
//! use screenlib_test_harness::MockTransport;
//!
//! let (transport, devices) = MockTransport::new();
//! devices.refuse_next(1); // first connection attempt fails
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use screenlib_core::error::{Error, Result};
use screenlib_core::transport::{Transport, TransportStreams};
use tokio::sync::mpsc;

use crate::mock_device::{MockDevice, STEP_TIMEOUT, StepResult};

/// Buffer size of each in-memory stream.
const DUPLEX_CAPACITY: usize = 4096;

#[derive(Debug, Default)]
struct Counters {
    /// Connection attempts still to be refused.
    refuse: AtomicUsize,
    /// Total `open` calls, refused or not.
    opened: AtomicUsize,
}

/// A [`Transport`] whose connections end in test-controlled [`MockDevice`]s.
#[derive(Debug)]
pub struct MockTransport {
    devices: mpsc::UnboundedSender<MockDevice>,
    counters: Arc<Counters>,
}

/// Test-side handle: receives the device end of each new connection.
#[derive(Debug)]
pub struct MockDevices {
    devices: mpsc::UnboundedReceiver<MockDevice>,
    counters: Arc<Counters>,
}

impl MockTransport {
    /// Create a transport and the handle that receives its connections.
    pub fn new() -> (Self, MockDevices) {
        let (tx, rx) = mpsc::unbounded_channel();
        let counters = Arc::new(Counters::default());
        (
            MockTransport {
                devices: tx,
                counters: Arc::clone(&counters),
            },
            MockDevices {
                devices: rx,
                counters,
            },
        )
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn open(&self) -> Result<TransportStreams> {
        self.counters.opened.fetch_add(1, Ordering::SeqCst);

        let refused = self
            .counters
            .refuse
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if refused {
            tracing::debug!("Mock transport refusing connection");
            return Err(Error::Transport("connection refused: mock".into()));
        }

        let (client, device) = tokio::io::duplex(DUPLEX_CAPACITY);
        self.devices
            .send(MockDevice::new(device))
            .map_err(|_| Error::Transport("connection refused: no mock device listener".into()))?;

        let (reader, writer) = tokio::io::split(client);
        Ok(TransportStreams {
            reader: Box::new(reader),
            writer: Box::new(writer),
        })
    }

    fn describe(&self) -> String {
        "mock://screen".to_string()
    }
}

impl MockDevices {
    /// Wait for the next connection, failing after [`STEP_TIMEOUT`].
    pub async fn accept(&mut self) -> StepResult<MockDevice> {
        self.accept_within(STEP_TIMEOUT)
            .await
            .ok_or_else(|| format!("no connection within {:?}", STEP_TIMEOUT))
    }

    /// Wait up to `window` for the next connection.
    pub async fn accept_within(&mut self, window: Duration) -> Option<MockDevice> {
        tokio::time::timeout(window, self.devices.recv())
            .await
            .ok()
            .flatten()
    }

    /// Make the next `n` connection attempts fail with a transport error.
    pub fn refuse_next(&self, n: usize) {
        self.counters.refuse.store(n, Ordering::SeqCst);
    }

    /// Number of connection attempts so far, including refused ones.
    pub fn opened(&self) -> usize {
        self.counters.opened.load(Ordering::SeqCst)
    }
}
