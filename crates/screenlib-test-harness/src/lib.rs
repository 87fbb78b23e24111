//! screenlib-test-harness: Test utilities and a simulated screen controller
//! for screenlib.
//!
//! - [`MockTransport`] / [`MockDevices`]: an in-memory transport whose
//!   connections end in scripted [`MockDevice`]s, for deterministic client
//!   tests
//! - [`MockScreenServer`]: a controller simulator on a real TCP port, for
//!   end-to-end tests and the CLI's `--mock` mode

pub mod mock_device;
pub mod mock_tcp;
pub mod mock_transport;

pub use mock_device::{MockDevice, STEP_TIMEOUT, StepResult};
pub use mock_tcp::MockScreenServer;
pub use mock_transport::{MockDevices, MockTransport};
