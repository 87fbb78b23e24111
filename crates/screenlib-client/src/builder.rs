//! ScreenClientBuilder -- fluent builder for constructing [`ScreenClient`]
//! instances.
//!
//! # Example
//!
//! ```no_run
//! use screenlib_client::ScreenClientBuilder;
//! use std::time::Duration;
//!
//! # async fn example() -> screenlib_core::Result<()> {
//! let client = ScreenClientBuilder::new()
//!     .host("192.168.1.60")
//!     .username("admin")
//!     .password("secret")
//!     .reconnect_interval(Duration::from_secs(30))
//!     .build()?;
//! client.connect().await?;
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;
use std::time::Duration;

use screenlib_core::error::{Error, Result};
use screenlib_core::transport::Transport;
use screenlib_core::types::Credentials;
use screenlib_transport::TcpTransport;

use crate::client::ScreenClient;
use crate::dispatcher::DEFAULT_COMMAND_INTERVAL;
use crate::handshake::DEFAULT_HANDSHAKE_TIMEOUT;
use crate::supervisor::Timings;

/// Default controller telnet port.
pub const DEFAULT_PORT: u16 = 23;

/// Default delay between reconnection attempts.
pub const DEFAULT_RECONNECT_INTERVAL: Duration = Duration::from_secs(60);

/// Default TCP connect timeout.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = screenlib_transport::tcp::DEFAULT_CONNECT_TIMEOUT;

/// Fluent builder for [`ScreenClient`].
///
/// `host` and `username` are required; everything else has a default.
#[derive(Debug, Clone)]
pub struct ScreenClientBuilder {
    host: Option<String>,
    port: u16,
    username: Option<String>,
    password: String,
    reconnect_interval: Duration,
    command_interval: Duration,
    handshake_timeout: Duration,
    connect_timeout: Duration,
}

impl ScreenClientBuilder {
    /// Create a new builder with default settings.
    pub fn new() -> Self {
        ScreenClientBuilder {
            host: None,
            port: DEFAULT_PORT,
            username: None,
            password: String::new(),
            reconnect_interval: DEFAULT_RECONNECT_INTERVAL,
            command_interval: DEFAULT_COMMAND_INTERVAL,
            handshake_timeout: DEFAULT_HANDSHAKE_TIMEOUT,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }

    /// Set the controller's IP address or hostname.
    pub fn host(mut self, host: &str) -> Self {
        self.host = Some(host.to_string());
        self
    }

    /// Set the controller's TCP port (default: 23).
    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set the login name.
    pub fn username(mut self, username: &str) -> Self {
        self.username = Some(username.to_string());
        self
    }

    /// Set the login password (default: empty).
    pub fn password(mut self, password: &str) -> Self {
        self.password = password.to_string();
        self
    }

    /// Set the fixed delay between reconnection attempts (default: 60 s).
    pub fn reconnect_interval(mut self, interval: Duration) -> Self {
        self.reconnect_interval = interval;
        self
    }

    /// Set the pause after each command sent (default: 1 s).
    pub fn command_interval(mut self, interval: Duration) -> Self {
        self.command_interval = interval;
        self
    }

    /// Set the limit on the login exchange (default: 10 s).
    pub fn handshake_timeout(mut self, timeout: Duration) -> Self {
        self.handshake_timeout = timeout;
        self
    }

    /// Set the TCP connect timeout (default: 5 s). Ignored by
    /// [`build_with_transport`](Self::build_with_transport).
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Build a client that connects over TCP to `host:port`.
    ///
    /// Does not connect; call [`ScreenClient::connect`].
    pub fn build(self) -> Result<ScreenClient> {
        let credentials = self.credentials()?;
        if self.connect_timeout.is_zero() {
            return Err(Error::InvalidParameter(
                "connect_timeout must be non-zero".into(),
            ));
        }
        let transport =
            TcpTransport::new(credentials.addr()).with_connect_timeout(self.connect_timeout);
        let timings = self.timings();
        Ok(ScreenClient::new(Arc::new(transport), credentials, timings))
    }

    /// Build a client over any [`Transport`], e.g. an in-memory one in tests.
    ///
    /// `host` and `port` are still recorded in the client's credentials but
    /// are not used to connect.
    pub fn build_with_transport(self, transport: Arc<dyn Transport>) -> Result<ScreenClient> {
        let credentials = self.credentials()?;
        let timings = self.timings();
        Ok(ScreenClient::new(transport, credentials, timings))
    }

    fn credentials(&self) -> Result<Credentials> {
        let host = match self.host.as_deref() {
            Some(host) if !host.trim().is_empty() => host,
            _ => return Err(Error::InvalidParameter("host is required".into())),
        };
        let username = match self.username.as_deref() {
            Some(username) if !username.is_empty() => username,
            _ => return Err(Error::InvalidParameter("username is required".into())),
        };

        for (name, value) in [
            ("reconnect_interval", self.reconnect_interval),
            ("command_interval", self.command_interval),
            ("handshake_timeout", self.handshake_timeout),
        ] {
            if value.is_zero() {
                return Err(Error::InvalidParameter(format!("{name} must be non-zero")));
            }
        }

        Ok(Credentials::new(
            host,
            self.port,
            username,
            self.password.as_str(),
            self.reconnect_interval,
        ))
    }

    fn timings(&self) -> Timings {
        Timings {
            command_interval: self.command_interval,
            handshake_timeout: self.handshake_timeout,
        }
    }
}

impl Default for ScreenClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}
