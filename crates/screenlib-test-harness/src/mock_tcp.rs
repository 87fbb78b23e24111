//! Simulated screen controller on a real TCP port.
//!
//! [`MockScreenServer`] listens on localhost, opens each connection with
//! telnet option offers, logs clients in with fixed credentials, echoes the commands and queries it understands, and reports
//! motion with `STATUS` and `POSITION` events the way a controller does. It
//! backs the CLI's `--mock` mode and end-to-end tests over
//! `TcpTransport`.
//!
//! # Example
//!
//! ```
//! use screenlib_test_harness::MockScreenServer;
//!
//! # async fn example() -> screenlib_core::Result<()> {
//! let server = MockScreenServer::start("admin", "secret").await?;
//! let addr = server.addr();
//! // ... point a client at `addr` ...
//! # Ok(())
//! # }
//! ```

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use screenlib_core::error::{Error, Result};
use screenlib_core::{CommandKind, EventKind, Motor, MotorStatus, ParsedMessage};
use screenlib_protocol::codec;
use screenlib_transport::TelnetStream;
use screenlib_transport::telnet::{IAC, WILL};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use crate::mock_device::{MockDevice, StepResult};

/// Fully extended position.
const END_POSITION: u32 = 100;

/// `IAC WILL ECHO`, `IAC WILL SUPPRESS-GO-AHEAD`, as a telnet server opens.
const OPTION_OFFERS: [u8; 6] = [IAC, WILL, 0x01, IAC, WILL, 0x03];

/// Simulated controller listening on `127.0.0.1`.
///
/// Accepts any number of clients, one task each. Dropping the server stops
/// accepting and disconnects every client.
#[derive(Debug)]
pub struct MockScreenServer {
    addr: String,
    accepted: Arc<AtomicUsize>,
    kick: broadcast::Sender<()>,
    accept_task: JoinHandle<()>,
}

#[derive(Debug, Clone)]
struct Login {
    username: String,
    password: String,
}

impl MockScreenServer {
    /// Bind a random port and start accepting clients.
    pub async fn start(username: &str, password: &str) -> Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .map_err(|e| Error::Transport(format!("failed to bind mock screen server: {}", e)))?;
        let addr = listener.local_addr().map_err(Error::Io)?.to_string();

        let login = Login {
            username: username.to_string(),
            password: password.to_string(),
        };
        let accepted = Arc::new(AtomicUsize::new(0));
        let (kick, _) = broadcast::channel(1);

        let accept_task = {
            let accepted = Arc::clone(&accepted);
            let kick = kick.clone();
            tokio::spawn(async move {
                loop {
                    let (stream, peer) = match listener.accept().await {
                        Ok(conn) => conn,
                        Err(e) => {
                            tracing::warn!(error = %e, "Mock screen server accept failed");
                            continue;
                        }
                    };
                    accepted.fetch_add(1, Ordering::SeqCst);
                    tracing::debug!(peer = %peer, "Mock screen server accepted client");

                    let login = login.clone();
                    let kicked = kick.subscribe();
                    tokio::spawn(async move {
                        if let Err(e) = serve(stream, login, kicked).await {
                            tracing::debug!(peer = %peer, error = %e, "Mock client session ended");
                        }
                    });
                }
            })
        };

        tracing::info!(addr = %addr, "Mock screen server listening");
        Ok(Self {
            addr,
            accepted,
            kick,
            accept_task,
        })
    }

    /// Address the server is listening on, e.g. `"127.0.0.1:54321"`.
    pub fn addr(&self) -> &str {
        &self.addr
    }

    /// Listening port.
    pub fn port(&self) -> u16 {
        self.addr
            .rsplit(':')
            .next()
            .and_then(|p| p.parse().ok())
            .unwrap_or_default()
    }

    /// Number of connections accepted so far.
    pub fn accepted(&self) -> usize {
        self.accepted.load(Ordering::SeqCst)
    }

    /// Drop every connected client, as a controller reboot would. The server
    /// keeps listening.
    pub fn drop_clients(&self) {
        let _ = self.kick.send(());
    }
}

impl Drop for MockScreenServer {
    fn drop(&mut self) {
        self.accept_task.abort();
        let _ = self.kick.send(());
    }
}

/// One client connection: login, then command/event simulation.
async fn serve(
    stream: TcpStream,
    login: Login,
    mut kicked: broadcast::Receiver<()>,
) -> StepResult<()> {
    let (reader, writer) = tokio::io::split(TelnetStream::new(stream));
    let mut device = MockDevice::from_halves(Box::new(reader), Box::new(writer));
    device.send_bytes(&OPTION_OFFERS).await?;

    tokio::select! {
        _ = kicked.recv() => return Ok(()),
        result = authenticate(&mut device, &login) => result?,
    }

    let mut screen = Screen::default();
    loop {
        let line = tokio::select! {
            _ = kicked.recv() => return Ok(()),
            line = device.recv_line() => line?,
        };
        let Some(line) = line else {
            return Ok(());
        };

        let line = line.trim();
        let message = match codec::parse_message(line) {
            Ok(Some(message)) => message,
            Ok(None) | Err(_) => {
                tracing::trace!(line = %line, "Mock screen ignoring line");
                continue;
            }
        };

        device.send_line(line).await?;
        for event in screen.apply(&message) {
            device.send_line(&event).await?;
        }
    }
}

/// Prompt until the client sends the right credentials.
async fn authenticate(device: &mut MockDevice, login: &Login) -> StepResult<()> {
    loop {
        device.send_raw("\r\nUser:").await?;
        let username = device.read_line().await?;
        device.send_raw("\r\nPassword:").await?;
        let password = device.read_line().await?;

        if username.trim() == login.username && password.trim() == login.password {
            return device.send_raw("\r\nConnected: screenlib mock CVM\r\n").await;
        }
        device.send_raw("\r\nLogin incorrect").await?;
    }
}

/// Motor positions and stored presets of the simulated screen.
#[derive(Debug, Default)]
struct Screen {
    positions: HashMap<Motor, u32>,
    presets: HashMap<(Motor, u32), u32>,
}

impl Screen {
    /// Update state for `message` and return the event lines it produces.
    fn apply(&mut self, message: &ParsedMessage) -> Vec<String> {
        match message {
            ParsedMessage::Command {
                motor,
                command,
                argument,
            } => self.command(*motor, *command, *argument),
            ParsedMessage::Query { motor, .. } => {
                vec![event(*motor, EventKind::Position, &self.position(*motor).to_string())]
            }
            ParsedMessage::Event { .. } => Vec::new(),
        }
    }

    fn position(&self, motor: Motor) -> u32 {
        self.positions.get(&motor).copied().unwrap_or(0)
    }

    fn command(&mut self, motor: Motor, command: CommandKind, argument: Option<u32>) -> Vec<String> {
        let target = match command {
            CommandKind::Up | CommandKind::Retract => Some(0),
            CommandKind::Down => Some(END_POSITION),
            CommandKind::Recall => argument.map(|n| {
                self.presets
                    .get(&(motor, n))
                    .copied()
                    .unwrap_or(n.saturating_mul(10).min(END_POSITION))
            }),
            CommandKind::Store => {
                if let Some(n) = argument {
                    self.presets.insert((motor, n), self.position(motor));
                }
                None
            }
            CommandKind::Stop => {
                return vec![status(motor, MotorStatus::Stop)];
            }
        };

        let Some(target) = target else {
            return Vec::new();
        };
        let current = self.position(motor);
        self.positions.insert(motor, target);

        let moving = if target < current {
            MotorStatus::Retracting
        } else {
            MotorStatus::Extending
        };
        let resting = match target {
            0 => MotorStatus::Home,
            END_POSITION => MotorStatus::End,
            _ => MotorStatus::Stop,
        };
        vec![
            status(motor, moving),
            status(motor, resting),
            event(motor, EventKind::Position, &target.to_string()),
        ]
    }
}

fn status(motor: Motor, status: MotorStatus) -> String {
    event(motor, EventKind::Status, &status.to_string())
}

fn event(motor: Motor, event: EventKind, value: &str) -> String {
    format!("!{}.{}={};", motor.code(), event.keyword(), value)
}
