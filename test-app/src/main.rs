// screenlib test application -- CLI tool for driving a motorized screen
// controller, or an in-process simulator, from the command line.
//
// Usage:
//   screenlib-test-app --host 192.168.1.60 --username admin --password admin monitor
//   screenlib-test-app --host 192.168.1.60 --username admin down --motor all
//   screenlib-test-app --host 192.168.1.60 --username admin recall 2
//   screenlib-test-app --mock position --motor a
//   screenlib-test-app --mock monitor --duration 10
//
// Logging goes to stderr and is controlled by RUST_LOG (default
// "screenlib=info"), e.g. RUST_LOG=screenlib=trace to see every line.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use screenlib::{CommandKind, Motor, ParsedMessage, ScreenClient, ScreenClientBuilder};
use screenlib_test_harness::MockScreenServer;

const MOCK_USERNAME: &str = "admin";
const MOCK_PASSWORD: &str = "admin";

// ---------------------------------------------------------------------------
// CLI argument definitions
// ---------------------------------------------------------------------------

/// screenlib test application -- drives a screen controller from the command line.
#[derive(Parser)]
#[command(name = "screenlib-test-app", version, about)]
struct Cli {
    /// Controller IP address or hostname. Required unless --mock is used.
    #[arg(long)]
    host: Option<String>,

    /// Controller telnet port.
    #[arg(long, default_value_t = screenlib::client::builder::DEFAULT_PORT)]
    port: u16,

    /// Login name. Required unless --mock is used.
    #[arg(long)]
    username: Option<String>,

    /// Login password.
    #[arg(long, default_value = "")]
    password: String,

    /// Seconds between reconnection attempts.
    #[arg(long, default_value_t = 60)]
    reconnect_interval: u64,

    /// Milliseconds to pause after each command sent.
    #[arg(long, default_value_t = 1000)]
    command_interval: u64,

    /// Seconds allowed for the login exchange.
    #[arg(long, default_value_t = 10)]
    handshake_timeout: u64,

    /// Seconds allowed for the TCP connect.
    #[arg(long, default_value_t = 5)]
    connect_timeout: u64,

    /// Start an in-process simulated controller and connect to it instead.
    /// Conflicts with --host.
    #[arg(long, conflicts_with = "host")]
    mock: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print every message from the controller, plus connection changes.
    Monitor {
        /// Duration in seconds (0 = run until Ctrl-C).
        #[arg(long, default_value_t = 0)]
        duration: u64,
    },

    #[command(flatten)]
    Send(SendCommand),
}

/// Commands that enqueue one request for the controller.
#[derive(Subcommand)]
enum SendCommand {
    /// Raise a motor.
    Up {
        /// Motor: all, a, b, c, d, or a dotted wire code.
        #[arg(long, default_value = "all")]
        motor: Motor,
    },

    /// Lower a motor.
    Down {
        #[arg(long, default_value = "all")]
        motor: Motor,
    },

    /// Stop a motor where it is.
    Stop {
        #[arg(long, default_value = "all")]
        motor: Motor,
    },

    /// Fully retract a motor.
    Retract {
        #[arg(long, default_value = "all")]
        motor: Motor,
    },

    /// Move all motors to a stored preset.
    Recall {
        /// Preset number.
        preset: u32,
    },

    /// Store the current position of all motors as a preset.
    Store {
        /// Preset number.
        preset: u32,
    },

    /// Ask the controller for a motor's position.
    Position {
        #[arg(long, default_value = "all")]
        motor: Motor,
    },
}

// ---------------------------------------------------------------------------
// Client construction
// ---------------------------------------------------------------------------

/// Build and connect a client from the CLI options. Returns the simulator
/// too when --mock is used, so it lives as long as the client.
async fn create_client(cli: &Cli) -> Result<(ScreenClient, Option<MockScreenServer>)> {
    let mut builder = ScreenClientBuilder::new()
        .reconnect_interval(Duration::from_secs(cli.reconnect_interval))
        .command_interval(Duration::from_millis(cli.command_interval))
        .handshake_timeout(Duration::from_secs(cli.handshake_timeout))
        .connect_timeout(Duration::from_secs(cli.connect_timeout));

    let server = if cli.mock {
        let server = MockScreenServer::start(MOCK_USERNAME, MOCK_PASSWORD)
            .await
            .context("failed to start mock screen server")?;
        builder = builder
            .host("127.0.0.1")
            .port(server.port())
            .username(MOCK_USERNAME)
            .password(MOCK_PASSWORD);
        Some(server)
    } else {
        let Some(host) = cli.host.as_deref() else {
            bail!("--host is required (or use --mock)");
        };
        let Some(username) = cli.username.as_deref() else {
            bail!("--username is required (or use --mock)");
        };
        builder = builder
            .host(host)
            .port(cli.port)
            .username(username)
            .password(&cli.password);
        None
    };

    let client = builder.build().context("invalid connection settings")?;
    let endpoint = client.credentials().addr();
    client
        .connect()
        .await
        .with_context(|| format!("failed to connect to {endpoint}"))?;
    println!("Connected to {endpoint}");

    Ok((client, server))
}

// ---------------------------------------------------------------------------
// Command implementations
// ---------------------------------------------------------------------------

/// Register an observer that prints every message as it arrives.
async fn print_messages(client: &ScreenClient) {
    client
        .register_state_callback(Arc::new(|message: &ParsedMessage| {
            println!("[message] {message}");
        }))
        .await;
}

async fn cmd_monitor(client: &ScreenClient, duration_secs: u64) -> Result<()> {
    print_messages(client).await;
    let mut state = client.state_receiver();

    println!("Monitoring controller messages (Ctrl-C to stop)...");

    let deadline = async {
        if duration_secs > 0 {
            tokio::time::sleep(Duration::from_secs(duration_secs)).await;
        } else {
            std::future::pending::<()>().await;
        }
    };
    tokio::pin!(deadline);

    loop {
        tokio::select! {
            _ = &mut deadline => {
                println!("Monitor duration elapsed.");
                break;
            }
            signal = tokio::signal::ctrl_c() => {
                signal.context("failed to listen for Ctrl-C")?;
                break;
            }
            changed = state.changed() => {
                if changed.is_err() {
                    break;
                }
                let current = *state.borrow_and_update();
                println!("[connection] {current}");
            }
        }
    }

    Ok(())
}

/// Enqueue one command, then wait long enough for it to go out and for the
/// controller's first reactions to come back.
async fn cmd_send(client: &ScreenClient, command: &SendCommand, settle: Duration) -> Result<()> {
    print_messages(client).await;

    match command {
        SendCommand::Up { motor } => client.move_motor(*motor, CommandKind::Up).await?,
        SendCommand::Down { motor } => client.move_motor(*motor, CommandKind::Down).await?,
        SendCommand::Stop { motor } => client.move_motor(*motor, CommandKind::Stop).await?,
        SendCommand::Retract { motor } => {
            client.move_motor(*motor, CommandKind::Retract).await?
        }
        SendCommand::Recall { preset } => client.recall_preset(*preset).await,
        SendCommand::Store { preset } => client.store_preset(*preset).await,
        SendCommand::Position { motor } => client.query_position(*motor).await,
    }

    tokio::time::sleep(settle).await;
    let pending = client.pending_commands().await;
    if pending > 0 {
        println!("[warning] {pending} command(s) still queued");
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("screenlib=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let (client, _server) = create_client(&cli).await?;
    let settle = Duration::from_millis(cli.command_interval) + Duration::from_millis(500);

    let result = match &cli.command {
        Command::Monitor { duration } => cmd_monitor(&client, *duration).await,
        Command::Send(command) => cmd_send(&client, command, settle).await,
    };

    client.close().await;
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn send_commands_parse_at_top_level() {
        let cli = Cli::try_parse_from(["screenlib-test-app", "--mock", "down", "--motor", "a"])
            .unwrap();
        assert!(matches!(
            cli.command,
            Command::Send(SendCommand::Down { motor: Motor::A })
        ));

        let cli = Cli::try_parse_from(["screenlib-test-app", "--mock", "recall", "2"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::Send(SendCommand::Recall { preset: 2 })
        ));
    }

    #[test]
    fn monitor_parses() {
        let cli =
            Cli::try_parse_from(["screenlib-test-app", "--mock", "monitor", "--duration", "3"])
                .unwrap();
        assert!(matches!(cli.command, Command::Monitor { duration: 3 }));
    }
}
