//! Monitor screen controller events.
//!
//! Connects to a controller, registers an observer that prints every
//! decoded message, then lowers all motors and watches them travel. The
//! client keeps reconnecting in the background if the link drops.
//!
//! # Requirements
//!
//! - A screen controller reachable on the network
//! - Host and credentials adjusted for your installation
//!
//! # Usage
//!
//! ```sh
//! cargo run -p screenlib --example monitor_events
//! ```

use std::sync::Arc;
use std::time::Duration;

use screenlib::{CommandKind, Motor, ParsedMessage, ScreenClientBuilder};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let host = "192.168.1.60";

    println!("Connecting to screen controller at {}...", host);

    let client = ScreenClientBuilder::new()
        .host(host)
        .username("admin")
        .password("admin")
        .reconnect_interval(Duration::from_secs(10))
        .build()?;
    client.connect().await?;
    println!("Connected.\n");

    let start = tokio::time::Instant::now();
    client
        .register_state_callback(Arc::new(move |message: &ParsedMessage| {
            let elapsed = start.elapsed();
            println!(
                "{:>6}.{:03}s {}",
                elapsed.as_secs(),
                elapsed.subsec_millis(),
                message
            );
        }))
        .await;

    client.move_motor(Motor::All, CommandKind::Down).await?;
    client.query_position(Motor::All).await;

    println!("Monitoring for 60 seconds...\n");
    let mut state = client.state_receiver();
    let deadline = tokio::time::sleep(Duration::from_secs(60));
    tokio::pin!(deadline);

    loop {
        tokio::select! {
            _ = &mut deadline => break,
            changed = state.changed() => {
                if changed.is_err() {
                    break;
                }
                println!("(connection {})", *state.borrow_and_update());
            }
        }
    }

    client.close().await;
    println!("\nMonitoring complete.");
    Ok(())
}
