//! Simulated ESP32 lamp entry point.
//!
//! ```text
//! lamp-esp-sim --server 192.168.1.20:8080
//! ```
//!
//! Runs until Ctrl-C.  Set `RUST_LOG=debug` to see every message.

use std::time::Duration;

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use lamp_esp_sim::application::lamp::SimulatedLamp;
use lamp_esp_sim::infrastructure::network::{LampClient, SimConfig};

/// Simulated ESP32-S3 colour lamp for Lamp Hub.
#[derive(Parser, Debug)]
#[command(name = "lamp-esp-sim", version, about)]
struct Args {
    /// Hub address as host:port
    #[arg(long, env = "LAMP_SERVER", default_value = "127.0.0.1:8080")]
    server: String,

    /// Seconds to wait before reconnecting
    #[arg(long, default_value_t = 3)]
    reconnect_secs: u64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    info!("ESP32 lamp simulator starting, hub at {}", args.server);

    let mut client = LampClient::new(
        SimConfig {
            server: args.server,
            reconnect_interval: Duration::from_secs(args.reconnect_secs),
        },
        SimulatedLamp::default(),
    );

    tokio::select! {
        _ = client.run() => {}
        result = tokio::signal::ctrl_c() => {
            result?;
            info!("shutdown signal received");
        }
    }

    info!(state = ?client.lamp().state(), "ESP32 lamp simulator stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_defaults() {
        let args = Args::try_parse_from(["lamp-esp-sim"]).unwrap();
        assert_eq!(args.reconnect_secs, 3);
    }

    #[test]
    fn test_args_server_flag() {
        let args =
            Args::try_parse_from(["lamp-esp-sim", "--server", "10.0.0.2:9000"]).unwrap();
        assert_eq!(args.server, "10.0.0.2:9000");
    }
}
