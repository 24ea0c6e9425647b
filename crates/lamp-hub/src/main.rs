//! Lamp Hub entry point.
//!
//! Wires together all infrastructure services and starts the Tokio async runtime.
//!
//! # Architecture
//!
//! ```text
//! main()
//!  └─ load_config()            -- TOML file or defaults
//!  └─ start services
//!       ├─ TcpServer           (accept loop + one task per lamp)
//!       ├─ BleAdapter          (command loop + connect loop)
//!       ├─ console reader      (stdin → button presses)
//!       └─ EventLoop           (DeviceRouter + GuiShell, this task)
//! ```

use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use lamp_hub::application::{gui_shell::GuiShell, route_event::DeviceRouter};
use lamp_hub::infrastructure::{
    ble::{default_scanner, BleAdapter},
    bridge::{ble_bridge, queue},
    event_loop::EventLoop,
    network::TcpServer,
    storage::config::{load_config, AppConfig},
    ui_bridge::spawn_stdin_reader,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Configuration is read before logging starts so its level can be used.
    let (config, config_error) = match load_config() {
        Ok(cfg) => (cfg, None),
        Err(e) => (AppConfig::default(), Some(e)),
    };

    // Initialise structured logging.  Level is overridden by `RUST_LOG`.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.hub.log_level)),
        )
        .init();

    if let Some(e) = config_error {
        warn!("using default configuration: {e}");
    }
    info!("Lamp Hub starting");

    let capacity = config.bridge.capacity;
    let (router_sink, router_rx) = queue("router", capacity);
    let (gui_sink, gui_rx) = queue("gui", capacity);
    let (router_end, adapter_end) = ble_bridge(capacity);

    // ── TCP server ────────────────────────────────────────────────────────────
    // A failed bind is fatal: without the socket the ESP32 lamp cannot reach us.
    let server = TcpServer::bind(&config.network.listen_addr(), Arc::new(router_sink.clone())).await?;
    let tcp_hub = server.hub();
    tokio::spawn(server.run());

    // ── BLE adapter ───────────────────────────────────────────────────────────
    let adapter = Arc::new(BleAdapter::new(
        default_scanner(config.ble.scan_timeout()),
        config.ble.device_name.clone(),
        config.ble.scan_retry_interval(),
        Arc::new(adapter_end.mailbox),
    ));
    let commands = adapter_end.commands;
    tokio::spawn(async move { adapter.run(commands).await });

    // ── Console input ─────────────────────────────────────────────────────────
    let (buttons_tx, buttons_rx) = mpsc::channel(8);
    spawn_stdin_reader(buttons_tx);

    // ── Ctrl-C / SIGTERM handler ──────────────────────────────────────────────
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("shutdown signal received");
            let _ = shutdown_tx.send(true);
        }
    });

    let router = DeviceRouter::new(
        Arc::new(gui_sink),
        tcp_hub,
        Arc::new(router_end.commands),
        router_end.mailbox,
    );
    let gui = GuiShell::new(hostname(), Arc::new(router_sink));

    info!("Lamp Hub ready.  Type lamp-nrf or lamp-esp to press a button, Ctrl-C to exit.");
    EventLoop::new(
        router,
        gui,
        router_rx,
        gui_rx,
        buttons_rx,
        config.bridge.poll_interval(),
    )
    .run(shutdown_rx)
    .await;

    info!("Lamp Hub stopped");
    Ok(())
}

/// Best-effort machine name for the info widget.
fn hostname() -> String {
    std::env::var("HOSTNAME")
        .ok()
        .or_else(|| std::env::var("COMPUTERNAME").ok())
        .or_else(|| {
            std::fs::read_to_string("/etc/hostname")
                .ok()
                .map(|s| s.trim().to_string())
        })
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "unknown".to_string())
}
