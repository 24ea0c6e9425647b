//! The hub's main loop: one task that owns the router and the GUI.
//!
//! Router and GUI state are never shared between tasks.  Everything that
//! happens elsewhere (a TCP read, a BLE notification, a console line) reaches
//! them as a message on one of the loop's inputs:
//!
//! | input        | source                          | handled by          |
//! |--------------|---------------------------------|---------------------|
//! | `router_rx`  | TCP adapter, GUI                | `DeviceRouter`      |
//! | `gui_rx`     | router                          | `GuiShell`          |
//! | `buttons`    | console bridge                  | `GuiShell::press`   |
//! | ticker       | `tokio::time::interval`         | router (`Timer`)    |
//! | shutdown     | Ctrl-C handler                  | ends the loop       |
//!
//! The BLE adapter is not listed: its events arrive through the bridge
//! mailbox, which the router drains on every tick.

use std::time::Duration;

use lamp_core::{AppEvent, UserButton};
use tokio::sync::{mpsc, watch};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::application::gui_shell::GuiShell;
use crate::application::route_event::DeviceRouter;
use crate::infrastructure::bridge::EventReceiver;
use crate::infrastructure::ui_bridge::ConsoleView;

pub struct EventLoop {
    router: DeviceRouter,
    gui: GuiShell,
    router_rx: EventReceiver,
    gui_rx: EventReceiver,
    buttons: mpsc::Receiver<UserButton>,
    poll_interval: Duration,
}

impl EventLoop {
    pub fn new(
        router: DeviceRouter,
        gui: GuiShell,
        router_rx: EventReceiver,
        gui_rx: EventReceiver,
        buttons: mpsc::Receiver<UserButton>,
        poll_interval: Duration,
    ) -> Self {
        Self {
            router,
            gui,
            router_rx,
            gui_rx,
            buttons,
            poll_interval,
        }
    }

    /// Runs until `shutdown` becomes `true` or its sender is dropped, then
    /// hands back the router and the GUI so callers can inspect final state.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) -> (DeviceRouter, GuiShell) {
        let EventLoop {
            mut router,
            mut gui,
            mut router_rx,
            mut gui_rx,
            mut buttons,
            poll_interval,
        } = self;
        let mut console = ConsoleView::new();

        for event in DeviceRouter::startup_events() {
            if let Err(e) = gui.handle(event).await {
                warn!("startup: {e}");
            }
        }
        console.update(&gui.views());

        let mut ticker = tokio::time::interval(poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!("event loop running");
        loop {
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
                Some(event) = router_rx.recv() => {
                    if let Err(e) = router.route(event).await {
                        warn!("router: {e}");
                    }
                }
                Some(event) = gui_rx.recv() => {
                    if let Err(e) = gui.handle(event).await {
                        warn!("gui: {e}");
                    }
                    console.update(&gui.views());
                }
                Some(button) = buttons.recv() => {
                    debug!(?button, "console press");
                    if let Err(e) = gui.press(button).await {
                        warn!("gui: {e}");
                    }
                }
                _ = ticker.tick() => {
                    if let Err(e) = router.route(AppEvent::timer()).await {
                        warn!("router: {e}");
                    }
                }
            }
        }
        info!("event loop stopped");
        (router, gui)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::route_event::EventSink;
    use crate::infrastructure::bridge::queue;
    use lamp_core::{ConnectionState, ConnectionType, EspLampState};
    use serde_json::json;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_tcp_update_reaches_esp_widget() {
        // Arrange
        let (router_sink, router_rx) = queue("router", 16);
        let (gui_sink, gui_rx) = queue("gui", 16);
        let (tcp_sink, mut tcp_rx) = queue("tcp", 16);
        let (ble_sink, _ble_rx) = queue("ble", 16);
        let (_mailbox_tx, mailbox_rx) = queue("mailbox", 16);
        let (_buttons_tx, buttons_rx) = mpsc::channel(4);
        let router = DeviceRouter::new(
            Arc::new(gui_sink),
            Arc::new(tcp_sink),
            Arc::new(ble_sink),
            mailbox_rx,
        );
        let gui = GuiShell::new("test", Arc::new(router_sink.clone()));
        let event_loop = EventLoop::new(
            router,
            gui,
            router_rx,
            gui_rx,
            buttons_rx,
            Duration::from_millis(10),
        );
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = tokio::spawn(event_loop.run(shutdown_rx));

        // Act: a lamp connects and reports yellow.
        router_sink
            .send(AppEvent::connection_update(
                ConnectionType::Tcp,
                ConnectionState::Connected,
            ))
            .await
            .unwrap();
        // The widget asks for the lamp's state as soon as it sees the connection.
        assert_eq!(
            tcp_rx.recv().await,
            Some(AppEvent::device_req_update(ConnectionType::Tcp))
        );
        router_sink
            .send(AppEvent::data_tcp(
                json!({"device":"lamp-esp","event":"update","arg0":0,"arg1":2})
                    .as_object()
                    .cloned()
                    .unwrap(),
            ))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        shutdown_tx.send(true).unwrap();
        let (router, gui) = handle.await.unwrap();

        // Assert
        assert_eq!(router.tcp_state(), ConnectionState::Connected);
        assert_eq!(gui.esp().state(), EspLampState::ColorYellow);
        assert_eq!(gui.views()[1].text, "yellow");
    }

    #[tokio::test]
    async fn test_dropping_shutdown_sender_stops_loop() {
        let (_router_sink, router_rx) = queue("router", 4);
        let (gui_sink, gui_rx) = queue("gui", 4);
        let (_mailbox_tx, mailbox_rx) = queue("mailbox", 4);
        let (_buttons_tx, buttons_rx) = mpsc::channel(4);
        let (tcp_sink, _tcp_rx) = queue("tcp", 4);
        let (ble_sink, _ble_rx) = queue("ble", 4);
        let (loopback, _loopback_rx) = queue("router-loopback", 4);
        let router = DeviceRouter::new(
            Arc::new(gui_sink),
            Arc::new(tcp_sink),
            Arc::new(ble_sink),
            mailbox_rx,
        );
        let gui = GuiShell::new("test", Arc::new(loopback));
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let event_loop = EventLoop::new(
            router,
            gui,
            router_rx,
            gui_rx,
            buttons_rx,
            Duration::from_millis(10),
        );

        drop(shutdown_tx);
        let (router, _gui) = event_loop.run(shutdown_rx).await;

        assert_eq!(router.tcp_state(), ConnectionState::Disconnected);
    }
}
