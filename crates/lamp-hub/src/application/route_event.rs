//! DeviceRouter: dispatches every event in the hub to its destination.
//!
//! The router is the heart of the hub.  It receives events from the GUI, the
//! TCP adapter, and (through the bridge mailbox) the BLE adapter, keeps track
//! of which transports are connected, and forwards each event to the
//! component that should act on it:
//!
//! ```text
//!              ┌──────────────┐   DeviceUpdate / ConnectionUpdate
//!  GUI ──────► │              │ ─────────────────────────────────► GUI
//!  TCP ──────► │ DeviceRouter │   UserInput(LampEspOn), ReqUpdate
//!  mailbox ──► │              │ ─────────────────────────────────► TCP adapter
//!   (Timer)    └──────────────┘   UserInput(LampNrfOnOff), ReqUpdate
//!                                 ─────────────────────────────────► BLE bridge
//! ```
//!
//! # Architecture
//!
//! The router depends only on the [`EventSink`] trait and `lamp_core` types.
//! The three sinks are injected at construction time, so unit tests replace
//! them with mocks and the event loop replaces them with channels.
//!
//! Dispatch is a single exhaustive `match` on [`EventKind`].  Kinds the router
//! does not handle fall into [`DeviceRouter::unsupported`], which logs and
//! drops.

use std::sync::Arc;

use async_trait::async_trait;
use lamp_core::{
    protocol::messages::DEVICE_LAMP_NRF, AppEvent, ConnectionState, ConnectionType, EventKind,
    LampMessage, NrfLampState, Payload, UserButton,
};
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Error type for the routing use case.
#[derive(Debug, Error, PartialEq)]
pub enum RouteError {
    /// The component behind a sink is gone (its receiver was dropped).
    #[error("{target} sink unavailable: {reason}")]
    Sink { target: &'static str, reason: String },
}

/// Something that accepts events: the GUI, a transport adapter, or a queue.
///
/// Infrastructure implementations push into tokio channels; test
/// implementations record calls.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EventSink: Send + Sync {
    /// Delivers one event.  Returns `Err` only when the receiver is gone.
    async fn send(&self, event: AppEvent) -> Result<(), String>;
}

/// The router's inbox from the BLE adapter, polled without blocking.
pub trait Mailbox: Send {
    /// The oldest queued event, or `None` when the mailbox is empty.
    fn try_next(&mut self) -> Option<AppEvent>;
}

impl Mailbox for mpsc::Receiver<AppEvent> {
    fn try_next(&mut self) -> Option<AppEvent> {
        self.try_recv().ok()
    }
}

/// The Device Router use case.
///
/// Owns the authoritative connection state of both transports.  Transports
/// report transitions through `ConnectionUpdate` events and never read the
/// state back.
pub struct DeviceRouter {
    tcp_state: ConnectionState,
    ble_state: ConnectionState,
    gui: Arc<dyn EventSink>,
    tcp: Arc<dyn EventSink>,
    ble_bridge: Arc<dyn EventSink>,
    /// Events posted by the BLE adapter, drained on every Timer tick.
    mailbox: Box<dyn Mailbox>,
}

impl DeviceRouter {
    /// Creates a router with both transports marked disconnected.
    pub fn new(
        gui: Arc<dyn EventSink>,
        tcp: Arc<dyn EventSink>,
        ble_bridge: Arc<dyn EventSink>,
        mailbox: impl Mailbox + 'static,
    ) -> Self {
        Self {
            tcp_state: ConnectionState::Disconnected,
            ble_state: ConnectionState::Disconnected,
            gui,
            tcp,
            ble_bridge,
            mailbox: Box::new(mailbox),
        }
    }

    /// The events posted to the GUI on startup, so both lamp widgets show
    /// "disconnect" before any transport has reported.
    pub fn startup_events() -> [AppEvent; 2] {
        [
            AppEvent::connection_update(ConnectionType::Tcp, ConnectionState::Disconnected),
            AppEvent::connection_update(ConnectionType::Ble, ConnectionState::Disconnected),
        ]
    }

    pub fn tcp_state(&self) -> ConnectionState {
        self.tcp_state
    }

    pub fn ble_state(&self) -> ConnectionState {
        self.ble_state
    }

    /// Routes one inbound event.
    ///
    /// A `Timer` drains the bridge mailbox and dispatches every drained event.
    /// Everything else is dispatched directly.
    ///
    /// # Errors
    ///
    /// Returns [`RouteError::Sink`] if a destination is gone.  When draining
    /// the mailbox, every drained event is still dispatched and the first
    /// error is returned at the end.
    pub async fn route(&mut self, event: AppEvent) -> Result<(), RouteError> {
        if event.kind() == EventKind::Timer {
            return self.drain_mailbox().await;
        }
        self.dispatch(event).await
    }

    async fn drain_mailbox(&mut self) -> Result<(), RouteError> {
        let mut first_error = None;
        while let Some(event) = self.mailbox.try_next() {
            if let Err(e) = self.dispatch(event).await {
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    async fn dispatch(&mut self, event: AppEvent) -> Result<(), RouteError> {
        match event.kind() {
            EventKind::ConnectionUpdate => self.on_connection_update(event).await,
            EventKind::UserInput => self.on_user_input(event).await,
            EventKind::DeviceReqUpdate => self.on_req_update(event).await,
            EventKind::DataTcp => self.on_data_tcp(event).await,
            EventKind::DataBle => self.on_data_ble(event).await,
            // A Timer can only get here from the mailbox; draining again from
            // inside a drain is not supported.
            EventKind::Timer | EventKind::Null | EventKind::DeviceUpdate => {
                self.unsupported(&event);
                Ok(())
            }
        }
    }

    // ── Handlers ──────────────────────────────────────────────────────────────

    async fn on_connection_update(&mut self, event: AppEvent) -> Result<(), RouteError> {
        match (event.connection_type(), event.connection_state()) {
            (Some(ConnectionType::Tcp), Some(state)) => {
                debug!(?state, "tcp connection update");
                self.tcp_state = state;
            }
            (Some(ConnectionType::Ble), Some(state)) => {
                debug!(?state, "ble connection update");
                self.ble_state = state;
            }
            _ => self.unsupported(&event),
        }
        // The GUI sees every connection update, including ones it will ignore.
        forward(&*self.gui, "gui", event).await
    }

    async fn on_user_input(&mut self, event: AppEvent) -> Result<(), RouteError> {
        match event.user_button() {
            Some(UserButton::LampEspOn) => {
                if self.tcp_state == ConnectionState::Connected {
                    forward(&*self.tcp, "tcp", event).await
                } else {
                    debug!("no TCP client connected, dropping {event}");
                    Ok(())
                }
            }
            Some(UserButton::LampNrfOnOff) => {
                if self.ble_state == ConnectionState::Connected {
                    forward(&*self.ble_bridge, "ble", event).await
                } else {
                    debug!("BLE lamp not connected, dropping {event}");
                    Ok(())
                }
            }
            None => {
                self.unsupported(&event);
                Ok(())
            }
        }
    }

    async fn on_req_update(&mut self, event: AppEvent) -> Result<(), RouteError> {
        match event.connection_type() {
            Some(ConnectionType::Tcp) => forward(&*self.tcp, "tcp", event).await,
            Some(ConnectionType::Ble) => forward(&*self.ble_bridge, "ble", event).await,
            None => {
                self.unsupported(&event);
                Ok(())
            }
        }
    }

    async fn on_data_tcp(&mut self, event: AppEvent) -> Result<(), RouteError> {
        match event.into_payload() {
            Some(Payload::Json(obj)) => {
                forward(&*self.gui, "gui", AppEvent::device_update(obj)).await
            }
            other => {
                debug!(payload = ?other, "DataTcp without a JSON object, dropping");
                Ok(())
            }
        }
    }

    async fn on_data_ble(&mut self, event: AppEvent) -> Result<(), RouteError> {
        match event.into_payload() {
            Some(Payload::Bytes(bytes)) => match NrfLampState::from_wire(&bytes).as_arg() {
                Some(state) => {
                    let obj = LampMessage::update(DEVICE_LAMP_NRF, state).to_object();
                    forward(&*self.gui, "gui", AppEvent::device_update(obj)).await
                }
                None => {
                    warn!(?bytes, "unknown nRF lamp state, not forwarded");
                    Ok(())
                }
            },
            Some(Payload::Json(obj)) => {
                forward(&*self.gui, "gui", AppEvent::device_update(obj)).await
            }
            None => {
                debug!("DataBle without payload, dropping");
                Ok(())
            }
        }
    }

    /// Fallback for anything the router does not handle.
    fn unsupported(&self, event: &AppEvent) {
        debug!("router: unsupported {event}");
    }
}

async fn forward(
    sink: &dyn EventSink,
    target: &'static str,
    event: AppEvent,
) -> Result<(), RouteError> {
    sink.send(event)
        .await
        .map_err(|reason| RouteError::Sink { target, reason })
}

// ── Tests ─────────────────────────────────────────────────────────────────────
