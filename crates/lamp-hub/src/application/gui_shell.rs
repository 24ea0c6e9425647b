//! GuiShell: the panel screen as seen by the router.
//!
//! The shell owns the three widgets and a sink back to the router.  Events
//! from the router are dispatched to the widget they concern; events the
//! widgets produce (clicks, update requests) are sent back to the router.
//!
//! ```text
//!   router ──ConnectionUpdate(Tcp)──► LampEspWidget ──DeviceReqUpdate(Tcp)──► router
//!          ──ConnectionUpdate(Ble)──► LampNrfWidget ──DeviceReqUpdate(Ble)──► router
//!          ──DeviceUpdate{device}──► widget named by `device`
//! ```

use std::sync::Arc;

use lamp_core::{
    protocol::messages::{DEVICE_LAMP_ESP, DEVICE_LAMP_NRF},
    AppEvent, ConnectionType, EventKind, UserButton,
};
use serde_json::Value;
use tracing::debug;

use crate::application::route_event::{EventSink, RouteError};
use crate::application::widgets::{InfoWidget, LampEspWidget, LampNrfWidget, WidgetView};

pub struct GuiShell {
    info: InfoWidget,
    esp: LampEspWidget,
    nrf: LampNrfWidget,
    router: Arc<dyn EventSink>,
}

impl GuiShell {
    pub fn new(hostname: impl Into<String>, router: Arc<dyn EventSink>) -> Self {
        Self {
            info: InfoWidget::new(hostname),
            esp: LampEspWidget::new(),
            nrf: LampNrfWidget::new(),
            router,
        }
    }

    pub fn esp(&self) -> &LampEspWidget {
        &self.esp
    }

    pub fn nrf(&self) -> &LampNrfWidget {
        &self.nrf
    }

    /// Current view of every widget, top to bottom.
    pub fn views(&self) -> [WidgetView; 3] {
        [self.info.view(), self.esp.view(), self.nrf.view()]
    }

    /// Handles one event addressed to the GUI.
    ///
    /// # Errors
    ///
    /// Returns [`RouteError::Sink`] if an event the widgets produce cannot be
    /// delivered to the router.
    pub async fn handle(&mut self, event: AppEvent) -> Result<(), RouteError> {
        match event.kind() {
            EventKind::ConnectionUpdate => self.on_connection_update(&event).await,
            EventKind::DeviceUpdate => {
                self.on_device_update(&event);
                Ok(())
            }
            EventKind::UserInput | EventKind::DeviceReqUpdate => self.to_router(event).await,
            EventKind::Timer => {
                debug!("gui: {event}");
                Ok(())
            }
            EventKind::Null | EventKind::DataTcp | EventKind::DataBle => {
                debug!("gui: unsupported {event}");
                Ok(())
            }
        }
    }

    /// A tap on a lamp's bulb icon.  Ignored while that lamp is disconnected.
    pub async fn click(&mut self, button: UserButton) -> Result<(), RouteError> {
        let click = match button {
            UserButton::LampEspOn => self.esp.click(),
            UserButton::LampNrfOnOff => self.nrf.click(),
        };
        match click {
            Some(event) => self.to_router(event).await,
            None => {
                debug!(?button, "click on disconnected lamp ignored");
                Ok(())
            }
        }
    }

    /// A press on one of the board's physical buttons.
    ///
    /// Unlike [`GuiShell::click`] this is not gated on the widget; the router
    /// decides whether the transport is ready.
    pub async fn press(&mut self, button: UserButton) -> Result<(), RouteError> {
        self.to_router(AppEvent::user_input(button)).await
    }

    async fn on_connection_update(&mut self, event: &AppEvent) -> Result<(), RouteError> {
        let Some(state) = event.connection_state() else {
            debug!("gui: unsupported connection state in {event}");
            return Ok(());
        };
        let request = match event.connection_type() {
            Some(ConnectionType::Tcp) => self.esp.on_connection(state),
            Some(ConnectionType::Ble) => self.nrf.on_connection(state),
            None => {
                debug!("gui: unsupported connection type in {event}");
                None
            }
        };
        match request {
            Some(req) => self.to_router(req).await,
            None => Ok(()),
        }
    }

    fn on_device_update(&mut self, event: &AppEvent) {
        let Some(obj) = event.json() else {
            debug!("gui: device update without payload");
            return;
        };
        match obj.get("device").and_then(Value::as_str) {
            Some(DEVICE_LAMP_ESP) => self.esp.on_device_update(obj),
            Some(DEVICE_LAMP_NRF) => self.nrf.on_device_update(obj),
            other => debug!(device = ?other, "gui: update for unknown device ignored"),
        }
    }

    async fn to_router(&self, event: AppEvent) -> Result<(), RouteError> {
        self.router
            .send(event)
            .await
            .map_err(|reason| RouteError::Sink {
                target: "router",
                reason,
            })
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
