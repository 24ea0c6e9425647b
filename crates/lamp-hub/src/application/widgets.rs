//! Headless widget models for the panel screen.
//!
//! Each widget keeps just enough state to decide what the screen should show
//! and which events a click or a connection change should produce.  Drawing
//! is someone else's job: [`WidgetView`] is a plain description that a
//! renderer (or the console bridge) turns into pixels or log lines.
//!
//! The two lamp widgets behave identically apart from their lamp model, so
//! they share one generic implementation, [`LampWidget`], parameterised by a
//! [`LampModel`].

use lamp_core::{
    protocol::messages::{DEVICE_LAMP_ESP, DEVICE_LAMP_NRF, EVENT_UPDATE},
    AppEvent, ConnectionState, ConnectionType, EspLampState, JsonObject, NrfLampState, UserButton,
};
use serde_json::Value;
use tracing::debug;

/// Outline and text colour of a widget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WidgetColor {
    Blue,
    Grey,
}

/// What a widget currently shows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WidgetView {
    pub title: &'static str,
    pub text: String,
    pub color: WidgetColor,
    /// Whether the bulb icon is drawn lit.
    pub lamp_lit: bool,
}

// ── Lamp models ───────────────────────────────────────────────────────────────

/// Static facts about one kind of lamp that its widget needs.
pub trait LampModel: Copy + Default + PartialEq + std::fmt::Debug {
    /// Value of the `device` field in this lamp's update messages.
    const DEVICE: &'static str;
    const TITLE: &'static str;
    /// Transport the lamp is reached over.
    const TRANSPORT: ConnectionType;
    /// Button that acts on this lamp.
    const BUTTON: UserButton;

    fn from_arg(value: i64) -> Option<Self>;
    fn label(self) -> &'static str;
    fn is_off(self) -> bool;
}

impl LampModel for EspLampState {
    const DEVICE: &'static str = DEVICE_LAMP_ESP;
    const TITLE: &'static str = "SEEED ESP32S3";
    const TRANSPORT: ConnectionType = ConnectionType::Tcp;
    const BUTTON: UserButton = UserButton::LampEspOn;

    fn from_arg(value: i64) -> Option<Self> {
        EspLampState::from_arg(value)
    }

    fn label(self) -> &'static str {
        EspLampState::label(self)
    }

    fn is_off(self) -> bool {
        self == EspLampState::Off
    }
}

impl LampModel for NrfLampState {
    const DEVICE: &'static str = DEVICE_LAMP_NRF;
    const TITLE: &'static str = "NRF52840";
    const TRANSPORT: ConnectionType = ConnectionType::Ble;
    const BUTTON: UserButton = UserButton::LampNrfOnOff;

    fn from_arg(value: i64) -> Option<Self> {
        NrfLampState::from_arg(value)
    }

    fn label(self) -> &'static str {
        NrfLampState::label(self)
    }

    fn is_off(self) -> bool {
        self == NrfLampState::Off
    }
}

// ── Lamp widget ───────────────────────────────────────────────────────────────

/// Widget for one lamp: connection indicator, bulb icon, and state text.
#[derive(Debug, Default)]
pub struct LampWidget<L: LampModel> {
    connected: bool,
    state: L,
}

pub type LampEspWidget = LampWidget<EspLampState>;
pub type LampNrfWidget = LampWidget<NrfLampState>;

impl<L: LampModel> LampWidget<L> {
    pub fn new() -> Self {
        Self {
            connected: false,
            state: L::default(),
        }
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    pub fn state(&self) -> L {
        self.state
    }

    /// Applies a connection change for this widget's transport.
    ///
    /// Returns the `DeviceReqUpdate` to send when the lamp becomes connected,
    /// so the widget learns the lamp's state instead of guessing it.
    pub fn on_connection(&mut self, state: ConnectionState) -> Option<AppEvent> {
        self.connected = state == ConnectionState::Connected;
        self.connected
            .then(|| AppEvent::device_req_update(L::TRANSPORT))
    }

    /// Applies a device update message addressed to this lamp.
    ///
    /// Messages for other devices or with other events are ignored.
    pub fn on_device_update(&mut self, obj: &JsonObject) {
        if obj.get("device").and_then(Value::as_str) != Some(L::DEVICE) {
            return;
        }
        if obj.get("event").and_then(Value::as_str) != Some(EVENT_UPDATE) {
            return;
        }
        match obj.get("arg1").and_then(Value::as_i64).and_then(L::from_arg) {
            Some(state) => self.state = state,
            None => debug!(device = L::DEVICE, arg1 = ?obj.get("arg1"), "unsupported lamp state"),
        }
    }

    /// A tap on the bulb icon.  Only a connected lamp reacts.
    pub fn click(&self) -> Option<AppEvent> {
        self.connected.then(|| AppEvent::user_input(L::BUTTON))
    }

    pub fn view(&self) -> WidgetView {
        let text = if self.connected {
            self.state.label().to_string()
        } else {
            "disconnect".to_string()
        };
        WidgetView {
            title: L::TITLE,
            text,
            color: if self.connected {
                WidgetColor::Blue
            } else {
                WidgetColor::Grey
            },
            lamp_lit: self.connected && !self.state.is_off(),
        }
    }
}

// ── Info widget ───────────────────────────────────────────────────────────────

/// Shows which machine the hub runs on.
#[derive(Debug)]
pub struct InfoWidget {
    hostname: String,
}

impl InfoWidget {
    pub fn new(hostname: impl Into<String>) -> Self {
        Self {
            hostname: hostname.into(),
        }
    }

    pub fn view(&self) -> WidgetView {
        WidgetView {
            title: "info",
            text: format!("host: {}", self.hostname),
            color: WidgetColor::Blue,
            lamp_lit: false,
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use lamp_core::EventKind;
    use serde_json::json;

    fn obj(v: Value) -> JsonObject {
        v.as_object().cloned().unwrap()
    }

    #[test]
    fn test_new_widget_shows_disconnect_in_grey() {
        let widget = LampEspWidget::new();

        let view = widget.view();

        assert_eq!(view.text, "disconnect");
        assert_eq!(view.color, WidgetColor::Grey);
        assert!(!view.lamp_lit);
    }

    #[test]
    fn test_connecting_requests_an_update_over_own_transport() {
        let mut esp = LampEspWidget::new();
        let mut nrf = LampNrfWidget::new();

        let esp_req = esp.on_connection(ConnectionState::Connected);
        let nrf_req = nrf.on_connection(ConnectionState::Connected);

        assert_eq!(esp_req, Some(AppEvent::device_req_update(ConnectionType::Tcp)));
        assert_eq!(nrf_req, Some(AppEvent::device_req_update(ConnectionType::Ble)));
    }

    #[test]
    fn test_disconnecting_emits_nothing_and_greys_out() {
        let mut esp = LampEspWidget::new();
        esp.on_connection(ConnectionState::Connected);

        let emitted = esp.on_connection(ConnectionState::Disconnected);

        assert_eq!(emitted, None);
        assert_eq!(esp.view().color, WidgetColor::Grey);
    }

    #[test]
    fn test_update_sets_state_and_view() {
        // Arrange
        let mut esp = LampEspWidget::new();
        esp.on_connection(ConnectionState::Connected);

        // Act
        esp.on_device_update(&obj(json!({"device":"lamp-esp","event":"update","arg0":0,"arg1":2})));

        // Assert
        assert_eq!(esp.state(), EspLampState::ColorYellow);
        let view = esp.view();
        assert_eq!(view.text, "yellow");
        assert_eq!(view.color, WidgetColor::Blue);
        assert!(view.lamp_lit);
    }

    #[test]
    fn test_update_for_other_device_is_ignored() {
        let mut esp = LampEspWidget::new();
        esp.on_device_update(&obj(json!({"device":"lamp-nrf","event":"update","arg1":1})));
        assert_eq!(esp.state(), EspLampState::Off);
    }

    #[test]
    fn test_update_with_invalid_state_keeps_previous() {
        let mut nrf = LampNrfWidget::new();
        nrf.on_device_update(&obj(json!({"device":"lamp-nrf","event":"update","arg1":1})));

        nrf.on_device_update(&obj(json!({"device":"lamp-nrf","event":"update","arg1":7})));

        assert_eq!(nrf.state(), NrfLampState::On);
    }

    #[test]
    fn test_click_only_when_connected() {
        let mut nrf = LampNrfWidget::new();
        assert_eq!(nrf.click(), None);

        nrf.on_connection(ConnectionState::Connected);
        let ev = nrf.click().expect("connected widget emits a click");

        assert_eq!(ev.kind(), EventKind::UserInput);
        assert_eq!(ev.user_button(), Some(UserButton::LampNrfOnOff));
    }

    #[test]
    fn test_off_lamp_is_not_lit() {
        let mut nrf = LampNrfWidget::new();
        nrf.on_connection(ConnectionState::Connected);
        nrf.on_device_update(&obj(json!({"device":"lamp-nrf","event":"update","arg1":0})));

        let view = nrf.view();

        assert_eq!(view.text, "off");
        assert!(!view.lamp_lit);
    }

    #[test]
    fn test_info_widget_shows_hostname() {
        let info = InfoWidget::new("unihiker");
        assert_eq!(info.view().text, "host: unihiker");
    }
}
