//! The JSON message exchanged between the hub and the lamps.
//!
//! Every message on the TCP link is one flat JSON object:
//!
//! ```json
//! {"device":"lamp-esp","event":"update","arg0":0,"arg1":2}
//! ```
//!
//! | event        | direction    | arg0           | arg1          |
//! |--------------|--------------|----------------|---------------|
//! | `req-update` | hub → lamp   | 0              | 0             |
//! | `user-click` | hub → lamp   | button number  | 0             |
//! | `update`     | lamp → hub   | 0              | lamp state    |
//!
//! The same shape is reused inside the hub for `lamp-nrf` updates, so the GUI
//! treats both lamps uniformly.  Field order in [`LampMessage`] is the order
//! on the wire.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::event::{JsonObject, UserButton};
use crate::protocol::codec::ProtocolError;

/// Device name of the ESP32 lamp.
pub const DEVICE_LAMP_ESP: &str = "lamp-esp";
/// Device name of the nRF lamp.
pub const DEVICE_LAMP_NRF: &str = "lamp-nrf";

pub const EVENT_REQ_UPDATE: &str = "req-update";
pub const EVENT_USER_CLICK: &str = "user-click";
pub const EVENT_UPDATE: &str = "update";

/// One lamp protocol message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LampMessage {
    pub device: String,
    pub event: String,
    #[serde(default)]
    pub arg0: i64,
    #[serde(default)]
    pub arg1: i64,
}

impl LampMessage {
    pub fn new(device: &str, event: &str, arg0: i64, arg1: i64) -> Self {
        Self {
            device: device.to_string(),
            event: event.to_string(),
            arg0,
            arg1,
        }
    }

    /// Asks the ESP32 lamp to report its current state.
    pub fn req_update() -> Self {
        Self::new(DEVICE_LAMP_ESP, EVENT_REQ_UPDATE, 0, 0)
    }

    /// Tells the ESP32 lamp that a panel button was clicked.
    pub fn user_click(button: UserButton) -> Self {
        Self::new(DEVICE_LAMP_ESP, EVENT_USER_CLICK, button as i64, 0)
    }

    /// A state report from `device`.
    pub fn update(device: &str, state: i64) -> Self {
        Self::new(device, EVENT_UPDATE, 0, state)
    }

    /// Interprets a decoded JSON object as a lamp message.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::Malformed`] when `device` or `event` is
    /// missing or a field has the wrong JSON type.
    pub fn from_object(obj: &JsonObject) -> Result<Self, ProtocolError> {
        serde_json::from_value(Value::Object(obj.clone()))
            .map_err(|e| ProtocolError::Malformed(e.to_string()))
    }

    /// Converts the message into a JSON object with the four wire fields.
    pub fn to_object(&self) -> JsonObject {
        let mut obj = JsonObject::new();
        obj.insert("device".into(), Value::from(self.device.as_str()));
        obj.insert("event".into(), Value::from(self.event.as_str()));
        obj.insert("arg0".into(), Value::from(self.arg0));
        obj.insert("arg1".into(), Value::from(self.arg1));
        obj
    }

    pub fn is_for(&self, device: &str) -> bool {
        self.device == device
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_req_update_serializes_to_exact_wire_text() {
        let text = serde_json::to_string(&LampMessage::req_update()).unwrap();
        assert_eq!(
            text,
            r#"{"device":"lamp-esp","event":"req-update","arg0":0,"arg1":0}"#
        );
    }

    #[test]
    fn test_user_click_carries_button_number() {
        let text = serde_json::to_string(&LampMessage::user_click(UserButton::LampEspOn)).unwrap();
        assert_eq!(
            text,
            r#"{"device":"lamp-esp","event":"user-click","arg0":2,"arg1":0}"#
        );
    }

    #[test]
    fn test_from_object_defaults_missing_args_to_zero() {
        let obj = json!({"device": "lamp-esp", "event": "update"})
            .as_object()
            .cloned()
            .unwrap();

        let msg = LampMessage::from_object(&obj).unwrap();

        assert_eq!(msg, LampMessage::update(DEVICE_LAMP_ESP, 0));
    }

    #[test]
    fn test_from_object_without_device_is_malformed() {
        let obj = json!({"event": "update", "arg1": 1})
            .as_object()
            .cloned()
            .unwrap();

        let result = LampMessage::from_object(&obj);

        assert!(matches!(result, Err(ProtocolError::Malformed(_))));
    }

    #[test]
    fn test_to_object_matches_json_literal() {
        let obj = LampMessage::update(DEVICE_LAMP_NRF, 1).to_object();
        let expected = json!({"device": "lamp-nrf", "event": "update", "arg0": 0, "arg1": 1});
        assert_eq!(Value::Object(obj), expected);
    }
}
