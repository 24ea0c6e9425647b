//! The event envelope that every component of Lamp Hub exchanges.
//!
//! An [`AppEvent`] is a small immutable value:
//!
//! ```text
//! AppEvent { kind: EventKind, arg0: i32, arg1: i32, payload: Option<Payload> }
//! ```
//!
//! `kind` is a closed enumeration.  The two integer arguments are overloaded
//! per kind:
//!
//! | kind               | arg0              | arg1              | payload            |
//! |--------------------|-------------------|-------------------|--------------------|
//! | `ConnectionUpdate` | [`ConnectionType`]| [`ConnectionState`]| –                 |
//! | `DeviceUpdate`     | 0                 | 0                 | JSON object        |
//! | `DeviceReqUpdate`  | [`ConnectionType`]| 0                 | –                  |
//! | `DataTcp`          | 0                 | 0                 | JSON object        |
//! | `DataBle`          | 0                 | 0                 | raw bytes          |
//! | `UserInput`        | [`UserButton`]    | 0                 | –                  |
//! | `Timer`, `Null`    | 0                 | 0                 | –                  |
//!
//! The typed constructors below are the only way the hub builds events, so
//! the table is enforced at the construction site.  The typed accessors
//! decode the arguments back and return `None` for values outside the
//! enumerations instead of panicking.

use serde_json::{Map, Value};

/// A decoded JSON object, as carried by `DataTcp` and `DeviceUpdate`.
pub type JsonObject = Map<String, Value>;

// ── Closed enumerations ───────────────────────────────────────────────────────

/// Every kind of event routed through the hub.
///
/// The discriminants are the values the panel firmware logs, so hub and
/// panel log lines can be compared directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum EventKind {
    Null = 0,
    Timer = 1,
    /// A transport connected or disconnected.
    ConnectionUpdate = 10,
    /// A device reported a new state (payload is the device's JSON object).
    DeviceUpdate = 11,
    /// Someone wants a device to report its current state.
    DeviceReqUpdate = 12,
    DataTcp = 20,
    DataBle = 21,
    /// A button on the panel was pressed.
    UserInput = 40,
}

impl TryFrom<u8> for EventKind {
    type Error = ();

    fn try_from(value: u8) -> Result<Self, ()> {
        match value {
            0 => Ok(EventKind::Null),
            1 => Ok(EventKind::Timer),
            10 => Ok(EventKind::ConnectionUpdate),
            11 => Ok(EventKind::DeviceUpdate),
            12 => Ok(EventKind::DeviceReqUpdate),
            20 => Ok(EventKind::DataTcp),
            21 => Ok(EventKind::DataBle),
            40 => Ok(EventKind::UserInput),
            _ => Err(()),
        }
    }
}

/// Which transport a `ConnectionUpdate` or `DeviceReqUpdate` concerns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum ConnectionType {
    Tcp = 1,
    Ble = 2,
}

impl TryFrom<i32> for ConnectionType {
    type Error = ();

    fn try_from(value: i32) -> Result<Self, ()> {
        match value {
            1 => Ok(ConnectionType::Tcp),
            2 => Ok(ConnectionType::Ble),
            _ => Err(()),
        }
    }
}

/// Whether a transport is ready to carry commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(i32)]
pub enum ConnectionState {
    Connected = 1,
    #[default]
    Disconnected = 2,
}

impl TryFrom<i32> for ConnectionState {
    type Error = ();

    fn try_from(value: i32) -> Result<Self, ()> {
        match value {
            1 => Ok(ConnectionState::Connected),
            2 => Ok(ConnectionState::Disconnected),
            _ => Err(()),
        }
    }
}

/// Identifies which physical control on the panel was pressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum UserButton {
    /// Toggles the nRF lamp between on and off.
    LampNrfOnOff = 1,
    /// Advances the ESP32 lamp to its next colour.
    LampEspOn = 2,
}

impl TryFrom<i32> for UserButton {
    type Error = ();

    fn try_from(value: i32) -> Result<Self, ()> {
        match value {
            1 => Ok(UserButton::LampNrfOnOff),
            2 => Ok(UserButton::LampEspOn),
            _ => Err(()),
        }
    }
}

// ── Payload ───────────────────────────────────────────────────────────────────

/// Optional data attached to an event.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// Raw characteristic value read from or notified by the BLE lamp.
    Bytes(Vec<u8>),
    /// A JSON object received over TCP or built for the GUI.
    Json(JsonObject),
}

// ── Envelope ──────────────────────────────────────────────────────────────────

/// The unit of communication between the GUI, the router, and the adapters.
///
/// Fields are private: an event is never modified after construction.
/// Forwarding an event to another component moves or clones it as a whole.
#[derive(Debug, Clone, PartialEq)]
pub struct AppEvent {
    kind: EventKind,
    arg0: i32,
    arg1: i32,
    payload: Option<Payload>,
}

impl AppEvent {
    /// Builds an event from raw parts.
    ///
    /// Prefer the typed constructors; this exists for adapters that receive
    /// already-numbered arguments and for tests that exercise unknown values.
    pub fn new(kind: EventKind, arg0: i32, arg1: i32, payload: Option<Payload>) -> Self {
        Self {
            kind,
            arg0,
            arg1,
            payload,
        }
    }

    /// The periodic tick that drives bridge polling.
    pub fn timer() -> Self {
        Self::new(EventKind::Timer, 0, 0, None)
    }

    pub fn connection_update(connection: ConnectionType, state: ConnectionState) -> Self {
        Self::new(
            EventKind::ConnectionUpdate,
            connection as i32,
            state as i32,
            None,
        )
    }

    pub fn device_update(obj: JsonObject) -> Self {
        Self::new(EventKind::DeviceUpdate, 0, 0, Some(Payload::Json(obj)))
    }

    pub fn device_req_update(connection: ConnectionType) -> Self {
        Self::new(EventKind::DeviceReqUpdate, connection as i32, 0, None)
    }

    pub fn data_tcp(obj: JsonObject) -> Self {
        Self::new(EventKind::DataTcp, 0, 0, Some(Payload::Json(obj)))
    }

    pub fn data_ble(bytes: Vec<u8>) -> Self {
        Self::new(EventKind::DataBle, 0, 0, Some(Payload::Bytes(bytes)))
    }

    pub fn user_input(button: UserButton) -> Self {
        Self::new(EventKind::UserInput, button as i32, 0, None)
    }

    pub fn kind(&self) -> EventKind {
        self.kind
    }

    pub fn arg0(&self) -> i32 {
        self.arg0
    }

    pub fn arg1(&self) -> i32 {
        self.arg1
    }

    pub fn payload(&self) -> Option<&Payload> {
        self.payload.as_ref()
    }

    /// Consumes the event and returns its payload.
    pub fn into_payload(self) -> Option<Payload> {
        self.payload
    }

    /// `arg0` read as a connection type.
    pub fn connection_type(&self) -> Option<ConnectionType> {
        ConnectionType::try_from(self.arg0).ok()
    }

    /// `arg1` read as a connection state.
    pub fn connection_state(&self) -> Option<ConnectionState> {
        ConnectionState::try_from(self.arg1).ok()
    }

    /// `arg0` read as a panel button.
    pub fn user_button(&self) -> Option<UserButton> {
        UserButton::try_from(self.arg0).ok()
    }

    /// The JSON object payload, if this event carries one.
    pub fn json(&self) -> Option<&JsonObject> {
        match &self.payload {
            Some(Payload::Json(obj)) => Some(obj),
            _ => None,
        }
    }

    /// The raw byte payload, if this event carries one.
    pub fn bytes(&self) -> Option<&[u8]> {
        match &self.payload {
            Some(Payload::Bytes(b)) => Some(b),
            _ => None,
        }
    }
}

impl std::fmt::Display for AppEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "event={:?}, arg0={}, arg1={}, payload={:?}",
            self.kind, self.arg0, self.arg1, self.payload
        )
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
