//! # lamp-core
//!
//! Shared library for Lamp Hub containing the event taxonomy, the lamp state
//! models, and the JSON wire protocol spoken with the ESP32 lamp.
//!
//! This crate is used by the hub and by the ESP32 lamp simulator.
//! It has zero dependencies on OS APIs, sockets, or the Bluetooth stack.
//!
//! # Architecture overview (for beginners)
//!
//! Lamp Hub is a small control panel.  It sits between a screen with two
//! buttons, an nRF52840 lamp reached over Bluetooth Low Energy, and an
//! ESP32-S3 lamp that connects to the hub over TCP.  Every interaction in the
//! system (a button press, a BLE notification, a JSON message from the ESP32)
//! is turned into one kind of value: an [`AppEvent`].
//!
//! - **`domain`** – The [`AppEvent`] envelope, the closed enumerations that
//!   give its arguments meaning ([`EventKind`], [`ConnectionType`], ...), and
//!   the per-lamp state machines.
//!
//! - **`protocol`** – How lamp messages travel as JSON over TCP, how a byte
//!   stream is split back into JSON objects, and the GATT identifiers of the
//!   nRF lamp.

pub mod domain;
pub mod protocol;

// Re-export the most-used types at the crate root so callers can write
// `lamp_core::AppEvent` instead of `lamp_core::domain::event::AppEvent`.
pub use domain::event::{
    AppEvent, ConnectionState, ConnectionType, EventKind, JsonObject, Payload, UserButton,
};
pub use domain::lamp::{EspLampState, NrfLampState};
pub use protocol::codec::{encode_message, JsonStreamDecoder, ProtocolError};
pub use protocol::messages::LampMessage;
