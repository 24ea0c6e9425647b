//! Protocol module containing the lamp message type, the JSON stream codec,
//! and the GATT identifiers of the nRF lamp.

pub mod codec;
pub mod gatt;
pub mod messages;

pub use codec::{encode_message, JsonStreamDecoder, ProtocolError, MAX_PENDING_BYTES};
pub use messages::{LampMessage, DEVICE_LAMP_ESP, DEVICE_LAMP_NRF};
