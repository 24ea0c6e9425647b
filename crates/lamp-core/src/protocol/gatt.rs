//! GATT identifiers of the nRF52840 lamp.
//!
//! The lamp firmware exposes one custom service with one characteristic.
//! The characteristic supports read, write-without-response, and notify; its
//! value is a single byte (see [`crate::NrfLampState`]).

use uuid::Uuid;

/// Advertised name the hub scans for when no name is configured.
pub const DEFAULT_DEVICE_NAME: &str = "nrf52840-lamp";

/// The lamp control service.
pub const LAMP_SERVICE_UUID: Uuid = Uuid::from_u128(0x0000_1523_1212_efde_1523_785f_eabc_d123);

/// The on/off characteristic inside [`LAMP_SERVICE_UUID`].
pub const LAMP_CHARACTERISTIC_UUID: Uuid =
    Uuid::from_u128(0x0000_1525_1212_efde_1523_785f_eabc_d123);
