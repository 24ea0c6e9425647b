//! lamp-esp-sim library entry point.
//!
//! A stand-in for the ESP32-S3 lamp firmware.  It connects to the hub's TCP
//! port, answers `req-update` with its current colour, and steps through the
//! colour cycle on every `user-click` for the lamp button.
//!
//! - **`application`** – the lamp's state machine, free of any I/O.
//! - **`infrastructure`** – the TCP session and the reconnect loop.

pub mod application;
pub mod infrastructure;
