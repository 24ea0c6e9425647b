//! Infrastructure layer for the hub.
//!
//! Contains OS-facing adapters: the BLE central, the TCP listener, the
//! bounded queues between tasks, file-system storage, the console bridge,
//! and the event loop that ties them together.
//!
//! **Dependency rule**: this layer may depend on `application` and `lamp_core`,
//! but MUST NOT be imported by the `application` or domain layers.

pub mod ble;
pub mod bridge;
pub mod event_loop;
pub mod network;
pub mod storage;
pub mod ui_bridge;
