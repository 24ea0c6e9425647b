//! Network infrastructure for the hub.
//!
//! # Sub-modules
//!
//! - **`tcp_server`** – Listens for the ESP32 lamp, turns the JSON objects it
//!   sends into `DataTcp` events for the router, and broadcasts router
//!   commands back to every connected lamp.

pub mod tcp_server;

pub use tcp_server::{ClientHub, NetworkError, TcpServer};
