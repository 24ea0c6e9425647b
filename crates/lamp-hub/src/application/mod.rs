//! Application layer use cases for the hub.
//!
//! # What is the "application" layer? (for beginners)
//!
//! In Clean Architecture the *application* layer sits between the domain
//! (pure business rules, here in `lamp-core`) and the infrastructure
//! (sockets, Bluetooth, files).
//!
//! Use cases in this layer:
//!
//! - **Orchestrate** domain objects to fulfil a user goal (e.g., "when the
//!   nRF button is pressed and the lamp is connected, toggle it").
//! - **Depend on abstractions** (the [`route_event::EventSink`] trait) rather
//!   than concrete channels, so the infrastructure can be swapped without
//!   changing this code.
//! - **Contain no OS calls, no network I/O, no file system access**.
//!
//! # Sub-modules
//!
//! - **`route_event`** – The Device Router.  Every event in the hub passes
//!   through it; it owns the connection state of both transports.
//!
//! - **`gui_shell`** – The screen as the router sees it: dispatches events to
//!   widgets and turns clicks into events.
//!
//! - **`widgets`** – Headless models of the info and lamp widgets.

pub mod gui_shell;
pub mod route_event;
pub mod widgets;
