//! Domain entities for Lamp Hub.
//!
//! This module contains pure business logic with no infrastructure dependencies.
//!
//! # What is "domain" in Clean Architecture? (for beginners)
//!
//! The innermost layer of the application is the **domain**.  Domain code
//! defines the vocabulary of the system and the rules that never depend on
//! how bytes reach us: here, what an event is, which kinds exist, and how a
//! lamp moves from one state to the next when a button is pressed.
//!
//! Code in outer layers (the router, the TCP and BLE adapters, the GUI shell)
//! depends on the domain, but the domain never depends on them.

/// The event envelope and its closed enumerations.
pub mod event;

/// Lamp state models for the nRF and ESP32 lamps.
pub mod lamp;
