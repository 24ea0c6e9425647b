//! Infrastructure layer for the simulated lamp.
//!
//! **Dependency rule**: this layer may depend on `application` and
//! `lamp_core`, never the other way round.

pub mod network;
