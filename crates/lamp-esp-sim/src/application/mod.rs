//! Application layer for the simulated lamp.

pub mod lamp;
