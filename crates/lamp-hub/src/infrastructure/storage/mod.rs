//! Storage infrastructure: configuration file persistence.
//!
//! This module provides a thin adapter between the application and the
//! file system.  The `config` sub-module handles:
//!
//! - Reading the TOML configuration file from the platform-appropriate directory.
//! - Writing a default file so operators have something to edit.
//! - Providing sensible defaults when the file does not exist yet (first run).
//!
//! The hub keeps no other state on disk.

pub mod config;
