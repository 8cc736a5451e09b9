//! # Configuration Module
//!
//! Engine-level settings. Loading them from files, the environment or the
//! command line is left to the binary embedding the engine.

/// Serializable engine configuration with defaults for every field.
pub mod sync_config;

pub use sync_config::{SyncConfig, TransportKind};
