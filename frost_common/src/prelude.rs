//! Prelude module for common re-exports.
//!
//! ```rust
//! use frost_common::prelude::*;
//! ```

use std::time::Duration;

// ─── Logging ────────────────────────────────────────────────────────
pub use crate::config::LogLevel;

// ─── Configuration ──────────────────────────────────────────────────
pub use crate::config::{ConfigError, ConfigLoader, SharedConfig};

// ─── Process ────────────────────────────────────────────────────────
pub use crate::process::{ControlMode, ProcessState, ProcessStatus, ServerMode};

// ─── Registers ──────────────────────────────────────────────────────
pub use crate::consts::REGISTER_COUNT;
pub use crate::registers::RegisterFile;

/// Default simulation tick interval as Duration.
pub const DEFAULT_TICK_INTERVAL: Duration =
    Duration::from_millis(crate::consts::TICK_INTERVAL_MS);
