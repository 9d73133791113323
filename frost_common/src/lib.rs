//! frost Common Library
//!
//! Shared constants, process types, register layout and configuration
//! loading for all frost workspace crates.
//!
//! # Module Structure
//!
//! - [`consts`] - Thresholds, physics defaults, protocol limits
//! - [`process`] - `ProcessState` and its status/mode enums
//! - [`registers`] - Holding register layout and ×10 fixed-point scaling
//! - [`config`] - Configuration loading traits and types
//! - [`prelude`] - Common re-exports for convenience
//!
//! # Usage
//!
//! ```rust
//! use frost_common::prelude::*;
//! use frost_common::registers::HR_SETPOINT;
//! ```

pub mod config;
pub mod consts;
pub mod prelude;
pub mod process;
pub mod registers;
