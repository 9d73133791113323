//! Heating plant process model.
//!
//! - [`physics`] - thermal model, valve slew, status classification
//! - [`controller`] - proportional-band valve control
//! - [`fault`] - controller crash lockdown
//! - [`bridge`] - state ⇄ register file mapping
//! - [`shared`] - the single lock-guarded state handle

pub mod bridge;
pub mod controller;
pub mod fault;
pub mod physics;
pub mod shared;

pub use controller::Controller;
pub use fault::FaultMonitor;
pub use physics::{PhysicsEngine, StatusTransition};
pub use shared::SharedProcess;
