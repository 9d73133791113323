//! # FROST PLC Library
//!
//! Simulated district-heating PLC served over Modbus/TCP.
//!
//! A single plant state is shared between a fixed-cadence simulation timer
//! (physics + bang-bang controller) and any number of client sessions that
//! read and write its ten holding registers. A backend fault in the field
//! protocol layer takes the controller down while the server keeps answering
//! reads (DEGRADED), and the building drifts toward freezing.
//!
//! # Module Structure
//!
//! - [`process`] - physics, controller, fault injection, register bridge
//! - [`simulation`] - timer task driving the plant
//! - [`codec`] - field protocol seam and the Modbus/TCP codec
//! - [`server`] - connection supervisor and client sessions
//! - [`runtime`] - start/stop of the whole service
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                        frost_plc                                 │
//! │  ┌──────────────┐    ┌──────────────┐    ┌───────────────────┐   │
//! │  │  Simulation  │───►│SharedProcess │◄───│  ClientSession ×N │   │
//! │  │  (timer)     │    │ (one mutex)  │    │  (thread each)    │   │
//! │  └──────────────┘    └──────┬───────┘    └─────────┬─────────┘   │
//! │                             │                      │             │
//! │                             ▼                      ▼             │
//! │                      ┌──────────────┐    ┌───────────────────┐   │
//! │                      │ FaultMonitor │◄───│   FieldCodec      │   │
//! │                      └──────────────┘    │   (Modbus/TCP)    │   │
//! │                                          └───────────────────┘   │
//! └──────────────────────────────────────────────────────────────────┘
//! ```

#![warn(missing_docs)]

pub mod codec;
pub mod config;
pub mod error;
pub mod process;
pub mod runtime;
pub mod server;
pub mod simulation;

pub use crate::config::PlcConfig;
pub use crate::error::PlcError;
pub use crate::process::SharedProcess;
pub use crate::runtime::{PlcRuntime, RunningPlc, Telemetry};
pub use crate::simulation::{SimulationTask, TimingStats};
