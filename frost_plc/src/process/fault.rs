//! Controller crash lockdown.
//!
//! A backend failure observed by any client session kills the controller:
//! the valve command fails closed, the actuator freezes, and the plant is
//! left to heat loss. Nothing in the process ever brings it back.

use super::shared::SharedProcess;
use frost_common::process::ProcessState;
use tracing::error;

/// Apply the crash transition. Returns `true` if this call performed it.
///
/// Only a running controller can crash; later calls leave the state
/// untouched, so repeated crashes compose to a single one.
pub fn crash(state: &mut ProcessState) -> bool {
    if !state.controller_running {
        return false;
    }
    state.controller_running = false;
    state.time_without_control = 0;
    state.valve_cmd = 0;
    true
}

/// Lock-taking front end to [`crash`], shared by all client sessions.
#[derive(Debug, Clone)]
pub struct FaultMonitor {
    process: SharedProcess,
}

impl FaultMonitor {
    /// Create a monitor over the shared plant.
    pub fn new(process: SharedProcess) -> Self {
        Self { process }
    }

    /// Record a protocol backend crash.
    ///
    /// Logs the DEGRADED transition the first time only.
    pub fn crash(&self, reason: &str) -> bool {
        let (crashed, valve_actual) = self.process.mutate(|s| (crash(s), s.valve_actual));
        if crashed {
            error!(
                reason,
                "Controller crashed! Valve frozen at {}%, server DEGRADED", valve_actual
            );
        }
        crashed
    }
}
