//! Proportional-band temperature controller.
//!
//! Saturates the valve outside `setpoint ± deadband`, maps the error
//! linearly onto 0..=100 % inside it.

use crate::config::ControllerConfig;
use frost_common::consts::VALVE_MAX;
use frost_common::process::{ControlMode, ProcessState};

/// Per-tick control law.
#[derive(Debug, Clone, Copy)]
pub struct Controller {
    deadband: f64,
}

impl Controller {
    /// Create a controller from config.
    pub fn new(config: ControllerConfig) -> Self {
        Self {
            deadband: config.deadband,
        }
    }

    /// Update `valve_cmd` from the current temperature error.
    ///
    /// Acts only while the controller is alive, in AUTO mode, and the pipes
    /// are intact.
    pub fn step(&self, state: &mut ProcessState) {
        if !state.controller_running || state.mode != ControlMode::Auto || state.pipes_burst {
            return;
        }
        state.valve_cmd = self.command_for(state.setpoint - state.inside_temp);
    }

    /// Valve command for a given `setpoint - inside_temp` error.
    pub fn command_for(&self, error: f64) -> u8 {
        let cmd = if error > self.deadband {
            VALVE_MAX as i32
        } else if error < -self.deadband {
            0
        } else {
            // error = +deadband → 100 %, error = -deadband → 0 %
            (50.0 + 50.0 * (error / self.deadband)) as i32
        };
        cmd.clamp(0, VALVE_MAX as i32) as u8
    }
}

impl Default for Controller {
    fn default() -> Self {
        Self::new(ControllerConfig::default())
    }
}
