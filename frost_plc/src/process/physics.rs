//! Building thermal model.
//!
//! One call to [`PhysicsEngine::tick`] advances the plant by `dt` seconds:
//! valve slew, heat balance, status classification. Runs whether or not the
//! controller is alive; a dead controller only freezes the valve.

use crate::config::PhysicsConfig;
use frost_common::consts::{TEMP_MODEL_MAX, TEMP_MODEL_MIN, VALVE_MAX};
use frost_common::process::{ProcessState, ProcessStatus};

/// Status change produced by a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusTransition {
    /// Status before the tick.
    pub from: ProcessStatus,
    /// Status after the tick.
    pub to: ProcessStatus,
}

/// Per-tick thermal update.
#[derive(Debug, Clone, Copy)]
pub struct PhysicsEngine {
    params: PhysicsConfig,
}

impl PhysicsEngine {
    /// Create an engine with the given constants.
    pub fn new(params: PhysicsConfig) -> Self {
        Self { params }
    }

    /// Advance the plant by `dt` seconds.
    ///
    /// No-op once the pipes have burst. Returns the status transition, if any.
    pub fn tick(&self, state: &mut ProcessState, dt: f64) -> Option<StatusTransition> {
        if state.pipes_burst {
            return None;
        }

        state.runtime = state.runtime.wrapping_add(1);
        if !state.controller_running {
            state.time_without_control = state.time_without_control.saturating_add(1);
        }

        // ── Valve dynamics ──────────────────────────────────────
        // Without a controller the actuator holds its last position.
        if state.controller_running {
            state.valve_actual = slew(state.valve_actual, state.valve_cmd, self.params.slew_rate * dt);
        }
        state.valve_actual = state.valve_actual.min(VALVE_MAX);

        // ── Heat balance ────────────────────────────────────────
        let opening = effective_opening(state);
        let heat_loss = (state.inside_temp - state.outside_temp) * self.params.loss_factor;
        let heat_gain = opening * self.params.max_power_kw / self.params.thermal_mass;

        state.inside_temp = (state.inside_temp + (heat_gain - heat_loss) * dt)
            .clamp(TEMP_MODEL_MIN, TEMP_MODEL_MAX);
        state.heater_power = opening * self.params.max_power_kw;

        // ── Status ──────────────────────────────────────────────
        let before = state.status;
        update_status(state);
        (before != state.status).then_some(StatusTransition {
            from: before,
            to: state.status,
        })
    }
}

/// Move `actual` toward `cmd` by at most `max_step` whole percent.
fn slew(actual: u8, cmd: u8, max_step: f64) -> u8 {
    let max_change = max_step as i32;
    let diff = cmd as i32 - actual as i32;
    let next = if diff > max_change {
        actual as i32 + max_change
    } else if diff < -max_change {
        actual as i32 - max_change
    } else {
        cmd as i32
    };
    next.clamp(0, VALVE_MAX as i32) as u8
}

/// Fraction of full flow the valve actually passes.
///
/// A crashed controller leaves the valve fail-closed: `valve_actual` keeps
/// reporting the last feedback position but no heat is delivered.
#[inline]
fn effective_opening(state: &ProcessState) -> f64 {
    if state.controller_running {
        state.valve_actual as f64 / 100.0
    } else {
        0.0
    }
}

/// Reclassify status from temperature. BURST latches.
fn update_status(state: &mut ProcessState) {
    if state.status == ProcessStatus::Burst {
        return;
    }
    let status = ProcessStatus::from_temperature(state.inside_temp);
    if status == ProcessStatus::Frozen && ProcessStatus::is_burst_temperature(state.inside_temp) {
        state.status = ProcessStatus::Burst;
        state.pipes_burst = true;
    } else {
        state.status = status;
    }
}
