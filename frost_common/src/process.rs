//! Heating plant process state and its status enums.
//!
//! `ProcessState` is the single record shared between the simulation timer
//! and every client session. It is a plain `Copy` value; synchronization is
//! the owner's job (see `frost_plc::process::SharedProcess`).

use crate::consts::{
    DEFAULT_INSIDE_TEMP, DEFAULT_OUTSIDE_TEMP, DEFAULT_SETPOINT, DEFAULT_SUPPLY_TEMP,
    DEFAULT_VALVE, TEMP_BURST, TEMP_CRITICAL, TEMP_FROZEN, TEMP_WARNING,
};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Process status, ordered by severity.
///
/// Discriminants are the values published in the status register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[repr(u16)]
pub enum ProcessStatus {
    /// Normal operation.
    #[default]
    Ok = 0,
    /// At or below 10 °C: hypothermia risk.
    Warning = 1,
    /// At or below 5 °C: pipe freeze risk.
    Critical = 2,
    /// At or below 0 °C: pipes frozen.
    Frozen = 3,
    /// Pipes burst. Latched for the lifetime of the process.
    Burst = 4,
}

impl ProcessStatus {
    /// Classify an indoor temperature against the fixed thresholds.
    ///
    /// Never returns `Burst` on its own: bursting needs the latch, which the
    /// physics engine owns.
    pub fn from_temperature(inside_temp: f64) -> Self {
        if inside_temp <= TEMP_FROZEN {
            Self::Frozen
        } else if inside_temp <= TEMP_CRITICAL {
            Self::Critical
        } else if inside_temp <= TEMP_WARNING {
            Self::Warning
        } else {
            Self::Ok
        }
    }

    /// Whether a frozen plant at this temperature has crossed the burst point.
    #[inline]
    pub fn is_burst_temperature(inside_temp: f64) -> bool {
        inside_temp <= TEMP_BURST
    }

    /// Register encoding.
    #[inline]
    pub const fn code(self) -> u16 {
        self as u16
    }

    /// Operator-facing label.
    pub const fn label(self) -> &'static str {
        match self {
            Self::Ok => "NORMAL",
            Self::Warning => "WARNING",
            Self::Critical => "CRITICAL",
            Self::Frozen => "FROZEN",
            Self::Burst => "BURST",
        }
    }
}

impl fmt::Display for ProcessStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Valve control mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u16)]
pub enum ControlMode {
    /// Valve commanded by the SCADA client.
    Manual = 0,
    /// Automatic temperature control.
    #[default]
    Auto = 1,
}

impl ControlMode {
    /// Decode a raw mode register value. Only 0 and 1 are valid.
    pub const fn from_raw(raw: u16) -> Option<Self> {
        match raw {
            0 => Some(Self::Manual),
            1 => Some(Self::Auto),
            _ => None,
        }
    }

    /// Register encoding.
    #[inline]
    pub const fn code(self) -> u16 {
        self as u16
    }
}

/// Server-level mode, derived from controller liveness.
///
/// `Running → Degraded` is the only transition; nothing leads back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServerMode {
    /// Controller alive, requests served normally.
    Running,
    /// Controller crashed; reads reflect the decaying plant.
    Degraded,
}

/// Physical and control variables of the heating plant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProcessState {
    /// Indoor temperature [°C].
    pub inside_temp: f64,
    /// Valve command [%], 0..=100.
    pub valve_cmd: u8,
    /// Temperature setpoint [°C], 0..=40.
    pub setpoint: f64,
    /// Control mode.
    pub mode: ControlMode,
    /// Outdoor temperature [°C].
    pub outside_temp: f64,
    /// Derived process status.
    pub status: ProcessStatus,
    /// Actual valve position [%], 0..=100.
    pub valve_actual: u8,
    /// District heating supply temperature [°C].
    pub supply_temp: f64,
    /// Ticks since start.
    pub runtime: u32,
    /// Heating power currently delivered [kW].
    pub heater_power: f64,
    /// Is the controller alive?
    pub controller_running: bool,
    /// Ticks since the controller died.
    pub time_without_control: u32,
    /// Permanent failure latch.
    pub pipes_burst: bool,
}

impl Default for ProcessState {
    fn default() -> Self {
        Self {
            inside_temp: DEFAULT_INSIDE_TEMP,
            valve_cmd: DEFAULT_VALVE,
            setpoint: DEFAULT_SETPOINT,
            mode: ControlMode::Auto,
            outside_temp: DEFAULT_OUTSIDE_TEMP,
            status: ProcessStatus::Ok,
            valve_actual: DEFAULT_VALVE,
            supply_temp: DEFAULT_SUPPLY_TEMP,
            runtime: 0,
            heater_power: 0.0,
            controller_running: true,
            time_without_control: 0,
            pipes_burst: false,
        }
    }
}

impl ProcessState {
    /// Server mode implied by this state.
    #[inline]
    pub fn server_mode(&self) -> ServerMode {
        if self.controller_running {
            ServerMode::Running
        } else {
            ServerMode::Degraded
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_thresholds_are_inclusive() {
        assert_eq!(ProcessStatus::from_temperature(10.01), ProcessStatus::Ok);
        assert_eq!(ProcessStatus::from_temperature(10.0), ProcessStatus::Warning);
        assert_eq!(ProcessStatus::from_temperature(5.0), ProcessStatus::Critical);
        assert_eq!(ProcessStatus::from_temperature(0.0), ProcessStatus::Frozen);
        assert_eq!(ProcessStatus::from_temperature(-25.0), ProcessStatus::Frozen);
    }

    #[test]
    fn burst_point() {
        assert!(!ProcessStatus::is_burst_temperature(-1.99));
        assert!(ProcessStatus::is_burst_temperature(-2.0));
    }

    #[test]
    fn status_severity_order() {
        assert!(ProcessStatus::Ok < ProcessStatus::Warning);
        assert!(ProcessStatus::Frozen < ProcessStatus::Burst);
        assert_eq!(ProcessStatus::Burst.code(), 4);
        assert_eq!(ProcessStatus::Burst.to_string(), "BURST");
    }

    #[test]
    fn control_mode_raw() {
        assert_eq!(ControlMode::from_raw(0), Some(ControlMode::Manual));
        assert_eq!(ControlMode::from_raw(1), Some(ControlMode::Auto));
        assert_eq!(ControlMode::from_raw(2), None);
    }

    #[test]
    fn default_state_is_running() {
        let state = ProcessState::default();
        assert_eq!(state.server_mode(), ServerMode::Running);
        assert_eq!(state.valve_actual, 50);
        assert!(!state.pipes_burst);
    }
}
