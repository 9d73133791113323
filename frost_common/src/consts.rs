//! Plant-wide constants for the frost workspace.
//!
//! Single source of truth for thresholds, physics defaults and protocol
//! limits. Imported by all crates; never duplicated.

// ─── Temperature thresholds [°C] ────────────────────────────────────

/// At or below this temperature the occupants are at hypothermia risk.
pub const TEMP_WARNING: f64 = 10.0;

/// At or below this temperature the pipes are at freeze risk.
pub const TEMP_CRITICAL: f64 = 5.0;

/// At or below this temperature the pipes are frozen.
pub const TEMP_FROZEN: f64 = 0.0;

/// At or below this temperature frozen pipes burst (latched).
pub const TEMP_BURST: f64 = -2.0;

/// Lower clamp of the indoor temperature model.
pub const TEMP_MODEL_MIN: f64 = -30.0;

/// Upper clamp of the indoor temperature model.
pub const TEMP_MODEL_MAX: f64 = 50.0;

// ─── Initial conditions ─────────────────────────────────────────────

/// Default indoor temperature at startup.
pub const DEFAULT_INSIDE_TEMP: f64 = 20.0;

/// Default outdoor temperature (winter conditions).
pub const DEFAULT_OUTSIDE_TEMP: f64 = -15.0;

/// Default district heating supply temperature.
pub const DEFAULT_SUPPLY_TEMP: f64 = 90.0;

/// Default temperature setpoint.
pub const DEFAULT_SETPOINT: f64 = 20.0;

/// Default valve command and position at startup [%].
pub const DEFAULT_VALVE: u8 = 50;

// ─── Physics ────────────────────────────────────────────────────────

/// Heat loss coefficient per °C of indoor/outdoor difference.
pub const DEFAULT_LOSS_FACTOR: f64 = 0.015;

/// Heater power at a fully open valve [kW].
pub const DEFAULT_MAX_POWER_KW: f64 = 80.0;

/// Building thermal mass.
pub const DEFAULT_THERMAL_MASS: f64 = 30.0;

/// Valve travel per second [%/s].
pub const DEFAULT_SLEW_RATE: f64 = 5.0;

// ─── Control ────────────────────────────────────────────────────────

/// Proportional band half-width around the setpoint [°C].
pub const DEFAULT_DEADBAND: f64 = 2.0;

/// Maximum valve opening [%].
pub const VALVE_MAX: u8 = 100;

/// Writable setpoint range upper bound [°C].
pub const SETPOINT_MAX: f64 = 40.0;

/// Writable setpoint range upper bound, raw register value (×10).
pub const SETPOINT_RAW_MAX: u16 = 400;

// ─── Timing ─────────────────────────────────────────────────────────

/// Default simulation tick interval in milliseconds.
pub const TICK_INTERVAL_MS: u64 = 1000;

// ─── Protocol ───────────────────────────────────────────────────────

/// Default Modbus/TCP listen address.
pub const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:502";

/// Default service instance name.
pub const DEFAULT_SERVICE_NAME: &str = "frost-plc";

/// Number of holding registers exposed by the plant.
pub const REGISTER_COUNT: usize = 10;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thresholds_are_ordered() {
        assert!(TEMP_WARNING > TEMP_CRITICAL);
        assert!(TEMP_CRITICAL > TEMP_FROZEN);
        assert!(TEMP_FROZEN > TEMP_BURST);
        assert!(TEMP_BURST > TEMP_MODEL_MIN);
        assert!(TEMP_MODEL_MAX > TEMP_WARNING);
    }

    #[test]
    fn setpoint_raw_limit_matches_scale() {
        assert_eq!(SETPOINT_RAW_MAX as f64, SETPOINT_MAX * 10.0);
        assert!(DEFAULT_SETPOINT <= SETPOINT_MAX);
    }

    #[test]
    fn defaults_are_within_limits() {
        assert!(DEFAULT_VALVE <= VALVE_MAX);
        assert!(DEFAULT_THERMAL_MASS > 0.0);
        assert!(TICK_INTERVAL_MS > 0);
    }
}
