//! Service configuration for the heating plant PLC.
//!
//! Loaded once from TOML at startup via [`ConfigLoader`]; every section has
//! defaults so an empty file (or no file) yields the reference plant.

use frost_common::config::{ConfigError, ConfigLoader, SharedConfig};
use frost_common::consts::{
    DEFAULT_DEADBAND, DEFAULT_INSIDE_TEMP, DEFAULT_LOSS_FACTOR,
    DEFAULT_MAX_POWER_KW, DEFAULT_OUTSIDE_TEMP, DEFAULT_SETPOINT, DEFAULT_SLEW_RATE,
    DEFAULT_SUPPLY_TEMP, DEFAULT_THERMAL_MASS, DEFAULT_VALVE, SETPOINT_MAX, TEMP_MODEL_MAX,
    TEMP_MODEL_MIN, TICK_INTERVAL_MS, VALVE_MAX,
};
use frost_common::process::{ControlMode, ProcessState, ProcessStatus};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

/// Top-level `frost_plc` configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PlcConfig {
    /// Common service settings (name, logging).
    pub shared: SharedConfig,
    /// Listener settings.
    pub server: ServerConfig,
    /// Timer task settings.
    pub simulation: SimulationConfig,
    /// Thermal model constants.
    pub physics: PhysicsConfig,
    /// Controller tuning.
    pub controller: ControllerConfig,
    /// Plant state at startup.
    pub initial: InitialConditions,
}

/// Listener settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    /// Modbus/TCP listen address.
    pub listen: SocketAddr,
    /// Optional cap on concurrent client sessions. `None` = unbounded.
    pub max_clients: Option<usize>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: SocketAddr::from(([0, 0, 0, 0], 502)),
            max_clients: None,
        }
    }
}

/// Simulation timer settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SimulationConfig {
    /// Tick period in milliseconds.
    pub tick_interval_ms: u64,
    /// Emit a status line every N ticks (0 = never).
    pub status_log_every: u32,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: TICK_INTERVAL_MS,
            status_log_every: 10,
        }
    }
}

impl SimulationConfig {
    /// Tick period as a Duration.
    #[inline]
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    /// Simulated seconds advanced per tick.
    #[inline]
    pub fn dt(&self) -> f64 {
        self.tick_interval_ms as f64 / 1000.0
    }
}

/// Thermal model constants.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PhysicsConfig {
    /// Heat loss coefficient per °C of indoor/outdoor difference.
    pub loss_factor: f64,
    /// Heater power at a fully open valve [kW].
    pub max_power_kw: f64,
    /// Building thermal mass.
    pub thermal_mass: f64,
    /// Valve travel [%/s].
    pub slew_rate: f64,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            loss_factor: DEFAULT_LOSS_FACTOR,
            max_power_kw: DEFAULT_MAX_POWER_KW,
            thermal_mass: DEFAULT_THERMAL_MASS,
            slew_rate: DEFAULT_SLEW_RATE,
        }
    }
}

/// Controller tuning.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ControllerConfig {
    /// Proportional band half-width [°C].
    pub deadband: f64,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            deadband: DEFAULT_DEADBAND,
        }
    }
}

/// Plant state at startup.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct InitialConditions {
    /// Indoor temperature [°C].
    pub inside_temp: f64,
    /// Outdoor temperature [°C].
    pub outside_temp: f64,
    /// Supply temperature [°C].
    pub supply_temp: f64,
    /// Setpoint [°C].
    pub setpoint: f64,
    /// Valve command and actual position [%].
    pub valve: u8,
    /// Control mode.
    pub mode: ControlMode,
}

impl Default for InitialConditions {
    fn default() -> Self {
        Self {
            inside_temp: DEFAULT_INSIDE_TEMP,
            outside_temp: DEFAULT_OUTSIDE_TEMP,
            supply_temp: DEFAULT_SUPPLY_TEMP,
            setpoint: DEFAULT_SETPOINT,
            valve: DEFAULT_VALVE,
            mode: ControlMode::Auto,
        }
    }
}

impl InitialConditions {
    /// Build the startup process state.
    pub fn to_state(&self) -> ProcessState {
        ProcessState {
            inside_temp: self.inside_temp,
            outside_temp: self.outside_temp,
            supply_temp: self.supply_temp,
            setpoint: self.setpoint,
            valve_cmd: self.valve,
            valve_actual: self.valve,
            mode: self.mode,
            status: ProcessStatus::from_temperature(self.inside_temp),
            ..ProcessState::default()
        }
    }
}

impl PlcConfig {
    /// Load from `path`, or fall back to defaults when no path is given.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config = match path {
            Some(path) => Self::load(path)?,
            None => Self::default(),
        };
        config.validate()?;
        Ok(config)
    }

    /// Loopback config on an ephemeral port. Used by tests and benches.
    pub fn loopback() -> Self {
        let mut config = Self::default();
        config.server.listen = SocketAddr::from(([127, 0, 0, 1], 0));
        config
    }

    /// Semantic validation of every section.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.shared.validate()?;

        if self.server.max_clients == Some(0) {
            return invalid("server.max_clients must be at least 1");
        }
        if self.simulation.tick_interval_ms == 0 {
            return invalid("simulation.tick_interval_ms must be > 0");
        }

        let p = &self.physics;
        if !p.loss_factor.is_finite() || p.loss_factor < 0.0 {
            return invalid("physics.loss_factor must be finite and >= 0");
        }
        if !p.max_power_kw.is_finite() || p.max_power_kw < 0.0 {
            return invalid("physics.max_power_kw must be finite and >= 0");
        }
        if !p.thermal_mass.is_finite() || p.thermal_mass <= 0.0 {
            return invalid("physics.thermal_mass must be finite and > 0");
        }
        if !p.slew_rate.is_finite() || p.slew_rate < 0.0 {
            return invalid("physics.slew_rate must be finite and >= 0");
        }
        // The valve moves in whole percent; a smaller step truncates to zero.
        if p.slew_rate * self.simulation.dt() < 1.0 {
            return invalid(&format!(
                "physics.slew_rate * tick interval must be >= 1 %/tick (got {} %/s at {} ms)",
                p.slew_rate, self.simulation.tick_interval_ms
            ));
        }
        if !self.controller.deadband.is_finite() || self.controller.deadband <= 0.0 {
            return invalid("controller.deadband must be finite and > 0");
        }

        let i = &self.initial;
        if !(0.0..=SETPOINT_MAX).contains(&i.setpoint) {
            return invalid(&format!("initial.setpoint must be within 0..={SETPOINT_MAX}"));
        }
        if i.valve > VALVE_MAX {
            return invalid(&format!("initial.valve must be within 0..={VALVE_MAX}"));
        }
        if !(TEMP_MODEL_MIN..=TEMP_MODEL_MAX).contains(&i.inside_temp) {
            return invalid(&format!(
                "initial.inside_temp must be within {TEMP_MODEL_MIN}..={TEMP_MODEL_MAX}"
            ));
        }
        if !i.outside_temp.is_finite() || !i.supply_temp.is_finite() {
            return invalid("initial temperatures must be finite");
        }
        Ok(())
    }

    /// Render the effective configuration as TOML.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string(self).map_err(|e| ConfigError::ParseError(e.to_string()))
    }
}

fn invalid(reason: &str) -> Result<(), ConfigError> {
    Err(ConfigError::ValidationError(reason.to_string()))
}
