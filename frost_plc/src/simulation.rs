//! Fixed-cadence simulation timer.
//!
//! Every interval the task takes the state lock once, runs the physics tick
//! and then the controller step, and releases it. The first tick fires one
//! interval after start. Shutdown is observed between ticks; a tick in
//! progress always completes.

use crate::config::PlcConfig;
use crate::error::PlcError;
use crate::process::{Controller, PhysicsEngine, SharedProcess, StatusTransition};
use frost_common::process::{ProcessState, ProcessStatus};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Longest single sleep between shutdown checks.
const SHUTDOWN_POLL: Duration = Duration::from_millis(50);

/// Timing statistics for the tick loop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TimingStats {
    /// Ticks executed.
    pub tick_count: u64,
    /// Ticks that started late by more than a full interval.
    pub overruns: u64,
    /// Longest tick [µs].
    pub max_tick_us: u64,
    /// Sum of tick durations [µs].
    pub total_tick_us: u64,
}

impl TimingStats {
    /// Mean tick duration [µs].
    pub fn avg_tick_us(&self) -> u64 {
        self.total_tick_us.checked_div(self.tick_count).unwrap_or(0)
    }
}

/// Timer task driving physics and control.
pub struct SimulationTask {
    process: SharedProcess,
    physics: PhysicsEngine,
    controller: Controller,
    interval: Duration,
    dt: f64,
    status_log_every: u32,
    shutdown: Arc<AtomicBool>,
    stats: TimingStats,
}

impl SimulationTask {
    /// Build the task from config.
    pub fn new(config: &PlcConfig, process: SharedProcess, shutdown: Arc<AtomicBool>) -> Self {
        Self {
            process,
            physics: PhysicsEngine::new(config.physics),
            controller: Controller::new(config.controller),
            interval: config.simulation.tick_interval(),
            dt: config.simulation.dt(),
            status_log_every: config.simulation.status_log_every,
            shutdown,
            stats: TimingStats::default(),
        }
    }

    /// Timing statistics so far.
    #[inline]
    pub fn stats(&self) -> TimingStats {
        self.stats
    }

    /// Run one tick: physics, then control, under a single lock hold.
    pub fn step(&mut self) -> ProcessState {
        let started = Instant::now();
        let physics = &self.physics;
        let controller = &self.controller;
        let dt = self.dt;

        let (transition, state) = self.process.mutate(|state| {
            let transition = physics.tick(state, dt);
            controller.step(state);
            (transition, *state)
        });

        let elapsed_us = started.elapsed().as_micros() as u64;
        self.stats.tick_count += 1;
        self.stats.total_tick_us += elapsed_us;
        self.stats.max_tick_us = self.stats.max_tick_us.max(elapsed_us);

        if let Some(transition) = transition {
            log_transition(transition, &state);
        }
        if self.status_log_every > 0 && self.stats.tick_count % self.status_log_every as u64 == 0 {
            info!(
                runtime = state.runtime,
                valve_cmd = state.valve_cmd,
                valve_actual = state.valve_actual,
                heater_kw = state.heater_power,
                mode = ?state.mode,
                server = ?state.server_mode(),
                "Inside {:.1}°C (setpoint {:.1}°C), status {}",
                state.inside_temp,
                state.setpoint,
                state.status
            );
        }
        state
    }

    /// Tick until shutdown. Returns the final timing statistics.
    pub fn run(mut self) -> TimingStats {
        info!(
            "Simulation started (interval={}ms, dt={}s)",
            self.interval.as_millis(),
            self.dt
        );

        let mut next = Instant::now() + self.interval;
        while self.sleep_until(next) {
            self.step();

            next += self.interval;
            let now = Instant::now();
            if next < now {
                self.stats.overruns += 1;
                if self.stats.overruns <= 10 || self.stats.overruns % 1000 == 0 {
                    warn!(
                        "Tick overrun #{}: {}ms behind schedule",
                        self.stats.overruns,
                        (now - next).as_millis()
                    );
                }
                next = now + self.interval;
            }

            if self.stats.tick_count % 1000 == 0 {
                debug!(
                    "Simulation: {} ticks, avg={}us, max={}us, overruns={}",
                    self.stats.tick_count,
                    self.stats.avg_tick_us(),
                    self.stats.max_tick_us,
                    self.stats.overruns
                );
            }
        }

        info!(
            "Simulation stopped after {} ticks (overruns: {})",
            self.stats.tick_count, self.stats.overruns
        );
        self.stats
    }

    /// Start the task on its own thread.
    pub fn spawn(self) -> Result<JoinHandle<TimingStats>, PlcError> {
        thread::Builder::new()
            .name("simulation".to_string())
            .spawn(move || self.run())
            .map_err(|e| PlcError::Thread(format!("failed to spawn simulation thread: {e}")))
    }

    /// Sleep until `deadline` in short slices. Returns `false` on shutdown.
    fn sleep_until(&self, deadline: Instant) -> bool {
        loop {
            if self.shutdown.load(Ordering::SeqCst) {
                return false;
            }
            let now = Instant::now();
            if now >= deadline {
                return true;
            }
            thread::sleep((deadline - now).min(SHUTDOWN_POLL));
        }
    }
}

fn log_transition(transition: StatusTransition, state: &ProcessState) {
    match transition.to {
        ProcessStatus::Burst => error!(
            time_without_control = state.time_without_control,
            "PIPES BURST at {:.1}°C, plant lost",
            state.inside_temp
        ),
        to if to > transition.from => warn!(
            "Status {} -> {} at {:.1}°C",
            transition.from, to, state.inside_temp
        ),
        to => info!(
            "Status {} -> {} at {:.1}°C",
            transition.from, to, state.inside_temp
        ),
    }
}
