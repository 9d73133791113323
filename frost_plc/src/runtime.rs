//! Service lifecycle: build the plant, bind the listener, start the workers.

use crate::codec::{CodecFactory, ModbusTcpFactory};
use crate::config::PlcConfig;
use crate::error::PlcError;
use crate::process::SharedProcess;
use crate::server::{ClientCounter, ConnectionSupervisor};
use crate::simulation::{SimulationTask, TimingStats};
use frost_common::process::{ProcessState, ServerMode};
use std::net::{SocketAddr, TcpListener};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use tracing::{info, warn};

/// Read-only view of the running service.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Telemetry {
    /// Plant state at the time of the call.
    pub state: ProcessState,
    /// Connected clients.
    pub clients: usize,
    /// RUNNING or DEGRADED.
    pub mode: ServerMode,
}

/// Entry point for starting the PLC service.
pub struct PlcRuntime;

impl PlcRuntime {
    /// Start with the Modbus/TCP codec.
    pub fn start(config: &PlcConfig) -> Result<RunningPlc, PlcError> {
        Self::start_with(config, ModbusTcpFactory)
    }

    /// Start with any codec factory.
    pub fn start_with<F: CodecFactory>(
        config: &PlcConfig,
        factory: F,
    ) -> Result<RunningPlc, PlcError> {
        config.validate()?;

        let process = SharedProcess::new(config.initial.to_state());
        let addr = config.server.listen;
        let listener = TcpListener::bind(addr).map_err(|source| PlcError::Bind { addr, source })?;
        let local_addr = listener.local_addr()?;
        info!("Modbus server listening on {}", local_addr);

        let shutdown = Arc::new(AtomicBool::new(false));
        let clients = ClientCounter::default();

        let supervisor = ConnectionSupervisor::new(
            listener,
            factory,
            process.clone(),
            clients.clone(),
            Arc::clone(&shutdown),
            config.server.max_clients,
        )?;
        let simulation = SimulationTask::new(config, process.clone(), Arc::clone(&shutdown));

        let simulation = simulation.spawn()?;
        let supervisor = match thread::Builder::new()
            .name("supervisor".to_string())
            .spawn(move || supervisor.run())
        {
            Ok(handle) => handle,
            Err(e) => {
                shutdown.store(true, Ordering::SeqCst);
                let _ = simulation.join();
                return Err(PlcError::Thread(format!(
                    "failed to spawn supervisor thread: {e}"
                )));
            }
        };

        Ok(RunningPlc {
            local_addr,
            process,
            clients,
            shutdown,
            simulation: Some(simulation),
            supervisor: Some(supervisor),
        })
    }
}

/// Handle to a started service. Dropping it requests shutdown without
/// waiting.
pub struct RunningPlc {
    local_addr: SocketAddr,
    process: SharedProcess,
    clients: ClientCounter,
    shutdown: Arc<AtomicBool>,
    simulation: Option<JoinHandle<TimingStats>>,
    supervisor: Option<JoinHandle<Result<(), PlcError>>>,
}

impl RunningPlc {
    /// Bound listen address (resolves port 0).
    #[inline]
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Shared plant handle.
    #[inline]
    pub fn process(&self) -> &SharedProcess {
        &self.process
    }

    /// Snapshot of state, client count and server mode.
    pub fn telemetry(&self) -> Telemetry {
        let state = self.process.snapshot();
        Telemetry {
            state,
            clients: self.clients.get(),
            mode: state.server_mode(),
        }
    }

    /// Flag that stops every worker when set.
    pub fn shutdown_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.shutdown)
    }

    /// Request shutdown and wait for all workers.
    pub fn shutdown(self) -> Result<Telemetry, PlcError> {
        info!("Shutdown requested");
        self.shutdown.store(true, Ordering::SeqCst);
        self.wait()
    }

    /// Wait for the workers to stop, without requesting it.
    pub fn wait(mut self) -> Result<Telemetry, PlcError> {
        let mut result = Ok(());

        if let Some(handle) = self.supervisor.take() {
            result = match handle.join() {
                Ok(outcome) => outcome,
                Err(_) => Err(PlcError::Thread("supervisor thread panicked".to_string())),
            };
        }
        // The supervisor may have exited on its own; stop the timer too.
        self.shutdown.store(true, Ordering::SeqCst);
        if let Some(handle) = self.simulation.take() {
            match handle.join() {
                Ok(stats) => info!(
                    "Timing: {} ticks, avg={}us, max={}us, overruns={}",
                    stats.tick_count,
                    stats.avg_tick_us(),
                    stats.max_tick_us,
                    stats.overruns
                ),
                Err(_) => {
                    warn!("Simulation thread panicked");
                    if result.is_ok() {
                        result = Err(PlcError::Thread("simulation thread panicked".to_string()));
                    }
                }
            }
        }

        result.map(|()| self.telemetry())
    }
}

impl Drop for RunningPlc {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use frost_common::process::ControlMode;

    #[test]
    fn start_and_shutdown_on_loopback() {
        let config = PlcConfig::loopback();
        let plc = PlcRuntime::start(&config).unwrap();
        assert_ne!(plc.local_addr().port(), 0);

        let telemetry = plc.telemetry();
        assert_eq!(telemetry.clients, 0);
        assert_eq!(telemetry.mode, ServerMode::Running);
        assert_eq!(telemetry.state.mode, ControlMode::Auto);

        let last = plc.shutdown().unwrap();
        assert_eq!(last.clients, 0);
    }

    #[test]
    fn invalid_config_is_rejected_before_bind() {
        let mut config = PlcConfig::loopback();
        config.simulation.tick_interval_ms = 0;
        assert!(matches!(
            PlcRuntime::start(&config),
            Err(PlcError::Config(_))
        ));
    }

    #[test]
    fn bind_conflict_reports_address() {
        let taken = TcpListener::bind("127.0.0.1:0").unwrap();
        let mut config = PlcConfig::loopback();
        config.server.listen = taken.local_addr().unwrap();
        match PlcRuntime::start(&config) {
            Err(PlcError::Bind { addr, .. }) => assert_eq!(addr, config.server.listen),
            Err(other) => panic!("unexpected error: {other}"),
            Ok(_) => panic!("second bind on the same port succeeded"),
        }
    }
}
