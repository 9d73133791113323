//! # FROST PLC Binary
//!
//! Simulated heating-plant PLC with a Modbus/TCP register server.
//!
//! # Usage
//!
//! ```bash
//! # Reference plant on 0.0.0.0:502
//! frost_plc
//!
//! # Config file, unprivileged port, finer 200 ms time step (same plant speed)
//! frost_plc --config config/frost_plc.toml --listen 127.0.0.1:5020 --tick-ms 200
//!
//! # Verbose JSON logs appended to a file
//! LOG_FILE=/logs/plc.log frost_plc -v --json
//! ```

use clap::Parser;
use frost_plc::{PlcConfig, PlcRuntime};
use std::fs::OpenOptions;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::Ordering;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::writer::BoxMakeWriter;

/// FROST PLC - simulated district-heating controller over Modbus/TCP
#[derive(Parser, Debug)]
#[command(name = "frost_plc")]
#[command(version)]
#[command(about = "Simulated heating-plant PLC with a Modbus/TCP register server")]
#[command(long_about = None)]
struct Args {
    /// Path to the TOML configuration file. Built-in defaults when absent.
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Override the listen address.
    #[arg(short, long, value_name = "ADDR")]
    listen: Option<SocketAddr>,

    /// Override the simulation tick interval in milliseconds.
    ///
    /// Simulated time follows the wall clock; this only changes the step size.
    /// The valve must still move at least 1 % per tick.
    #[arg(long, value_name = "MS")]
    tick_ms: Option<u64>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Output logs in JSON format
    #[arg(long)]
    json: bool,

    /// Append logs to this file instead of stderr.
    #[arg(long, value_name = "FILE", env = "LOG_FILE")]
    log_file: Option<PathBuf>,

    /// Print the effective configuration as TOML and exit.
    #[arg(long)]
    print_config: bool,
}

fn main() {
    if let Err(e) = run() {
        eprintln!("frost_plc: {e}");
        error!("PLC startup failed: {}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let mut config = PlcConfig::load_or_default(args.config.as_deref())?;
    if let Some(listen) = args.listen {
        config.server.listen = listen;
    }
    if let Some(tick_ms) = args.tick_ms {
        config.simulation.tick_interval_ms = tick_ms;
    }
    if args.log_file.is_some() {
        config.shared.log_file = args.log_file.clone();
    }
    config.validate()?;

    if args.print_config {
        print!("{}", config.to_toml()?);
        return Ok(());
    }

    setup_tracing(&args, &config)?;

    info!(
        "{} v{} starting...",
        config.shared.service_name,
        env!("CARGO_PKG_VERSION")
    );
    match &args.config {
        Some(path) => info!("Configuration loaded from {}", path.display()),
        None => info!("No configuration file given, using built-in defaults"),
    }
    let initial = &config.initial;
    info!(
        "Initial plant: inside {:.1}°C, outside {:.1}°C, supply {:.1}°C, setpoint {:.1}°C, valve {}%, mode {:?}",
        initial.inside_temp,
        initial.outside_temp,
        initial.supply_temp,
        initial.setpoint,
        initial.valve,
        initial.mode
    );

    let plc = PlcRuntime::start(&config)?;

    let shutdown = plc.shutdown_flag();
    ctrlc::set_handler(move || {
        info!("Received shutdown signal");
        shutdown.store(true, Ordering::SeqCst);
    })?;

    let last = plc.wait()?;
    info!(
        inside_temp = last.state.inside_temp,
        status = %last.state.status,
        mode = ?last.mode,
        runtime = last.state.runtime,
        pipes_burst = last.state.pipes_burst,
        "{} shutdown complete",
        config.shared.service_name
    );
    Ok(())
}

/// Setup tracing subscriber from config and CLI arguments.
fn setup_tracing(args: &Args, config: &PlcConfig) -> Result<(), Box<dyn std::error::Error>> {
    let directive = if args.verbose {
        "debug"
    } else {
        config.shared.log_level.as_directive()
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directive));

    let (writer, ansi) = match config.shared.log_file.as_deref() {
        Some(path) => (BoxMakeWriter::new(Mutex::new(open_log(path)?)), false),
        None => (BoxMakeWriter::new(std::io::stderr), true),
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(ansi)
        .with_thread_names(true);
    if args.json {
        builder.json().init();
    } else {
        builder.init();
    }
    Ok(())
}

fn open_log(path: &Path) -> std::io::Result<std::fs::File> {
    if let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)?;
    }
    OpenOptions::new().create(true).append(true).open(path)
}
