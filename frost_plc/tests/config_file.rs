//! `PlcConfig` loading from disk.

use frost_common::config::ConfigError;
use frost_common::process::{ControlMode, ProcessStatus};
use frost_plc::PlcConfig;
use frost_plc::config::PhysicsConfig;
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn sample_config() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("../config/frost_plc.toml")
}

#[test]
fn shipped_sample_matches_defaults() {
    let config = PlcConfig::load_or_default(Some(&sample_config())).unwrap();
    let defaults = PlcConfig::default();

    assert_eq!(config.server.listen, defaults.server.listen);
    assert_eq!(config.server.max_clients, None);
    assert_eq!(config.simulation.tick_interval_ms, 1000);
    assert_eq!(config.physics, PhysicsConfig::default());
    assert_eq!(config.controller, defaults.controller);
    assert_eq!(config.initial, defaults.initial);
}

#[test]
fn partial_file_overrides_only_given_keys() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("plc.toml");
    fs::write(
        &path,
        r#"
[server]
listen = "127.0.0.1:5020"
max_clients = 4

[initial]
inside_temp = 3.5
mode = "manual"
"#,
    )
    .unwrap();

    let config = PlcConfig::load_or_default(Some(&path)).unwrap();
    assert_eq!(config.server.listen, "127.0.0.1:5020".parse::<SocketAddr>().unwrap());
    assert_eq!(config.server.max_clients, Some(4));
    assert_eq!(config.initial.mode, ControlMode::Manual);
    assert_eq!(config.physics, PhysicsConfig::default());

    let state = config.initial.to_state();
    assert_eq!(state.inside_temp, 3.5);
    assert_eq!(state.status, ProcessStatus::Critical);
    assert!(state.controller_running);
}

#[test]
fn unknown_keys_are_rejected() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("plc.toml");
    fs::write(&path, "[physics]\nloss_factr = 0.02\n").unwrap();
    assert!(matches!(
        PlcConfig::load_or_default(Some(&path)),
        Err(ConfigError::ParseError(_))
    ));
}

#[test]
fn out_of_range_values_fail_validation() {
    let dir = TempDir::new().unwrap();
    let cases = [
        "[initial]\nsetpoint = 45.0\n",
        "[initial]\nvalve = 120\n",
        "[physics]\nthermal_mass = 0.0\n",
        "[simulation]\ntick_interval_ms = 0\n",
        "[simulation]\ntick_interval_ms = 100\n",
        "[physics]\nloss_factor = inf\n",
        "[server]\nmax_clients = 0\n",
    ];
    for (i, body) in cases.iter().enumerate() {
        let path = dir.path().join(format!("case_{i}.toml"));
        fs::write(&path, body).unwrap();
        assert!(
            matches!(
                PlcConfig::load_or_default(Some(&path)),
                Err(ConfigError::ValidationError(_))
            ),
            "accepted: {body}"
        );
    }
}

#[test]
fn no_path_means_defaults() {
    let config = PlcConfig::load_or_default(None).unwrap();
    assert_eq!(config.shared.service_name, "frost-plc");
    assert_eq!(config.initial.to_state().status, ProcessStatus::Ok);
}
