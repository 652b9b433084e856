// crates/voxeld-config/src/tests.rs
// ============================================================================
// Module: Config Tests
// Description: Unit coverage for DaemonConfig defaults, validation, and
//              the environment overlay.
// ============================================================================

#![allow(clippy::unwrap_used, reason = "test assertions read better unwrapped")]

use std::io::Write as _;

use crate::config::DaemonConfig;
use crate::config::MAX_CONFIG_FILE_SIZE;
use crate::config::MAX_WORKER_COUNT;
use crate::env::apply_env_overlay;
use crate::env::RENDER_TTL_VAR;
use crate::env::SOCKET_PATH_VAR;
use crate::env::WORKER_COUNT_VAR;
use crate::error::ConfigError;

#[test]
fn default_config_validates() {
    let config = DaemonConfig::default();
    config.validate().unwrap();
}

#[test]
fn zero_worker_count_is_rejected() {
    let mut config = DaemonConfig::default();
    config.worker_count = 0;
    assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
}

#[test]
fn worker_count_above_max_is_rejected() {
    let mut config = DaemonConfig::default();
    config.worker_count = MAX_WORKER_COUNT + 1;
    assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
}

#[test]
fn queue_capacity_below_worker_count_is_rejected() {
    let mut config = DaemonConfig::default();
    config.worker_count = 8;
    config.request_queue_capacity = 4;
    assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
}

#[test]
fn zero_render_max_total_bytes_is_rejected() {
    let mut config = DaemonConfig::default();
    config.render_max_total_bytes = 0;
    assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
}

#[test]
fn empty_socket_path_is_rejected() {
    let mut config = DaemonConfig::default();
    config.socket_path = String::new().into();
    assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
}

#[test]
fn load_rejects_oversized_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    let padding = "#".repeat(MAX_CONFIG_FILE_SIZE + 1);
    writeln!(file, "{padding}").unwrap();
    let result = DaemonConfig::load(file.path());
    assert!(matches!(result, Err(ConfigError::TooLarge(_))));
}

#[test]
fn load_rejects_malformed_toml() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "this is not valid toml = = =").unwrap();
    let result = DaemonConfig::load(file.path());
    assert!(matches!(result, Err(ConfigError::Parse(_))));
}

#[test]
fn load_accepts_partial_toml_and_fills_defaults() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, r#"worker_count = 7"#).unwrap();
    let config = DaemonConfig::load(file.path()).unwrap();
    assert_eq!(config.worker_count, 7);
    assert_eq!(config.log_level, crate::config::LogLevel::Info);
}

#[test]
fn env_overlay_overrides_socket_path_and_worker_count() {
    // SAFETY-free: std::env::set_var is unsafe-free in this edition's API
    // surface; the test scopes variables to names unused elsewhere.
    std::env::set_var(SOCKET_PATH_VAR, "/tmp/overlay.sock");
    std::env::set_var(WORKER_COUNT_VAR, "9");
    let config = apply_env_overlay(DaemonConfig::default()).unwrap();
    assert_eq!(config.socket_path.to_str().unwrap(), "/tmp/overlay.sock");
    assert_eq!(config.worker_count, 9);
    std::env::remove_var(SOCKET_PATH_VAR);
    std::env::remove_var(WORKER_COUNT_VAR);
}

#[test]
fn env_overlay_rejects_unparseable_numeric_value() {
    std::env::set_var(RENDER_TTL_VAR, "not-a-number");
    let result = apply_env_overlay(DaemonConfig::default());
    std::env::remove_var(RENDER_TTL_VAR);
    assert!(matches!(result, Err(ConfigError::InvalidEnvVar(RENDER_TTL_VAR, _))));
}

#[test]
fn env_overlay_ignores_empty_string_as_unset() {
    std::env::set_var(SOCKET_PATH_VAR, "");
    let base = DaemonConfig::default();
    let expected = base.socket_path.clone();
    let config = apply_env_overlay(base).unwrap();
    std::env::remove_var(SOCKET_PATH_VAR);
    assert_eq!(config.socket_path, expected);
}
