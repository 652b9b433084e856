// crates/voxeld-config/src/env.rs
// ============================================================================
// Module: Environment Overlay
// Description: Applies GOXEL_* environment variables onto a base DaemonConfig.
// Purpose: Let operators override select fields without a config file,
//          without ever silently accepting a malformed value.
// Dependencies: crate::config, crate::error
// ============================================================================

use std::env;
use std::path::PathBuf;

use crate::config::DaemonConfig;
use crate::error::ConfigError;

/// Environment variable overriding `socket_path`.
pub const SOCKET_PATH_VAR: &str = "GOXEL_SOCKET_PATH";
/// Environment variable overriding `render_dir`.
pub const RENDER_DIR_VAR: &str = "GOXEL_RENDER_DIR";
/// Environment variable overriding `render_ttl_ms`.
pub const RENDER_TTL_VAR: &str = "GOXEL_RENDER_TTL";
/// Environment variable overriding `render_max_total_bytes`.
pub const RENDER_MAX_SIZE_VAR: &str = "GOXEL_RENDER_MAX_SIZE";
/// Environment variable overriding `render_sweep_interval_ms`.
pub const RENDER_CLEANUP_INTERVAL_VAR: &str = "GOXEL_RENDER_CLEANUP_INTERVAL";
/// Environment variable overriding `worker_count`.
pub const WORKER_COUNT_VAR: &str = "GOXEL_WORKER_COUNT";

/// Applies any recognized `GOXEL_*` environment variables onto `base`,
/// returning the resulting config. Does not validate the result; callers
/// should run [`DaemonConfig::validate`] afterward.
///
/// # Errors
/// Returns [`ConfigError::InvalidEnvVar`] naming the variable whose value
/// could not be parsed as its expected type.
pub fn apply_env_overlay(mut base: DaemonConfig) -> Result<DaemonConfig, ConfigError> {
    if let Some(value) = read_var(SOCKET_PATH_VAR) {
        base.socket_path = PathBuf::from(value);
    }
    if let Some(value) = read_var(RENDER_DIR_VAR) {
        base.render_dir = PathBuf::from(value);
    }
    if let Some(value) = read_var(RENDER_TTL_VAR) {
        base.render_ttl_ms = parse_u64(RENDER_TTL_VAR, &value)?;
    }
    if let Some(value) = read_var(RENDER_MAX_SIZE_VAR) {
        base.render_max_total_bytes = parse_u64(RENDER_MAX_SIZE_VAR, &value)?;
    }
    if let Some(value) = read_var(RENDER_CLEANUP_INTERVAL_VAR) {
        base.render_sweep_interval_ms = parse_u64(RENDER_CLEANUP_INTERVAL_VAR, &value)?;
    }
    if let Some(value) = read_var(WORKER_COUNT_VAR) {
        base.worker_count = parse_usize(WORKER_COUNT_VAR, &value)?;
    }
    Ok(base)
}

/// Reads an environment variable, treating an empty string the same as unset.
fn read_var(name: &str) -> Option<String> {
    match env::var(name) {
        Ok(value) if !value.is_empty() => Some(value),
        _ => None,
    }
}

/// Parses a `u64`-valued environment variable, naming `name` on failure.
fn parse_u64(name: &'static str, value: &str) -> Result<u64, ConfigError> {
    value
        .parse::<u64>()
        .map_err(|_| ConfigError::InvalidEnvVar(name, value.to_string()))
}

/// Parses a `usize`-valued environment variable, naming `name` on failure.
fn parse_usize(name: &'static str, value: &str) -> Result<usize, ConfigError> {
    value
        .parse::<usize>()
        .map_err(|_| ConfigError::InvalidEnvVar(name, value.to_string()))
}
