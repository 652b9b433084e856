// crates/voxeld-config/src/config.rs
// ============================================================================
// Module: Daemon Configuration
// Description: DaemonConfig fields, named bounds, validation, and file load.
// Purpose: One immutable, validated value every other component is built
//          from; never accept an out-of-bound field silently.
// Dependencies: serde, toml, crate::error
// ============================================================================

use std::fs;
use std::path::Path;
use std::path::PathBuf;

use serde::Deserialize;
use serde::Serialize;

use crate::error::ConfigError;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Maximum configuration file size accepted by [`DaemonConfig::load`].
pub const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;
/// Minimum accepted `worker_count`.
pub const MIN_WORKER_COUNT: usize = 1;
/// Maximum accepted `worker_count`.
pub const MAX_WORKER_COUNT: usize = 256;
/// Minimum accepted `max_connections`.
pub const MIN_MAX_CONNECTIONS: usize = 1;
/// Maximum accepted `max_connections`.
pub const MAX_MAX_CONNECTIONS: usize = 65_536;
/// Minimum accepted `max_message_bytes`.
pub const MIN_MAX_MESSAGE_BYTES: usize = 1024;
/// Maximum accepted `max_message_bytes`.
pub const MAX_MAX_MESSAGE_BYTES: usize = 256 * 1024 * 1024;
/// Minimum accepted `request_timeout_ms`.
pub const MIN_REQUEST_TIMEOUT_MS: u64 = 10;
/// Maximum accepted `request_timeout_ms`.
pub const MAX_REQUEST_TIMEOUT_MS: u64 = 10 * 60 * 1000;
/// Minimum accepted `render_ttl_ms`.
pub const MIN_RENDER_TTL_MS: u64 = 0;
/// Maximum accepted `render_ttl_ms`.
pub const MAX_RENDER_TTL_MS: u64 = 7 * 24 * 60 * 60 * 1000;
/// Maximum accepted `render_max_total_bytes`.
pub const MAX_RENDER_MAX_TOTAL_BYTES: u64 = 64 * 1024 * 1024 * 1024;
/// Minimum accepted `render_sweep_interval_ms`.
pub const MIN_RENDER_SWEEP_INTERVAL_MS: u64 = 50;
/// Minimum accepted `session_drain_deadline_ms`.
pub const MIN_SESSION_DRAIN_DEADLINE_MS: u64 = 100;
/// Minimum accepted `session_outbound_channel_depth`.
pub const MIN_SESSION_OUTBOUND_CHANNEL_DEPTH: usize = 1;

/// Default `worker_count` when unset.
pub const DEFAULT_WORKER_COUNT: usize = 4;
/// Default `request_queue_capacity` when unset.
pub const DEFAULT_REQUEST_QUEUE_CAPACITY: usize = 64;
/// Default `max_connections` when unset.
pub const DEFAULT_MAX_CONNECTIONS: usize = 128;
/// Default `max_message_bytes` when unset (8 MiB).
pub const DEFAULT_MAX_MESSAGE_BYTES: usize = 8 * 1024 * 1024;
/// Default `request_timeout_ms` when unset.
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 30_000;
/// Default `render_ttl_ms` when unset.
pub const DEFAULT_RENDER_TTL_MS: u64 = 5 * 60 * 1000;
/// Default `render_max_total_bytes` when unset (512 MiB).
pub const DEFAULT_RENDER_MAX_TOTAL_BYTES: u64 = 512 * 1024 * 1024;
/// Default `render_sweep_interval_ms` when unset.
pub const DEFAULT_RENDER_SWEEP_INTERVAL_MS: u64 = 1000;
/// Default `session_drain_deadline_ms` when unset.
pub const DEFAULT_SESSION_DRAIN_DEADLINE_MS: u64 = 5000;
/// Default `session_outbound_channel_depth` when unset.
pub const DEFAULT_SESSION_OUTBOUND_CHANNEL_DEPTH: usize = 256;

// ============================================================================
// SECTION: DaemonConfig
// ============================================================================

/// Immutable, validated configuration for one daemon process.
///
/// Constructed by the surrounding CLI loader (out of scope for this crate's
/// daemon core consumer), optionally from a TOML file via
/// [`DaemonConfig::load`] and/or from the environment via
/// [`DaemonConfig::apply_env_overlay`]. Always call [`DaemonConfig::validate`]
/// before handing a `DaemonConfig` to the daemon core; `load` does this for
/// you.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DaemonConfig {
    /// Filesystem path for the listening Unix socket.
    pub socket_path: PathBuf,
    /// Number of worker tasks draining the request queue.
    pub worker_count: usize,
    /// Capacity of the bounded request queue.
    pub request_queue_capacity: usize,
    /// Maximum number of simultaneous connections.
    pub max_connections: usize,
    /// Hard cap on a single inbound JSON message, in bytes.
    pub max_message_bytes: usize,
    /// Wall-clock cap on a single method invocation, in milliseconds.
    pub request_timeout_ms: u64,
    /// Directory render artifacts are written into.
    pub render_dir: PathBuf,
    /// Time-to-live for a render artifact, in milliseconds.
    pub render_ttl_ms: u64,
    /// Total byte cap across all live render artifacts.
    pub render_max_total_bytes: u64,
    /// Interval between reaper sweeps, in milliseconds.
    pub render_sweep_interval_ms: u64,
    /// Optional path to a pidfile written at startup.
    pub pidfile_path: Option<PathBuf>,
    /// Minimum severity of audit events to emit.
    pub log_level: LogLevel,
    /// Wall-clock cap on the graceful shutdown drain phase, in milliseconds.
    pub session_drain_deadline_ms: u64,
    /// Bounded outbound channel depth per session.
    pub session_outbound_channel_depth: usize,
    /// Config kill-switch for the `shutdown` RPC method (§9 open question).
    pub shutdown_method_enabled: bool,
}

/// Minimum severity of an audit event worth emitting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Verbose, per-request detail.
    Trace,
    /// Developer-facing diagnostic detail.
    Debug,
    /// Normal operational events.
    Info,
    /// Recoverable but noteworthy conditions.
    Warn,
    /// Failures that terminate a connection or the process.
    Error,
}

impl Default for LogLevel {
    fn default() -> Self {
        Self::Info
    }
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            socket_path: PathBuf::from("/var/run/voxeld/voxeld.sock"),
            worker_count: DEFAULT_WORKER_COUNT,
            request_queue_capacity: DEFAULT_REQUEST_QUEUE_CAPACITY,
            max_connections: DEFAULT_MAX_CONNECTIONS,
            max_message_bytes: DEFAULT_MAX_MESSAGE_BYTES,
            request_timeout_ms: DEFAULT_REQUEST_TIMEOUT_MS,
            render_dir: PathBuf::from("/var/tmp/voxeld_renders"),
            render_ttl_ms: DEFAULT_RENDER_TTL_MS,
            render_max_total_bytes: DEFAULT_RENDER_MAX_TOTAL_BYTES,
            render_sweep_interval_ms: DEFAULT_RENDER_SWEEP_INTERVAL_MS,
            pidfile_path: None,
            log_level: LogLevel::default(),
            session_drain_deadline_ms: DEFAULT_SESSION_DRAIN_DEADLINE_MS,
            session_outbound_channel_depth: DEFAULT_SESSION_OUTBOUND_CHANNEL_DEPTH,
            shutdown_method_enabled: true,
        }
    }
}

impl DaemonConfig {
    /// Loads a `DaemonConfig` from a TOML file at `path`, then validates it.
    ///
    /// # Errors
    /// Returns [`ConfigError::Io`] if the file cannot be read,
    /// [`ConfigError::TooLarge`] if it exceeds [`MAX_CONFIG_FILE_SIZE`],
    /// [`ConfigError::Parse`] if it is not valid TOML, or
    /// [`ConfigError::Invalid`] if a field fails validation.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let bytes = fs::read(path).map_err(|err| ConfigError::Io(err.to_string()))?;
        if bytes.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::TooLarge(MAX_CONFIG_FILE_SIZE));
        }
        let content = std::str::from_utf8(&bytes)
            .map_err(|_| ConfigError::Parse("configuration file must be utf-8".to_string()))?;
        let config: Self = toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates every field against its documented bound.
    ///
    /// # Errors
    /// Returns [`ConfigError::Invalid`] naming the first field found to be
    /// out of bounds.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(MIN_WORKER_COUNT..=MAX_WORKER_COUNT).contains(&self.worker_count) {
            return Err(ConfigError::Invalid(format!(
                "worker_count must be between {MIN_WORKER_COUNT} and {MAX_WORKER_COUNT}"
            )));
        }
        if self.request_queue_capacity < self.worker_count {
            return Err(ConfigError::Invalid(
                "request_queue_capacity must be >= worker_count".to_string(),
            ));
        }
        if !(MIN_MAX_CONNECTIONS..=MAX_MAX_CONNECTIONS).contains(&self.max_connections) {
            return Err(ConfigError::Invalid(format!(
                "max_connections must be between {MIN_MAX_CONNECTIONS} and {MAX_MAX_CONNECTIONS}"
            )));
        }
        if !(MIN_MAX_MESSAGE_BYTES..=MAX_MAX_MESSAGE_BYTES).contains(&self.max_message_bytes) {
            return Err(ConfigError::Invalid(format!(
                "max_message_bytes must be between {MIN_MAX_MESSAGE_BYTES} and {MAX_MAX_MESSAGE_BYTES}"
            )));
        }
        if !(MIN_REQUEST_TIMEOUT_MS..=MAX_REQUEST_TIMEOUT_MS).contains(&self.request_timeout_ms) {
            return Err(ConfigError::Invalid(format!(
                "request_timeout_ms must be between {MIN_REQUEST_TIMEOUT_MS} and {MAX_REQUEST_TIMEOUT_MS}"
            )));
        }
        if self.render_ttl_ms > MAX_RENDER_TTL_MS {
            return Err(ConfigError::Invalid(format!(
                "render_ttl_ms must be <= {MAX_RENDER_TTL_MS}"
            )));
        }
        if self.render_max_total_bytes == 0 || self.render_max_total_bytes > MAX_RENDER_MAX_TOTAL_BYTES {
            return Err(ConfigError::Invalid(format!(
                "render_max_total_bytes must be between 1 and {MAX_RENDER_MAX_TOTAL_BYTES}"
            )));
        }
        if self.render_sweep_interval_ms < MIN_RENDER_SWEEP_INTERVAL_MS {
            return Err(ConfigError::Invalid(format!(
                "render_sweep_interval_ms must be >= {MIN_RENDER_SWEEP_INTERVAL_MS}"
            )));
        }
        if self.session_drain_deadline_ms < MIN_SESSION_DRAIN_DEADLINE_MS {
            return Err(ConfigError::Invalid(format!(
                "session_drain_deadline_ms must be >= {MIN_SESSION_DRAIN_DEADLINE_MS}"
            )));
        }
        if self.session_outbound_channel_depth < MIN_SESSION_OUTBOUND_CHANNEL_DEPTH {
            return Err(ConfigError::Invalid(format!(
                "session_outbound_channel_depth must be >= {MIN_SESSION_OUTBOUND_CHANNEL_DEPTH}"
            )));
        }
        if self.socket_path.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("socket_path must not be empty".to_string()));
        }
        if self.render_dir.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("render_dir must not be empty".to_string()));
        }
        Ok(())
    }
}
