// crates/voxeld-config/src/error.rs
// ============================================================================
// Module: Config Error
// Description: Failure taxonomy for loading and validating DaemonConfig.
// Purpose: Fail closed and specifically: every invalid field names itself.
// Dependencies: thiserror
// ============================================================================

use thiserror::Error;

/// A failure loading or validating a [`crate::DaemonConfig`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A field failed its own validation; the message names the field and
    /// the bound it violated.
    #[error("invalid configuration: {0}")]
    Invalid(String),
    /// The config file could not be read from disk.
    #[error("failed to read configuration file: {0}")]
    Io(String),
    /// The config file exceeded the maximum accepted size.
    #[error("configuration file exceeds the {0}-byte size limit")]
    TooLarge(usize),
    /// The config file's contents were not valid TOML.
    #[error("failed to parse configuration: {0}")]
    Parse(String),
    /// An environment variable override had a value that could not be
    /// interpreted as the expected type.
    #[error("invalid value for environment variable {0}: {1}")]
    InvalidEnvVar(&'static str, String),
}
