// crates/voxeld-config/src/lib.rs
// ============================================================================
// Module: Voxeld Config
// Description: DaemonConfig model, validation, and environment overlay.
// Purpose: Give the daemon one validated, immutable-after-construction
//          configuration value built from a TOML file and/or environment.
// Dependencies: serde, serde_json, thiserror, toml
// ============================================================================

//! ## Overview
//!
//! This crate owns `DaemonConfig`: the values a caller must supply before
//! starting the daemon core. Loading a config file and parsing CLI flags is
//! explicitly out of scope for the core itself; this crate only validates
//! whatever `DaemonConfig` it is handed and optionally builds one from a
//! TOML file plus the environment variables the surrounding CLI loader
//! recognizes.

#![forbid(unsafe_code)]

pub mod config;
pub mod env;
pub mod error;

pub use config::DaemonConfig;
pub use error::ConfigError;

#[cfg(test)]
mod tests;
