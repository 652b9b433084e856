// crates/voxeld-cli/src/main.rs
// ============================================================================
// Module: Voxeld CLI
// Description: Thin environment-variable-driven bootstrapper for the
//              daemon core. No flag parsing (§1 Non-goals).
// Purpose: Build a DaemonConfig, construct the in-memory scene, and run
//          the Supervisor to completion.
// Dependencies: tokio, voxeld-config, voxeld-core, voxeld-server
// ============================================================================

use std::io::Write as _;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use voxeld_config::env::apply_env_overlay;
use voxeld_config::DaemonConfig;
use voxeld_core::InMemoryScene;
use voxeld_core::SharedScene;
use voxeld_server::telemetry::AuditSink;
use voxeld_server::telemetry::FileAuditSink;
use voxeld_server::telemetry::StderrAuditSink;

/// Environment variable naming an optional base TOML config file, loaded
/// before the `GOXEL_*` overlay of §6 is applied.
const CONFIG_PATH_VAR: &str = "VOXELD_CONFIG_PATH";
/// Environment variable naming an optional audit log file; stderr is used
/// when unset.
const AUDIT_LOG_PATH_VAR: &str = "VOXELD_AUDIT_LOG_PATH";

#[tokio::main]
async fn main() -> ExitCode {
    let config = match load_config() {
        Ok(config) => config,
        Err(message) => {
            let _ = writeln!(std::io::stderr(), "voxeld: {message}");
            return ExitCode::FAILURE;
        }
    };

    let audit = build_audit_sink();
    let scene = SharedScene::new(InMemoryScene::default());

    match voxeld_server::supervisor::run(config, scene, audit).await {
        Ok(exit_code) => u8::try_from(exit_code).map(ExitCode::from).unwrap_or(ExitCode::FAILURE),
        Err(err) => {
            let _ = writeln!(std::io::stderr(), "voxeld: {err}");
            ExitCode::FAILURE
        }
    }
}

/// Loads an optional base TOML file named by [`CONFIG_PATH_VAR`], then
/// overlays the `GOXEL_*` environment variables on top, then validates.
fn load_config() -> Result<DaemonConfig, String> {
    let base = match std::env::var(CONFIG_PATH_VAR) {
        Ok(path) if !path.is_empty() => {
            DaemonConfig::load(&PathBuf::from(path)).map_err(|err| format!("loading config: {err}"))?
        }
        _ => DaemonConfig::default(),
    };
    let overlaid = apply_env_overlay(base).map_err(|err| format!("applying environment overlay: {err}"))?;
    overlaid.validate().map_err(|err| format!("invalid configuration: {err}"))?;
    Ok(overlaid)
}

/// Builds the audit sink: a [`FileAuditSink`] if [`AUDIT_LOG_PATH_VAR`] is
/// set and openable, otherwise [`StderrAuditSink`].
fn build_audit_sink() -> Arc<dyn AuditSink> {
    if let Ok(path) = std::env::var(AUDIT_LOG_PATH_VAR) {
        if !path.is_empty() {
            if let Ok(sink) = FileAuditSink::new(&PathBuf::from(path)) {
                return Arc::new(sink);
            }
        }
    }
    Arc::new(StderrAuditSink)
}
