// crates/voxeld-server/src/supervisor.rs
// ============================================================================
// Module: Supervisor
// Description: Process lifecycle: config validation, pidfile handling,
//              signal installation, component startup in order, the run
//              loop, and graceful shutdown in reverse order (§4.9).
// Purpose: The one place that knows the full startup/shutdown sequence;
//          every other module only knows its own piece of it.
// Dependencies: tokio (signal, time, fs), voxeld-config, voxeld-core,
//               crate::{acceptor, worker_pool, session, render_store,
//               registry, stats, telemetry, handlers, error}
// Grounding: signal future pattern adapted from the shutdown-on-SIGTERM
//            idiom in other_examples' daemon IPC module (no teacher
//            precedent; the teacher is a stdio MCP server with no signal
//            handling of its own).
// ============================================================================

use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::signal::unix::signal;
use tokio::signal::unix::SignalKind;
use voxeld_config::DaemonConfig;
use voxeld_core::SharedScene;

use crate::acceptor;
use crate::error::DaemonError;
use crate::handlers::HandlerContext;
use crate::registry::MethodRegistry;
use crate::render_store::RenderStore;
use crate::session::SessionDeps;
use crate::stats::DaemonStats;
use crate::telemetry::AuditSink;
use crate::telemetry::LifecycleEvent;
use crate::worker_pool::WorkerPool;

/// Process exit code for a clean shutdown.
pub const EXIT_OK: i32 = 0;
/// Process exit code when the drain deadline forced termination.
pub const EXIT_DRAIN_FORCED: i32 = 1;

/// Brings up every daemon-core component in dependency order, runs until a
/// shutdown signal (SIGTERM, SIGINT, or the `shutdown` RPC method) is
/// observed, then tears every component down in reverse order.
///
/// # Errors
/// Returns [`DaemonError::Config`] if `config` fails validation, or
/// [`DaemonError::Lifecycle`] if the pidfile or socket cannot be claimed.
pub async fn run(config: DaemonConfig, scene: SharedScene, audit: Arc<dyn AuditSink>) -> Result<i32, DaemonError> {
    config.validate().map_err(|err| DaemonError::Config(err.to_string()))?;

    if let Some(pidfile_path) = &config.pidfile_path {
        claim_pidfile(pidfile_path).await?;
    }
    audit.record_lifecycle(&LifecycleEvent {
        phase: "startup",
        detail: format!("binding {}", config.socket_path.display()),
    });

    let stats = Arc::new(DaemonStats::new());
    stats.mark_started();

    let render_store = Arc::new(RenderStore::new(config.render_dir.clone(), config.render_max_total_bytes));
    render_store.cleanup_orphans(config.render_ttl_ms).await;
    let reaper = crate::render_store::spawn_reaper(Arc::clone(&render_store), config.render_sweep_interval_ms);

    let registry = Arc::new(MethodRegistry::build(config.shutdown_method_enabled));
    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);

    let ctx = Arc::new(HandlerContext {
        render_store: Arc::clone(&render_store),
        registry: Arc::clone(&registry),
        stats: Arc::clone(&stats),
        shutdown: shutdown_tx.clone(),
        protocol_version: "2.0",
        daemon_version: env!("CARGO_PKG_VERSION"),
        render_ttl_ms: config.render_ttl_ms,
    });

    let worker_pool = WorkerPool::spawn(
        config.worker_count,
        config.request_queue_capacity,
        scene,
        Arc::clone(&ctx),
        Arc::clone(&stats),
        Duration::from_millis(config.request_timeout_ms),
    );

    let session_deps = Arc::new(SessionDeps {
        registry,
        pool: worker_pool.handle(),
        stats: Arc::clone(&stats),
        audit: Arc::clone(&audit),
        max_message_bytes: config.max_message_bytes,
        outbound_channel_depth: config.session_outbound_channel_depth,
        drain_deadline: Duration::from_millis(config.session_drain_deadline_ms),
    });

    let listener = acceptor::bind(&config.socket_path).await?;
    let acceptor_task = tokio::spawn(acceptor::run(
        listener,
        config.max_connections,
        shutdown_rx.clone(),
        Arc::clone(&stats),
        session_deps,
    ));

    let exit_code = wait_for_shutdown(shutdown_tx.clone(), shutdown_tx.subscribe(), Arc::clone(&audit)).await;

    let acceptor_result = tokio::time::timeout(
        Duration::from_millis(config.session_drain_deadline_ms).saturating_add(Duration::from_secs(1)),
        acceptor_task,
    )
    .await;
    let exit_code = if acceptor_result.is_err() { EXIT_DRAIN_FORCED } else { exit_code };

    worker_pool.shutdown().await;
    reaper.abort();
    render_store.sweep().await;

    acceptor::unlink(&config.socket_path).await?;
    if let Some(pidfile_path) = &config.pidfile_path {
        release_pidfile(pidfile_path).await;
    }

    audit.record_lifecycle(&LifecycleEvent {
        phase: "shutdown",
        detail: "all components drained".to_string(),
    });

    Ok(exit_code)
}

/// Installs SIGTERM/SIGINT/SIGHUP/SIGPIPE handlers and waits for either a
/// terminating signal or the `shutdown_watch` channel (observed by the
/// `shutdown` RPC method) to fire. SIGHUP reopens the audit sink without
/// ending the loop; SIGPIPE is observed and ignored (a broken pipe
/// surfaces through a write error instead, per §4.9).
async fn wait_for_shutdown(shutdown_tx: tokio::sync::watch::Sender<bool>, mut shutdown_watch: tokio::sync::watch::Receiver<bool>, audit: Arc<dyn AuditSink>) -> i32 {
    let Ok(mut sigterm) = signal(SignalKind::terminate()) else {
        return EXIT_OK;
    };
    let Ok(mut sigint) = signal(SignalKind::interrupt()) else {
        return EXIT_OK;
    };
    let Ok(mut sighup) = signal(SignalKind::hangup()) else {
        return EXIT_OK;
    };
    let Ok(mut sigpipe) = signal(SignalKind::pipe()) else {
        return EXIT_OK;
    };

    loop {
        tokio::select! {
            _ = sigterm.recv() => {
                audit.record_lifecycle(&LifecycleEvent { phase: "sigterm", detail: String::new() });
                break;
            }
            _ = sigint.recv() => {
                audit.record_lifecycle(&LifecycleEvent { phase: "sigint", detail: String::new() });
                break;
            }
            _ = sighup.recv() => {
                audit.record_lifecycle(&LifecycleEvent { phase: "sighup", detail: "reopening audit sink".to_string() });
                audit.reopen();
            }
            _ = sigpipe.recv() => {}
            changed = shutdown_watch.changed() => {
                if changed.is_err() || *shutdown_watch.borrow() {
                    audit.record_lifecycle(&LifecycleEvent { phase: "rpc_shutdown", detail: String::new() });
                    break;
                }
            }
        }
    }
    let _ = shutdown_tx.send(true);
    EXIT_OK
}

/// Writes the current process id to `pidfile_path` via a create-exclusive
/// temp file followed by an atomic rename, refusing to start if an
/// existing pidfile names a process that is still alive.
///
/// # Errors
/// Returns [`DaemonError::Lifecycle`] if a live process already holds the
/// pidfile, or if the file cannot be written.
async fn claim_pidfile(pidfile_path: &Path) -> Result<(), DaemonError> {
    if let Ok(existing) = tokio::fs::read_to_string(pidfile_path).await {
        if let Ok(existing_pid) = existing.trim().parse::<u32>() {
            if process_is_alive(existing_pid) {
                return Err(DaemonError::Lifecycle(format!(
                    "pidfile {} names running process {existing_pid}",
                    pidfile_path.display()
                )));
            }
        }
    }
    let tmp_path = tmp_sibling(pidfile_path);
    tokio::fs::write(&tmp_path, std::process::id().to_string())
        .await
        .map_err(|err| DaemonError::Lifecycle(format!("writing pidfile: {err}")))?;
    tokio::fs::rename(&tmp_path, pidfile_path)
        .await
        .map_err(|err| DaemonError::Lifecycle(format!("renaming pidfile into place: {err}")))?;
    Ok(())
}

/// Removes the pidfile at shutdown, best-effort.
async fn release_pidfile(pidfile_path: &Path) {
    let _ = tokio::fs::remove_file(pidfile_path).await;
}

/// A `.tmp`-suffixed sibling path used for the create-then-rename dance.
fn tmp_sibling(path: &Path) -> PathBuf {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(format!(".{}.tmp", std::process::id()));
    PathBuf::from(tmp)
}

/// Checks whether `pid` names a live process, via `/proc/<pid>`.
#[must_use]
fn process_is_alive(pid: u32) -> bool {
    Path::new(&format!("/proc/{pid}")).exists()
}
