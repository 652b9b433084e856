// crates/voxeld-server/src/telemetry.rs
// ============================================================================
// Module: Telemetry
// Description: Structured audit-event sinks for lifecycle, session, and
//              dispatch events (§4.11).
// Purpose: Give every subsystem one place to emit observability events
//          without ever blocking request handling beyond a bounded write.
// Dependencies: serde, serde_json, std::fs, std::sync::Mutex
// ============================================================================

use std::fs::File;
use std::fs::OpenOptions;
use std::io::Write as _;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Mutex;

use serde::Serialize;

use crate::client_id::ClientId;

/// A structured lifecycle audit event (startup, shutdown, signal received).
#[derive(Debug, Clone, Serialize)]
pub struct LifecycleEvent {
    /// The lifecycle phase, e.g. `"startup"`, `"shutdown"`, `"sigterm"`.
    pub phase: &'static str,
    /// A short human-readable detail string.
    pub detail: String,
}

/// A structured session audit event (accepted, closed).
#[derive(Debug, Clone, Serialize)]
pub struct SessionEvent {
    /// The connection this event concerns.
    pub client_id: u64,
    /// The session transition, e.g. `"accepted"`, `"closed"`.
    pub transition: &'static str,
    /// A short human-readable detail string.
    pub detail: String,
}

/// A structured dispatch audit event (one per completed request).
#[derive(Debug, Clone, Serialize)]
pub struct DispatchEvent {
    /// The connection that issued the request.
    pub client_id: u64,
    /// The method name invoked.
    pub method: String,
    /// The concurrency class the method was registered under.
    pub concurrency: &'static str,
    /// `"ok"`, `"error"`, or `"timeout"`.
    pub outcome: &'static str,
    /// Wall-clock duration of the invocation, in milliseconds.
    pub duration_ms: u64,
}

impl SessionEvent {
    /// Builds a `"accepted"` event for `client_id`.
    #[must_use]
    pub fn accepted(client_id: ClientId) -> Self {
        Self {
            client_id: client_id.value(),
            transition: "accepted",
            detail: String::new(),
        }
    }

    /// Builds a `"closed"` event for `client_id` with `detail`.
    #[must_use]
    pub fn closed(client_id: ClientId, detail: impl Into<String>) -> Self {
        Self {
            client_id: client_id.value(),
            transition: "closed",
            detail: detail.into(),
        }
    }
}

// ============================================================================
// SECTION: Trait
// ============================================================================

/// Audit sink consulted at Supervisor startup/shutdown, Session
/// accept/close, and Worker dispatch completion.
///
/// Every method defaults to a no-op so a sink only needs to implement the
/// categories it cares about.
pub trait AuditSink: Send + Sync {
    /// Records a lifecycle transition.
    fn record_lifecycle(&self, _event: &LifecycleEvent) {}

    /// Records a session transition.
    fn record_session(&self, _event: &SessionEvent) {}

    /// Records a completed dispatch.
    fn record_dispatch(&self, _event: &DispatchEvent) {}

    /// Reopens any underlying log handle. Called on SIGHUP; sinks that
    /// hold no file handle can ignore this.
    fn reopen(&self) {}
}

/// Writes one structured JSON line per event to stderr.
#[derive(Debug, Default)]
pub struct StderrAuditSink;

impl AuditSink for StderrAuditSink {
    fn record_lifecycle(&self, event: &LifecycleEvent) {
        write_json_line(&mut std::io::stderr(), event);
    }

    fn record_session(&self, event: &SessionEvent) {
        write_json_line(&mut std::io::stderr(), event);
    }

    fn record_dispatch(&self, event: &DispatchEvent) {
        write_json_line(&mut std::io::stderr(), event);
    }
}

/// Writes one structured JSON line per event to an append-only file,
/// reopened on [`AuditSink::reopen`] (SIGHUP).
pub struct FileAuditSink {
    /// The log file path, retained so `reopen` can reopen it.
    path: PathBuf,
    /// The currently open file handle.
    file: Mutex<File>,
}

impl FileAuditSink {
    /// Opens `path` in append mode, creating it if absent.
    ///
    /// # Errors
    /// Returns an error if the file cannot be opened.
    pub fn new(path: &Path) -> std::io::Result<Self> {
        let file = open_append(path)?;
        Ok(Self {
            path: path.to_path_buf(),
            file: Mutex::new(file),
        })
    }
}

/// Opens `path` for append, creating it if it does not exist.
fn open_append(path: &Path) -> std::io::Result<File> {
    OpenOptions::new().create(true).append(true).open(path)
}

impl AuditSink for FileAuditSink {
    fn record_lifecycle(&self, event: &LifecycleEvent) {
        self.write_locked(event);
    }

    fn record_session(&self, event: &SessionEvent) {
        self.write_locked(event);
    }

    fn record_dispatch(&self, event: &DispatchEvent) {
        self.write_locked(event);
    }

    fn reopen(&self) {
        if let Ok(reopened) = open_append(&self.path) {
            if let Ok(mut guard) = self.file.lock() {
                *guard = reopened;
            }
        }
    }
}

impl FileAuditSink {
    /// Serializes `event` and appends it under the file lock, best-effort.
    fn write_locked(&self, event: &impl Serialize) {
        if let Ok(mut file) = self.file.lock() {
            write_json_line(&mut *file, event);
        }
    }
}

/// No-op sink for tests and deployments that want silence.
#[derive(Debug, Default)]
pub struct NoopAuditSink;

impl AuditSink for NoopAuditSink {}

/// Serializes `event` as one JSON line and writes it to `writer`,
/// best-effort: a serialization or write failure is silently dropped
/// rather than panicking or blocking the caller.
fn write_json_line(writer: &mut impl Write, event: &impl Serialize) {
    if let Ok(payload) = serde_json::to_string(event) {
        let _ = writeln!(writer, "{payload}");
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, reason = "test assertions read better unwrapped")]

    use std::fs;

    use super::AuditSink;
    use super::FileAuditSink;
    use super::LifecycleEvent;
    use super::NoopAuditSink;
    use super::StderrAuditSink;

    #[test]
    fn noop_sink_accepts_every_event_kind_without_panicking() {
        let sink = NoopAuditSink;
        sink.record_lifecycle(&LifecycleEvent {
            phase: "startup",
            detail: String::new(),
        });
        sink.reopen();
    }

    #[test]
    fn stderr_sink_does_not_panic_on_record() {
        let sink = StderrAuditSink;
        sink.record_lifecycle(&LifecycleEvent {
            phase: "startup",
            detail: "test".to_string(),
        });
    }

    #[test]
    fn file_sink_appends_one_line_per_event() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audit.log");
        let sink = FileAuditSink::new(&path).unwrap();
        sink.record_lifecycle(&LifecycleEvent {
            phase: "startup",
            detail: "a".to_string(),
        });
        sink.record_lifecycle(&LifecycleEvent {
            phase: "shutdown",
            detail: "b".to_string(),
        });
        let contents = fs::read_to_string(&path).unwrap();
        assert_eq!(contents.lines().count(), 2);
    }

    #[test]
    fn file_sink_reopen_survives_external_truncation() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audit.log");
        let sink = FileAuditSink::new(&path).unwrap();
        sink.record_lifecycle(&LifecycleEvent {
            phase: "startup",
            detail: String::new(),
        });
        fs::remove_file(&path).unwrap();
        sink.reopen();
        sink.record_lifecycle(&LifecycleEvent {
            phase: "startup",
            detail: String::new(),
        });
        assert!(path.exists());
    }
}
