// crates/voxeld-server/src/stats.rs
// ============================================================================
// Module: Daemon Stats
// Description: Shared atomic counters backing the `status` method.
// Purpose: Let Acceptor/WorkerPool/Session update live counts without a
//          lock, and let handlers.rs read a consistent snapshot.
// Dependencies: std::sync::atomic
// ============================================================================

use std::sync::atomic::AtomicU64;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

/// Shared, lock-free counters read by the `status` method and written by
/// the Acceptor, Worker Pool, and Sessions as work moves through the
/// daemon.
#[derive(Debug, Default)]
pub struct DaemonStats {
    /// Current number of live Sessions.
    active_connections: AtomicUsize,
    /// Current number of items sitting in the worker queue.
    queue_depth: AtomicUsize,
    /// Current number of workers in the `Executing` state.
    workers_busy: AtomicUsize,
    /// Unix-epoch milliseconds the Supervisor entered its run loop.
    started_at_ms: AtomicU64,
}

/// A point-in-time snapshot of [`DaemonStats`], returned by the `status`
/// method.
#[derive(Debug, Clone, serde::Serialize)]
pub struct StatsSnapshot {
    /// Milliseconds since the daemon entered its run loop.
    pub uptime_ms: u64,
    /// Current live connection count.
    pub active_connections: usize,
    /// Current worker queue depth.
    pub queue_depth: usize,
    /// Current number of busy workers.
    pub workers_busy: usize,
}

impl DaemonStats {
    /// Builds a fresh, zeroed stats block.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the moment the run loop started, for uptime reporting.
    pub fn mark_started(&self) {
        self.started_at_ms.store(now_ms(), Ordering::Relaxed);
    }

    /// Increments the live connection count.
    pub fn connection_opened(&self) {
        self.active_connections.fetch_add(1, Ordering::Relaxed);
    }

    /// Decrements the live connection count.
    pub fn connection_closed(&self) {
        self.active_connections.fetch_sub(1, Ordering::Relaxed);
    }

    /// Sets the current worker queue depth.
    pub fn set_queue_depth(&self, depth: usize) {
        self.queue_depth.store(depth, Ordering::Relaxed);
    }

    /// Marks one worker as entering the `Executing` state.
    pub fn worker_started(&self) {
        self.workers_busy.fetch_add(1, Ordering::Relaxed);
    }

    /// Marks one worker as leaving the `Executing` state.
    pub fn worker_finished(&self) {
        self.workers_busy.fetch_sub(1, Ordering::Relaxed);
    }

    /// Returns the current active connection count.
    #[must_use]
    pub fn connections(&self) -> usize {
        self.active_connections.load(Ordering::Relaxed)
    }

    /// Takes a consistent point-in-time snapshot of all counters.
    #[must_use]
    pub fn snapshot(&self) -> StatsSnapshot {
        let started_at_ms = self.started_at_ms.load(Ordering::Relaxed);
        let uptime_ms = if started_at_ms == 0 {
            0
        } else {
            now_ms().saturating_sub(started_at_ms)
        };
        StatsSnapshot {
            uptime_ms,
            active_connections: self.active_connections.load(Ordering::Relaxed),
            queue_depth: self.queue_depth.load(Ordering::Relaxed),
            workers_busy: self.workers_busy.load(Ordering::Relaxed),
        }
    }
}

/// Current Unix-epoch milliseconds.
pub(crate) fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::DaemonStats;

    #[test]
    fn connection_counter_round_trips() {
        let stats = DaemonStats::new();
        stats.connection_opened();
        stats.connection_opened();
        stats.connection_closed();
        assert_eq!(stats.connections(), 1);
    }

    #[test]
    fn uptime_is_zero_before_mark_started() {
        let stats = DaemonStats::new();
        assert_eq!(stats.snapshot().uptime_ms, 0);
    }
}
