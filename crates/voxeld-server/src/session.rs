// crates/voxeld-server/src/session.rs
// ============================================================================
// Module: Session
// Description: Per-connection state machine: frame reading, request
//              fan-out to the worker pool, batch assembly, and the
//              drain-on-shutdown sequence (§4.5, §4.7).
// Purpose: Give each accepted connection its own read/write split so a
//          slow client never blocks another, while still bounding how much
//          outbound backlog one connection can build up.
// Dependencies: tokio (net, sync, time), voxeld-protocol, crate::framing,
//               crate::worker_pool, crate::registry, crate::telemetry
// ============================================================================

use std::sync::Arc;
use std::time::Duration;

use tokio::io::BufReader;
use tokio::net::UnixStream;
use tokio::sync::mpsc;
use tokio::sync::oneshot;
use tokio::sync::watch;
use voxeld_protocol::codec::assemble_batch;
use voxeld_protocol::codec::codec_error_response;
use voxeld_protocol::codec::parse_error_response;
use voxeld_protocol::Id;
use voxeld_protocol::RpcMessage;
use voxeld_protocol::RpcResponse;

use crate::client_id::ClientId;
use crate::error::DaemonError;
use crate::framing;
use crate::registry::MethodRegistry;
use crate::stats::DaemonStats;
use crate::telemetry::AuditSink;
use crate::telemetry::SessionEvent;
use crate::worker_pool::EnqueueFailure;
use crate::worker_pool::WorkItem;
use crate::worker_pool::WorkerPoolHandle;

/// Everything a Session needs that outlives the connection itself.
pub struct SessionDeps {
    /// The method registry, for resolving a request's method name.
    pub registry: Arc<MethodRegistry>,
    /// A handle to submit work to the worker pool.
    pub pool: WorkerPoolHandle,
    /// Live daemon counters.
    pub stats: Arc<DaemonStats>,
    /// The audit sink to record session transitions on.
    pub audit: Arc<dyn AuditSink>,
    /// Reject any single line larger than this.
    pub max_message_bytes: usize,
    /// Bound on how many outbound replies may be queued before backpressure.
    pub outbound_channel_depth: usize,
    /// How long to let in-flight requests finish after the read side ends.
    pub drain_deadline: Duration,
}

/// Runs one connection end to end: accepts work until EOF or a shutdown
/// signal, then drains in-flight requests before returning.
pub async fn run(stream: UnixStream, client_id: ClientId, shutdown_rx: watch::Receiver<bool>, deps: Arc<SessionDeps>) {
    deps.stats.connection_opened();
    deps.audit.record_session(&SessionEvent::accepted(client_id));

    let (read_half, write_half) = stream.into_split();
    let mut reader = BufReader::new(read_half);
    let (outbound_tx, outbound_rx) = mpsc::channel::<serde_json::Value>(deps.outbound_channel_depth.max(1));
    let write_handle = tokio::spawn(write_loop(write_half, outbound_rx));

    let close_reason = read_loop(&mut reader, client_id, shutdown_rx, &deps, &outbound_tx).await;

    drop(outbound_tx);
    let _ = tokio::time::timeout(deps.drain_deadline, write_handle).await;

    deps.stats.connection_closed();
    deps.audit.record_session(&SessionEvent::closed(client_id, close_reason));
}

/// Reads frames until EOF, a transport error, or a shutdown signal; spawns
/// one task per parsed line so a slow request never blocks reading the
/// next one. Returns a short human-readable reason for the caller's audit
/// log entry.
async fn read_loop(
    reader: &mut BufReader<tokio::net::unix::OwnedReadHalf>,
    client_id: ClientId,
    mut shutdown_rx: watch::Receiver<bool>,
    deps: &Arc<SessionDeps>,
    outbound_tx: &mpsc::Sender<serde_json::Value>,
) -> &'static str {
    let mut inflight: Vec<tokio::task::JoinHandle<()>> = Vec::new();
    let reason = loop {
        tokio::select! {
            biased;
            changed = shutdown_rx.changed() => {
                if changed.is_err() || *shutdown_rx.borrow() {
                    break "shutdown";
                }
            }
            line = framing::read_message(reader, deps.max_message_bytes) => {
                match line {
                    Ok(None) => break "eof",
                    Ok(Some(raw)) => {
                        if raw.trim().is_empty() {
                            continue;
                        }
                        let deps = Arc::clone(deps);
                        let outbound_tx = outbound_tx.clone();
                        inflight.push(tokio::spawn(async move {
                            process_line(raw, client_id, &deps, &outbound_tx).await;
                        }));
                        inflight.retain(|h| !h.is_finished());
                    }
                    Err(framing::FramingError::Oversized) => {
                        send(outbound_tx, parse_error_response("message exceeds max_message_bytes").to_value()).await;
                        break "oversized message";
                    }
                    Err(framing::FramingError::InvalidUtf8) => {
                        send(outbound_tx, parse_error_response("message is not valid utf-8").to_value()).await;
                        continue;
                    }
                    Err(framing::FramingError::Io(_err)) => break "transport error",
                }
            }
        }
    };

    let drain = async {
        for handle in inflight {
            let _ = handle.await;
        }
    };
    let _ = tokio::time::timeout(deps.drain_deadline, drain).await;
    reason
}

/// Parses one wire line and routes it: a malformed line gets an immediate
/// parse-error reply, a single message is dispatched directly, and a batch
/// fans every entry out concurrently before assembling one combined
/// response array (§6's batch example).
async fn process_line(raw: String, client_id: ClientId, deps: &SessionDeps, outbound_tx: &mpsc::Sender<serde_json::Value>) {
    let message = match RpcMessage::parse(&raw) {
        Ok(message) => message,
        Err(err) => {
            send(outbound_tx, codec_error_response(err).to_value()).await;
            return;
        }
    };
    match message {
        RpcMessage::Batch(items) => {
            let mut handles = Vec::with_capacity(items.len());
            for item in items {
                handles.push(tokio::spawn(dispatch_one(item, client_id, clone_deps(deps))));
            }
            let mut responses = Vec::with_capacity(handles.len());
            for handle in handles {
                responses.push(handle.await.ok().flatten());
            }
            if let Some(batch_value) = assemble_batch(responses) {
                send(outbound_tx, batch_value).await;
            }
        }
        single => {
            if let Some(response) = dispatch_one(single, client_id, clone_deps(deps)).await {
                send(outbound_tx, response.to_value()).await;
            }
        }
    }
}

/// A cheaply clonable view of the pieces `dispatch_one` needs, so a batch
/// item can be spawned onto its own task without borrowing `deps`.
struct DepsView {
    registry: Arc<MethodRegistry>,
    pool: WorkerPoolHandle,
}

fn clone_deps(deps: &SessionDeps) -> DepsView {
    DepsView {
        registry: Arc::clone(&deps.registry),
        pool: deps.pool.clone(),
    }
}

/// Dispatches one non-batch `RpcMessage`: resolves the method, enqueues it
/// on the worker pool, and (for a request) awaits its reply. Returns
/// `None` for a notification or for a nested batch item that is itself a
/// notification.
async fn dispatch_one(message: RpcMessage, client_id: ClientId, deps: DepsView) -> Option<RpcResponse> {
    match message {
        RpcMessage::Notification { method, params } => {
            if let Some(descriptor) = deps.registry.get(&method).copied() {
                let _ = deps.pool.try_enqueue(WorkItem {
                    client_id,
                    request_id: None,
                    descriptor,
                    params,
                    reply_tx: None,
                });
            }
            None
        }
        RpcMessage::Request { id, method, params } => Some(dispatch_request(id, method, params, client_id, &deps).await),
        RpcMessage::Batch(_) => {
            Some(RpcResponse::error(Id::Null, DaemonError::Protocol("nested batch".to_string()).to_rpc_error()))
        }
    }
}

/// Resolves and enqueues a single request, then awaits its reply.
async fn dispatch_request(id: Id, method: String, params: serde_json::Value, client_id: ClientId, deps: &DepsView) -> RpcResponse {
    let Some(descriptor) = deps.registry.get(&method).copied() else {
        return RpcResponse::error(id, DaemonError::MethodNotFound(method).to_rpc_error());
    };
    let (reply_tx, reply_rx) = oneshot::channel();
    let enqueue_result = deps.pool.try_enqueue(WorkItem {
        client_id,
        request_id: Some(id.clone()),
        descriptor,
        params,
        reply_tx: Some(reply_tx),
    });
    if let Err(failure) = enqueue_result {
        let error = match failure {
            EnqueueFailure::QueueFull => DaemonError::Overloaded,
            EnqueueFailure::Closed => DaemonError::Shutdown,
        };
        return RpcResponse::error(id, error.to_rpc_error());
    }
    match reply_rx.await {
        Ok(Ok(value)) => RpcResponse::success(id, value),
        Ok(Err(err)) => RpcResponse::error(id, err.to_rpc_error()),
        Err(_recv_error) => {
            RpcResponse::error(id, DaemonError::Execution("worker dropped the reply channel".to_string()).to_rpc_error())
        }
    }
}

/// Best-effort send onto the outbound channel; a full or closed channel
/// (the write side already gave up) silently drops the reply rather than
/// blocking or panicking.
async fn send(outbound_tx: &mpsc::Sender<serde_json::Value>, value: serde_json::Value) {
    let _ = outbound_tx.send(value).await;
}

/// Drains the outbound channel and writes one framed line per value until
/// the channel closes or a write fails.
async fn write_loop(mut writer: tokio::net::unix::OwnedWriteHalf, mut outbound_rx: mpsc::Receiver<serde_json::Value>) {
    while let Some(value) = outbound_rx.recv().await {
        let payload = value.to_string();
        if framing::write_message(&mut writer, &payload).await.is_err() {
            break;
        }
    }
}
