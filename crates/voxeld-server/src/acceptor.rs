// crates/voxeld-server/src/acceptor.rs
// ============================================================================
// Module: Acceptor
// Description: Binds the Unix domain socket, detects/clears a stale socket
//              left by a crashed prior instance, enforces max_connections,
//              and spawns one Session per accepted connection (§4.4, §4.9).
// Purpose: Keep socket lifecycle and the connection cap in one place,
//          separate from per-connection framing and dispatch.
// Dependencies: tokio (net, fs), std::os::unix::fs::PermissionsExt
// ============================================================================

use std::io;
use std::os::unix::fs::FileTypeExt;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;
use std::sync::Arc;

use tokio::net::UnixListener;
use tokio::net::UnixStream;
use tokio::sync::watch;

use crate::client_id::ClientId;
use crate::client_id::ClientIdGenerator;
use crate::error::DaemonError;
use crate::framing;
use crate::session;
use crate::session::SessionDeps;
use crate::stats::DaemonStats;

/// Socket file mode applied after bind: owner and group read/write, no
/// world access.
const SOCKET_MODE: u32 = 0o660;

/// Binds `socket_path`, clearing a stale socket (one with no listening
/// peer) left behind by a crashed prior instance, and applies
/// [`SOCKET_MODE`].
///
/// # Errors
/// Returns [`DaemonError::Lifecycle`] if the path exists and is either a
/// live socket (another instance is already listening) or a non-socket
/// file, or if binding/chmod otherwise fails.
pub async fn bind(socket_path: &Path) -> Result<UnixListener, DaemonError> {
    if let Some(parent) = socket_path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|err| DaemonError::Lifecycle(format!("creating socket directory {}: {err}", parent.display())))?;
    }

    match tokio::fs::symlink_metadata(socket_path).await {
        Ok(metadata) => {
            if !metadata.file_type().is_socket() {
                return Err(DaemonError::Lifecycle(format!(
                    "{} exists and is not a socket",
                    socket_path.display()
                )));
            }
            match UnixStream::connect(socket_path).await {
                Ok(_live) => {
                    return Err(DaemonError::Lifecycle(format!(
                        "{} is already in use by a running instance",
                        socket_path.display()
                    )))
                }
                Err(_refused) => {
                    tokio::fs::remove_file(socket_path)
                        .await
                        .map_err(|err| DaemonError::Lifecycle(format!("removing stale socket: {err}")))?;
                }
            }
        }
        Err(err) if err.kind() == io::ErrorKind::NotFound => {}
        Err(err) => return Err(DaemonError::Lifecycle(format!("inspecting {}: {err}", socket_path.display()))),
    }

    let listener = UnixListener::bind(socket_path)
        .map_err(|err| DaemonError::Lifecycle(format!("binding {}: {err}", socket_path.display())))?;
    let permissions = std::fs::Permissions::from_mode(SOCKET_MODE);
    tokio::fs::set_permissions(socket_path, permissions)
        .await
        .map_err(|err| DaemonError::Lifecycle(format!("chmod {}: {err}", socket_path.display())))?;
    Ok(listener)
}

/// Removes the socket file, ignoring a `NotFound` (already gone).
pub async fn unlink(socket_path: &Path) -> Result<(), DaemonError> {
    match tokio::fs::remove_file(socket_path).await {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(err) => Err(DaemonError::Lifecycle(format!("removing {}: {err}", socket_path.display()))),
    }
}

/// Accepts connections until `shutdown_rx` observes `true`, enforcing
/// `max_connections` by immediately closing any connection beyond the cap
/// with an `Overloaded` error, and spawning a [`session::run`] task for
/// every connection admitted.
///
/// Every spawned Session is tracked in a [`tokio::task::JoinSet`]; once the
/// accept loop stops, this function awaits every outstanding Session
/// (each internally bounded by its own `drain_deadline`) before returning,
/// so the caller can treat this function's completion as "no connection
/// work remains" (§4.9's shutdown ordering).
pub async fn run(listener: UnixListener, max_connections: usize, mut shutdown_rx: watch::Receiver<bool>, stats: Arc<DaemonStats>, deps: Arc<SessionDeps>) {
    let client_ids = ClientIdGenerator::new();
    let mut sessions = tokio::task::JoinSet::new();
    loop {
        tokio::select! {
            biased;
            changed = shutdown_rx.changed() => {
                if changed.is_err() || *shutdown_rx.borrow() {
                    break;
                }
            }
            accepted = listener.accept() => {
                let Ok((stream, _addr)) = accepted else {
                    continue;
                };
                let client_id = client_ids.next();
                if stats.connections() >= max_connections {
                    reject_over_capacity(stream).await;
                    continue;
                }
                let deps = Arc::clone(&deps);
                let shutdown_rx = shutdown_rx.clone();
                sessions.spawn(session::run(stream, client_id, shutdown_rx, deps));
            }
        }
    }
    while sessions.join_next().await.is_some() {}
}

/// Writes a single `Overloaded` error response (id `null`, since no
/// request has been read yet) and drops the connection without ever
/// constructing a Session.
async fn reject_over_capacity(mut stream: UnixStream) {
    let response = voxeld_protocol::RpcResponse::error(voxeld_protocol::Id::Null, DaemonError::Overloaded.to_rpc_error());
    let payload = response.to_value().to_string();
    let _ = framing::write_message(&mut stream, &payload).await;
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, reason = "test assertions read better unwrapped")]

    use super::bind;
    use super::unlink;

    #[tokio::test]
    async fn bind_creates_a_socket_with_the_expected_mode() {
        let dir = tempfile::tempdir().unwrap();
        let socket_path = dir.path().join("voxeld.sock");
        let listener = bind(&socket_path).await.unwrap();
        let metadata = std::fs::metadata(&socket_path).unwrap();
        use std::os::unix::fs::PermissionsExt;
        assert_eq!(metadata.permissions().mode() & 0o777, 0o660);
        drop(listener);
        unlink(&socket_path).await.unwrap();
        assert!(!socket_path.exists());
    }

    #[tokio::test]
    async fn bind_clears_a_stale_socket_left_by_a_dead_process() {
        let dir = tempfile::tempdir().unwrap();
        let socket_path = dir.path().join("voxeld.sock");
        {
            let listener = bind(&socket_path).await.unwrap();
            drop(listener);
        }
        // The file is still present (bind doesn't unlink on drop); a
        // second bind must detect it has no listener and reclaim it.
        let listener = bind(&socket_path).await.unwrap();
        drop(listener);
    }

    #[tokio::test]
    async fn bind_refuses_a_plain_file_in_place_of_a_socket() {
        let dir = tempfile::tempdir().unwrap();
        let socket_path = dir.path().join("voxeld.sock");
        std::fs::write(&socket_path, b"not a socket").unwrap();
        let result = bind(&socket_path).await;
        assert!(result.is_err());
    }
}
