// crates/voxeld-server/src/error.rs
// ============================================================================
// Module: Daemon Error
// Description: Internal failure taxonomy (Transport/Protocol/Dispatch/
//              Execution/Lifecycle/Config) and its JSON-RPC mapping.
// Purpose: Give every subsystem one error type; only Lifecycle escapes the
//          process, everything else becomes a client-visible RpcError.
// Dependencies: thiserror, voxeld-protocol, voxeld-core
// ============================================================================

use thiserror::Error;
use voxeld_core::DomainError;
use voxeld_protocol::ErrorCode;
use voxeld_protocol::RpcError;

/// A failure occurring anywhere in the daemon core.
///
/// Per the error handling design, only [`DaemonError::Lifecycle`] escapes
/// the process (it is fatal at startup); every other variant is surfaced to
/// the originating client as a JSON-RPC error via
/// [`DaemonError::to_rpc_error`] and logged, never propagated across a
/// connection boundary.
#[derive(Debug, Error)]
pub enum DaemonError {
    /// A socket error, EOF, or oversized frame. Terminal for the connection.
    #[error("transport error: {0}")]
    Transport(String),
    /// Malformed JSON, wrong `jsonrpc` field, missing `method`, or an
    /// invalid batch shape.
    #[error("protocol error: {0}")]
    Protocol(String),
    /// The requested method is absent from the registry.
    #[error("method not found: {0}")]
    MethodNotFound(String),
    /// `params` failed the handler's own validation.
    #[error("invalid params: {0}")]
    InvalidParams(String),
    /// The worker queue was full at enqueue time.
    #[error("worker queue overloaded")]
    Overloaded,
    /// The daemon is draining and refuses new work.
    #[error("daemon is shutting down")]
    Shutdown,
    /// The handler exceeded `request_timeout_ms`.
    #[error("request timed out")]
    Timeout,
    /// The handler failed unexpectedly, including a caught panic.
    #[error("execution error: {0}")]
    Execution(String),
    /// A domain error forwarded verbatim from `SceneEngine`/`RenderStore`.
    #[error(transparent)]
    Domain(#[from] DomainError),
    /// A startup failure: bad config, address in use, scene init failed.
    /// Fatal; the process exits non-zero.
    #[error("lifecycle error: {0}")]
    Lifecycle(String),
    /// An invalid or malformed `DaemonConfig`. Fatal at load time via the
    /// same lifecycle path.
    #[error("config error: {0}")]
    Config(String),
}

impl DaemonError {
    /// Maps this error onto the JSON-RPC `(code, message)` pair a client
    /// should see. Domain errors pass their own stable code through
    /// unchanged; everything else maps onto the fixed codes of §4.2.
    #[must_use]
    pub fn to_rpc_error(&self) -> RpcError {
        match self {
            Self::Transport(msg) => RpcError::new(ErrorCode::ParseError, msg.clone()),
            Self::Protocol(msg) => RpcError::new(ErrorCode::InvalidRequest, msg.clone()),
            Self::MethodNotFound(msg) => RpcError::new(ErrorCode::MethodNotFound, msg.clone()),
            Self::InvalidParams(msg) => RpcError::new(ErrorCode::InvalidParams, msg.clone()),
            Self::Overloaded => RpcError::from_code(ErrorCode::Overloaded),
            Self::Shutdown => RpcError::from_code(ErrorCode::Shutdown),
            Self::Timeout => RpcError::from_code(ErrorCode::Timeout),
            Self::Execution(msg) => RpcError::new(ErrorCode::InternalError, msg.clone()),
            Self::Domain(domain) => {
                RpcError::new(ErrorCode::DomainError(domain.code()), domain.to_string())
            }
            Self::Lifecycle(msg) | Self::Config(msg) => {
                RpcError::new(ErrorCode::InternalError, msg.clone())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, reason = "test assertions read better unwrapped")]

    use voxeld_core::DomainError;

    use super::DaemonError;

    #[test]
    fn domain_error_keeps_its_own_stable_code() {
        let err = DaemonError::Domain(DomainError::UnknownLayer);
        assert_eq!(err.to_rpc_error().code, -32011);
    }

    #[test]
    fn method_not_found_maps_to_standard_code() {
        let err = DaemonError::MethodNotFound("nope".to_string());
        assert_eq!(err.to_rpc_error().code, -32601);
    }

    #[test]
    fn overloaded_maps_to_reserved_code() {
        assert_eq!(DaemonError::Overloaded.to_rpc_error().code, -32001);
    }
}
