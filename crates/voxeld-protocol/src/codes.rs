// crates/voxeld-protocol/src/codes.rs
// ============================================================================
// Module: Error Code Table
// Description: The JSON-RPC error codes recognized by the daemon core.
// Purpose: Give every crate one source of truth for the -32768..-32000 range.
// Dependencies: (none)
// ============================================================================

/// A JSON-RPC error code in the range reserved for this daemon.
///
/// Variants map 1:1 onto the table in the error handling design: transport
/// and protocol failures use the codes reserved by the JSON-RPC 2.0
/// specification itself; `Timeout`, `Overloaded`, and `Shutdown` are this
/// daemon's own reserved codes; `DomainError` passes through a code supplied
/// by the `SceneEngine` collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// Malformed JSON, oversized frame, or invalid UTF-8.
    ParseError,
    /// Structurally invalid per JSON-RPC 2.0 (bad `jsonrpc`, missing `method`, empty batch).
    InvalidRequest,
    /// The method name is absent from the registry.
    MethodNotFound,
    /// `params` failed the handler's own validation.
    InvalidParams,
    /// The handler failed unexpectedly (including a caught panic).
    InternalError,
    /// The handler exceeded `request_timeout_ms`.
    Timeout,
    /// The worker queue was full at enqueue time.
    Overloaded,
    /// The daemon is draining and refuses new work.
    Shutdown,
    /// A domain-specific error forwarded from `SceneEngine`/`RenderStore`,
    /// carrying its own code in -32010..-32099.
    DomainError(i32),
}

impl ErrorCode {
    /// Returns the numeric JSON-RPC code for this error.
    #[must_use]
    pub const fn as_i32(self) -> i32 {
        match self {
            Self::ParseError => -32700,
            Self::InvalidRequest => -32600,
            Self::MethodNotFound => -32601,
            Self::InvalidParams => -32602,
            Self::InternalError => -32603,
            Self::Timeout => -32000,
            Self::Overloaded => -32001,
            Self::Shutdown => -32002,
            Self::DomainError(code) => code,
        }
    }

    /// Returns the conventional human-readable message for this error, used
    /// when the caller has no more specific text to report.
    #[must_use]
    pub const fn default_message(self) -> &'static str {
        match self {
            Self::ParseError => "Parse error",
            Self::InvalidRequest => "Invalid Request",
            Self::MethodNotFound => "Method not found",
            Self::InvalidParams => "Invalid params",
            Self::InternalError => "Internal error",
            Self::Timeout => "Request timed out",
            Self::Overloaded => "Too many connections",
            Self::Shutdown => "Daemon is shutting down",
            Self::DomainError(_) => "Domain error",
        }
    }

    /// Lower bound (inclusive) of the domain error code range.
    pub const DOMAIN_RANGE_MIN: i32 = -32099;
    /// Upper bound (inclusive) of the domain error code range.
    pub const DOMAIN_RANGE_MAX: i32 = -32010;

    /// Returns `true` when `code` falls inside the domain error range.
    #[must_use]
    pub const fn is_domain_range(code: i32) -> bool {
        code >= Self::DOMAIN_RANGE_MIN && code <= Self::DOMAIN_RANGE_MAX
    }
}
