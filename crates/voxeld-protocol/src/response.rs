// crates/voxeld-protocol/src/response.rs
// ============================================================================
// Module: RPC Response
// Description: The outbound JSON-RPC 2.0 response shapes.
// Purpose: Serialize success/error responses and batch arrays exactly once.
// Dependencies: serde, serde_json, crate::id, crate::codes
// ============================================================================

use serde::Serialize;
use serde_json::Value;

use crate::codes::ErrorCode;
use crate::id::Id;

/// A JSON-RPC 2.0 error object.
#[derive(Debug, Clone, Serialize)]
pub struct RpcError {
    /// The numeric error code.
    pub code: i32,
    /// A short, human-readable description.
    pub message: String,
    /// Optional structured detail.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl RpcError {
    /// Builds an [`RpcError`] from an [`ErrorCode`] and message text.
    #[must_use]
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code: code.as_i32(),
            message: message.into(),
            data: None,
        }
    }

    /// Builds an [`RpcError`] using the code's conventional default message.
    #[must_use]
    pub fn from_code(code: ErrorCode) -> Self {
        Self::new(code, code.default_message())
    }

    /// Attaches structured `data` to this error.
    #[must_use]
    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }
}

/// A single JSON-RPC 2.0 response: either a success or an error, both
/// carrying the `id` of the request they answer.
#[derive(Debug, Clone)]
pub enum RpcResponse {
    /// A successful result.
    Success {
        /// The id of the request this answers.
        id: Id,
        /// The method's result value.
        result: Value,
    },
    /// A failed request.
    Error {
        /// The id of the request this answers, or [`Id::Null`] when the
        /// request itself could not be parsed.
        id: Id,
        /// The error detail.
        error: RpcError,
    },
}

impl RpcResponse {
    /// Builds a success response.
    #[must_use]
    pub const fn success(id: Id, result: Value) -> Self {
        Self::Success { id, result }
    }

    /// Builds an error response.
    #[must_use]
    pub const fn error(id: Id, error: RpcError) -> Self {
        Self::Error { id, error }
    }

    /// Returns the id this response answers.
    #[must_use]
    pub const fn id(&self) -> &Id {
        match self {
            Self::Success { id, .. } | Self::Error { id, .. } => id,
        }
    }

    /// Serializes this response into the JSON-RPC 2.0 envelope.
    #[must_use]
    pub fn to_value(&self) -> Value {
        match self {
            Self::Success { id, result } => serde_json::json!({
                "jsonrpc": "2.0",
                "result": result,
                "id": id.clone().into_value(),
            }),
            Self::Error { id, error } => serde_json::json!({
                "jsonrpc": "2.0",
                "error": error,
                "id": id.clone().into_value(),
            }),
        }
    }
}
