// crates/voxeld-protocol/src/codec.rs
// ============================================================================
// Module: Codec Errors and Batch Assembly
// Description: Parse-time error taxonomy and batch response array assembly.
// Purpose: Keep batch semantics (ordering, notification omission) in one place.
// Dependencies: serde_json, thiserror, crate::id, crate::response
// ============================================================================

use serde_json::Value;
use thiserror::Error;

use crate::id::Id;
use crate::response::RpcResponse;

/// Failure to parse or structurally validate an inbound message.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum CodecError {
    /// The input was not valid JSON, or a message exceeded the caller's
    /// size cap, or the input was not valid UTF-8.
    #[error("parse error")]
    ParseError,
    /// The input was valid JSON but not a well-formed JSON-RPC 2.0
    /// request, notification, or batch.
    #[error("invalid request")]
    InvalidRequest,
}

/// Assembles the response array for a batch, preserving the positional
/// order of the original requests and omitting entries for notifications
/// (which have no corresponding response).
///
/// Returns `None` when every entry was a notification, per JSON-RPC 2.0:
/// a batch of only notifications produces no reply at all.
#[must_use]
pub fn assemble_batch(responses: Vec<Option<RpcResponse>>) -> Option<Value> {
    let values: Vec<Value> = responses
        .into_iter()
        .flatten()
        .map(|r| r.to_value())
        .collect();
    if values.is_empty() {
        None
    } else {
        Some(Value::Array(values))
    }
}

/// Builds the single-error response used when an entire line fails to
/// parse at the framing layer (oversized frame, invalid UTF-8), per
/// JSON-RPC 2.0's convention of `id: null` for such failures. Always
/// [`crate::codes::ErrorCode::ParseError`]: framing failures never reach
/// far enough to distinguish a malformed request from malformed JSON.
#[must_use]
pub fn parse_error_response(message: &str) -> RpcResponse {
    RpcResponse::error(
        Id::Null,
        crate::response::RpcError::new(crate::codes::ErrorCode::ParseError, message),
    )
}

/// Builds the single-error response for a line that parsed as JSON (or
/// failed to) but never became an [`RpcMessage`], selecting the JSON-RPC
/// code from the specific [`CodecError`] `RpcMessage::parse` returned
/// rather than always reporting `ParseError`.
#[must_use]
pub fn codec_error_response(err: CodecError) -> RpcResponse {
    let code = match err {
        CodecError::ParseError => crate::codes::ErrorCode::ParseError,
        CodecError::InvalidRequest => crate::codes::ErrorCode::InvalidRequest,
    };
    RpcResponse::error(Id::Null, crate::response::RpcError::from_code(code))
}
