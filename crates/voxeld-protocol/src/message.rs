// crates/voxeld-protocol/src/message.rs
// ============================================================================
// Module: RPC Message
// Description: The inbound JSON-RPC 2.0 shapes: request, notification, batch.
// Purpose: Parse and validate exactly what JSON-RPC 2.0 requires, no more.
// Dependencies: serde_json, crate::id
// ============================================================================

use serde_json::Value;

use crate::codec::CodecError;
use crate::id::Id;

/// A single JSON-RPC 2.0 request or notification, or a batch of either.
///
/// # Invariants
/// - A `Batch` is never empty; an empty array is rejected during parsing
///   before a `Batch` value is ever constructed.
/// - A `Batch` never contains another `Batch` (a batch of batches is
///   invalid per JSON-RPC 2.0 and rejected during parsing).
#[derive(Debug, Clone, PartialEq)]
pub enum RpcMessage {
    /// A request expecting exactly one response, carrying the given id.
    Request {
        /// The request identifier, echoed back in the response.
        id: Id,
        /// The method name.
        method: String,
        /// The method parameters, or `Value::Null` if absent.
        params: Value,
    },
    /// A notification: fire-and-forget, never answered.
    Notification {
        /// The method name.
        method: String,
        /// The method parameters, or `Value::Null` if absent.
        params: Value,
    },
    /// A non-empty batch of requests and/or notifications.
    Batch(Vec<RpcMessage>),
}

impl RpcMessage {
    /// Parses one line of wire input (already stripped of its trailing
    /// newline) into an [`RpcMessage`].
    ///
    /// # Errors
    /// Returns [`CodecError::ParseError`] for malformed JSON and
    /// [`CodecError::InvalidRequest`] for JSON that parses but does not
    /// conform to the JSON-RPC 2.0 shape.
    pub fn parse(line: &str) -> Result<Self, CodecError> {
        let value: Value = serde_json::from_str(line).map_err(|_| CodecError::ParseError)?;
        Self::from_value(value)
    }

    /// Converts an already-parsed JSON [`Value`] into an [`RpcMessage`].
    ///
    /// # Errors
    /// Returns [`CodecError::InvalidRequest`] when the value is not a
    /// well-formed JSON-RPC 2.0 request, notification, or non-empty,
    /// non-nested batch.
    pub fn from_value(value: Value) -> Result<Self, CodecError> {
        match value {
            Value::Array(items) => {
                if items.is_empty() {
                    return Err(CodecError::InvalidRequest);
                }
                let mut batch = Vec::with_capacity(items.len());
                for item in items {
                    if item.is_array() {
                        return Err(CodecError::InvalidRequest);
                    }
                    batch.push(Self::from_single(item)?);
                }
                Ok(Self::Batch(batch))
            }
            other => Self::from_single(other),
        }
    }

    /// Parses a single (non-batch) JSON-RPC object.
    fn from_single(value: Value) -> Result<Self, CodecError> {
        let Value::Object(mut obj) = value else {
            return Err(CodecError::InvalidRequest);
        };

        match obj.get("jsonrpc") {
            Some(Value::String(v)) if v == "2.0" => {}
            _ => return Err(CodecError::InvalidRequest),
        }

        let method = match obj.remove("method") {
            Some(Value::String(m)) => m,
            _ => return Err(CodecError::InvalidRequest),
        };

        let params = obj.remove("params").unwrap_or(Value::Null);

        match obj.remove("id") {
            None => Ok(Self::Notification { method, params }),
            Some(Value::Null) => Ok(Self::Request {
                id: Id::Null,
                method,
                params,
            }),
            Some(Value::String(s)) => Ok(Self::Request {
                id: Id::String(s),
                method,
                params,
            }),
            Some(Value::Number(n)) => {
                let Some(n) = n.as_i64() else {
                    return Err(CodecError::InvalidRequest);
                };
                Ok(Self::Request {
                    id: Id::Number(n),
                    method,
                    params,
                })
            }
            Some(_) => Err(CodecError::InvalidRequest),
        }
    }

    /// Returns `true` when this message (or, for a batch, every entry in
    /// it) is a notification and therefore produces no response.
    #[must_use]
    pub fn is_all_notifications(&self) -> bool {
        match self {
            Self::Request { .. } => false,
            Self::Notification { .. } => true,
            Self::Batch(items) => items.iter().all(Self::is_all_notifications),
        }
    }
}
