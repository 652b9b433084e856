// crates/voxeld-protocol/src/id.rs
// ============================================================================
// Module: Request Id
// Description: The JSON-RPC 2.0 `id` value: string, integer, or null.
// Purpose: Preserve request identity verbatim across request/response.
// Dependencies: serde, serde_json
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

/// A JSON-RPC request identifier.
///
/// Per the JSON-RPC 2.0 specification an `id` is a string, a number, or
/// `null`. It is never interpreted, only echoed back in the response that
/// answers the request carrying it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Id {
    /// A string identifier.
    String(String),
    /// A numeric identifier, stored as seen on the wire.
    Number(i64),
    /// No identifier was present; only valid for notifications or as the
    /// `id` of a response to an unparseable request.
    Null,
}

impl Id {
    /// Returns `true` when this id is [`Id::Null`].
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Converts this id into a raw [`Value`] suitable for embedding in a
    /// response object.
    #[must_use]
    pub fn into_value(self) -> Value {
        match self {
            Self::String(s) => Value::String(s),
            Self::Number(n) => Value::Number(n.into()),
            Self::Null => Value::Null,
        }
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String(s) => write!(f, "{s}"),
            Self::Number(n) => write!(f, "{n}"),
            Self::Null => write!(f, "null"),
        }
    }
}
