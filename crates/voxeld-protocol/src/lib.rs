// crates/voxeld-protocol/src/lib.rs
// ============================================================================
// Module: Voxeld Protocol
// Description: JSON-RPC 2.0 message model, error code table, and batch codec.
// Purpose: Give every other crate in the workspace one shared wire vocabulary.
// Dependencies: serde, serde_json, thiserror
// ============================================================================

//! ## Overview
//!
//! This crate defines the JSON-RPC 2.0 message shapes exchanged over the
//! daemon's Unix socket and the codec that parses/serializes them, including
//! batch handling. It does not know about sockets, framing, or the scene;
//! those concerns live in `voxeld-server`.

#![forbid(unsafe_code)]

pub mod codes;
pub mod codec;
pub mod id;
pub mod message;
pub mod response;

pub use codec::CodecError;
pub use codes::ErrorCode;
pub use id::Id;
pub use message::RpcMessage;
pub use response::RpcError;
pub use response::RpcResponse;

#[cfg(test)]
mod tests;
