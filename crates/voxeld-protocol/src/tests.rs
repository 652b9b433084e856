// crates/voxeld-protocol/src/tests.rs
// ============================================================================
// Module: Protocol Unit Tests
// Description: Parsing, batching, and response-serialization coverage.
// ============================================================================

#![allow(clippy::unwrap_used, reason = "test assertions read better unwrapped")]

use serde_json::json;

use crate::codec::assemble_batch;
use crate::codes::ErrorCode;
use crate::id::Id;
use crate::message::RpcMessage;
use crate::response::RpcError;
use crate::response::RpcResponse;
use crate::CodecError;

#[test]
fn parses_request_with_numeric_id() {
    let msg = RpcMessage::parse(r#"{"jsonrpc":"2.0","method":"ping","id":1}"#).unwrap();
    match msg {
        RpcMessage::Request { id, method, params } => {
            assert_eq!(id, Id::Number(1));
            assert_eq!(method, "ping");
            assert_eq!(params, serde_json::Value::Null);
        }
        _ => panic!("expected Request"),
    }
}

#[test]
fn parses_request_with_string_id() {
    let msg = RpcMessage::parse(r#"{"jsonrpc":"2.0","method":"echo","params":{"x":42},"id":"a"}"#)
        .unwrap();
    match msg {
        RpcMessage::Request { id, params, .. } => {
            assert_eq!(id, Id::String("a".to_string()));
            assert_eq!(params, json!({"x": 42}));
        }
        _ => panic!("expected Request"),
    }
}

#[test]
fn absent_id_is_notification() {
    let msg = RpcMessage::parse(r#"{"jsonrpc":"2.0","method":"ping"}"#).unwrap();
    assert!(matches!(msg, RpcMessage::Notification { .. }));
    assert!(msg.is_all_notifications());
}

#[test]
fn null_id_is_a_request_not_a_notification() {
    let msg = RpcMessage::parse(r#"{"jsonrpc":"2.0","method":"ping","id":null}"#).unwrap();
    match msg {
        RpcMessage::Request { id, .. } => assert_eq!(id, Id::Null),
        _ => panic!("expected Request"),
    }
}

#[test]
fn rejects_wrong_jsonrpc_version() {
    let err = RpcMessage::parse(r#"{"jsonrpc":"1.0","method":"ping","id":1}"#).unwrap_err();
    assert_eq!(err, CodecError::InvalidRequest);
}

#[test]
fn rejects_missing_method() {
    let err = RpcMessage::parse(r#"{"jsonrpc":"2.0","id":1}"#).unwrap_err();
    assert_eq!(err, CodecError::InvalidRequest);
}

#[test]
fn rejects_malformed_json() {
    let err = RpcMessage::parse("{not json").unwrap_err();
    assert_eq!(err, CodecError::ParseError);
}

#[test]
fn empty_batch_is_invalid() {
    let err = RpcMessage::parse("[]").unwrap_err();
    assert_eq!(err, CodecError::InvalidRequest);
}

#[test]
fn batch_of_batches_is_invalid() {
    let err = RpcMessage::parse(r#"[[{"jsonrpc":"2.0","method":"ping","id":1}]]"#).unwrap_err();
    assert_eq!(err, CodecError::InvalidRequest);
}

#[test]
fn codec_error_response_keeps_invalid_request_distinct_from_parse_error() {
    let invalid = crate::codec::codec_error_response(CodecError::InvalidRequest);
    assert_eq!(invalid.to_value()["error"]["code"], json!(-32600));

    let malformed = crate::codec::codec_error_response(CodecError::ParseError);
    assert_eq!(malformed.to_value()["error"]["code"], json!(-32700));
}

#[test]
fn single_element_batch_parses() {
    let msg = RpcMessage::parse(r#"[{"jsonrpc":"2.0","method":"ping","id":1}]"#).unwrap();
    match msg {
        RpcMessage::Batch(items) => assert_eq!(items.len(), 1),
        _ => panic!("expected Batch"),
    }
}

#[test]
fn batch_of_all_notifications_has_no_response() {
    let msg = RpcMessage::parse(
        r#"[{"jsonrpc":"2.0","method":"ping"},{"jsonrpc":"2.0","method":"pong"}]"#,
    )
    .unwrap();
    assert!(msg.is_all_notifications());
}

#[test]
fn assemble_batch_omits_notifications_and_preserves_order() {
    let responses = vec![
        Some(RpcResponse::success(Id::Number(1), json!(1))),
        None,
        Some(RpcResponse::success(Id::Number(3), json!(3))),
    ];
    let value = assemble_batch(responses).unwrap();
    let arr = value.as_array().unwrap();
    assert_eq!(arr.len(), 2);
    assert_eq!(arr[0]["id"], json!(1));
    assert_eq!(arr[1]["id"], json!(3));
}

#[test]
fn assemble_batch_of_only_notifications_is_none() {
    let responses: Vec<Option<RpcResponse>> = vec![None, None];
    assert!(assemble_batch(responses).is_none());
}

#[test]
fn echo_round_trip() {
    let values = [json!(42), json!("s"), json!(null), json!([1, 2, 3]), json!({"a": 1})];
    for v in values {
        let resp = RpcResponse::success(Id::Number(1), v.clone());
        let encoded = resp.to_value();
        assert_eq!(encoded["result"], v);
    }
}

#[test]
fn error_response_carries_code_and_message() {
    let err = RpcError::from_code(ErrorCode::MethodNotFound);
    let resp = RpcResponse::error(Id::String("abc".to_string()), err);
    let value = resp.to_value();
    assert_eq!(value["error"]["code"], json!(-32601));
    assert_eq!(value["error"]["message"], json!("Method not found"));
    assert_eq!(value["id"], json!("abc"));
}

#[test]
fn domain_error_range_check() {
    assert!(ErrorCode::is_domain_range(-32010));
    assert!(ErrorCode::is_domain_range(-32099));
    assert!(!ErrorCode::is_domain_range(-32100));
    assert!(!ErrorCode::is_domain_range(-32009));
}
