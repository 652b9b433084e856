// crates/voxeld-protocol/tests/codec_properties.rs
// ============================================================================
// Module: Codec Property Tests
// Description: Round-trip and batch-ordering laws from the testable properties.
// ============================================================================

#![allow(clippy::unwrap_used, reason = "test assertions read better unwrapped")]

use proptest::prelude::*;
use serde_json::json;
use serde_json::Value;
use voxeld_protocol::codec::assemble_batch;
use voxeld_protocol::id::Id;
use voxeld_protocol::response::RpcResponse;
use voxeld_protocol::RpcMessage;

fn arbitrary_json() -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i32>().prop_map(|n| json!(n)),
        ".*".prop_map(Value::String),
    ];
    leaf.prop_recursive(4, 64, 8, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..4).prop_map(Value::Array),
            prop::collection::hash_map("[a-z]{1,6}", inner, 0..4)
                .prop_map(|m| Value::Object(m.into_iter().collect())),
        ]
    })
}

proptest! {
    #[test]
    fn echo_returns_exactly_the_input_value(value in arbitrary_json()) {
        let resp = RpcResponse::success(Id::Number(1), value.clone());
        let encoded = resp.to_value();
        prop_assert_eq!(&encoded["result"], &value);
    }

    #[test]
    fn batch_assembly_preserves_positional_order(ids in prop::collection::vec(0i64..1000, 1..20)) {
        let responses: Vec<Option<RpcResponse>> = ids
            .iter()
            .map(|id| Some(RpcResponse::success(Id::Number(*id), json!(id))))
            .collect();
        let assembled = assemble_batch(responses).unwrap();
        let arr = assembled.as_array().unwrap();
        for (response, expected_id) in arr.iter().zip(ids.iter()) {
            prop_assert_eq!(&response["id"], &json!(expected_id));
        }
    }
}

#[test]
fn request_of_max_size_is_valid_and_one_byte_more_is_a_parse_concern_of_framing() {
    // The codec itself has no size cap — that lives in voxeld-server's
    // framing layer (see §4.1) — but it must still accept an arbitrarily
    // large, well-formed single request.
    let big_string = "x".repeat(8192);
    let line = format!(
        r#"{{"jsonrpc":"2.0","method":"echo","params":"{big_string}","id":1}}"#
    );
    let msg = RpcMessage::parse(&line).unwrap();
    assert!(matches!(msg, RpcMessage::Request { .. }));
}
