//! Property-based test generators using proptest.
//!
//! Provides strategies for generating names, JSON values and documents.

use proptest::prelude::*;
use serde_json::{Map, Number, Value};
use waterview_core::Document;

/// Strategy for generating valid database or collection names.
pub fn name_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-zA-Z][a-zA-Z0-9_-]{0,31}").expect("Invalid regex")
}

/// Strategy for generating names the store must reject.
pub fn invalid_name_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        Just(String::new()),
        Just(".".to_string()),
        Just("..".to_string()),
        name_strategy().prop_map(|n| format!("../{n}")),
        name_strategy().prop_map(|n| format!("{n}/x")),
        name_strategy().prop_map(|n| format!("{n}\\x")),
        name_strategy().prop_map(|n| format!(".{n}")),
        name_strategy().prop_map(|n| format!("{n}\0")),
        Just("a".repeat(256)),
    ]
}

/// Strategy for scalar JSON values.
pub fn json_leaf_strategy() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(Value::from),
        // Quarter steps survive a text round trip exactly.
        (-4_000_000i64..4_000_000)
            .prop_map(|n| Number::from_f64(n as f64 / 4.0).map_or(Value::Null, Value::Number)),
        "[a-zA-Z0-9 ]{0,16}".prop_map(Value::String),
    ]
}

/// Strategy for arbitrary (nested) JSON values.
pub fn json_value_strategy() -> impl Strategy<Value = Value> {
    json_leaf_strategy().prop_recursive(3, 32, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..4).prop_map(Value::Array),
            prop::collection::btree_map("[a-z]{1,6}", inner, 0..4)
                .prop_map(|m| Value::Object(m.into_iter().collect())),
        ]
    })
}

/// Strategy for documents (JSON objects).
pub fn document_strategy() -> impl Strategy<Value = Document> {
    prop::collection::btree_map("[a-z]{1,6}", json_value_strategy(), 0..6)
        .prop_map(|m| m.into_iter().collect::<Map<String, Value>>())
}

/// Strategy for a batch of documents.
pub fn documents_strategy(max: usize) -> impl Strategy<Value = Vec<Document>> {
    prop::collection::vec(document_strategy(), 0..=max)
}

/// Strategy for documents with a small shared field space, so that
/// equality predicates hit often.
pub fn dense_document_strategy() -> impl Strategy<Value = Document> {
    prop::collection::btree_map(
        prop::sample::select(vec!["a", "b", "c"]),
        prop_oneof![
            (0i64..3).prop_map(Value::from),
            prop::sample::select(vec!["x", "y"]).prop_map(Value::from),
        ],
        0..3,
    )
    .prop_map(|m| m.into_iter().map(|(k, v)| (k.to_string(), v)).collect())
}
