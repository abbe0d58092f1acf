//! Benchmark utilities.

use rand::Rng;
use serde_json::{json, Value};
use waterview_core::{Connection, DocumentStore};

/// Collection name used by the store benchmarks.
pub const BENCH_COLLECTION: &str = "bench";

/// Generate random printable text of the specified length.
pub fn random_text(len: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..len).map(|_| rng.gen_range(b'a'..=b'z') as char).collect()
}

/// Generate a document with a random payload of roughly `payload_size` bytes.
pub fn random_document(seq: usize, payload_size: usize) -> Value {
    let mut rng = rand::thread_rng();
    json!({
        "seq": seq,
        "group": rng.gen_range(0..10),
        "payload": random_text(payload_size),
    })
}

/// Generate `count` documents with the given payload size.
pub fn generate_documents(count: usize, payload_size: usize) -> Vec<Value> {
    (0..count).map(|i| random_document(i, payload_size)).collect()
}

/// Opens an in-memory store holding one collection of `count` documents.
pub fn populated_store(count: usize, payload_size: usize) -> (DocumentStore, Connection) {
    let store = DocumentStore::open_in_memory().unwrap();
    let conn = store.create_database("benchDB").unwrap();
    store.create_collection(&conn, BENCH_COLLECTION).unwrap();
    store
        .insert_many(&conn, BENCH_COLLECTION, generate_documents(count, payload_size))
        .unwrap();
    (store, conn)
}
