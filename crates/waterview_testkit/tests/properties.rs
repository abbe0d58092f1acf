//! Property tests: round trips and predicate semantics through the store.

use proptest::prelude::*;
use serde_json::Value;
use waterview_core::{Document, Predicate};
use waterview_testkit::scenarios::{self, TEST_COLLECTION};
use waterview_testkit::{dense_document_strategy, documents_strategy, TestStore};

fn as_values(docs: &[Document]) -> Vec<Value> {
    docs.iter().cloned().map(Value::Object).collect()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn append_then_load_round_trips(batches in prop::collection::vec(documents_strategy(6), 1..4)) {
        let store = TestStore::memory();
        let conn = scenarios::populated(&store, 0);

        let mut expected = Vec::new();
        for batch in &batches {
            let added = store
                .insert_many(&conn, TEST_COLLECTION, as_values(batch))
                .unwrap();
            prop_assert_eq!(added, batch.len());
            expected.extend(batch.iter().cloned());
        }

        prop_assert_eq!(store.get_all(&conn, TEST_COLLECTION).unwrap(), expected);
    }

    #[test]
    fn find_agrees_with_field_equality(
        docs in prop::collection::vec(dense_document_strategy(), 0..20),
        sample in dense_document_strategy(),
    ) {
        let store = TestStore::memory();
        let conn = scenarios::populated(&store, 0);
        store.insert_many(&conn, TEST_COLLECTION, as_values(&docs)).unwrap();

        let predicate = Predicate::from(sample.clone());
        let expected: Vec<Document> = docs
            .iter()
            .filter(|doc| sample.iter().all(|(k, v)| doc.get(k) == Some(v)))
            .cloned()
            .collect();

        let found = store.find(&conn, TEST_COLLECTION, &predicate).unwrap();
        prop_assert_eq!(&found, &expected);
        prop_assert_eq!(
            store.count_where(&conn, TEST_COLLECTION, &predicate).unwrap(),
            expected.len()
        );
        prop_assert_eq!(
            store.get_where(&conn, TEST_COLLECTION, &predicate).unwrap(),
            expected.first().cloned()
        );
    }
}

#[test]
fn compact_files_round_trip_too() {
    use waterview_core::Config;

    let store = TestStore::file_with_config(Config::default().pretty(false));
    let conn = scenarios::seeded(&store);

    let raw = std::fs::read_to_string(store.data_file(&conn, TEST_COLLECTION).unwrap()).unwrap();
    assert!(!raw.contains('\n'));
    assert_eq!(store.get_all(&conn, TEST_COLLECTION).unwrap().len(), 2);
}
