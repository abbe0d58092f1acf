//! Failure injection, corruption, validation and lock timeouts.

use serde_json::json;
use std::path::Path;
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use waterview_core::{Config, CoreError, DocumentStore, ErrorKind};
use waterview_storage::StorageBackend;
use waterview_testkit::scenarios::{self, TEST_COLLECTION, TEST_DB};
use waterview_testkit::{FaultyBackend, TestStore};

fn faulty_store(config: Config) -> (DocumentStore, Arc<FaultyBackend>) {
    let backend = Arc::new(FaultyBackend::in_memory());
    let store = DocumentStore::with_backend("/data", config, backend.clone()).unwrap();
    (store, backend)
}

#[test]
fn failed_multi_insert_persists_nothing() {
    let (store, backend) = faulty_store(Config::default());
    let conn = scenarios::seeded(&store);
    let before = store.get_all(&conn, TEST_COLLECTION).unwrap();

    backend.fail_next_writes(1);
    let err = store
        .insert_many(
            &conn,
            TEST_COLLECTION,
            vec![json!({"name": "A"}), json!({"name": "B"}), json!({"name": "C"})],
        )
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Io);
    assert!(err.is_retryable());

    assert_eq!(store.get_all(&conn, TEST_COLLECTION).unwrap(), before);

    // The same batch goes through once the fault is gone.
    store
        .insert_many(&conn, TEST_COLLECTION, vec![json!({"name": "A"}), json!({"name": "B"})])
        .unwrap();
    assert_eq!(store.get_all(&conn, TEST_COLLECTION).unwrap().len(), 4);
}

#[test]
fn failed_registration_rolls_back_collection() {
    let (store, backend) = faulty_store(Config::default());
    let conn = store.create_database(TEST_DB).unwrap();

    backend.only_fail_file("registry.json");
    backend.fail_next_writes(1);
    assert!(store.create_collection(&conn, "orphan").is_err());

    assert!(!backend.exists(Path::new("/data/testDB/orphan")));
    assert!(store.list_collections(&conn).unwrap().is_empty());

    backend.reset();
    store.create_collection(&conn, "orphan").unwrap();
    assert_eq!(store.list_collections(&conn).unwrap(), vec!["orphan"]);
}

#[test]
fn failed_database_creation_leaves_no_directory() {
    let (store, backend) = faulty_store(Config::default());

    backend.only_fail_file("registry.json");
    backend.fail_next_writes(1);
    assert!(store.create_database(TEST_DB).is_err());
    assert!(!backend.exists(Path::new("/data/testDB")));

    backend.reset();
    store.create_database(TEST_DB).unwrap();
}

#[test]
fn failed_selection_write_still_creates_database() {
    let (store, backend) = faulty_store(Config::default());

    backend.only_fail_file("config.json");
    backend.fail_next_writes(1);
    let conn = store.create_database(TEST_DB).unwrap();
    assert_eq!(backend.writes_failed(), 1);
    assert!(store.selected_database().unwrap().is_none());
    assert_eq!(
        store.create_database(TEST_DB).unwrap_err().kind(),
        ErrorKind::AlreadyExists
    );

    backend.reset();
    assert_eq!(store.connect(TEST_DB).unwrap(), conn);
    assert_eq!(store.selected_database().unwrap().as_deref(), Some(TEST_DB));
}

#[test]
fn interrupted_collection_delete_can_be_retried() {
    let (store, backend) = faulty_store(Config::default());
    let conn = scenarios::seeded(&store);

    backend.only_fail_file("registry.json");
    backend.fail_next_writes(1);
    let err = store.delete_collection(&conn, TEST_COLLECTION).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Io);
    assert!(!backend.exists(Path::new("/data/testDB/testCollection")));
    assert_eq!(store.list_collections(&conn).unwrap(), vec![TEST_COLLECTION]);

    backend.reset();
    store.delete_collection(&conn, TEST_COLLECTION).unwrap();
    assert!(store.list_collections(&conn).unwrap().is_empty());
    assert_eq!(
        store.delete_collection(&conn, TEST_COLLECTION).unwrap_err().kind(),
        ErrorKind::NotFound
    );
}

#[test]
fn registry_is_rebuilt_after_crash() {
    let (store, backend) = faulty_store(Config::default());
    let conn = scenarios::seeded(&store);

    // A collection written to disk whose registration never happened.
    let inner = backend.inner();
    inner.create_dir(Path::new("/data/testDB/late")).unwrap();
    inner
        .write_atomic(Path::new("/data/testDB/late/data.json"), b"[{\"x\":1}]", false)
        .unwrap();
    // A stray directory without a data file.
    inner.create_dir(Path::new("/data/testDB/stray")).unwrap();
    // And a registry that no longer parses.
    inner
        .write_atomic(Path::new("/data/testDB/registry.json"), b"{\"name\":", false)
        .unwrap();

    assert_eq!(store.connect(TEST_DB).unwrap_err().kind(), ErrorKind::NotFound);

    let registry = store.rebuild_registry(TEST_DB).unwrap();
    assert_eq!(registry.collections, vec!["late", TEST_COLLECTION]);

    let conn2 = store.connect(TEST_DB).unwrap();
    assert_eq!(conn2, conn);
    assert_eq!(store.get_all(&conn, "late").unwrap().len(), 1);
}

#[test]
fn corrupt_data_file_is_reported() {
    let (store, backend) = faulty_store(Config::default());
    let conn = scenarios::seeded(&store);
    let data_file = store.data_file(&conn, TEST_COLLECTION).unwrap();

    for garbage in [&b"not json"[..], b"{\"a\":1}", b"[1, 2]"] {
        backend.inner().write_atomic(&data_file, garbage, false).unwrap();

        let err = store.get_all(&conn, TEST_COLLECTION).unwrap_err();
        assert!(matches!(err, CoreError::Corruption { .. }), "{err}");
        assert_eq!(
            store.insert(&conn, TEST_COLLECTION, json!({"a": 1})).unwrap_err().kind(),
            ErrorKind::Corruption
        );
    }

    // Nothing was overwritten by the failed inserts.
    assert_eq!(backend.inner().read(&data_file).unwrap().unwrap(), b"[1, 2]");
}

#[test]
fn traversal_names_are_rejected() {
    let store = TestStore::file();
    let conn = scenarios::seeded(&store);

    for bad in ["..", ".", "../escape", "a/b", "a\\b", "", ".hidden", "nul\0"] {
        assert_eq!(
            store.create_database(bad).unwrap_err().kind(),
            ErrorKind::Validation,
            "{bad:?}"
        );
        assert_eq!(
            store.create_collection(&conn, bad).unwrap_err().kind(),
            ErrorKind::Validation,
            "{bad:?}"
        );
        assert_eq!(
            store.get_all(&conn, bad).unwrap_err().kind(),
            ErrorKind::Validation,
            "{bad:?}"
        );
    }

    let parent = store.path().unwrap().parent().unwrap();
    assert!(!parent.join("escape").exists());
}

#[test]
fn waiting_reader_times_out_behind_slow_writer() {
    let config = Config::default().lock_timeout(Duration::from_millis(20));
    let (store, backend) = faulty_store(config);
    let conn = scenarios::seeded(&store);

    let started = backend.writes_started();
    backend.set_write_delay(Duration::from_millis(500));

    let writer = {
        let store = store.clone();
        let conn = conn.clone();
        thread::spawn(move || store.insert(&conn, TEST_COLLECTION, json!({"slow": true})))
    };

    // The writer holds the collection lock once its write has begun.
    while backend.writes_started() == started {
        thread::yield_now();
    }

    let err = store.get_all(&conn, TEST_COLLECTION).unwrap_err();
    assert!(matches!(err, CoreError::LockTimeout { .. }), "{err}");
    assert!(err.is_retryable());

    assert_eq!(writer.join().unwrap().unwrap(), 1);
    backend.reset();
    assert_eq!(store.get_all(&conn, TEST_COLLECTION).unwrap().len(), 3);
}

#[test]
fn other_collections_are_not_blocked() {
    let config = Config::default().lock_timeout(Duration::from_millis(100));
    let (store, backend) = faulty_store(config);
    let conn = scenarios::seeded(&store);
    store.create_collection(&conn, "other").unwrap();

    let started = backend.writes_started();
    backend.set_write_delay(Duration::from_millis(400));

    let writer = {
        let store = store.clone();
        let conn = conn.clone();
        thread::spawn(move || store.insert(&conn, TEST_COLLECTION, json!({"slow": true})))
    };
    while backend.writes_started() == started {
        thread::yield_now();
    }

    assert!(store.get_all(&conn, "other").unwrap().is_empty());
    writer.join().unwrap().unwrap();
}
