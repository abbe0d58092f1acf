//! Test fixtures and store helpers.
//!
//! Provides convenience functions for setting up test stores
//! and common test scenarios.

use std::path::Path;
use tempfile::TempDir;
use waterview_core::{Config, DocumentStore};

/// A test store with automatic cleanup.
pub struct TestStore {
    /// The store instance.
    pub store: DocumentStore,
    /// The temporary directory (kept alive to prevent cleanup).
    temp_dir: Option<TempDir>,
}

impl TestStore {
    /// Creates a new in-memory test store.
    pub fn memory() -> Self {
        Self {
            store: DocumentStore::open_in_memory().expect("Failed to open in-memory store"),
            temp_dir: None,
        }
    }

    /// Creates a new store in a temporary directory.
    pub fn file() -> Self {
        Self::file_with_config(Config::default())
    }

    /// Creates a new store in a temporary directory with `config`.
    pub fn file_with_config(config: Config) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let store = DocumentStore::open_with_config(temp_dir.path(), config)
            .expect("Failed to open file store");
        Self {
            store,
            temp_dir: Some(temp_dir),
        }
    }

    /// Returns the data directory if file-based, None if in-memory.
    pub fn path(&self) -> Option<&Path> {
        self.temp_dir.as_ref().map(TempDir::path)
    }

    /// Opens a second store on the same directory, as another process would.
    ///
    /// # Panics
    ///
    /// Panics if this store is in-memory.
    pub fn reopen(&self, config: Config) -> DocumentStore {
        let path = self.path().expect("Only file stores can be reopened");
        DocumentStore::open_with_config(path, config).expect("Failed to reopen store")
    }
}

impl std::ops::Deref for TestStore {
    type Target = DocumentStore;

    fn deref(&self) -> &Self::Target {
        &self.store
    }
}

/// Runs a test with a temporary in-memory store.
///
/// # Example
///
/// ```rust,ignore
/// use waterview_testkit::with_temp_store;
///
/// #[test]
/// fn my_test() {
///     with_temp_store(|store| {
///         let db = store.create_database("testDB").unwrap();
///         // ... test operations
///     });
/// }
/// ```
pub fn with_temp_store<F, R>(f: F) -> R
where
    F: FnOnce(&DocumentStore) -> R,
{
    let test_store = TestStore::memory();
    f(&test_store.store)
}

/// Runs a test with a store in a temporary directory.
pub fn with_file_store<F, R>(f: F) -> R
where
    F: FnOnce(&DocumentStore, &Path) -> R,
{
    let test_store = TestStore::file();
    let path = test_store.path().expect("File store should have a path");
    f(&test_store.store, path)
}

/// Test scenario helpers.
pub mod scenarios {
    use super::*;
    use serde_json::json;
    use waterview_core::Connection;

    /// Database name used by the scenarios.
    pub const TEST_DB: &str = "testDB";
    /// Collection name used by the scenarios.
    pub const TEST_COLLECTION: &str = "testCollection";

    /// The two documents of the basic scenario, in insertion order.
    pub fn users() -> Vec<serde_json::Value> {
        vec![
            json!({"name": "Rahul", "age": 20}),
            json!({"name": "John", "age": 30}),
        ]
    }

    /// Creates `testDB/testCollection` holding [`users`].
    pub fn seeded(store: &DocumentStore) -> Connection {
        let conn = store
            .create_database(TEST_DB)
            .expect("Failed to create database");
        store
            .create_collection(&conn, TEST_COLLECTION)
            .expect("Failed to create collection");
        store
            .insert_many(&conn, TEST_COLLECTION, users())
            .expect("Failed to insert users");
        conn
    }

    /// Creates a database with one collection of `count` numbered documents.
    pub fn populated(store: &DocumentStore, count: usize) -> Connection {
        let conn = store
            .create_database(TEST_DB)
            .expect("Failed to create database");
        store
            .create_collection(&conn, TEST_COLLECTION)
            .expect("Failed to create collection");
        let docs = (0..count).map(|i| json!({ "seq": i, "even": i % 2 == 0 }));
        store
            .insert_many(&conn, TEST_COLLECTION, docs)
            .expect("Failed to insert documents");
        conn
    }
}
