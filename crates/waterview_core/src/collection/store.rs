//! Collection store: one data file per collection, rewritten atomically.

use crate::collection::codec::decode_documents;
use crate::context::StoreContext;
use crate::dir::DatabaseDirs;
use crate::error::{CoreError, CoreResult, ErrorKind, ObjectKind};
use crate::lock::LockMode;
use crate::query::Document;
use std::sync::Arc;
use tracing::{debug, info, warn};
use waterview_storage::StorageError;

/// Owns the backing files of collections.
///
/// # Write protocol
///
/// Every mutation holds the collection's exclusive lock for its whole
/// read-modify-write span:
///
/// 1. Read the current array
/// 2. Mutate it in memory
/// 3. Write a temporary file in the collection directory
/// 4. Rename the temporary file over `data.json`
///
/// The rename is the only visible state change, so a crash leaves either
/// the old or the new array in place, and concurrent writers never lose
/// each other's updates. Reads hold the shared lock.
#[derive(Clone)]
pub struct CollectionStore {
    ctx: Arc<StoreContext>,
    dirs: DatabaseDirs,
}

impl CollectionStore {
    pub(crate) fn new(ctx: Arc<StoreContext>, dirs: DatabaseDirs) -> Self {
        Self { ctx, dirs }
    }

    /// Creates an empty collection and registers it.
    ///
    /// Directory creation, the initial `[]` write and registration all run
    /// under the collection's exclusive lock. If anything fails after the
    /// directory was created, the directory is removed again.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the database does not exist
    /// - `AlreadyExists` if the collection directory exists
    pub fn create_collection(&self, db: &str, name: &str) -> CoreResult<()> {
        let path = self.ctx.layout.collection_path(db, name)?;
        self.dirs.require_database(db)?;
        let _guard = self.ctx.lock_collection(db, name, LockMode::Exclusive)?;

        match self.ctx.backend.create_dir(&path) {
            Ok(()) => {}
            Err(StorageError::AlreadyExists { .. }) => {
                return Err(CoreError::already_exists(
                    ObjectKind::Collection,
                    qualified(db, name),
                ));
            }
            Err(StorageError::NotFound { .. }) => {
                return Err(CoreError::not_found(ObjectKind::Database, db));
            }
            Err(e) => return Err(e.into()),
        }

        if let Err(e) = self.initialize(db, name) {
            warn!(database = db, collection = name, error = %e, "collection creation failed, rolling back");
            if let Err(rollback) = self.ctx.backend.remove_dir_all(&path) {
                warn!(database = db, collection = name, error = %rollback, "rollback failed");
            }
            return Err(e);
        }

        info!(database = db, collection = name, "collection created");
        Ok(())
    }

    fn initialize(&self, db: &str, name: &str) -> CoreResult<()> {
        let data_file = self.ctx.layout.collection_data_file(db, name)?;
        let empty: Vec<Document> = Vec::new();
        self.ctx.write_file(&data_file, &self.ctx.encode(&empty)?)?;
        self.dirs.register_collection(db, name)
    }

    /// Removes a collection directory recursively and unregisters it.
    ///
    /// A registry entry left behind by an earlier delete whose directory
    /// removal succeeded is cleared, and the call succeeds.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the collection is neither on disk nor registered
    pub fn delete_collection(&self, db: &str, name: &str) -> CoreResult<()> {
        let path = self.ctx.layout.collection_path(db, name)?;
        let result = {
            let _guard = self.ctx.lock_collection(db, name, LockMode::Exclusive)?;
            self.remove_collection(db, name, &path)
        };
        self.ctx.locks.prune();
        result
    }

    fn remove_collection(&self, db: &str, name: &str, path: &std::path::Path) -> CoreResult<()> {
        match self.ctx.backend.remove_dir_all(path) {
            Ok(()) => {}
            Err(StorageError::NotFound { .. }) => {
                if !self.dirs.is_registered(db, name)? {
                    return Err(CoreError::not_found(
                        ObjectKind::Collection,
                        qualified(db, name),
                    ));
                }
                warn!(database = db, collection = name, "clearing registry entry of removed collection");
            }
            Err(e) => return Err(e.into()),
        }
        self.dirs.unregister_collection(db, name)?;

        info!(database = db, collection = name, "collection deleted");
        Ok(())
    }

    /// Loads every document of a collection, in stored order.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the collection does not exist
    /// - `Corruption` if the data file is not a JSON array of objects
    pub fn load_all(&self, db: &str, name: &str) -> CoreResult<Vec<Document>> {
        let result = {
            let _guard = self.ctx.lock_collection(db, name, LockMode::Shared)?;
            self.read_documents(db, name)
        };
        self.forget_if_missing(result)
    }

    /// Appends one document. Returns 1.
    pub fn append_one(&self, db: &str, name: &str, document: Document) -> CoreResult<usize> {
        self.append_many(db, name, vec![document])
    }

    /// Appends documents in the order supplied and returns how many were
    /// appended.
    ///
    /// Either all documents are persisted or none are. An empty batch
    /// returns 0 without rewriting the file.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the collection does not exist
    /// - `Corruption` if the existing data file is unreadable
    /// - `Io` if the rewrite fails; the previous contents remain
    pub fn append_many(&self, db: &str, name: &str, documents: Vec<Document>) -> CoreResult<usize> {
        let result = {
            let _guard = self.ctx.lock_collection(db, name, LockMode::Exclusive)?;
            self.append_locked(db, name, documents)
        };
        self.forget_if_missing(result)
    }

    fn append_locked(&self, db: &str, name: &str, documents: Vec<Document>) -> CoreResult<usize> {
        let mut current = self.read_documents(db, name)?;
        let added = documents.len();
        if added == 0 {
            return Ok(0);
        }
        current.extend(documents);

        let data_file = self.ctx.layout.collection_data_file(db, name)?;
        self.ctx.write_file(&data_file, &self.ctx.encode(&current)?)?;

        debug!(database = db, collection = name, added, total = current.len(), "documents appended");
        Ok(added)
    }

    /// Returns whether the collection exists.
    pub fn exists(&self, db: &str, name: &str) -> CoreResult<bool> {
        let data_file = self.ctx.layout.collection_data_file(db, name)?;
        Ok(self.ctx.backend.exists(&data_file))
    }

    /// Drops idle lock entries after a lookup of a missing collection, so
    /// misses do not accumulate in the lock map. The guard must be released.
    fn forget_if_missing<T>(&self, result: CoreResult<T>) -> CoreResult<T> {
        if matches!(&result, Err(e) if e.kind() == ErrorKind::NotFound) {
            self.ctx.locks.prune();
        }
        result
    }

    /// Reads and decodes the data file. The caller holds the lock.
    fn read_documents(&self, db: &str, name: &str) -> CoreResult<Vec<Document>> {
        let data_file = self.ctx.layout.collection_data_file(db, name)?;
        let data = self
            .ctx
            .backend
            .read(&data_file)?
            .ok_or_else(|| CoreError::not_found(ObjectKind::Collection, qualified(db, name)))?;
        decode_documents(&data, &data_file)
    }
}

fn qualified(db: &str, collection: &str) -> String {
    format!("{db}/{collection}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::layout::Layout;
    use serde_json::json;
    use std::path::Path;
    use std::thread;
    use waterview_storage::{FileBackend, InMemoryBackend, StorageBackend};

    fn doc(value: serde_json::Value) -> Document {
        crate::query::document_from_value(value).unwrap()
    }

    fn setup(backend: Arc<dyn StorageBackend>, data_dir: &Path) -> (CollectionStore, DatabaseDirs) {
        backend.create_dir_all(data_dir).unwrap();
        let ctx = Arc::new(StoreContext::new(backend, Layout::new(data_dir), Config::default()));
        let dirs = DatabaseDirs::new(Arc::clone(&ctx));
        dirs.create_database("testDB").unwrap();
        (CollectionStore::new(ctx, dirs.clone()), dirs)
    }

    fn memory_store() -> (CollectionStore, DatabaseDirs, Arc<InMemoryBackend>) {
        let backend = Arc::new(InMemoryBackend::new());
        let (store, dirs) = setup(backend.clone(), Path::new("/data"));
        (store, dirs, backend)
    }

    #[test]
    fn create_writes_empty_array_and_registers() {
        let (store, dirs, backend) = memory_store();

        store.create_collection("testDB", "users").unwrap();

        let data = backend
            .read(Path::new("/data/testDB/users/data.json"))
            .unwrap()
            .unwrap();
        assert_eq!(serde_json::from_slice::<serde_json::Value>(&data).unwrap(), json!([]));
        assert_eq!(dirs.connect("testDB").unwrap().collections, vec!["users"]);
        assert!(store.load_all("testDB", "users").unwrap().is_empty());
    }

    #[test]
    fn create_twice_fails() {
        let (store, _, _) = memory_store();
        store.create_collection("testDB", "users").unwrap();

        let err = store.create_collection("testDB", "users").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AlreadyExists);
    }

    #[test]
    fn create_in_missing_database_fails() {
        let (store, _, backend) = memory_store();

        let err = store.create_collection("nope", "users").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert!(!backend.exists(Path::new("/data/nope")));
    }

    #[test]
    fn create_rolls_back_when_registry_is_unwritable() {
        let (store, _, backend) = memory_store();
        // A corrupt registry makes the registration step fail.
        backend
            .write_atomic(Path::new("/data/testDB/registry.json"), b"garbage", false)
            .unwrap();

        let err = store.create_collection("testDB", "users").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Corruption);
        assert!(!backend.exists(Path::new("/data/testDB/users")));
    }

    #[test]
    fn append_preserves_order() {
        let (store, _, _) = memory_store();
        store.create_collection("testDB", "users").unwrap();

        assert_eq!(store.append_one("testDB", "users", doc(json!({"n": 0}))).unwrap(), 1);
        let batch = (1..5).map(|n| doc(json!({ "n": n }))).collect();
        assert_eq!(store.append_many("testDB", "users", batch).unwrap(), 4);

        let ns: Vec<_> = store
            .load_all("testDB", "users")
            .unwrap()
            .iter()
            .map(|d| d["n"].as_i64().unwrap())
            .collect();
        assert_eq!(ns, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn append_empty_batch_is_noop() {
        let (store, _, _) = memory_store();
        store.create_collection("testDB", "users").unwrap();

        assert_eq!(store.append_many("testDB", "users", Vec::new()).unwrap(), 0);
        assert!(store.load_all("testDB", "users").unwrap().is_empty());

        let err = store.append_many("testDB", "ghost", Vec::new()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn append_to_missing_collection_fails() {
        let (store, _, backend) = memory_store();

        let err = store
            .append_one("testDB", "ghost", doc(json!({"a": 1})))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert!(!backend.exists(Path::new("/data/testDB/ghost")));
    }

    #[test]
    fn corrupt_data_file_is_reported() {
        let (store, _, backend) = memory_store();
        store.create_collection("testDB", "users").unwrap();
        backend
            .write_atomic(Path::new("/data/testDB/users/data.json"), b"[1, 2, 3]", false)
            .unwrap();

        let err = store.load_all("testDB", "users").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Corruption);

        let err = store
            .append_one("testDB", "users", doc(json!({"a": 1})))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Corruption);
    }

    #[test]
    fn delete_removes_and_unregisters() {
        let (store, dirs, backend) = memory_store();
        store.create_collection("testDB", "users").unwrap();
        store.append_one("testDB", "users", doc(json!({"a": 1}))).unwrap();

        store.delete_collection("testDB", "users").unwrap();

        assert!(!backend.exists(Path::new("/data/testDB/users")));
        assert!(dirs.connect("testDB").unwrap().collections.is_empty());
        assert_eq!(
            store.load_all("testDB", "users").unwrap_err().kind(),
            ErrorKind::NotFound
        );
        assert_eq!(
            store.delete_collection("testDB", "users").unwrap_err().kind(),
            ErrorKind::NotFound
        );
    }

    #[test]
    fn delete_clears_registry_entry_without_directory() {
        let (store, dirs, backend) = memory_store();
        store.create_collection("testDB", "users").unwrap();
        // The directory went away but the registry still lists it.
        backend.remove_dir_all(Path::new("/data/testDB/users")).unwrap();
        assert_eq!(dirs.connect("testDB").unwrap().collections, vec!["users"]);

        store.delete_collection("testDB", "users").unwrap();

        assert!(dirs.connect("testDB").unwrap().collections.is_empty());
        assert_eq!(
            store.delete_collection("testDB", "users").unwrap_err().kind(),
            ErrorKind::NotFound
        );
    }

    #[test]
    fn missing_collections_leave_no_lock_entries() {
        let (store, _, _) = memory_store();
        store.create_collection("testDB", "users").unwrap();

        for i in 0..50 {
            let name = format!("typo{i}");
            assert!(store.load_all("testDB", &name).is_err());
            assert!(store.append_one("testDB", &name, doc(json!({"a": 1}))).is_err());
            assert!(store.delete_collection("testDB", &name).is_err());
        }

        assert!(store.ctx.locks.is_empty());
        assert!(store.load_all("testDB", "users").unwrap().is_empty());
    }

    #[test]
    fn concurrent_appends_are_serialized() {
        let temp = tempfile::tempdir().unwrap();
        let (store, _) = setup(Arc::new(FileBackend::new()), temp.path());
        store.create_collection("testDB", "hits").unwrap();

        let threads = 8;
        let per_thread = 10;
        let handles: Vec<_> = (0..threads)
            .map(|t| {
                let store = store.clone();
                thread::spawn(move || {
                    for i in 0..per_thread {
                        store
                            .append_one("testDB", "hits", doc(json!({"t": t, "i": i})))
                            .unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let docs = store.load_all("testDB", "hits").unwrap();
        assert_eq!(docs.len(), threads * per_thread);

        let stray: Vec<_> = std::fs::read_dir(temp.path().join("testDB").join("hits"))
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .filter(|name| name != "data.json")
            .collect();
        assert!(stray.is_empty(), "left temporary files behind: {stray:?}");
    }
}
