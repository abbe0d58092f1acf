//! The synchronous document store.
//!
//! [`DocumentStore`] ties the database directory manager, the collection
//! store and the query engine together behind one handle. Every collection
//! operation takes a [`Connection`], which names the database it acts on;
//! there is no process-wide "current database".
//!
//! ```rust,ignore
//! use waterview_core::{DocumentStore, Predicate};
//! use serde_json::json;
//!
//! let store = DocumentStore::open("./data")?;
//! let db = store.create_database("testDB")?;
//! store.create_collection(&db, "users")?;
//! store.insert(&db, "users", json!({"name": "Rahul", "age": 20}))?;
//!
//! let hit = store.get_where(&db, "users", &Predicate::all().with("age", 20))?;
//! ```

use crate::collection::{Collection as TypedCollection, CollectionStore};
use crate::config::Config;
use crate::context::StoreContext;
use crate::dir::DatabaseDirs;
use crate::error::{CoreError, CoreResult, ObjectKind};
use crate::layout::Layout;
use crate::query::{self, document_from_value, Document, Predicate};
use crate::registry::Registry;
use crate::selection;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};
use waterview_storage::{FileBackend, InMemoryBackend, StorageBackend};

/// A handle naming one existing database.
///
/// Only [`DocumentStore::create_database`], [`DocumentStore::connect`],
/// [`DocumentStore::open_database`] and [`DocumentStore::connect_default`]
/// hand these out. A connection does not
/// pin the database: if it is deleted, later operations report `NotFound`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Connection {
    database: String,
}

impl Connection {
    /// Name of the connected database.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.database
    }
}

impl std::fmt::Display for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.database)
    }
}

/// A JSON document store rooted at one data directory.
///
/// Cloning is cheap; clones share locks and configuration, so concurrent
/// writers on clones are serialized per collection.
#[derive(Clone)]
pub struct DocumentStore {
    ctx: Arc<StoreContext>,
    dirs: DatabaseDirs,
    collections: CollectionStore,
}

impl DocumentStore {
    /// Opens a store on the local filesystem with the default configuration.
    ///
    /// The data directory is created if missing.
    pub fn open(data_dir: impl AsRef<Path>) -> CoreResult<Self> {
        Self::open_with_config(data_dir, Config::default())
    }

    /// Opens a store on the local filesystem.
    pub fn open_with_config(data_dir: impl AsRef<Path>, config: Config) -> CoreResult<Self> {
        let backend = FileBackend::new().sync_directories(config.sync_writes);
        Self::with_backend(data_dir, config, Arc::new(backend))
    }

    /// Opens an in-memory store, useful for tests.
    pub fn open_in_memory() -> CoreResult<Self> {
        Self::with_backend("/", Config::default(), Arc::new(InMemoryBackend::new()))
    }

    /// Opens a store over an arbitrary backend.
    pub fn with_backend(
        data_dir: impl AsRef<Path>,
        config: Config,
        backend: Arc<dyn StorageBackend>,
    ) -> CoreResult<Self> {
        let data_dir = data_dir.as_ref().to_path_buf();
        backend.create_dir_all(&data_dir)?;

        let ctx = Arc::new(StoreContext::new(backend, Layout::new(&data_dir), config));
        let dirs = DatabaseDirs::new(Arc::clone(&ctx));
        let collections = CollectionStore::new(Arc::clone(&ctx), dirs.clone());

        debug!(data_dir = %data_dir.display(), "store opened");
        Ok(Self {
            ctx,
            dirs,
            collections,
        })
    }

    /// Returns the store configuration.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.ctx.config
    }

    /// Returns the data directory.
    #[must_use]
    pub fn data_dir(&self) -> &Path {
        self.ctx.layout.data_dir()
    }

    /// Returns the path of a collection's data file.
    pub fn data_file(&self, conn: &Connection, collection: &str) -> CoreResult<PathBuf> {
        self.ctx.layout.collection_data_file(conn.name(), collection)
    }

    // ========================================================================
    // Databases
    // ========================================================================

    /// Creates a database and connects to it.
    ///
    /// Recording the selection happens after the database exists; if that
    /// write fails it is logged and the connection is still returned.
    ///
    /// # Errors
    ///
    /// - `Validation` if `name` is malformed
    /// - `AlreadyExists` if the database exists
    pub fn create_database(&self, name: &str) -> CoreResult<Connection> {
        let registry = self.dirs.create_database(name)?;
        self.select(&registry);
        Ok(Connection {
            database: registry.name,
        })
    }

    /// Connects to an existing database and records it as the selection.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the database directory or its registry is missing or
    ///   unreadable
    pub fn connect(&self, name: &str) -> CoreResult<Connection> {
        let registry = self.dirs.connect(name)?;
        self.select(&registry);
        Ok(Connection {
            database: registry.name,
        })
    }

    /// Opens an existing database without touching the selection.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the database directory or its registry is missing or
    ///   unreadable
    pub fn open_database(&self, name: &str) -> CoreResult<Connection> {
        let registry = self.dirs.connect(name)?;
        Ok(Connection {
            database: registry.name,
        })
    }

    /// Opens the database recorded in `config.json`. The file is only read.
    ///
    /// # Errors
    ///
    /// - `NotFound` if no database is recorded, or the recorded one is gone
    /// - `Corruption` if `config.json` is unreadable
    pub fn connect_default(&self) -> CoreResult<Connection> {
        match self.selected_database()? {
            Some(name) => self.open_database(&name),
            None => Err(CoreError::not_found(
                ObjectKind::Path,
                self.ctx.layout.config_file().display().to_string(),
            )),
        }
    }

    /// Returns the name recorded in `config.json`, if any.
    pub fn selected_database(&self) -> CoreResult<Option<String>> {
        Ok(selection::load(&self.ctx)?.map(|registry| registry.name))
    }

    /// Deletes a database and everything in it.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the database does not exist
    pub fn delete_database(&self, name: &str) -> CoreResult<()> {
        self.dirs.delete_database(name)
    }

    /// Names of all databases, sorted.
    pub fn list_databases(&self) -> CoreResult<Vec<String>> {
        self.dirs.list_databases()
    }

    /// Reads the registry of the connected database.
    pub fn registry(&self, conn: &Connection) -> CoreResult<Registry> {
        self.dirs.connect(conn.name())
    }

    /// Names of the registered collections, in creation order.
    pub fn list_collections(&self, conn: &Connection) -> CoreResult<Vec<String>> {
        Ok(self.registry(conn)?.collections)
    }

    /// Rewrites a database's registry from the collections on disk.
    pub fn rebuild_registry(&self, name: &str) -> CoreResult<Registry> {
        self.dirs.rebuild_registry(name)
    }

    fn select(&self, registry: &Registry) {
        if !self.ctx.config.track_selection {
            return;
        }
        if let Err(e) = selection::record(&self.ctx, registry) {
            warn!(database = %registry.name, error = %e, "selection not recorded");
        }
    }

    // ========================================================================
    // Collections
    // ========================================================================

    /// Creates an empty collection in the connected database.
    ///
    /// # Errors
    ///
    /// - `Validation` if `name` is malformed
    /// - `AlreadyExists` if the collection exists
    /// - `NotFound` if the database was deleted
    pub fn create_collection(&self, conn: &Connection, name: &str) -> CoreResult<()> {
        self.collections.create_collection(conn.name(), name)
    }

    /// Deletes a collection and its documents.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the collection does not exist
    pub fn delete_collection(&self, conn: &Connection, name: &str) -> CoreResult<()> {
        self.collections.delete_collection(conn.name(), name)
    }

    /// Appends one document. Returns 1.
    ///
    /// # Errors
    ///
    /// - `Validation` if `document` is not a JSON object
    /// - `NotFound` if the collection does not exist
    pub fn insert(&self, conn: &Connection, collection: &str, document: Value) -> CoreResult<usize> {
        let document = document_from_value(document)?;
        self.collections
            .append_one(conn.name(), collection, document)
    }

    /// Appends documents in order, all or nothing. Returns how many were
    /// appended.
    ///
    /// Every value is checked before anything is written.
    pub fn insert_many<I>(&self, conn: &Connection, collection: &str, documents: I) -> CoreResult<usize>
    where
        I: IntoIterator<Item = Value>,
    {
        let documents = documents
            .into_iter()
            .map(document_from_value)
            .collect::<CoreResult<Vec<Document>>>()?;
        let added = self
            .collections
            .append_many(conn.name(), collection, documents)?;
        if added > 0 {
            info!(database = conn.name(), collection, added, "documents inserted");
        }
        Ok(added)
    }

    /// Returns every document in stored order.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the collection does not exist
    /// - `Corruption` if the data file is unreadable
    pub fn get_all(&self, conn: &Connection, collection: &str) -> CoreResult<Vec<Document>> {
        self.collections.load_all(conn.name(), collection)
    }

    /// Returns the first document matching `predicate`, or `None`.
    pub fn get_where(
        &self,
        conn: &Connection,
        collection: &str,
        predicate: &Predicate,
    ) -> CoreResult<Option<Document>> {
        let documents = self.get_all(conn, collection)?;
        Ok(query::first_match(&documents, predicate).cloned())
    }

    /// Returns every document matching `predicate`, in stored order.
    pub fn find(
        &self,
        conn: &Connection,
        collection: &str,
        predicate: &Predicate,
    ) -> CoreResult<Vec<Document>> {
        let documents = self.get_all(conn, collection)?;
        Ok(query::filter(&documents, predicate).cloned().collect())
    }

    /// Counts the documents matching `predicate`.
    pub fn count_where(
        &self,
        conn: &Connection,
        collection: &str,
        predicate: &Predicate,
    ) -> CoreResult<usize> {
        let documents = self.get_all(conn, collection)?;
        Ok(query::filter(&documents, predicate).count())
    }

    /// Returns a typed view of a collection.
    ///
    /// The collection is not checked here; operations on the view report
    /// `NotFound` if it does not exist.
    #[must_use]
    pub fn collection<T>(&self, conn: &Connection, name: &str) -> TypedCollection<T>
    where
        T: Serialize + DeserializeOwned,
    {
        TypedCollection::new(self.clone(), conn.clone(), name.to_string())
    }

    /// Returns whether the collection exists in the connected database.
    pub fn collection_exists(&self, conn: &Connection, collection: &str) -> CoreResult<bool> {
        self.collections.exists(conn.name(), collection)
    }
}

impl std::fmt::Debug for DocumentStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentStore")
            .field("data_dir", &self.data_dir())
            .field("config", &self.ctx.config)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use serde_json::json;
    use tempfile::tempdir;

    fn seeded() -> (DocumentStore, Connection) {
        let store = DocumentStore::open_in_memory().unwrap();
        let db = store.create_database("testDB").unwrap();
        store.create_collection(&db, "testCollection").unwrap();
        store
            .insert_many(
                &db,
                "testCollection",
                vec![
                    json!({"name": "Rahul", "age": 20}),
                    json!({"name": "John", "age": 30}),
                ],
            )
            .unwrap();
        (store, db)
    }

    #[test]
    fn insert_then_get_all() {
        let (store, db) = seeded();
        let docs = store.get_all(&db, "testCollection").unwrap();
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0]["name"], "Rahul");
        assert_eq!(docs[1]["name"], "John");
    }

    #[test]
    fn get_where_returns_first_match() {
        let (store, db) = seeded();
        store
            .insert(&db, "testCollection", json!({"name": "Asha", "age": 20}))
            .unwrap();

        let hit = store
            .get_where(&db, "testCollection", &Predicate::all().with("age", 20))
            .unwrap()
            .unwrap();
        assert_eq!(hit["name"], "Rahul");
    }

    #[test]
    fn get_where_without_match_is_none() {
        let (store, db) = seeded();
        let miss = store
            .get_where(&db, "testCollection", &Predicate::all().with("age", 99))
            .unwrap();
        assert!(miss.is_none());
    }

    #[test]
    fn find_and_count() {
        let (store, db) = seeded();
        store
            .insert(&db, "testCollection", json!({"name": "Asha", "age": 20.0}))
            .unwrap();

        let pred = Predicate::all().with("age", 20);
        let found = store.find(&db, "testCollection", &pred).unwrap();
        assert_eq!(found.len(), 2);
        assert_eq!(found[1]["name"], "Asha");
        assert_eq!(store.count_where(&db, "testCollection", &pred).unwrap(), 2);
        assert_eq!(store.count_where(&db, "testCollection", &Predicate::all()).unwrap(), 3);
    }

    #[test]
    fn insert_rejects_non_objects() {
        let (store, db) = seeded();
        let err = store.insert(&db, "testCollection", json!([1, 2])).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);

        let err = store
            .insert_many(&db, "testCollection", vec![json!({"ok": true}), json!(3)])
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(store.get_all(&db, "testCollection").unwrap().len(), 2);
    }

    #[test]
    fn deleted_collection_is_not_found() {
        let (store, db) = seeded();
        store.delete_collection(&db, "testCollection").unwrap();

        let err = store.get_all(&db, "testCollection").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert!(store.list_collections(&db).unwrap().is_empty());
    }

    #[test]
    fn duplicate_database_fails() {
        let (store, _) = seeded();
        let err = store.create_database("testDB").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AlreadyExists);
    }

    #[test]
    fn create_and_connect_record_selection() {
        let store = DocumentStore::open_in_memory().unwrap();
        assert!(store.selected_database().unwrap().is_none());
        assert_eq!(store.connect_default().unwrap_err().kind(), ErrorKind::NotFound);

        store.create_database("a").unwrap();
        store.create_database("b").unwrap();
        assert_eq!(store.selected_database().unwrap().as_deref(), Some("b"));

        store.connect("a").unwrap();
        assert_eq!(store.connect_default().unwrap().name(), "a");
    }

    #[test]
    fn selection_descriptor_follows_collections() {
        let store = DocumentStore::open_in_memory().unwrap();
        let db = store.create_database("testDB").unwrap();
        store.create_collection(&db, "users").unwrap();
        store.create_collection(&db, "posts").unwrap();
        store.delete_collection(&db, "users").unwrap();

        let descriptor = selection::load(&store.ctx).unwrap().unwrap();
        assert_eq!(descriptor, store.registry(&db).unwrap());
        assert_eq!(descriptor.collections, vec!["posts"]);
    }

    #[test]
    fn open_database_leaves_selection_alone() {
        let store = DocumentStore::open_in_memory().unwrap();
        store.create_database("a").unwrap();
        store.create_database("b").unwrap();
        store.connect("a").unwrap();

        assert_eq!(store.open_database("b").unwrap().name(), "b");
        assert_eq!(store.connect_default().unwrap().name(), "a");
        assert_eq!(store.selected_database().unwrap().as_deref(), Some("a"));
        assert_eq!(store.open_database("c").unwrap_err().kind(), ErrorKind::NotFound);
    }

    #[test]
    fn selection_tracking_can_be_disabled() {
        let backend = Arc::new(InMemoryBackend::new());
        let config = Config::default().track_selection(false);
        let store = DocumentStore::with_backend("/data", config, backend.clone()).unwrap();

        store.create_database("a").unwrap();
        assert!(store.selected_database().unwrap().is_none());
        assert!(!backend.exists(Path::new("/data/config.json")));
    }

    #[test]
    fn delete_database_then_connect_fails() {
        let (store, db) = seeded();
        store.delete_database(db.name()).unwrap();

        assert!(store.list_databases().unwrap().is_empty());
        assert_eq!(store.connect("testDB").unwrap_err().kind(), ErrorKind::NotFound);
        assert_eq!(
            store.get_all(&db, "testCollection").unwrap_err().kind(),
            ErrorKind::NotFound
        );
    }

    #[test]
    fn on_disk_layout() {
        let dir = tempdir().unwrap();
        let store = DocumentStore::open(dir.path()).unwrap();
        let db = store.create_database("testDB").unwrap();
        store.create_collection(&db, "users").unwrap();
        store.insert(&db, "users", json!({"name": "Rahul"})).unwrap();

        let registry: Value =
            serde_json::from_slice(&std::fs::read(dir.path().join("testDB/registry.json")).unwrap())
                .unwrap();
        assert_eq!(registry, json!({"name": "testDB", "collections": ["users"]}));

        let data: Value = serde_json::from_slice(
            &std::fs::read(dir.path().join("testDB/users/data.json")).unwrap(),
        )
        .unwrap();
        assert_eq!(data, json!([{"name": "Rahul"}]));

        let selected: Value =
            serde_json::from_slice(&std::fs::read(dir.path().join("config.json")).unwrap()).unwrap();
        assert_eq!(selected["name"], "testDB");

        assert_eq!(store.data_file(&db, "users").unwrap(), dir.path().join("testDB/users/data.json"));
    }

    #[test]
    fn reopen_sees_existing_data() {
        let dir = tempdir().unwrap();
        {
            let store = DocumentStore::open(dir.path()).unwrap();
            let db = store.create_database("testDB").unwrap();
            store.create_collection(&db, "users").unwrap();
            store.insert(&db, "users", json!({"n": 1})).unwrap();
        }

        let store = DocumentStore::open(dir.path()).unwrap();
        let db = store.connect_default().unwrap();
        assert_eq!(db.name(), "testDB");
        assert!(store.collection_exists(&db, "users").unwrap());
        assert_eq!(store.get_all(&db, "users").unwrap().len(), 1);
    }
}
