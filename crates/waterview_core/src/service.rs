//! Async facade over [`DocumentStore`].
//!
//! Each call moves its arguments into a job on the tokio blocking pool and
//! resolves exactly once with the job's result. A call whose future is
//! dropped before the job starts is skipped; once started, a job runs to
//! completion even if nobody awaits it.

use crate::error::{CoreError, CoreResult};
use crate::query::{Document, Predicate};
use crate::registry::Registry;
use crate::store::{Connection, DocumentStore};
use serde_json::Value;
use std::io;
use tokio::sync::oneshot;
use tracing::trace;

/// Async handle to a [`DocumentStore`].
///
/// Must be used from within a tokio runtime.
///
/// ```rust,ignore
/// let service = DocumentService::new(DocumentStore::open("./data")?);
/// let db = service.create_database("testDB").await?;
/// service.create_collection(&db, "users").await?;
/// service.insert(&db, "users", json!({"name": "Rahul", "age": 20})).await?;
/// let all = service.get_all(&db, "users").await?;
/// ```
#[derive(Debug, Clone)]
pub struct DocumentService {
    store: DocumentStore,
}

impl DocumentService {
    /// Wraps a store.
    #[must_use]
    pub fn new(store: DocumentStore) -> Self {
        Self { store }
    }

    /// The underlying synchronous store.
    #[must_use]
    pub fn store(&self) -> &DocumentStore {
        &self.store
    }

    async fn run<T, F>(&self, op: &'static str, job: F) -> CoreResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&DocumentStore) -> CoreResult<T> + Send + 'static,
    {
        let store = self.store.clone();
        let (tx, rx) = oneshot::channel();

        tokio::task::spawn_blocking(move || {
            if tx.is_closed() {
                trace!(op, "caller went away before start, skipping");
                return;
            }
            // The receiver may be gone by now; the work is done either way.
            let _ = tx.send(job(&store));
        });

        rx.await
            .map_err(|_| CoreError::Io(io::Error::other(format!("{op}: worker terminated"))))?
    }

    /// See [`DocumentStore::create_database`].
    pub async fn create_database(&self, name: &str) -> CoreResult<Connection> {
        let name = name.to_string();
        self.run("create_database", move |s| s.create_database(&name))
            .await
    }

    /// See [`DocumentStore::connect`].
    pub async fn connect(&self, name: &str) -> CoreResult<Connection> {
        let name = name.to_string();
        self.run("connect", move |s| s.connect(&name)).await
    }

    /// See [`DocumentStore::open_database`].
    pub async fn open_database(&self, name: &str) -> CoreResult<Connection> {
        let name = name.to_string();
        self.run("open_database", move |s| s.open_database(&name))
            .await
    }

    /// See [`DocumentStore::connect_default`].
    pub async fn connect_default(&self) -> CoreResult<Connection> {
        self.run("connect_default", DocumentStore::connect_default)
            .await
    }

    /// See [`DocumentStore::delete_database`].
    pub async fn delete_database(&self, name: &str) -> CoreResult<()> {
        let name = name.to_string();
        self.run("delete_database", move |s| s.delete_database(&name))
            .await
    }

    /// See [`DocumentStore::list_databases`].
    pub async fn list_databases(&self) -> CoreResult<Vec<String>> {
        self.run("list_databases", DocumentStore::list_databases)
            .await
    }

    /// See [`DocumentStore::list_collections`].
    pub async fn list_collections(&self, conn: &Connection) -> CoreResult<Vec<String>> {
        let conn = conn.clone();
        self.run("list_collections", move |s| s.list_collections(&conn))
            .await
    }

    /// See [`DocumentStore::rebuild_registry`].
    pub async fn rebuild_registry(&self, name: &str) -> CoreResult<Registry> {
        let name = name.to_string();
        self.run("rebuild_registry", move |s| s.rebuild_registry(&name))
            .await
    }

    /// See [`DocumentStore::create_collection`].
    pub async fn create_collection(&self, conn: &Connection, name: &str) -> CoreResult<()> {
        let (conn, name) = (conn.clone(), name.to_string());
        self.run("create_collection", move |s| s.create_collection(&conn, &name))
            .await
    }

    /// See [`DocumentStore::delete_collection`].
    pub async fn delete_collection(&self, conn: &Connection, name: &str) -> CoreResult<()> {
        let (conn, name) = (conn.clone(), name.to_string());
        self.run("delete_collection", move |s| s.delete_collection(&conn, &name))
            .await
    }

    /// See [`DocumentStore::insert`].
    pub async fn insert(&self, conn: &Connection, collection: &str, document: Value) -> CoreResult<usize> {
        let (conn, collection) = (conn.clone(), collection.to_string());
        self.run("insert", move |s| s.insert(&conn, &collection, document))
            .await
    }

    /// See [`DocumentStore::insert_many`].
    pub async fn insert_many(
        &self,
        conn: &Connection,
        collection: &str,
        documents: Vec<Value>,
    ) -> CoreResult<usize> {
        let (conn, collection) = (conn.clone(), collection.to_string());
        self.run("insert_many", move |s| {
            s.insert_many(&conn, &collection, documents)
        })
        .await
    }

    /// See [`DocumentStore::get_all`].
    pub async fn get_all(&self, conn: &Connection, collection: &str) -> CoreResult<Vec<Document>> {
        let (conn, collection) = (conn.clone(), collection.to_string());
        self.run("get_all", move |s| s.get_all(&conn, &collection))
            .await
    }

    /// See [`DocumentStore::get_where`].
    pub async fn get_where(
        &self,
        conn: &Connection,
        collection: &str,
        predicate: &Predicate,
    ) -> CoreResult<Option<Document>> {
        let (conn, collection, predicate) = (conn.clone(), collection.to_string(), predicate.clone());
        self.run("get_where", move |s| s.get_where(&conn, &collection, &predicate))
            .await
    }

    /// See [`DocumentStore::find`].
    pub async fn find(
        &self,
        conn: &Connection,
        collection: &str,
        predicate: &Predicate,
    ) -> CoreResult<Vec<Document>> {
        let (conn, collection, predicate) = (conn.clone(), collection.to_string(), predicate.clone());
        self.run("find", move |s| s.find(&conn, &collection, &predicate))
            .await
    }
}
