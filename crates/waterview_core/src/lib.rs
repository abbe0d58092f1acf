//! # Waterview Core
//!
//! Embedded JSON document store: databases are directories, collections
//! are subdirectories holding one `data.json` array of objects.
//!
//! This crate provides:
//! - Name validation and the on-disk layout
//! - Database directories with a per-database collection registry
//! - Collection storage with atomic whole-file rewrites
//! - Per-path reader/writer locks with bounded waits
//! - Equality-predicate queries
//! - A synchronous [`DocumentStore`] and an async [`DocumentService`]
//!
//! ## Layout
//!
//! ```text
//! <data_dir>/config.json                  # selected database
//! <data_dir>/<db>/registry.json           # {"name", "collections"}
//! <data_dir>/<db>/<collection>/data.json  # [{...}, {...}]
//! ```
//!
//! ## Example
//!
//! ```rust
//! use serde_json::json;
//! use waterview_core::{DocumentStore, Predicate};
//!
//! let store = DocumentStore::open_in_memory().unwrap();
//! let db = store.create_database("testDB").unwrap();
//! store.create_collection(&db, "users").unwrap();
//! store.insert(&db, "users", json!({"name": "Rahul", "age": 20})).unwrap();
//!
//! let rahul = store
//!     .get_where(&db, "users", &Predicate::all().with("age", 20))
//!     .unwrap();
//! assert_eq!(rahul.unwrap()["name"], "Rahul");
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod collection;
mod config;
mod context;
mod dir;
mod error;
mod layout;
mod lock;
mod query;
mod registry;
mod selection;
mod service;
mod store;

pub use collection::{decode_documents, Collection, CollectionStore};
pub use config::Config;
pub use dir::DatabaseDirs;
pub use error::{CoreError, CoreResult, ErrorKind, ObjectKind};
pub use layout::{
    validate_name, Layout, CONFIG_FILE, DATA_FILE, LOCKS_DIR, MAX_NAME_LEN, REGISTRY_FILE,
};
pub use lock::{LockGuard, LockManager, LockMode};
pub use query::{document_from_value, filter, first_match, json_eq, matches, Document, Filter, Predicate};
pub use registry::Registry;
pub use service::DocumentService;
pub use store::{Connection, DocumentStore};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
