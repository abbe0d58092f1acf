//! Database directory management.
//!
//! A database is a directory under the data directory holding a
//! `registry.json` and one subdirectory per collection:
//!
//! ```text
//! <data_dir>/<db>/
//! ├─ registry.json     # {"name": <db>, "collections": [...]}
//! └─ <collection>/data.json
//! ```
//!
//! The registry lets the store validate collection membership without
//! scanning the filesystem. It is always re-derivable: a collection exists
//! exactly when its directory holds a data file that parses, so
//! [`DatabaseDirs::rebuild_registry`] can recreate it after a crash between
//! directory creation and the first registry write.

use crate::collection::decode_documents;
use crate::context::StoreContext;
use crate::error::{CoreError, CoreResult, ErrorKind, ObjectKind};
use crate::layout::validate_name;
use crate::lock::LockMode;
use crate::registry::Registry;
use crate::selection;
use std::sync::Arc;
use tracing::{debug, info, warn};
use waterview_storage::StorageError;

/// Creates, opens and deletes database directories and maintains their
/// registries.
///
/// Registry mutations run under the database-level lock, which is
/// independent of every collection lock.
#[derive(Clone)]
pub struct DatabaseDirs {
    ctx: Arc<StoreContext>,
}

impl DatabaseDirs {
    pub(crate) fn new(ctx: Arc<StoreContext>) -> Self {
        Self { ctx }
    }

    /// Creates a database directory with an empty registry.
    ///
    /// # Errors
    ///
    /// - `Validation` if `name` is malformed
    /// - `AlreadyExists` if the database directory exists
    /// - `Io` if the directory or registry cannot be written; the directory
    ///   is removed again in that case
    pub fn create_database(&self, name: &str) -> CoreResult<Registry> {
        let path = self.ctx.layout.database_path(name)?;

        // Non-recursive mkdir: of two concurrent creators exactly one wins.
        match self.ctx.backend.create_dir(&path) {
            Ok(()) => {}
            Err(StorageError::AlreadyExists { .. }) => {
                return Err(CoreError::already_exists(ObjectKind::Database, name));
            }
            Err(e) => return Err(e.into()),
        }

        let registry = Registry::new(name);
        if let Err(e) = self.write_registry_locked(&registry) {
            if let Err(rollback) = self.ctx.backend.remove_dir_all(&path) {
                warn!(database = name, error = %rollback, "rollback of database directory failed");
            }
            return Err(e);
        }

        info!(database = name, "database created");
        Ok(registry)
    }

    /// Opens an existing database and returns its registry.
    ///
    /// # Errors
    ///
    /// - `Validation` if `name` is malformed
    /// - `NotFound` if the directory or registry is missing or the registry
    ///   does not parse
    pub fn connect(&self, name: &str) -> CoreResult<Registry> {
        self.require_database(name)?;
        let _guard = self.ctx.lock_registry(name, LockMode::Shared)?;

        match self.load_registry(name) {
            Ok(registry) => Ok(registry),
            Err(e) if e.kind() == ErrorKind::Corruption => {
                warn!(database = name, error = %e, "registry unreadable");
                Err(CoreError::not_found(ObjectKind::Database, name))
            }
            Err(e) => Err(e),
        }
    }

    /// Adds `collection` to the registry of `db`. Registering a name that is
    /// already listed is a no-op.
    pub fn register_collection(&self, db: &str, collection: &str) -> CoreResult<()> {
        validate_name(collection)?;
        self.update_registry(db, |registry| registry.register(collection))
    }

    /// Removes `collection` from the registry of `db`. Unregistering a name
    /// that is not listed is a no-op.
    pub fn unregister_collection(&self, db: &str, collection: &str) -> CoreResult<()> {
        validate_name(collection)?;
        self.update_registry(db, |registry| registry.unregister(collection))
    }

    /// Returns whether `collection` is listed in the registry of `db`.
    pub fn is_registered(&self, db: &str, collection: &str) -> CoreResult<bool> {
        Ok(self.connect(db)?.contains(collection))
    }

    /// Recreates the registry of `db` from the collection directories that
    /// hold a valid data file.
    ///
    /// Works on databases whose registry is missing or corrupt.
    pub fn rebuild_registry(&self, db: &str) -> CoreResult<Registry> {
        let db_path = self.require_database(db)?;
        let _guard = self.ctx.lock_registry(db, LockMode::Exclusive)?;

        let mut registry = Registry::new(db);
        for name in self.ctx.backend.list_dirs(&db_path)? {
            if validate_name(&name).is_err() {
                continue;
            }
            let data_file = self.ctx.layout.collection_data_file(db, &name)?;
            // Readers need no collection lock: the data file only ever
            // changes by rename.
            match self.ctx.backend.read(&data_file)? {
                Some(data) if decode_documents(&data, &data_file).is_ok() => {
                    registry.register(&name);
                }
                _ => debug!(database = db, directory = %name, "skipping directory without valid data file"),
            }
        }

        self.write_registry(&registry)?;
        self.refresh_selection(&registry);
        info!(database = db, collections = registry.collections.len(), "registry rebuilt");
        Ok(registry)
    }

    /// Deletes a database and everything in it.
    ///
    /// Takes every collection's exclusive lock (in name order) and then the
    /// registry lock before removing the tree, so no operation on the
    /// database is in flight while it disappears.
    pub fn delete_database(&self, db: &str) -> CoreResult<()> {
        let db_path = self.require_database(db)?;

        let collections = self.ctx.backend.list_dirs(&db_path)?;
        let mut guards = Vec::with_capacity(collections.len() + 1);
        for name in collections.iter().filter(|n| validate_name(n).is_ok()) {
            guards.push(self.ctx.lock_collection(db, name, LockMode::Exclusive)?);
        }
        guards.push(self.ctx.lock_registry(db, LockMode::Exclusive)?);

        match self.ctx.backend.remove_dir_all(&db_path) {
            Ok(()) => {}
            Err(StorageError::NotFound { .. }) => {
                return Err(CoreError::not_found(ObjectKind::Database, db));
            }
            Err(e) => return Err(e.into()),
        }
        drop(guards);

        let locks_dir = self.ctx.layout.locks_dir(db)?;
        if self.ctx.backend.is_dir(&locks_dir) {
            if let Err(e) = self.ctx.backend.remove_dir_all(&locks_dir) {
                debug!(database = db, error = %e, "lock directory not removed");
            }
        }
        self.ctx.locks.prune();

        info!(database = db, "database deleted");
        Ok(())
    }

    /// Lists databases: directories under the data directory that hold a
    /// registry file.
    pub fn list_databases(&self) -> CoreResult<Vec<String>> {
        let data_dir = self.ctx.layout.data_dir();
        let mut names = Vec::new();
        for name in self.ctx.backend.list_dirs(data_dir)? {
            if validate_name(&name).is_err() {
                continue;
            }
            if self
                .ctx
                .backend
                .exists(&self.ctx.layout.database_registry_file(&name)?)
            {
                names.push(name);
            }
        }
        Ok(names)
    }

    /// Returns the database directory, or `NotFound` if it is missing.
    pub(crate) fn require_database(&self, db: &str) -> CoreResult<std::path::PathBuf> {
        let path = self.ctx.layout.database_path(db)?;
        if !self.ctx.backend.is_dir(&path) {
            return Err(CoreError::not_found(ObjectKind::Database, db));
        }
        Ok(path)
    }

    /// Reads the registry without locking.
    fn load_registry(&self, db: &str) -> CoreResult<Registry> {
        let path = self.ctx.layout.database_registry_file(db)?;
        let data = self
            .ctx
            .backend
            .read(&path)?
            .ok_or_else(|| CoreError::not_found(ObjectKind::Database, db))?;

        let registry = Registry::decode(&data, &path)?;
        if registry.name != db {
            return Err(CoreError::corruption(
                &path,
                format!("registry names database {:?}", registry.name),
            ));
        }
        Ok(registry)
    }

    fn update_registry(&self, db: &str, change: impl FnOnce(&mut Registry) -> bool) -> CoreResult<()> {
        self.require_database(db)?;
        let _guard = self.ctx.lock_registry(db, LockMode::Exclusive)?;

        let mut registry = self.load_registry(db)?;
        if change(&mut registry) {
            self.write_registry(&registry)?;
            self.refresh_selection(&registry);
            debug!(database = db, collections = ?registry.collections, "registry updated");
        }
        Ok(())
    }

    /// Keeps the `config.json` copy of a selected database's collection list
    /// current. The registry is already written, so failures are only logged.
    fn refresh_selection(&self, registry: &Registry) {
        if let Err(e) = selection::refresh(&self.ctx, registry) {
            warn!(database = %registry.name, error = %e, "selection descriptor not refreshed");
        }
    }

    fn write_registry_locked(&self, registry: &Registry) -> CoreResult<()> {
        let _guard = self.ctx.lock_registry(&registry.name, LockMode::Exclusive)?;
        self.write_registry(registry)
    }

    fn write_registry(&self, registry: &Registry) -> CoreResult<()> {
        let path = self.ctx.layout.database_registry_file(&registry.name)?;
        let data = self.ctx.encode(registry)?;
        self.ctx.write_file(&path, &data)
    }
}
