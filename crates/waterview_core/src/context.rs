//! State shared by the directory manager and the collection store.

use crate::config::Config;
use crate::error::{CoreError, CoreResult};
use crate::layout::Layout;
use crate::lock::{LockGuard, LockManager, LockMode};
use std::path::Path;
use std::sync::Arc;
use waterview_storage::StorageBackend;

/// Backend, layout, locks and configuration of one open store.
pub(crate) struct StoreContext {
    pub(crate) backend: Arc<dyn StorageBackend>,
    pub(crate) layout: Layout,
    pub(crate) locks: LockManager,
    pub(crate) config: Config,
}

impl StoreContext {
    pub(crate) fn new(backend: Arc<dyn StorageBackend>, layout: Layout, config: Config) -> Self {
        let file_locks = config.cross_process_locks && backend.is_persistent();
        Self {
            locks: LockManager::new(config.lock_timeout, file_locks),
            backend,
            layout,
            config,
        }
    }

    /// Locks a database's registry.
    pub(crate) fn lock_registry(&self, db: &str, mode: LockMode) -> CoreResult<LockGuard> {
        let key = self.layout.database_registry_file(db)?;
        let lock_file = self.layout.lock_file(db, None)?;
        self.locks.acquire(&key, Some(&lock_file), mode)
    }

    /// Locks a collection.
    pub(crate) fn lock_collection(
        &self,
        db: &str,
        collection: &str,
        mode: LockMode,
    ) -> CoreResult<LockGuard> {
        let key = self.layout.collection_path(db, collection)?;
        let lock_file = self.layout.lock_file(db, Some(collection))?;
        self.locks.acquire(&key, Some(&lock_file), mode)
    }

    /// Atomically replaces `path` with `data`, honouring `sync_writes`.
    pub(crate) fn write_file(&self, path: &Path, data: &[u8]) -> CoreResult<()> {
        self.backend.write_atomic(path, data, self.config.sync_writes)?;
        Ok(())
    }

    /// Serializes `value` as configured (pretty or compact).
    pub(crate) fn encode<T: serde::Serialize + ?Sized>(&self, value: &T) -> CoreResult<Vec<u8>> {
        let data = if self.config.pretty {
            serde_json::to_vec_pretty(value)
        } else {
            serde_json::to_vec(value)
        };
        data.map_err(|e| CoreError::Io(e.into()))
    }
}
