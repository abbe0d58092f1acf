//! Fault injection for storage backends.
//!
//! [`FaultyBackend`] wraps another backend and fails or slows down
//! `write_atomic` on demand. An injected failure happens before the inner
//! backend is called, which is exactly what a crash or I/O error before the
//! rename looks like: the target file keeps its previous contents.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use waterview_testkit::FaultyBackend;
//!
//! let backend = Arc::new(FaultyBackend::in_memory());
//! let store = DocumentStore::with_backend("/data", Config::default(), backend.clone())?;
//! // ... set up
//! backend.fail_next_writes(1);
//! assert!(store.insert_many(&db, "c", docs).is_err());
//! ```

use parking_lot::Mutex;
use std::io;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use waterview_storage::{InMemoryBackend, StorageBackend, StorageError, StorageResult};

/// A storage backend wrapper that can inject write failures.
pub struct FaultyBackend {
    inner: Arc<dyn StorageBackend>,
    /// Writes left to fail; `usize::MAX` fails every write.
    failures_left: AtomicUsize,
    /// Only writes to files with this name fail, if set.
    fail_file_name: Mutex<Option<String>>,
    write_delay: Mutex<Duration>,
    writes_started: AtomicUsize,
    writes_failed: AtomicUsize,
}

impl FaultyBackend {
    /// Wraps `inner`. No faults are armed.
    pub fn new(inner: Arc<dyn StorageBackend>) -> Self {
        Self {
            inner,
            failures_left: AtomicUsize::new(0),
            fail_file_name: Mutex::new(None),
            write_delay: Mutex::new(Duration::ZERO),
            writes_started: AtomicUsize::new(0),
            writes_failed: AtomicUsize::new(0),
        }
    }

    /// Wraps a fresh [`InMemoryBackend`].
    pub fn in_memory() -> Self {
        Self::new(Arc::new(InMemoryBackend::new()))
    }

    /// Fails the next `count` atomic writes.
    pub fn fail_next_writes(&self, count: usize) {
        self.failures_left.store(count, Ordering::SeqCst);
    }

    /// Fails every atomic write until [`reset`](Self::reset).
    pub fn fail_all_writes(&self) {
        self.failures_left.store(usize::MAX, Ordering::SeqCst);
    }

    /// Restricts armed failures to files named `name` (e.g. `registry.json`).
    pub fn only_fail_file(&self, name: &str) {
        *self.fail_file_name.lock() = Some(name.to_string());
    }

    /// Sleeps this long inside every atomic write, before writing.
    pub fn set_write_delay(&self, delay: Duration) {
        *self.write_delay.lock() = delay;
    }

    /// Disarms all faults and delays. Counters are kept.
    pub fn reset(&self) {
        self.failures_left.store(0, Ordering::SeqCst);
        *self.fail_file_name.lock() = None;
        *self.write_delay.lock() = Duration::ZERO;
    }

    /// Number of atomic writes attempted so far.
    pub fn writes_started(&self) -> usize {
        self.writes_started.load(Ordering::SeqCst)
    }

    /// Number of atomic writes failed by injection.
    pub fn writes_failed(&self) -> usize {
        self.writes_failed.load(Ordering::SeqCst)
    }

    /// The wrapped backend.
    pub fn inner(&self) -> &Arc<dyn StorageBackend> {
        &self.inner
    }

    fn should_fail(&self, path: &Path) -> bool {
        if let Some(name) = self.fail_file_name.lock().as_deref() {
            if path.file_name().and_then(|n| n.to_str()) != Some(name) {
                return false;
            }
        }
        self.failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| match left {
                0 => None,
                usize::MAX => Some(usize::MAX),
                n => Some(n - 1),
            })
            .is_ok()
    }
}

impl StorageBackend for FaultyBackend {
    fn read(&self, path: &Path) -> StorageResult<Option<Vec<u8>>> {
        self.inner.read(path)
    }

    fn write_atomic(&self, path: &Path, data: &[u8], sync: bool) -> StorageResult<()> {
        self.writes_started.fetch_add(1, Ordering::SeqCst);

        let delay = *self.write_delay.lock();
        if !delay.is_zero() {
            thread::sleep(delay);
        }

        if self.should_fail(path) {
            self.writes_failed.fetch_add(1, Ordering::SeqCst);
            return Err(StorageError::Io(io::Error::new(
                io::ErrorKind::Other,
                format!("injected write failure: {}", path.display()),
            )));
        }
        self.inner.write_atomic(path, data, sync)
    }

    fn create_dir(&self, path: &Path) -> StorageResult<()> {
        self.inner.create_dir(path)
    }

    fn create_dir_all(&self, path: &Path) -> StorageResult<()> {
        self.inner.create_dir_all(path)
    }

    fn remove_dir_all(&self, path: &Path) -> StorageResult<()> {
        self.inner.remove_dir_all(path)
    }

    fn exists(&self, path: &Path) -> bool {
        self.inner.exists(path)
    }

    fn is_dir(&self, path: &Path) -> bool {
        self.inner.is_dir(path)
    }

    fn list_dirs(&self, path: &Path) -> StorageResult<Vec<String>> {
        self.inner.list_dirs(path)
    }

    fn is_persistent(&self) -> bool {
        self.inner.is_persistent()
    }
}
