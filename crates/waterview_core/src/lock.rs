//! Per-resource reader/writer locks with bounded waits.
//!
//! Every collection directory and every database registry gets its own
//! `RwLock`, created on first use and shared process-wide through the
//! [`LockManager`]. Writers take the lock exclusively for a whole
//! read-modify-write cycle; readers take it shared so they never observe a
//! rename in progress.
//!
//! When cross-process locking is enabled, an `fs2` advisory lock on a file
//! under `<data_dir>/.locks/<db>/` is taken after the in-process lock, so independent
//! processes sharing a data directory are serialized too.

use crate::error::{CoreError, CoreResult};
use parking_lot::lock_api::{ArcRwLockReadGuard, ArcRwLockWriteGuard};
use parking_lot::{Mutex, RawRwLock, RwLock};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{trace, warn};

/// Whether a lock is taken for reading or writing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockMode {
    /// Many holders at once, excludes writers.
    Shared,
    /// Single holder, excludes everyone.
    Exclusive,
}

enum HeldLock {
    Shared(ArcRwLockReadGuard<RawRwLock, ()>),
    Exclusive(ArcRwLockWriteGuard<RawRwLock, ()>),
}

/// A held lock. Released on drop.
pub struct LockGuard {
    #[cfg(feature = "std")]
    _file: Option<file_lock::FileLockGuard>,
    _held: HeldLock,
    mode: LockMode,
}

impl LockGuard {
    /// Returns the mode this lock was taken in.
    #[must_use]
    pub fn mode(&self) -> LockMode {
        self.mode
    }
}

impl std::fmt::Debug for LockGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LockGuard").field("mode", &self.mode).finish()
    }
}

/// Registry of in-process locks keyed by resolved path.
///
/// # Thread Safety
///
/// The key map is behind a `Mutex` that is held only to look up or insert
/// an entry, never while waiting for a resource lock.
#[derive(Debug)]
pub struct LockManager {
    locks: Mutex<HashMap<PathBuf, Arc<RwLock<()>>>>,
    timeout: Duration,
    file_locks: bool,
}

impl LockManager {
    /// Creates a lock manager.
    ///
    /// `file_locks` enables advisory OS file locks in addition to the
    /// in-process ones.
    #[must_use]
    pub fn new(timeout: Duration, file_locks: bool) -> Self {
        if file_locks && cfg!(not(feature = "std")) {
            warn!("cross-process locks requested but the `std` feature is disabled");
        }
        Self {
            locks: Mutex::new(HashMap::new()),
            timeout,
            file_locks,
        }
    }

    /// Returns the wait bound.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Returns the number of lock entries currently tracked.
    #[must_use]
    pub fn len(&self) -> usize {
        self.locks.lock().len()
    }

    /// Returns true if no lock entries are tracked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.locks.lock().is_empty()
    }

    fn entry(&self, key: &Path) -> Arc<RwLock<()>> {
        let mut locks = self.locks.lock();
        Arc::clone(locks.entry(key.to_path_buf()).or_default())
    }

    /// Takes the shared lock on `key`.
    ///
    /// `lock_file` names the advisory lock file to use when cross-process
    /// locking is enabled.
    pub fn shared(&self, key: &Path, lock_file: Option<&Path>) -> CoreResult<LockGuard> {
        self.acquire(key, lock_file, LockMode::Shared)
    }

    /// Takes the exclusive lock on `key`.
    pub fn exclusive(&self, key: &Path, lock_file: Option<&Path>) -> CoreResult<LockGuard> {
        self.acquire(key, lock_file, LockMode::Exclusive)
    }

    /// Takes the lock on `key` in `mode`, waiting at most the configured
    /// timeout overall.
    pub fn acquire(
        &self,
        key: &Path,
        lock_file: Option<&Path>,
        mode: LockMode,
    ) -> CoreResult<LockGuard> {
        let started = Instant::now();
        let lock = self.entry(key);

        let held = match mode {
            LockMode::Shared => lock.try_read_arc_for(self.timeout).map(HeldLock::Shared),
            LockMode::Exclusive => lock.try_write_arc_for(self.timeout).map(HeldLock::Exclusive),
        };
        let held = held.ok_or_else(|| {
            warn!(resource = %key.display(), ?mode, "lock wait timed out");
            CoreError::lock_timeout(key.display().to_string(), self.timeout)
        })?;

        #[cfg(feature = "std")]
        let file = match lock_file {
            Some(path) if self.file_locks => {
                let deadline = started + self.timeout;
                Some(file_lock::FileLockGuard::acquire(path, mode, deadline, self.timeout)?)
            }
            _ => None,
        };
        #[cfg(not(feature = "std"))]
        let _ = lock_file;

        trace!(resource = %key.display(), ?mode, waited = ?started.elapsed(), "lock acquired");

        Ok(LockGuard {
            #[cfg(feature = "std")]
            _file: file,
            _held: held,
            mode,
        })
    }

    /// Drops entries that nobody holds or waits for.
    ///
    /// Called after a resource is deleted so the map does not grow without
    /// bound. An entry is only removed while the map owns the last reference,
    /// so a waiter can never end up on a lock that has been replaced.
    pub fn prune(&self) {
        self.locks.lock().retain(|_, lock| Arc::strong_count(lock) > 1);
    }
}

#[cfg(feature = "std")]
mod file_lock {
    use super::LockMode;
    use crate::error::{CoreError, CoreResult};
    use fs2::FileExt;
    use std::fs::{self, File, OpenOptions};
    use std::path::Path;
    use std::thread;
    use std::time::{Duration, Instant};

    const POLL_INTERVAL: Duration = Duration::from_millis(5);

    /// An advisory lock on a lock file, released on drop.
    pub(super) struct FileLockGuard {
        file: File,
    }

    impl FileLockGuard {
        pub(super) fn acquire(
            path: &Path,
            mode: LockMode,
            deadline: Instant,
            timeout: Duration,
        ) -> CoreResult<Self> {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            let file = OpenOptions::new()
                .read(true)
                .write(true)
                .create(true)
                .truncate(false)
                .open(path)?;

            loop {
                let attempt = match mode {
                    LockMode::Shared => FileExt::try_lock_shared(&file),
                    LockMode::Exclusive => FileExt::try_lock_exclusive(&file),
                };
                if attempt.is_ok() {
                    return Ok(Self { file });
                }
                if Instant::now() >= deadline {
                    return Err(CoreError::lock_timeout(path.display().to_string(), timeout));
                }
                thread::sleep(POLL_INTERVAL);
            }
        }
    }

    impl Drop for FileLockGuard {
        fn drop(&mut self) {
            let _ = FileExt::unlock(&self.file);
        }
    }
}
