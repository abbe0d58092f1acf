//! File-based storage backend for persistent storage.

use crate::backend::StorageBackend;
use crate::error::{StorageError, StorageResult};
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::warn;

/// A file-based storage backend.
///
/// This backend provides persistent storage using OS file APIs.
/// Data survives process restarts.
///
/// # Durability
///
/// `write_atomic` with `sync = true` follows the write-then-rename pattern:
/// 1. Write to a uniquely named temporary file next to the target
/// 2. `File::sync_all()` the temporary file
/// 3. Rename the temporary file over the target
/// 4. Fsync the parent directory so the rename itself is durable
///
/// The directory fsync runs after the visible state change. If it fails the
/// change has still happened, so the failure is logged and not reported.
/// Directory creation and removal fsync the parent only when directory sync
/// is enabled (see [`FileBackend::sync_directories`]).
///
/// # Thread Safety
///
/// The backend holds no state; every temporary file gets a fresh name, so
/// concurrent writers never share one. Serializing writers to the same target
/// is the caller's job.
///
/// # Example
///
/// ```no_run
/// use waterview_storage::{FileBackend, StorageBackend};
/// use std::path::Path;
///
/// let backend = FileBackend::new();
/// backend.write_atomic(Path::new("data.json"), b"[]", true).unwrap();
/// ```
#[derive(Debug, Clone, Copy)]
pub struct FileBackend {
    sync_dirs: bool,
}

impl Default for FileBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl FileBackend {
    /// Creates a new file backend with directory sync enabled.
    #[must_use]
    pub const fn new() -> Self {
        Self { sync_dirs: true }
    }

    /// Sets whether `create_dir` and `remove_dir_all` fsync the parent
    /// directory.
    #[must_use]
    pub const fn sync_directories(mut self, enabled: bool) -> Self {
        self.sync_dirs = enabled;
        self
    }

    /// Fsyncs the parent of `path` after a change that already took effect.
    ///
    /// Returns false if the sync failed.
    fn sync_parent(path: &Path) -> bool {
        let Some(parent) = path.parent() else {
            return true;
        };
        match Self::sync_directory(parent) {
            Ok(()) => true,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "directory sync failed after update");
                false
            }
        }
    }

    fn temp_path_for(path: &Path) -> StorageResult<PathBuf> {
        let parent = path.parent().ok_or_else(|| StorageError::not_found(path))?;
        let file_name = path
            .file_name()
            .ok_or_else(|| StorageError::not_found(path))?
            .to_string_lossy();
        Ok(parent.join(format!(".{file_name}.{}.tmp", uuid::Uuid::new_v4().simple())))
    }

    fn write_temp(temp_path: &Path, data: &[u8], sync: bool) -> io::Result<()> {
        let mut file = File::create(temp_path)?;
        file.write_all(data)?;
        if sync {
            file.sync_all()?;
        }
        Ok(())
    }

    /// Syncs a directory so that entry creation, rename and removal are
    /// durable.
    ///
    /// Windows NTFS journals metadata updates and does not support opening
    /// directories for fsync, so this is a no-op there.
    #[cfg(unix)]
    fn sync_directory(path: &Path) -> io::Result<()> {
        File::open(path)?.sync_all()
    }

    #[cfg(not(unix))]
    fn sync_directory(_path: &Path) -> io::Result<()> {
        Ok(())
    }
}

fn map_io(err: io::Error, path: &Path) -> StorageError {
    match err.kind() {
        io::ErrorKind::NotFound => StorageError::not_found(path),
        io::ErrorKind::AlreadyExists => StorageError::already_exists(path),
        _ => StorageError::Io(err),
    }
}

impl StorageBackend for FileBackend {
    fn read(&self, path: &Path) -> StorageResult<Option<Vec<u8>>> {
        match fs::read(path) {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StorageError::Io(e)),
        }
    }

    fn write_atomic(&self, path: &Path, data: &[u8], sync: bool) -> StorageResult<()> {
        let temp_path = Self::temp_path_for(path)?;

        if let Err(e) = Self::write_temp(&temp_path, data, sync) {
            let _ = fs::remove_file(&temp_path);
            return Err(map_io(e, path));
        }

        if let Err(e) = fs::rename(&temp_path, path) {
            let _ = fs::remove_file(&temp_path);
            return Err(map_io(e, path));
        }

        if sync {
            Self::sync_parent(path);
        }

        Ok(())
    }

    fn create_dir(&self, path: &Path) -> StorageResult<()> {
        fs::create_dir(path).map_err(|e| map_io(e, path))?;
        if self.sync_dirs {
            Self::sync_parent(path);
        }
        Ok(())
    }

    fn create_dir_all(&self, path: &Path) -> StorageResult<()> {
        fs::create_dir_all(path)?;
        Ok(())
    }

    fn remove_dir_all(&self, path: &Path) -> StorageResult<()> {
        if !path.exists() {
            return Err(StorageError::not_found(path));
        }
        if !path.is_dir() {
            return Err(StorageError::NotADirectory {
                path: path.to_path_buf(),
            });
        }
        fs::remove_dir_all(path).map_err(|e| map_io(e, path))?;
        if self.sync_dirs {
            Self::sync_parent(path);
        }
        Ok(())
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn is_dir(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn list_dirs(&self, path: &Path) -> StorageResult<Vec<String>> {
        if !path.is_dir() {
            return Err(StorageError::NotADirectory {
                path: path.to_path_buf(),
            });
        }

        let mut names = Vec::new();
        for entry in fs::read_dir(path)? {
            let entry = entry?;
            if entry.file_type()?.is_dir() {
                names.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        names.sort();
        Ok(names)
    }

    fn is_persistent(&self) -> bool {
        true
    }
}
