//! Storage backend trait definition.

use crate::error::StorageResult;
use std::path::Path;

/// A low-level storage backend for Waterview.
///
/// Storage backends are **opaque whole-file stores**. They read files,
/// replace them atomically, and manage the directories that hold them.
/// Waterview owns all interpretation of file contents.
///
/// # Invariants
///
/// - `read` returns exactly the bytes of the last successful `write_atomic`
/// - `write_atomic` either replaces the target completely or leaves it
///   untouched; a reader never observes a partially written file
/// - `create_dir` is atomic with respect to concurrent creators: exactly one
///   of them succeeds
/// - Backends must be `Send + Sync` for concurrent access
///
/// # Implementors
///
/// - [`super::InMemoryBackend`] - For testing
/// - [`super::FileBackend`] - For persistent storage
pub trait StorageBackend: Send + Sync {
    /// Reads the whole file at `path`.
    ///
    /// Returns `Ok(None)` if the file does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the path is a directory or an I/O error occurs.
    fn read(&self, path: &Path) -> StorageResult<Option<Vec<u8>>>;

    /// Atomically replaces the file at `path` with `data`.
    ///
    /// The data is written to a temporary file in the same directory which is
    /// then renamed over `path`. When `sync` is true, the temporary file is
    /// fsynced before the rename and the directory after it.
    ///
    /// If this returns an error, `path` still holds its previous contents
    /// (or is still absent) and no temporary file is left behind.
    ///
    /// # Errors
    ///
    /// Returns an error if the parent directory does not exist or an I/O
    /// error occurs.
    fn write_atomic(&self, path: &Path, data: &[u8], sync: bool) -> StorageResult<()>;

    /// Creates a single directory.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::AlreadyExists`](crate::StorageError::AlreadyExists)
    /// if anything exists at `path`, or
    /// [`StorageError::NotFound`](crate::StorageError::NotFound) if the parent
    /// is missing.
    fn create_dir(&self, path: &Path) -> StorageResult<()>;

    /// Creates a directory and all missing parents. Existing directories are
    /// not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if a path component exists as a file or an I/O error
    /// occurs.
    fn create_dir_all(&self, path: &Path) -> StorageResult<()>;

    /// Recursively removes a directory and everything below it.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::NotFound`](crate::StorageError::NotFound) if the
    /// directory does not exist.
    fn remove_dir_all(&self, path: &Path) -> StorageResult<()>;

    /// Returns whether anything exists at `path`.
    fn exists(&self, path: &Path) -> bool;

    /// Returns whether `path` is an existing directory.
    fn is_dir(&self, path: &Path) -> bool;

    /// Lists the names of the child directories of `path`, sorted.
    ///
    /// # Errors
    ///
    /// Returns an error if `path` is not a directory.
    fn list_dirs(&self, path: &Path) -> StorageResult<Vec<String>>;

    /// Returns true if paths handled by this backend are real OS paths.
    ///
    /// Advisory file locks are only meaningful for persistent backends.
    fn is_persistent(&self) -> bool;
}
