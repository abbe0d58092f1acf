//! Error types for Waterview core.

use std::fmt;
use std::io;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use waterview_storage::StorageError;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// The kind of object an `AlreadyExists` or `NotFound` error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectKind {
    /// A database directory.
    Database,
    /// A collection directory.
    Collection,
    /// Any other path (registry file, selection file, ...).
    Path,
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Database => f.write_str("database"),
            Self::Collection => f.write_str("collection"),
            Self::Path => f.write_str("path"),
        }
    }
}

/// Discriminant of [`CoreError`], for callers that only need to branch on
/// the kind of failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed name or predicate.
    Validation,
    /// Create targeted an existing database or collection.
    AlreadyExists,
    /// Operation targeted a missing database or collection.
    NotFound,
    /// A data or registry file did not parse.
    Corruption,
    /// A lock was not obtained within the configured bound.
    LockTimeout,
    /// Underlying filesystem failure.
    Io,
}

/// Errors that can occur in Waterview core operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A name or predicate was malformed.
    #[error("validation error: {message}")]
    Validation {
        /// Description of the problem.
        message: String,
    },

    /// A create operation targeted something that already exists.
    #[error("{kind} already exists: {name}")]
    AlreadyExists {
        /// What exists.
        kind: ObjectKind,
        /// Its name (or path).
        name: String,
    },

    /// An operation targeted something that does not exist.
    #[error("{kind} not found: {name}")]
    NotFound {
        /// What is missing.
        kind: ObjectKind,
        /// Its name (or path).
        name: String,
    },

    /// A file did not contain what it should.
    #[error("corrupt file {}: {message}", path.display())]
    Corruption {
        /// The offending file.
        path: PathBuf,
        /// Description of the corruption.
        message: String,
    },

    /// A lock could not be acquired in time.
    #[error("timed out after {waited:?} waiting for lock on {resource}")]
    LockTimeout {
        /// The locked resource.
        resource: String,
        /// How long the caller waited.
        waited: Duration,
    },

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl CoreError {
    /// Creates a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Creates an already-exists error.
    pub fn already_exists(kind: ObjectKind, name: impl Into<String>) -> Self {
        Self::AlreadyExists {
            kind,
            name: name.into(),
        }
    }

    /// Creates a not-found error.
    pub fn not_found(kind: ObjectKind, name: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            name: name.into(),
        }
    }

    /// Creates a corruption error.
    pub fn corruption(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Corruption {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Creates a lock timeout error.
    pub fn lock_timeout(resource: impl Into<String>, waited: Duration) -> Self {
        Self::LockTimeout {
            resource: resource.into(),
            waited,
        }
    }

    /// Returns the kind of this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation { .. } => ErrorKind::Validation,
            Self::AlreadyExists { .. } => ErrorKind::AlreadyExists,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::Corruption { .. } => ErrorKind::Corruption,
            Self::LockTimeout { .. } => ErrorKind::LockTimeout,
            Self::Io(_) => ErrorKind::Io,
        }
    }

    /// Returns true if retrying the same call may succeed.
    ///
    /// Only lock timeouts and I/O failures are transient; every other kind
    /// is a usage error that will fail again.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self.kind(), ErrorKind::LockTimeout | ErrorKind::Io)
    }
}

impl From<StorageError> for CoreError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::Io(e) => Self::Io(e),
            StorageError::NotFound { path } => {
                Self::not_found(ObjectKind::Path, path.display().to_string())
            }
            StorageError::AlreadyExists { path } => {
                Self::already_exists(ObjectKind::Path, path.display().to_string())
            }
            StorageError::NotADirectory { path } => Self::Io(io::Error::new(
                io::ErrorKind::Other,
                format!("not a directory: {}", path.display()),
            )),
        }
    }
}
