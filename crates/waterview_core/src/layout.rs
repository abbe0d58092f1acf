//! On-disk layout of a data directory.
//!
//! ```text
//! <data_dir>/
//! ├─ config.json                      # Selected default database
//! ├─ .locks/<database>/               # Advisory lock files (optional)
//! └─ <database>/
//!    ├─ registry.json                 # {"name": ..., "collections": [...]}
//!    └─ <collection>/
//!       └─ data.json                  # JSON array of JSON objects
//! ```
//!
//! Every name that becomes a path component is validated here, so nothing
//! built from user input can escape the data directory.

use crate::error::{CoreError, CoreResult};
use std::path::{Path, PathBuf};

/// Selection file at the data directory root.
pub const CONFIG_FILE: &str = "config.json";
/// Registry file inside each database directory.
pub const REGISTRY_FILE: &str = "registry.json";
/// Data file inside each collection directory.
pub const DATA_FILE: &str = "data.json";
/// Directory for advisory lock files at the data directory root.
pub const LOCKS_DIR: &str = ".locks";
/// Longest accepted database or collection name, in bytes.
pub const MAX_NAME_LEN: usize = 255;

/// Validates a database or collection name.
///
/// Names must be non-empty, at most [`MAX_NAME_LEN`] bytes, must not contain
/// path separators or NUL, and must not start with `.` (which also rules out
/// `.` and `..`).
pub fn validate_name(name: &str) -> CoreResult<()> {
    if name.is_empty() {
        return Err(CoreError::validation("name must not be empty"));
    }
    if name.len() > MAX_NAME_LEN {
        return Err(CoreError::validation(format!(
            "name is {} bytes, limit is {MAX_NAME_LEN}",
            name.len()
        )));
    }
    if name.starts_with('.') {
        return Err(CoreError::validation(format!(
            "name must not start with '.': {name:?}"
        )));
    }
    if let Some(c) = name.chars().find(|c| matches!(c, '/' | '\\' | '\0')) {
        return Err(CoreError::validation(format!(
            "name contains forbidden character {c:?}: {name:?}"
        )));
    }
    Ok(())
}

/// Maps database and collection names to paths under one data directory.
#[derive(Debug, Clone)]
pub struct Layout {
    data_dir: PathBuf,
}

impl Layout {
    /// Creates a layout rooted at `data_dir`.
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    /// Returns the data directory.
    #[must_use]
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Path of `config.json`.
    #[must_use]
    pub fn config_file(&self) -> PathBuf {
        self.data_dir.join(CONFIG_FILE)
    }

    /// Root directory of a database.
    pub fn database_path(&self, db: &str) -> CoreResult<PathBuf> {
        validate_name(db)?;
        Ok(self.data_dir.join(db))
    }

    /// Registry file of a database.
    pub fn database_registry_file(&self, db: &str) -> CoreResult<PathBuf> {
        Ok(self.database_path(db)?.join(REGISTRY_FILE))
    }

    /// Directory of a collection.
    pub fn collection_path(&self, db: &str, collection: &str) -> CoreResult<PathBuf> {
        validate_name(collection)?;
        Ok(self.database_path(db)?.join(collection))
    }

    /// Data file of a collection.
    pub fn collection_data_file(&self, db: &str, collection: &str) -> CoreResult<PathBuf> {
        Ok(self.collection_path(db, collection)?.join(DATA_FILE))
    }

    /// Directory holding a database's advisory lock files.
    ///
    /// Kept outside the database directory so that taking a lock never
    /// recreates a deleted database.
    pub fn locks_dir(&self, db: &str) -> CoreResult<PathBuf> {
        validate_name(db)?;
        Ok(self.data_dir.join(LOCKS_DIR).join(db))
    }

    /// Advisory lock file for a collection, or for the registry when
    /// `collection` is `None`.
    pub fn lock_file(&self, db: &str, collection: Option<&str>) -> CoreResult<PathBuf> {
        let dir = self.locks_dir(db)?;
        match collection {
            Some(name) => {
                validate_name(name)?;
                Ok(dir.join(format!("{name}.lock")))
            }
            None => Ok(dir.join("registry.lock")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn paths_are_correct() {
        let layout = Layout::new("/data");

        assert_eq!(layout.config_file(), PathBuf::from("/data/config.json"));
        assert_eq!(layout.database_path("testDB").unwrap(), PathBuf::from("/data/testDB"));
        assert_eq!(
            layout.database_registry_file("testDB").unwrap(),
            PathBuf::from("/data/testDB/registry.json")
        );
        assert_eq!(
            layout.collection_path("testDB", "users").unwrap(),
            PathBuf::from("/data/testDB/users")
        );
        assert_eq!(
            layout.collection_data_file("testDB", "users").unwrap(),
            PathBuf::from("/data/testDB/users/data.json")
        );
        assert_eq!(
            layout.lock_file("testDB", Some("users")).unwrap(),
            PathBuf::from("/data/.locks/testDB/users.lock")
        );
        assert_eq!(
            layout.lock_file("testDB", None).unwrap(),
            PathBuf::from("/data/.locks/testDB/registry.lock")
        );
    }

    #[test]
    fn rejects_traversal_names() {
        let layout = Layout::new("/data");

        for bad in ["", ".", "..", "../etc", "a/b", "a\\b", ".hidden", "nul\0byte"] {
            let err = layout.database_path(bad).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Validation, "accepted {bad:?}");

            let err = layout.collection_path("db", bad).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Validation, "accepted {bad:?}");
        }
    }

    #[test]
    fn accepts_ordinary_names() {
        for good in ["testDB", "users", "with space", "dots.inside", "ünïcödé", "a..b"] {
            assert!(validate_name(good).is_ok(), "rejected {good:?}");
        }
    }

    #[test]
    fn rejects_overlong_names() {
        let name = "x".repeat(MAX_NAME_LEN + 1);
        assert!(validate_name(&name).is_err());
        assert!(validate_name(&name[..MAX_NAME_LEN]).is_ok());
    }
}
