//! In-memory storage backend for testing.

use crate::backend::StorageBackend;
use crate::error::{StorageError, StorageResult};
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
enum Node {
    Dir,
    File(Vec<u8>),
}

/// An in-memory storage backend.
///
/// This backend keeps a map of paths to files and directories and is
/// suitable for:
/// - Unit tests
/// - Integration tests
/// - Ephemeral stores that don't need persistence
///
/// Filesystem roots (and the empty relative path) always exist.
///
/// # Thread Safety
///
/// This backend is thread-safe and can be shared across threads. Every
/// operation takes the internal lock once, so `write_atomic` is trivially
/// atomic.
///
/// # Example
///
/// ```rust
/// use std::path::Path;
/// use waterview_storage::{InMemoryBackend, StorageBackend};
///
/// let backend = InMemoryBackend::new();
/// backend.create_dir(Path::new("db")).unwrap();
/// assert!(backend.is_dir(Path::new("db")));
/// ```
#[derive(Debug, Default)]
pub struct InMemoryBackend {
    nodes: RwLock<BTreeMap<PathBuf, Node>>,
}

impl InMemoryBackend {
    /// Creates a new empty in-memory backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns every file path currently stored, sorted.
    ///
    /// Useful for testing and debugging.
    #[must_use]
    pub fn files(&self) -> Vec<PathBuf> {
        self.nodes
            .read()
            .iter()
            .filter(|(_, node)| matches!(node, Node::File(_)))
            .map(|(path, _)| path.clone())
            .collect()
    }

    /// Clears all files and directories.
    pub fn clear(&self) {
        self.nodes.write().clear();
    }
}

fn is_implicit_root(path: &Path) -> bool {
    path.as_os_str().is_empty() || path.parent().is_none()
}

fn dir_exists(nodes: &BTreeMap<PathBuf, Node>, path: &Path) -> bool {
    is_implicit_root(path) || matches!(nodes.get(path), Some(Node::Dir))
}

fn parent_exists(nodes: &BTreeMap<PathBuf, Node>, path: &Path) -> bool {
    match path.parent() {
        Some(parent) => dir_exists(nodes, parent),
        None => true,
    }
}

impl StorageBackend for InMemoryBackend {
    fn read(&self, path: &Path) -> StorageResult<Option<Vec<u8>>> {
        match self.nodes.read().get(path) {
            Some(Node::File(data)) => Ok(Some(data.clone())),
            Some(Node::Dir) => Err(StorageError::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("{} is a directory", path.display()),
            ))),
            None => Ok(None),
        }
    }

    fn write_atomic(&self, path: &Path, data: &[u8], _sync: bool) -> StorageResult<()> {
        let mut nodes = self.nodes.write();
        if !parent_exists(&nodes, path) {
            return Err(StorageError::not_found(path));
        }
        if matches!(nodes.get(path), Some(Node::Dir)) {
            return Err(StorageError::already_exists(path));
        }
        nodes.insert(path.to_path_buf(), Node::File(data.to_vec()));
        Ok(())
    }

    fn create_dir(&self, path: &Path) -> StorageResult<()> {
        let mut nodes = self.nodes.write();
        if nodes.contains_key(path) || is_implicit_root(path) {
            return Err(StorageError::already_exists(path));
        }
        if !parent_exists(&nodes, path) {
            return Err(StorageError::not_found(path));
        }
        nodes.insert(path.to_path_buf(), Node::Dir);
        Ok(())
    }

    fn create_dir_all(&self, path: &Path) -> StorageResult<()> {
        let mut nodes = self.nodes.write();
        let mut missing = Vec::new();
        for ancestor in path.ancestors() {
            if is_implicit_root(ancestor) {
                break;
            }
            match nodes.get(ancestor) {
                Some(Node::Dir) => break,
                Some(Node::File(_)) => {
                    return Err(StorageError::NotADirectory {
                        path: ancestor.to_path_buf(),
                    })
                }
                None => missing.push(ancestor.to_path_buf()),
            }
        }
        for dir in missing {
            nodes.insert(dir, Node::Dir);
        }
        Ok(())
    }

    fn remove_dir_all(&self, path: &Path) -> StorageResult<()> {
        let mut nodes = self.nodes.write();
        match nodes.get(path) {
            Some(Node::Dir) => {}
            Some(Node::File(_)) => {
                return Err(StorageError::NotADirectory {
                    path: path.to_path_buf(),
                })
            }
            None => return Err(StorageError::not_found(path)),
        }
        nodes.retain(|p, _| !p.starts_with(path));
        Ok(())
    }

    fn exists(&self, path: &Path) -> bool {
        is_implicit_root(path) || self.nodes.read().contains_key(path)
    }

    fn is_dir(&self, path: &Path) -> bool {
        dir_exists(&self.nodes.read(), path)
    }

    fn list_dirs(&self, path: &Path) -> StorageResult<Vec<String>> {
        let nodes = self.nodes.read();
        if !dir_exists(&nodes, path) {
            return Err(StorageError::NotADirectory {
                path: path.to_path_buf(),
            });
        }

        // BTreeMap iteration is sorted by path, and children of one parent
        // differ only in their last component, so names come out sorted.
        let names = nodes
            .iter()
            .filter(|(p, node)| matches!(node, Node::Dir) && p.parent() == Some(path))
            .filter_map(|(p, _)| p.file_name())
            .map(|name| name.to_string_lossy().into_owned())
            .collect();
        Ok(names)
    }

    fn is_persistent(&self) -> bool {
        false
    }
}
