//! Database registry: the persisted set of a database's collection names.

use crate::error::{CoreError, CoreResult};
use crate::layout::validate_name;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Contents of `registry.json`.
///
/// The same shape is used for the default-database descriptor in
/// `config.json`.
///
/// ```json
/// {"name": "testDB", "collections": ["users", "posts"]}
/// ```
///
/// `collections` has set semantics: registering a present name or
/// unregistering an absent one changes nothing. Insertion order is kept so
/// listings are stable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registry {
    /// Database name.
    pub name: String,
    /// Registered collection names.
    pub collections: Vec<String>,
}

impl Registry {
    /// Creates an empty registry for `name`.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            collections: Vec::new(),
        }
    }

    /// Adds a collection name. Returns true if the set changed.
    pub fn register(&mut self, collection: &str) -> bool {
        if self.contains(collection) {
            return false;
        }
        self.collections.push(collection.to_string());
        true
    }

    /// Removes a collection name. Returns true if the set changed.
    pub fn unregister(&mut self, collection: &str) -> bool {
        let before = self.collections.len();
        self.collections.retain(|c| c != collection);
        self.collections.len() != before
    }

    /// Returns whether `collection` is registered.
    #[must_use]
    pub fn contains(&self, collection: &str) -> bool {
        self.collections.iter().any(|c| c == collection)
    }

    /// Decodes a registry read from `path`.
    ///
    /// Fails with `Corruption` if the bytes are not a registry object or list
    /// a name that could not be a collection.
    pub fn decode(data: &[u8], path: &Path) -> CoreResult<Self> {
        let registry: Self = serde_json::from_slice(data)
            .map_err(|e| CoreError::corruption(path, format!("invalid registry: {e}")))?;

        for name in &registry.collections {
            validate_name(name).map_err(|e| {
                CoreError::corruption(path, format!("invalid collection entry: {e}"))
            })?;
        }

        Ok(registry)
    }
}
