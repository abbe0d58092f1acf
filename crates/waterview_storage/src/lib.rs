//! # Waterview Storage
//!
//! Storage backend trait and implementations for Waterview.
//!
//! This crate provides the lowest-level storage abstraction for Waterview.
//! Storage backends are **opaque whole-file stores** addressed by path - they
//! do not interpret the JSON they store.
//!
//! ## Design Principles
//!
//! - Backends read and replace whole files; there is no partial update
//! - Replacement is atomic: write a temporary sibling, then rename it over
//!   the target
//! - No knowledge of registries, collections, or documents
//! - Must be `Send + Sync` for concurrent access
//!
//! ## Available Backends
//!
//! - [`InMemoryBackend`] - For testing and ephemeral storage
//! - [`FileBackend`] - For persistent storage using OS file APIs
//!
//! ## Example
//!
//! ```rust
//! use std::path::Path;
//! use waterview_storage::{InMemoryBackend, StorageBackend};
//!
//! let backend = InMemoryBackend::new();
//! backend.create_dir_all(Path::new("/data/db")).unwrap();
//! backend.write_atomic(Path::new("/data/db/registry.json"), b"{}", true).unwrap();
//! let data = backend.read(Path::new("/data/db/registry.json")).unwrap();
//! assert_eq!(data.as_deref(), Some(&b"{}"[..]));
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod backend;
mod error;
mod file;
mod memory;

pub use backend::StorageBackend;
pub use error::{StorageError, StorageResult};
pub use file::FileBackend;
pub use memory::InMemoryBackend;
