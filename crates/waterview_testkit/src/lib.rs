//! # Waterview Testkit
//!
//! Test utilities for Waterview.
//!
//! This crate provides:
//! - Test fixtures and store helpers
//! - A fault-injecting storage backend
//! - Property-based test generators using proptest
//! - Concurrent stress testing utilities
//!
//! ## Usage
//!
//! ```rust,ignore
//! use waterview_testkit::prelude::*;
//!
//! #[test]
//! fn test_with_store() {
//!     with_temp_store(|store| {
//!         let db = store.create_database("testDB").unwrap();
//!         // ... test operations
//!     });
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod faulty;
pub mod fixtures;
pub mod generators;
pub mod stress;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::faulty::*;
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use crate::stress::*;
}

pub use faulty::*;
pub use fixtures::*;
pub use generators::*;
pub use stress::*;
