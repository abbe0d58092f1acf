//! Shared helpers for the Waterview benchmarks.

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod utils;
