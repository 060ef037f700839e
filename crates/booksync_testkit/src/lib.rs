//! # BookSync Testkit
//!
//! Test utilities for BookSync.
//!
//! This crate provides:
//! - Document fixtures and pre-seeded stores
//! - Store doubles that count, fail, or stall
//! - Property-based generators for book collections
//!
//! ## Usage
//!
//! ```rust,ignore
//! use booksync_testkit::prelude::*;
//!
//! let store = seeded_store(vec![book("x", "2024-01-10", "2024-01-10")]);
//! let counting = CountingStore::new(store);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
}

pub use fixtures::*;
pub use generators::*;
