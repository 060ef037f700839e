//! # BookSync Core
//!
//! Delta-sync engine for the BookSync service.
//!
//! This crate provides:
//! - A millisecond-precision [`Timestamp`] with one canonical wire form
//! - The document read model ([`Document`], [`FieldValue`]) and the
//!   normalized [`BookRecord`]
//! - Range queries over timestamp fields ([`Query`])
//! - The [`RecordStore`] trait and an in-memory [`MemoryStore`]
//! - The [`DeltaEngine`], which splits changes since a reference instant
//!   into "recently created" and "recently updated"
//!
//! # Example
//!
//! ```rust,ignore
//! use booksync_core::{DeltaEngine, MemoryStore};
//! use std::sync::Arc;
//!
//! let store = Arc::new(MemoryStore::new());
//! let engine = DeltaEngine::new(store);
//! let snapshot = engine.compute(Some("2024-01-05")).await?;
//! println!("{} new, {} changed", snapshot.count_created_data, snapshot.count_updated_data);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

mod delta;
mod document;
mod error;
mod query;
mod record;
mod store;
mod timestamp;

pub use delta::{
    created_query, parse_reference_date, updated_query, DeltaEngine, DeltaSnapshot,
    DEFAULT_COLLECTION,
};
pub use document::{Document, FieldValue, CREATED_AT, ID, UPDATED_AT};
pub use error::{DeltaError, DeltaResult, StoreError, StoreResult};
pub use query::{Comparison, Filter, Query};
pub use record::BookRecord;
pub use store::{MemoryStore, RecordStore};
pub use timestamp::{ParseTimestampError, Timestamp};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
