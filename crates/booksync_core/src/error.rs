//! Error types for BookSync core.

use crate::timestamp::ParseTimestampError;
use thiserror::Error;

/// Result type for record store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Result type for delta computations.
pub type DeltaResult<T> = Result<T, DeltaError>;

/// Errors raised by a record store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The store could not be reached.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// A query did not complete within the configured deadline.
    #[error("store query timed out")]
    Timeout,

    /// A stored document does not have the expected shape.
    #[error("malformed document {id}: {reason}")]
    MalformedDocument {
        /// Identifier of the offending document.
        id: String,
        /// What was wrong with it.
        reason: String,
    },

    /// Document not found.
    #[error("document not found: {id} in collection {collection}")]
    NotFound {
        /// The collection searched.
        collection: String,
        /// The identifier that was not found.
        id: String,
    },

    /// A document with the same identifier already exists.
    #[error("document already exists: {id} in collection {collection}")]
    AlreadyExists {
        /// The target collection.
        collection: String,
        /// The conflicting identifier.
        id: String,
    },

    /// Any other backend failure.
    #[error("backend error: {0}")]
    Backend(String),
}

impl StoreError {
    /// Creates a malformed-document error.
    pub fn malformed(id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedDocument {
            id: id.into(),
            reason: reason.into(),
        }
    }
}

/// Errors produced while computing a delta.
#[derive(Debug, Error)]
pub enum DeltaError {
    /// No reference date was supplied.
    #[error("missing reference date")]
    MissingParameter,

    /// The reference date could not be parsed.
    #[error("invalid reference date: {0}")]
    InvalidFormat(#[from] ParseTimestampError),

    /// The record store failed.
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

impl DeltaError {
    /// Returns true if the caller is at fault.
    pub fn is_client_error(&self) -> bool {
        matches!(self, DeltaError::MissingParameter | DeltaError::InvalidFormat(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delta_error_classification() {
        assert!(DeltaError::MissingParameter.is_client_error());
        assert!(!DeltaError::Store(StoreError::Timeout).is_client_error());
    }

    #[test]
    fn malformed_display() {
        let err = StoreError::malformed("book-1", "missing createdAt");
        let msg = err.to_string();
        assert!(msg.contains("book-1"));
        assert!(msg.contains("missing createdAt"));
    }
}
