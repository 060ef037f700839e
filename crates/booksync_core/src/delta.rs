//! Delta-sync query engine.
//!
//! Given a reference timestamp `T`, every record falls into at most one of
//! two buckets:
//! - recently created: `createdAt > T`
//! - recently updated: `updatedAt > T AND createdAt <= T`
//!
//! Records untouched since `T` fall into neither. A record created after
//! `T` is never reported as updated, even if it was also modified after `T`.

use crate::document::{Document, CREATED_AT, UPDATED_AT};
use crate::error::{DeltaError, DeltaResult, StoreError};
use crate::query::{Comparison, Query};
use crate::record::BookRecord;
use crate::store::RecordStore;
use crate::timestamp::Timestamp;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

/// Collection synchronized by default.
pub const DEFAULT_COLLECTION: &str = "books";

/// Result of one delta computation.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeltaSnapshot {
    /// Instant the snapshot was assembled.
    pub last_synced_on: Timestamp,
    /// Number of recently updated records.
    pub count_updated_data: usize,
    /// Number of recently created records.
    pub count_created_data: usize,
    /// Records created after the reference, ascending by `createdAt`.
    pub recently_created_data: Vec<BookRecord>,
    /// Records created at or before the reference and updated after it,
    /// ascending by `updatedAt`.
    pub recently_updated_data: Vec<BookRecord>,
}

impl DeltaSnapshot {
    /// Assembles a snapshot stamped with the current instant.
    pub fn new(created: Vec<BookRecord>, updated: Vec<BookRecord>) -> Self {
        Self {
            last_synced_on: Timestamp::now(),
            count_updated_data: updated.len(),
            count_created_data: created.len(),
            recently_created_data: created,
            recently_updated_data: updated,
        }
    }
}

/// Validates and parses the caller's reference date.
///
/// An absent or empty value is [`DeltaError::MissingParameter`]; anything
/// that does not parse is [`DeltaError::InvalidFormat`].
pub fn parse_reference_date(raw: Option<&str>) -> DeltaResult<Timestamp> {
    match raw {
        None | Some("") => Err(DeltaError::MissingParameter),
        Some(raw) => Ok(Timestamp::parse(raw)?),
    }
}

/// Query selecting records created strictly after `reference`.
pub fn created_query(reference: Timestamp) -> Query {
    Query::new()
        .filter(CREATED_AT, Comparison::Gt, reference)
        .order_by(CREATED_AT)
}

/// Query selecting records created at or before `reference` and updated
/// strictly after it.
pub fn updated_query(reference: Timestamp) -> Query {
    Query::new()
        .filter(UPDATED_AT, Comparison::Gt, reference)
        .filter(CREATED_AT, Comparison::Le, reference)
        .order_by(UPDATED_AT)
}

/// Computes deltas against an injected record store.
///
/// The engine holds no per-call state; one instance serves any number of
/// concurrent requests.
#[derive(Clone)]
pub struct DeltaEngine {
    store: Arc<dyn RecordStore>,
    collection: String,
    timeout: Option<Duration>,
}

impl DeltaEngine {
    /// Creates an engine over the default `books` collection.
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self {
            store,
            collection: DEFAULT_COLLECTION.to_string(),
            timeout: None,
        }
    }

    /// Sets the collection to synchronize.
    pub fn with_collection(mut self, collection: impl Into<String>) -> Self {
        self.collection = collection.into();
        self
    }

    /// Bounds the store phase of each computation.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Returns the collection name.
    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Validates `reference_date` and computes the delta.
    ///
    /// The store is not touched unless the date is valid.
    pub async fn compute(&self, reference_date: Option<&str>) -> DeltaResult<DeltaSnapshot> {
        let reference = parse_reference_date(reference_date)?;
        self.compute_at(reference).await
    }

    /// Computes the delta for an already-parsed reference timestamp.
    pub async fn compute_at(&self, reference: Timestamp) -> DeltaResult<DeltaSnapshot> {
        let created_q = created_query(reference);
        let updated_q = updated_query(reference);

        tracing::debug!(
            collection = %self.collection,
            created = %created_q,
            updated = %updated_q,
            "running delta queries"
        );

        let pair = self
            .store
            .query_pair(&self.collection, &created_q, &updated_q);
        let (created_docs, updated_docs) = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, pair)
                .await
                .map_err(|_| StoreError::Timeout)??,
            None => pair.await?,
        };

        let mut created = normalize(created_docs)?;
        let mut updated = normalize(updated_docs)?;

        created.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        updated.sort_by(|a, b| a.updated_at.cmp(&b.updated_at).then_with(|| a.id.cmp(&b.id)));

        let snapshot = DeltaSnapshot::new(created, updated);
        tracing::debug!(
            reference = %reference,
            created = snapshot.count_created_data,
            updated = snapshot.count_updated_data,
            "delta computed"
        );
        Ok(snapshot)
    }
}

fn normalize(docs: Vec<Document>) -> Result<Vec<BookRecord>, StoreError> {
    docs.into_iter().map(BookRecord::try_from).collect()
}
