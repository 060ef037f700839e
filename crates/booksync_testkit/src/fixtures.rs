//! Test fixtures and store doubles.
//!
//! Provides convenience functions for building book documents and
//! wrappers that observe or sabotage a record store.

use async_trait::async_trait;
use booksync_core::{
    Document, MemoryStore, Query, RecordStore, StoreError, StoreResult, Timestamp, CREATED_AT,
    DEFAULT_COLLECTION, UPDATED_AT,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Parses a timestamp, panicking on invalid input.
pub fn ts(s: &str) -> Timestamp {
    Timestamp::parse(s).expect("invalid fixture timestamp")
}

/// Builds a book document with a title, an author and both timestamps.
pub fn book(id: &str, created: &str, updated: &str) -> Document {
    Document::new(id)
        .with_field("title", format!("Title {id}"))
        .with_field("author", format!("Author {id}"))
        .with_field(CREATED_AT, ts(created))
        .with_field(UPDATED_AT, ts(updated))
}

/// Creates a memory store holding `docs` in the `books` collection.
pub fn seeded_store(docs: impl IntoIterator<Item = Document>) -> Arc<MemoryStore> {
    let store = Arc::new(MemoryStore::new());
    for doc in docs {
        store.put(DEFAULT_COLLECTION, doc);
    }
    store
}

/// The two-record scenario: `x` created after 2024-01-05, `y` created
/// before and updated after it.
pub fn x_and_y() -> Vec<Document> {
    vec![
        book("x", "2024-01-10", "2024-01-10"),
        book("y", "2024-01-01", "2024-01-15"),
    ]
}

/// Store wrapper that counts calls.
pub struct CountingStore {
    inner: Arc<dyn RecordStore>,
    queries: AtomicUsize,
    pairs: AtomicUsize,
}

impl CountingStore {
    /// Wraps a store.
    pub fn new(inner: Arc<dyn RecordStore>) -> Arc<Self> {
        Arc::new(Self {
            inner,
            queries: AtomicUsize::new(0),
            pairs: AtomicUsize::new(0),
        })
    }

    /// Number of single queries issued.
    pub fn query_count(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }

    /// Number of paired queries issued.
    pub fn pair_count(&self) -> usize {
        self.pairs.load(Ordering::SeqCst)
    }

    /// True if the store was never touched.
    pub fn untouched(&self) -> bool {
        self.query_count() == 0 && self.pair_count() == 0
    }
}

#[async_trait]
impl RecordStore for CountingStore {
    async fn query(&self, collection: &str, query: &Query) -> StoreResult<Vec<Document>> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        self.inner.query(collection, query).await
    }

    async fn query_pair(
        &self,
        collection: &str,
        first: &Query,
        second: &Query,
    ) -> StoreResult<(Vec<Document>, Vec<Document>)> {
        self.pairs.fetch_add(1, Ordering::SeqCst);
        self.inner.query_pair(collection, first, second).await
    }
}

/// Store that fails every query.
pub struct FailingStore {
    message: String,
}

impl FailingStore {
    /// Creates a store whose queries fail with `StoreError::Unavailable`.
    pub fn new(message: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            message: message.into(),
        })
    }
}

#[async_trait]
impl RecordStore for FailingStore {
    async fn query(&self, _collection: &str, _query: &Query) -> StoreResult<Vec<Document>> {
        Err(StoreError::Unavailable(self.message.clone()))
    }
}

/// Store that sleeps before delegating each query.
///
/// Uses the default `query_pair`, so a pair takes one `delay` when both
/// halves run concurrently.
pub struct DelayedStore {
    inner: Arc<dyn RecordStore>,
    delay: Duration,
}

impl DelayedStore {
    /// Wraps a store.
    pub fn new(inner: Arc<dyn RecordStore>, delay: Duration) -> Arc<Self> {
        Arc::new(Self { inner, delay })
    }
}

#[async_trait]
impl RecordStore for DelayedStore {
    async fn query(&self, collection: &str, query: &Query) -> StoreResult<Vec<Document>> {
        tokio::time::sleep(self.delay).await;
        self.inner.query(collection, query).await
    }
}

/// Store that panics on every query.
pub struct PanickingStore;

impl PanickingStore {
    /// Creates the store.
    pub fn new() -> Arc<Self> {
        Arc::new(Self)
    }
}

#[async_trait]
impl RecordStore for PanickingStore {
    async fn query(&self, collection: &str, _query: &Query) -> StoreResult<Vec<Document>> {
        panic!("store invariant violated while reading {collection}");
    }
}
