//! Record store abstraction and an in-memory implementation.

use crate::document::{Document, FieldValue, CREATED_AT, UPDATED_AT};
use crate::error::{StoreError, StoreResult};
use crate::query::Query;
use crate::timestamp::Timestamp;
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};

/// A queryable collection of documents.
///
/// Implementations return documents that satisfy every filter of the
/// query, sorted ascending by its order field.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Runs one query against a collection.
    async fn query(&self, collection: &str, query: &Query) -> StoreResult<Vec<Document>>;

    /// Runs two independent queries.
    ///
    /// The default issues both concurrently and waits for both; the first
    /// error wins. Stores that can read from a single snapshot should
    /// override this so both results reflect the same state.
    async fn query_pair(
        &self,
        collection: &str,
        first: &Query,
        second: &Query,
    ) -> StoreResult<(Vec<Document>, Vec<Document>)> {
        tokio::try_join!(
            self.query(collection, first),
            self.query(collection, second)
        )
    }
}

/// In-memory record store.
///
/// Documents live in per-collection maps keyed by id. Both halves of
/// [`RecordStore::query_pair`] run under one read lock, so they always
/// observe the same state.
pub struct MemoryStore {
    collections: RwLock<HashMap<String, BTreeMap<String, Document>>>,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self {
            collections: RwLock::new(HashMap::new()),
        }
    }

    /// Writes a raw document, replacing any document with the same id.
    pub fn put(&self, collection: &str, doc: Document) {
        self.collections
            .write()
            .entry(collection.to_string())
            .or_default()
            .insert(doc.id.clone(), doc);
    }

    /// Inserts a new record stamped with `at` as both creation and update
    /// instant.
    pub fn insert(
        &self,
        collection: &str,
        id: impl Into<String>,
        fields: BTreeMap<String, FieldValue>,
        at: Timestamp,
    ) -> StoreResult<()> {
        let id = id.into();
        let mut collections = self.collections.write();
        let docs = collections.entry(collection.to_string()).or_default();
        if docs.contains_key(&id) {
            return Err(StoreError::AlreadyExists {
                collection: collection.to_string(),
                id,
            });
        }

        let mut doc = Document {
            id: id.clone(),
            fields,
        };
        doc.fields.insert(CREATED_AT.to_string(), FieldValue::Timestamp(at));
        doc.fields.insert(UPDATED_AT.to_string(), FieldValue::Timestamp(at));
        docs.insert(id, doc);
        Ok(())
    }

    /// Merges `fields` into an existing record and advances `updatedAt`.
    ///
    /// `createdAt` cannot be overwritten, and `updatedAt` never moves
    /// backwards: an `at` earlier than the stored value leaves it unchanged.
    pub fn update(
        &self,
        collection: &str,
        id: &str,
        fields: BTreeMap<String, FieldValue>,
        at: Timestamp,
    ) -> StoreResult<()> {
        let mut collections = self.collections.write();
        let doc = collections
            .get_mut(collection)
            .and_then(|docs| docs.get_mut(id))
            .ok_or_else(|| StoreError::NotFound {
                collection: collection.to_string(),
                id: id.to_string(),
            })?;

        for (name, value) in fields {
            if name != CREATED_AT && name != UPDATED_AT {
                doc.fields.insert(name, value);
            }
        }

        let updated_at = doc.timestamp(UPDATED_AT).map_or(at, |prev| prev.max(at));
        doc.fields
            .insert(UPDATED_AT.to_string(), FieldValue::Timestamp(updated_at));
        Ok(())
    }

    /// Returns a copy of a document.
    pub fn get(&self, collection: &str, id: &str) -> Option<Document> {
        self.collections
            .read()
            .get(collection)
            .and_then(|docs| docs.get(id))
            .cloned()
    }

    /// Returns the number of documents in a collection.
    pub fn len(&self, collection: &str) -> usize {
        self.collections
            .read()
            .get(collection)
            .map_or(0, BTreeMap::len)
    }

    /// Returns true if the collection holds no documents.
    pub fn is_empty(&self, collection: &str) -> bool {
        self.len(collection) == 0
    }

    fn run(docs: Option<&BTreeMap<String, Document>>, query: &Query) -> Vec<Document> {
        let Some(docs) = docs else {
            return Vec::new();
        };
        let mut matched: Vec<Document> = docs
            .values()
            .filter(|doc| query.matches(doc))
            .cloned()
            .collect();
        matched.sort_by(|a, b| query.compare(a, b));
        matched
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn query(&self, collection: &str, query: &Query) -> StoreResult<Vec<Document>> {
        let collections = self.collections.read();
        Ok(Self::run(collections.get(collection), query))
    }

    async fn query_pair(
        &self,
        collection: &str,
        first: &Query,
        second: &Query,
    ) -> StoreResult<(Vec<Document>, Vec<Document>)> {
        let collections = self.collections.read();
        let docs = collections.get(collection);
        Ok((Self::run(docs, first), Self::run(docs, second)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::Comparison;

    fn ts(s: &str) -> Timestamp {
        Timestamp::parse(s).unwrap()
    }

    fn title(t: &str) -> BTreeMap<String, FieldValue> {
        let mut fields = BTreeMap::new();
        fields.insert("title".to_string(), FieldValue::from(t));
        fields
    }

    #[test]
    fn insert_stamps_both_timestamps() {
        let store = MemoryStore::new();
        store
            .insert("books", "b1", title("Dune"), ts("2024-01-10"))
            .unwrap();

        let doc = store.get("books", "b1").unwrap();
        assert_eq!(doc.timestamp(CREATED_AT), Some(ts("2024-01-10")));
        assert_eq!(doc.timestamp(UPDATED_AT), Some(ts("2024-01-10")));
    }

    #[test]
    fn duplicate_insert_fails() {
        let store = MemoryStore::new();
        store
            .insert("books", "b1", title("Dune"), ts("2024-01-10"))
            .unwrap();
        let err = store
            .insert("books", "b1", title("Emma"), ts("2024-01-11"))
            .unwrap_err();
        assert!(matches!(err, StoreError::AlreadyExists { .. }));
    }

    #[test]
    fn update_never_rewinds_or_touches_created_at() {
        let store = MemoryStore::new();
        store
            .insert("books", "b1", title("Dune"), ts("2024-01-10"))
            .unwrap();

        let mut fields = title("Dune Messiah");
        fields.insert(CREATED_AT.to_string(), FieldValue::from(ts("1999-01-01")));
        store
            .update("books", "b1", fields, ts("2024-01-15"))
            .unwrap();
        store
            .update("books", "b1", BTreeMap::new(), ts("2024-01-12"))
            .unwrap();

        let doc = store.get("books", "b1").unwrap();
        assert_eq!(doc.get("title").and_then(FieldValue::as_text), Some("Dune Messiah"));
        assert_eq!(doc.timestamp(CREATED_AT), Some(ts("2024-01-10")));
        assert_eq!(doc.timestamp(UPDATED_AT), Some(ts("2024-01-15")));
    }

    #[test]
    fn update_missing_document() {
        let store = MemoryStore::new();
        let err = store
            .update("books", "nope", BTreeMap::new(), ts("2024-01-01"))
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
    }

    #[tokio::test]
    async fn query_filters_and_orders() {
        let store = MemoryStore::new();
        store.insert("books", "c", title("C"), ts("2024-01-03")).unwrap();
        store.insert("books", "a", title("A"), ts("2024-01-03")).unwrap();
        store.insert("books", "b", title("B"), ts("2024-01-02")).unwrap();
        store.insert("books", "z", title("Z"), ts("2023-12-31")).unwrap();

        let q = Query::new()
            .filter(CREATED_AT, Comparison::Gt, ts("2024-01-01"))
            .order_by(CREATED_AT);
        let ids: Vec<_> = store
            .query("books", &q)
            .await
            .unwrap()
            .into_iter()
            .map(|d| d.id)
            .collect();
        assert_eq!(ids, vec!["b", "a", "c"]);
    }

    #[tokio::test]
    async fn unknown_collection_is_empty() {
        let store = MemoryStore::new();
        let docs = store.query("books", &Query::new()).await.unwrap();
        assert!(docs.is_empty());
        assert!(store.is_empty("books"));
    }
}
