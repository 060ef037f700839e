//! Normalized book records.

use crate::document::{Document, FieldValue, CREATED_AT, ID, UPDATED_AT};
use crate::error::StoreError;
use crate::timestamp::Timestamp;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;

/// A record ready to be returned to a syncing client.
///
/// The two timestamp fields are lifted out of the field map. Everything
/// else is carried verbatim in `fields`.
#[derive(Debug, Clone, PartialEq)]
pub struct BookRecord {
    /// Document identifier.
    pub id: String,
    /// Creation instant. Never changes after insert.
    pub created_at: Timestamp,
    /// Last mutation instant. Never earlier than `created_at`.
    pub updated_at: Timestamp,
    /// Domain fields (title, author, ...), ordered by name.
    pub fields: BTreeMap<String, FieldValue>,
}

impl BookRecord {
    /// Returns a domain field by name.
    pub fn field(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }
}

impl TryFrom<Document> for BookRecord {
    type Error = StoreError;

    fn try_from(mut doc: Document) -> Result<Self, Self::Error> {
        let created_at = take_timestamp(&mut doc, CREATED_AT)?;
        let updated_at = take_timestamp(&mut doc, UPDATED_AT)?;

        // The identifier is authoritative over a stored field of the same name.
        doc.fields.remove(ID);

        if updated_at < created_at {
            tracing::warn!(
                id = %doc.id,
                created_at = %created_at,
                updated_at = %updated_at,
                "record updated before it was created"
            );
        }

        Ok(Self {
            id: doc.id,
            created_at,
            updated_at,
            fields: doc.fields,
        })
    }
}

fn take_timestamp(doc: &mut Document, name: &str) -> Result<Timestamp, StoreError> {
    match doc.fields.remove(name) {
        Some(FieldValue::Timestamp(ts)) => Ok(ts),
        Some(other) => Err(StoreError::malformed(
            &doc.id,
            format!("{name} has type {}, expected timestamp", other.type_name()),
        )),
        None => Err(StoreError::malformed(&doc.id, format!("missing {name}"))),
    }
}

impl Serialize for BookRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len() + 3))?;
        map.serialize_entry(ID, &self.id)?;
        for (name, value) in &self.fields {
            map.serialize_entry(name, value)?;
        }
        map.serialize_entry(CREATED_AT, &self.created_at)?;
        map.serialize_entry(UPDATED_AT, &self.updated_at)?;
        map.end()
    }
}
