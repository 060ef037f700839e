//! Document read model returned by record stores.

use crate::error::{StoreError, StoreResult};
use crate::timestamp::Timestamp;
use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;

/// Field holding the creation instant.
pub const CREATED_AT: &str = "createdAt";
/// Field holding the last-mutation instant.
pub const UPDATED_AT: &str = "updatedAt";
/// Reserved name under which the document identifier is emitted.
pub const ID: &str = "id";

/// A dynamic field value.
///
/// Mirrors what a document database stores: JSON-like scalars and
/// containers plus a native timestamp type.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// Null value.
    Null,
    /// Boolean value.
    Bool(bool),
    /// Signed integer.
    Integer(i64),
    /// Floating point number.
    Double(f64),
    /// Text string.
    Text(String),
    /// Native timestamp.
    Timestamp(Timestamp),
    /// Array of values.
    Array(Vec<FieldValue>),
    /// Nested map, ordered by key.
    Map(BTreeMap<String, FieldValue>),
}

impl FieldValue {
    /// Returns the timestamp if this is a timestamp value.
    pub fn as_timestamp(&self) -> Option<Timestamp> {
        match self {
            FieldValue::Timestamp(ts) => Some(*ts),
            _ => None,
        }
    }

    /// Returns the text if this is a text value.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Short type name, used in diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            FieldValue::Null => "null",
            FieldValue::Bool(_) => "bool",
            FieldValue::Integer(_) => "integer",
            FieldValue::Double(_) => "double",
            FieldValue::Text(_) => "text",
            FieldValue::Timestamp(_) => "timestamp",
            FieldValue::Array(_) => "array",
            FieldValue::Map(_) => "map",
        }
    }

    /// Converts a JSON value. Strings stay text; integers that fit in
    /// `i64` become [`FieldValue::Integer`].
    pub fn from_json(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => FieldValue::Null,
            serde_json::Value::Bool(b) => FieldValue::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => FieldValue::Integer(i),
                None => n.as_f64().map_or(FieldValue::Null, FieldValue::Double),
            },
            serde_json::Value::String(s) => FieldValue::Text(s),
            serde_json::Value::Array(items) => {
                FieldValue::Array(items.into_iter().map(FieldValue::from_json).collect())
            }
            serde_json::Value::Object(map) => FieldValue::Map(
                map.into_iter()
                    .map(|(k, v)| (k, FieldValue::from_json(v)))
                    .collect(),
            ),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::Text(s.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        FieldValue::Text(s)
    }
}

impl From<i64> for FieldValue {
    fn from(i: i64) -> Self {
        FieldValue::Integer(i)
    }
}

impl From<bool> for FieldValue {
    fn from(b: bool) -> Self {
        FieldValue::Bool(b)
    }
}

impl From<Timestamp> for FieldValue {
    fn from(ts: Timestamp) -> Self {
        FieldValue::Timestamp(ts)
    }
}

impl Serialize for FieldValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            FieldValue::Null => serializer.serialize_unit(),
            FieldValue::Bool(b) => serializer.serialize_bool(*b),
            FieldValue::Integer(i) => serializer.serialize_i64(*i),
            // JSON has no NaN or infinity.
            FieldValue::Double(d) if !d.is_finite() => serializer.serialize_unit(),
            FieldValue::Double(d) => serializer.serialize_f64(*d),
            FieldValue::Text(s) => serializer.serialize_str(s),
            FieldValue::Timestamp(ts) => ts.serialize(serializer),
            FieldValue::Array(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            FieldValue::Map(entries) => {
                let mut map = serializer.serialize_map(Some(entries.len()))?;
                for (k, v) in entries {
                    map.serialize_entry(k, v)?;
                }
                map.end()
            }
        }
    }
}

/// A stored document: identifier plus field map.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    /// Document identifier, unique within its collection.
    pub id: String,
    /// All stored fields, including the timestamp fields.
    pub fields: BTreeMap<String, FieldValue>,
}

impl Document {
    /// Creates an empty document.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            fields: BTreeMap::new(),
        }
    }

    /// Adds a field (builder style).
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    /// Returns a field by name.
    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    /// Returns a field as a timestamp, if present and of timestamp type.
    pub fn timestamp(&self, name: &str) -> Option<Timestamp> {
        self.get(name).and_then(FieldValue::as_timestamp)
    }

    /// Builds a document from a JSON object.
    ///
    /// The object must carry a string `id`. `createdAt` and `updatedAt`,
    /// when present, must be timestamp strings and are stored as native
    /// timestamps; every other member is converted with
    /// [`FieldValue::from_json`].
    pub fn from_json(value: serde_json::Value) -> StoreResult<Self> {
        let serde_json::Value::Object(mut object) = value else {
            return Err(StoreError::malformed("<unknown>", "document is not a JSON object"));
        };

        let id = match object.remove(ID) {
            Some(serde_json::Value::String(id)) if !id.is_empty() => id,
            _ => return Err(StoreError::malformed("<unknown>", "missing string id")),
        };

        let mut doc = Document::new(id);
        for (name, value) in object {
            let field = if name == CREATED_AT || name == UPDATED_AT {
                let raw = value.as_str().ok_or_else(|| {
                    StoreError::malformed(&doc.id, format!("{name} is not a string"))
                })?;
                let ts = Timestamp::parse(raw)
                    .map_err(|e| StoreError::malformed(&doc.id, format!("{name}: {e}")))?;
                FieldValue::Timestamp(ts)
            } else {
                FieldValue::from_json(value)
            };
            doc.fields.insert(name, field);
        }
        Ok(doc)
    }
}
