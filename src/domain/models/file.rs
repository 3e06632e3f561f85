use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::warn;
use uuid::Uuid;

/// The only filter field compared as a number.
pub const SIZE_FIELD: &str = "size";

/// Metadata of one stored file, as returned by listings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileRecord {
    pub id: Uuid,
    pub name: String,
    pub timestamp: DateTime<Utc>,
    pub extension: String,
    pub size: i64,
    #[serde(rename = "fileBytes")]
    pub blob_id: Uuid,
    pub hidden: bool,
}

/// A file record that has not been persisted yet.
#[derive(Debug, Clone, PartialEq)]
pub struct FileUpload {
    pub name: String,
    pub timestamp: DateTime<Utc>,
    pub extension: String,
    pub size: i64,
    pub hidden: bool,
}

impl FileUpload {
    pub fn new(name: String, size: usize, timestamp: DateTime<Utc>) -> Self {
        let extension = extension_of(&name).to_string();
        Self {
            name,
            timestamp,
            extension,
            size: i64::try_from(size).unwrap_or(i64::MAX),
            hidden: false,
        }
    }
}

/// Partial update of the mutable record fields. Absent (or null) fields are
/// left untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extension: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hidden: Option<bool>,
}

impl FileUpdate {
    pub fn is_empty(&self) -> bool {
        self == &FileUpdate::default()
    }

    /// Rejects bodies that are not a JSON object, name an immutable field,
    /// or carry a value of the wrong type.
    pub fn from_json(body: &[u8]) -> Result<Self, serde_json::Error> {
        // A derived struct also accepts a sequence, matched by position.
        match serde_json::from_slice::<Value>(body)? {
            Value::Object(map) => serde_json::from_value(Value::Object(map)),
            _ => Err(serde::de::Error::custom("update body must be a JSON object")),
        }
    }
}

/// Equality filter over stored records, keyed by field name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FileFilter {
    fields: Map<String, Value>,
}

impl FileFilter {
    /// Builds a filter from query-string pairs. The first value of a repeated
    /// key wins. `size` must parse as an integer or it is dropped.
    pub fn from_query_pairs<I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut seen = HashSet::new();
        let mut fields = Map::new();

        for (key, value) in pairs {
            if !seen.insert(key.clone()) {
                continue;
            }

            if key == SIZE_FIELD {
                match value.parse::<i64>() {
                    Ok(size) => {
                        fields.insert(key, Value::from(size));
                    }
                    Err(e) => {
                        warn!(
                            "Error converting 'size' query parameter '{}' to int, skipping this parameter: {}",
                            value, e
                        );
                    }
                }
                continue;
            }

            fields.insert(key, Value::String(value));
        }

        Self { fields }
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    /// The filter as a JSON object, suitable for document containment.
    pub fn to_document(&self) -> Value {
        Value::Object(self.fields.clone())
    }
}

/// Extension of the final path element, leading dot included. Empty when
/// the name has no dot.
pub fn extension_of(name: &str) -> &str {
    match name.rfind(['.', '/']) {
        Some(idx) if name[idx..].starts_with('.') => &name[idx..],
        _ => "",
    }
}
