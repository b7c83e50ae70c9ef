//! Opaque record handle shared with the identity store and rule engine.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::types::RecordId;

/// A record owned by the external store.
///
/// Both the authenticated identity ("user record") and the records that
/// handlers guard with access rules use this type. It is held for the
/// duration of one request and never transformed here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    id: RecordId,
    collection: String,
    #[serde(default)]
    fields: Map<String, Value>,
}

impl Record {
    pub fn new(id: impl Into<RecordId>, collection: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            collection: collection.into(),
            fields: Map::new(),
        }
    }

    /// Set an attribute, returning the updated record.
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    pub fn id(&self) -> &RecordId {
        &self.id
    }

    /// Name of the collection the record belongs to (e.g., "users").
    pub fn collection(&self) -> &str {
        &self.collection
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }
}
