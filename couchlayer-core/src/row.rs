//! Raw documents as returned by the store.

use serde_json::{Map, Value};

/// One raw document, keyed by field name.
///
/// Rows are produced by [`normalize`](crate::normalize::normalize) and are never modified
/// afterwards; a record replaces its rows wholesale on every operation.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Row {
    fields: Map<String, Value>,
}

impl Row {
    pub(crate) fn new(fields: Map<String, Value>) -> Self {
        Self { fields }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    /// The document id (`_id`), if present and a string.
    pub fn id(&self) -> Option<&str> {
        self.get("_id").and_then(Value::as_str)
    }

    /// The document revision (`_rev`), if present and a string.
    pub fn revision(&self) -> Option<&str> {
        self.get("_rev").and_then(Value::as_str)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn into_fields(self) -> Map<String, Value> {
        self.fields
    }
}
