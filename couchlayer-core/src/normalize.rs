//! Normalization of store responses into rows.
//!
//! The store answers a fetch with the document itself and a query with `{"docs": [...]}`.
//! [`normalize`] folds both shapes into an ordered list of [`Row`]s so that callers never
//! need to know which endpoint produced a response:
//!
//! 1. `"docs"` holding an array yields one row per element, in order.
//! 2. Otherwise a response carrying `"_id"` is a single document and yields one row.
//! 3. Anything else yields no rows.

use serde_json::{Map, Value};

use crate::{
    error::{DocumentStoreError, DocumentStoreResult},
    row::Row,
};

/// Converts a raw store response into rows.
///
/// # Errors
///
/// Fails with [`DocumentStoreError::MalformedResponse`] when an element of `"docs"` is not a
/// JSON object. No other input is rejected.
pub fn normalize(response: &Map<String, Value>) -> DocumentStoreResult<Vec<Row>> {
    if let Some(Value::Array(docs)) = response.get("docs") {
        return docs
            .iter()
            .enumerate()
            .map(|(index, doc)| match doc {
                Value::Object(fields) => Ok(Row::new(fields.clone())),
                other => Err(DocumentStoreError::MalformedResponse(format!(
                    "docs[{index}] is not an object: {other}"
                ))),
            })
            .collect();
    }

    if response.contains_key("_id") {
        return Ok(vec![Row::new(response.clone())]);
    }

    Ok(Vec::new())
}
