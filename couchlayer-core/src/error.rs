//! Error types and result types for document store operations.
//!
//! Every operation on a [`DocumentRecord`](crate::document::DocumentRecord) either succeeds
//! or fails with a [`DocumentStoreError`]. Use [`DocumentStoreResult<T>`] as the return type
//! for fallible operations.

use serde_json::Error as SerdeJsonError;
use std::fmt;
use thiserror::Error;

use crate::client::StoreStatus;

/// The store call an error originated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Get,
    Create,
    Update,
    Delete,
    Find,
    CreateDatabase,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Operation::Get => "get",
            Operation::Create => "create",
            Operation::Update => "update",
            Operation::Delete => "delete",
            Operation::Find => "find",
            Operation::CreateDatabase => "create database",
        })
    }
}

/// Represents all possible errors that can occur when mapping records onto a document store.
///
/// Errors are `Clone` so that a failed operation can both return the error and retain it
/// on the record for later inspection.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DocumentStoreError {
    /// A precondition was not met; raised before any store call is made.
    #[error("Validation error: {0}")]
    Validation(String),
    /// The store answered with a status outside the accepted set for the operation.
    #[error("Store returned {status} for {operation} on {database}: {detail}")]
    Status {
        operation: Operation,
        database: String,
        status: StoreStatus,
        detail: String,
    },
    /// The underlying client call itself failed (connection, protocol, timeout).
    #[error("Transport error: {0}")]
    Transport(String),
    /// Serialization/deserialization error when converting between records and JSON.
    #[error("Serialization error: {0}")]
    Serialization(String),
    /// The store answered with a body that does not have the expected shape.
    #[error("Malformed store response: {0}")]
    MalformedResponse(String),
    /// Error during client initialization or connection setup.
    #[error("Initialization error: {0}")]
    Initialization(String),
}

impl DocumentStoreError {
    /// Returns the store status carried by a [`DocumentStoreError::Status`] error.
    pub fn status(&self) -> Option<StoreStatus> {
        match self {
            DocumentStoreError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, DocumentStoreError::Validation(_))
    }

    /// Returns `true` when the store rejected a write because of a revision mismatch.
    pub fn is_conflict(&self) -> bool {
        matches!(self.status(), Some(StoreStatus::Conflict))
    }
}

/// A specialized `Result` type for document store operations.
pub type DocumentStoreResult<T> = Result<T, DocumentStoreError>;

impl From<SerdeJsonError> for DocumentStoreError {
    fn from(err: SerdeJsonError) -> Self {
        DocumentStoreError::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_error_message_embeds_status_and_detail() {
        let err = DocumentStoreError::Status {
            operation: Operation::Create,
            database: "users".into(),
            status: StoreStatus::Conflict,
            detail: "conflict: Document update conflict.".into(),
        };

        assert_eq!(
            err.to_string(),
            "Store returned 409 Conflict for create on users: conflict: Document update conflict."
        );
        assert!(err.is_conflict());
        assert!(!err.is_validation());
    }

    #[test]
    fn serde_errors_become_serialization_errors() {
        let err: DocumentStoreError = serde_json::from_str::<serde_json::Value>("{")
            .unwrap_err()
            .into();

        assert!(matches!(err, DocumentStoreError::Serialization(_)));
        assert_eq!(err.status(), None);
    }
}
