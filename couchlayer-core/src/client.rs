//! Store client abstraction for revision-versioned document stores.
//!
//! The core never talks to the network itself. Everything it needs from a document store
//! is expressed by the [`StoreClient`] trait: fetch a document, create one, update one under
//! a revision, delete one under a revision, run a selector query and create a database.
//!
//! # Status versus failure
//!
//! A client distinguishes two kinds of outcome:
//!
//! - The store answered. The call returns `Ok(StoreResponse)` carrying the store's
//!   [`StoreStatus`] and decoded body, whatever that status is.
//! - The call itself failed (connection refused, timeout, undecodable bytes). The call returns
//!   `Err(DocumentStoreError::Transport)` or another non-status error.
//!
//! Deciding which statuses count as success is left to the caller, since the accepted set
//! differs per operation.
//!
//! # Examples
//!
//! ```ignore
//! use couchlayer::client::{StoreClient, FindRequest, Selector};
//! use serde_json::json;
//!
//! let client = InMemoryCouch::new();
//! client.create_database("users").await?;
//!
//! let response = client
//!     .create("users", Some("alice"), json!({ "name": "Alice" }).as_object().cloned().unwrap())
//!     .await?;
//! assert_eq!(response.status, StoreStatus::Created);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use async_trait::async_trait;
use serde_json::{Map, Value};
use std::{fmt, fmt::Debug, sync::Arc};

use crate::error::{DocumentStoreError, DocumentStoreResult};

/// A JSON document body as exchanged with the store.
pub type DocumentBody = Map<String, Value>;

/// Status codes reported by a document store.
///
/// The named variants are the ones the operations in this crate give meaning to.
/// Anything else is preserved as [`StoreStatus::Other`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreStatus {
    /// 200
    Ok,
    /// 201
    Created,
    /// 202
    Accepted,
    /// 304
    NotModified,
    /// 404
    NotFound,
    /// 409, a revision mismatch or an id that is already taken.
    Conflict,
    /// 412, most notably "database already exists".
    PreconditionFailed,
    Other(u16),
}

impl StoreStatus {
    pub fn from_code(code: u16) -> Self {
        match code {
            200 => StoreStatus::Ok,
            201 => StoreStatus::Created,
            202 => StoreStatus::Accepted,
            304 => StoreStatus::NotModified,
            404 => StoreStatus::NotFound,
            409 => StoreStatus::Conflict,
            412 => StoreStatus::PreconditionFailed,
            other => StoreStatus::Other(other),
        }
    }

    pub fn code(&self) -> u16 {
        match self {
            StoreStatus::Ok => 200,
            StoreStatus::Created => 201,
            StoreStatus::Accepted => 202,
            StoreStatus::NotModified => 304,
            StoreStatus::NotFound => 404,
            StoreStatus::Conflict => 409,
            StoreStatus::PreconditionFailed => 412,
            StoreStatus::Other(code) => *code,
        }
    }
}

impl fmt::Display for StoreStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            StoreStatus::Ok => "OK",
            StoreStatus::Created => "Created",
            StoreStatus::Accepted => "Accepted",
            StoreStatus::NotModified => "Not Modified",
            StoreStatus::NotFound => "Not Found",
            StoreStatus::Conflict => "Conflict",
            StoreStatus::PreconditionFailed => "Precondition Failed",
            StoreStatus::Other(code) => return write!(f, "{code}"),
        };

        write!(f, "{} {}", self.code(), reason)
    }
}

/// A decoded answer from the store: the status and the JSON object it returned.
#[derive(Debug, Clone, PartialEq)]
pub struct StoreResponse {
    pub status: StoreStatus,
    pub body: DocumentBody,
}

impl StoreResponse {
    pub fn new(status: StoreStatus, body: DocumentBody) -> Self {
        Self { status, body }
    }

    /// A response with an empty body.
    pub fn empty(status: StoreStatus) -> Self {
        Self::new(status, DocumentBody::new())
    }

    /// Builds the conventional `{"error": ..., "reason": ...}` failure body.
    pub fn failure(status: StoreStatus, error: &str, reason: &str) -> Self {
        let mut body = DocumentBody::new();
        body.insert("error".into(), Value::from(error));
        body.insert("reason".into(), Value::from(reason));

        Self::new(status, body)
    }

    /// Reads a string member of the body.
    pub fn str_field(&self, key: &str) -> Option<&str> {
        self.body.get(key).and_then(Value::as_str)
    }

    /// Human readable description of a failure body, e.g. `conflict: Document update conflict.`.
    pub fn detail(&self) -> String {
        match (self.str_field("error"), self.str_field("reason")) {
            (Some(error), Some(reason)) => format!("{error}: {reason}"),
            (Some(error), None) => error.to_string(),
            (None, Some(reason)) => reason.to_string(),
            (None, None) => "no detail".to_string(),
        }
    }
}

/// An opaque selector object handed to the store's query endpoint unchanged.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Selector(Map<String, Value>);

impl Selector {
    pub fn new(selector: Map<String, Value>) -> Self {
        Self(selector)
    }

    /// A selector matching every document.
    pub fn all() -> Self {
        let mut condition = Map::new();
        condition.insert("$gt".into(), Value::Null);

        let mut selector = Map::new();
        selector.insert("_id".into(), Value::Object(condition));

        Self(selector)
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_map(self) -> Map<String, Value> {
        self.0
    }
}

impl From<Map<String, Value>> for Selector {
    fn from(selector: Map<String, Value>) -> Self {
        Self(selector)
    }
}

impl TryFrom<Value> for Selector {
    type Error = DocumentStoreError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Object(selector) => Ok(Self(selector)),
            other => Err(DocumentStoreError::Validation(format!(
                "selector must be a JSON object, got {other}"
            ))),
        }
    }
}

/// A selector query together with its pagination window.
#[derive(Debug, Clone, PartialEq)]
pub struct FindRequest {
    pub selector: Selector,
    pub limit: usize,
    pub skip: usize,
}

impl FindRequest {
    pub fn new(selector: Selector, limit: usize, skip: usize) -> Self {
        Self { selector, limit, skip }
    }

    /// Renders the request as the JSON body of a `_find` call.
    pub fn to_body(&self) -> DocumentBody {
        let mut body = DocumentBody::new();
        body.insert("selector".into(), Value::Object(self.selector.as_map().clone()));
        body.insert("limit".into(), Value::from(self.limit));
        body.insert("skip".into(), Value::from(self.skip));
        body
    }
}

/// Abstract interface to a revision-versioned document store.
///
/// Implementers carry whatever connection state they need (host, credentials, TLS); the core
/// only ever calls these methods and interprets the returned status.
///
/// # Database argument
///
/// Every call names the logical database it targets, so a single client can be shared by all
/// record types of a process.
///
/// # Errors
///
/// Methods return `Err` only when the call could not be completed. Any answer from the store,
/// including "not found" or "conflict", is an `Ok(StoreResponse)`.
#[async_trait]
pub trait StoreClient: Send + Sync + Debug {
    /// Fetches the document with the given id.
    async fn get(&self, database: &str, id: &str) -> DocumentStoreResult<StoreResponse>;

    /// Creates a new document.
    ///
    /// With `id = None` the store assigns the id. The response body carries `id` and `rev`.
    async fn create(
        &self,
        database: &str,
        id: Option<&str>,
        document: DocumentBody,
    ) -> DocumentStoreResult<StoreResponse>;

    /// Replaces the document `id`, which must currently be at revision `revision`.
    async fn update(
        &self,
        database: &str,
        id: &str,
        document: DocumentBody,
        revision: &str,
    ) -> DocumentStoreResult<StoreResponse>;

    /// Deletes the document `id`, which must currently be at revision `revision`.
    async fn delete(
        &self,
        database: &str,
        id: &str,
        revision: &str,
    ) -> DocumentStoreResult<StoreResponse>;

    /// Runs a selector query. A successful body has the shape `{"docs": [...]}`.
    async fn find(&self, database: &str, request: FindRequest) -> DocumentStoreResult<StoreResponse>;

    /// Creates a database and reports the store's status.
    async fn create_database(&self, name: &str) -> DocumentStoreResult<StoreStatus>;

    /// Releases client resources. The default implementation is a no-op.
    ///
    /// Takes the client boxed so the call reaches the concrete client behind a
    /// `Box<dyn StoreClient>`.
    async fn shutdown_boxed(self: Box<Self>) -> DocumentStoreResult<()> {
        Ok(())
    }
}

macro_rules! forward_store_client {
    ($($target:ty { $($extra:tt)* }),* $(,)?) => {
        $(
            #[async_trait]
            impl<C> StoreClient for $target
            where
                C: StoreClient + ?Sized,
            {
                async fn get(&self, database: &str, id: &str) -> DocumentStoreResult<StoreResponse> {
                    (**self).get(database, id).await
                }

                async fn create(
                    &self,
                    database: &str,
                    id: Option<&str>,
                    document: DocumentBody,
                ) -> DocumentStoreResult<StoreResponse> {
                    (**self).create(database, id, document).await
                }

                async fn update(
                    &self,
                    database: &str,
                    id: &str,
                    document: DocumentBody,
                    revision: &str,
                ) -> DocumentStoreResult<StoreResponse> {
                    (**self).update(database, id, document, revision).await
                }

                async fn delete(
                    &self,
                    database: &str,
                    id: &str,
                    revision: &str,
                ) -> DocumentStoreResult<StoreResponse> {
                    (**self).delete(database, id, revision).await
                }

                async fn find(&self, database: &str, request: FindRequest) -> DocumentStoreResult<StoreResponse> {
                    (**self).find(database, request).await
                }

                async fn create_database(&self, name: &str) -> DocumentStoreResult<StoreStatus> {
                    (**self).create_database(name).await
                }

                $($extra)*
            }
        )*
    };
}

// Shared references cannot release the client they borrow.
forward_store_client!(
    &C {},
    Arc<C> {},
    Box<C> {
        async fn shutdown_boxed(self: Box<Self>) -> DocumentStoreResult<()> {
            C::shutdown_boxed(*self).await
        }
    },
);

/// Factory trait for constructing store clients.
#[async_trait]
pub trait StoreClientBuilder {
    type Client: StoreClient;

    async fn build(self) -> DocumentStoreResult<Self::Client>;
}
