//! In-memory store client with CouchDB semantics.
//!
//! Documents live in per-database ordered maps behind an async-aware read-write lock. Every
//! write assigns a new `N-<hex>` revision, deletes leave tombstones, and failures are reported
//! with the same statuses and `error`/`reason` bodies a CouchDB server would send.

use async_trait::async_trait;
use mea::rwlock::RwLock;
use serde_json::Value;
use std::{
    collections::{BTreeMap, HashMap},
    sync::Arc,
};
use tracing::debug;
use uuid::Uuid;

use couchlayer_core::{
    client::{DocumentBody, FindRequest, StoreClient, StoreClientBuilder, StoreResponse, StoreStatus},
    error::{DocumentStoreError, DocumentStoreResult},
};

use crate::selector::Condition;

const MISSING_DATABASE: &str = "Database does not exist.";
const UPDATE_CONFLICT: &str = "Document update conflict.";

/// One stored document, live or deleted.
#[derive(Debug, Clone)]
struct StoredDocument {
    sequence: u64,
    revision: String,
    body: DocumentBody,
    deleted: bool,
}

impl StoredDocument {
    fn is_live(&self) -> bool {
        !self.deleted
    }
}

type Database = BTreeMap<String, StoredDocument>;
type DatabaseMap = HashMap<String, Database>;

/// Thread-safe in-memory document store client.
///
/// `InMemoryCouch` is cloneable and uses an `Arc`-wrapped internal state; clones share the same
/// databases. Queries scan every document of a database in id order.
///
/// # Example
///
/// ```ignore
/// use couchlayer_memory::InMemoryCouch;
/// use couchlayer::client::StoreClient;
///
/// let client = InMemoryCouch::new();
/// client.create_database("users").await?;
///
/// let response = client.get("users", "alice").await?;
/// assert_eq!(response.status, StoreStatus::NotFound);
/// ```
#[derive(Default, Clone, Debug)]
pub struct InMemoryCouch {
    databases: Arc<RwLock<DatabaseMap>>,
}

impl InMemoryCouch {
    /// Creates a client with no databases.
    pub fn new() -> Self {
        Self {
            databases: Arc::new(RwLock::new(DatabaseMap::new())),
        }
    }

    pub fn builder() -> InMemoryCouchBuilder {
        InMemoryCouchBuilder::default()
    }

    /// Lists the database names, sorted.
    pub async fn database_names(&self) -> Vec<String> {
        let mut names = self
            .databases
            .read()
            .await
            .keys()
            .cloned()
            .collect::<Vec<_>>();
        names.sort();
        names
    }

    /// Counts the live documents of a database, `None` when it does not exist.
    pub async fn document_count(&self, database: &str) -> Option<usize> {
        self.databases
            .read()
            .await
            .get(database)
            .map(|documents| documents.values().filter(|doc| doc.is_live()).count())
    }
}

/// Writes `body` as the next revision of `id`, returning the `201` answer.
fn write_revision(documents: &mut Database, id: &str, mut body: DocumentBody) -> StoreResponse {
    let sequence = documents.get(id).map_or(1, |doc| doc.sequence + 1);
    let revision = format!("{sequence}-{}", Uuid::new_v4().simple());

    body.insert("_id".into(), Value::from(id));
    body.insert("_rev".into(), Value::from(revision.as_str()));
    body.remove("_deleted");

    documents.insert(
        id.to_string(),
        StoredDocument {
            sequence,
            revision: revision.clone(),
            body,
            deleted: false,
        },
    );

    StoreResponse::new(StoreStatus::Created, write_ack(id, &revision))
}

fn write_ack(id: &str, revision: &str) -> DocumentBody {
    let mut ack = DocumentBody::new();
    ack.insert("ok".into(), Value::Bool(true));
    ack.insert("id".into(), Value::from(id));
    ack.insert("rev".into(), Value::from(revision));
    ack
}

fn missing_database() -> StoreResponse {
    StoreResponse::failure(StoreStatus::NotFound, "not_found", MISSING_DATABASE)
}

fn conflict() -> StoreResponse {
    StoreResponse::failure(StoreStatus::Conflict, "conflict", UPDATE_CONFLICT)
}

fn bad_request(reason: &str) -> StoreResponse {
    StoreResponse::failure(StoreStatus::Other(400), "bad_request", reason)
}

/// CouchDB database names: a lowercase letter followed by lowercase letters, digits or any of
/// `_$()+-/`.
fn is_valid_database_name(name: &str) -> bool {
    let mut chars = name.chars();
    chars.next().is_some_and(|first| first.is_ascii_lowercase())
        && chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || "_$()+-/".contains(c))
}

#[async_trait]
impl StoreClient for InMemoryCouch {
    async fn get(&self, database: &str, id: &str) -> DocumentStoreResult<StoreResponse> {
        debug!(database, id, "memory get");
        let databases = self.databases.read().await;
        let Some(documents) = databases.get(database) else {
            return Ok(missing_database());
        };

        Ok(match documents.get(id) {
            Some(doc) if doc.is_live() => StoreResponse::new(StoreStatus::Ok, doc.body.clone()),
            Some(_) => StoreResponse::failure(StoreStatus::NotFound, "not_found", "deleted"),
            None => StoreResponse::failure(StoreStatus::NotFound, "not_found", "missing"),
        })
    }

    async fn create(
        &self,
        database: &str,
        id: Option<&str>,
        document: DocumentBody,
    ) -> DocumentStoreResult<StoreResponse> {
        debug!(database, id, "memory create");
        let mut databases = self.databases.write().await;
        let Some(documents) = databases.get_mut(database) else {
            return Ok(missing_database());
        };

        let id = match id {
            Some("") => return Ok(bad_request("Document id must not be empty")),
            Some(id) => id.to_string(),
            None => Uuid::new_v4().simple().to_string(),
        };

        if documents.get(&id).is_some_and(StoredDocument::is_live) {
            return Ok(conflict());
        }

        Ok(write_revision(documents, &id, document))
    }

    async fn update(
        &self,
        database: &str,
        id: &str,
        document: DocumentBody,
        revision: &str,
    ) -> DocumentStoreResult<StoreResponse> {
        debug!(database, id, revision, "memory update");
        let mut databases = self.databases.write().await;
        let Some(documents) = databases.get_mut(database) else {
            return Ok(missing_database());
        };

        let accepted = match documents.get(id) {
            Some(doc) if doc.is_live() => doc.revision == revision,
            _ => revision.is_empty(),
        };
        if !accepted {
            return Ok(conflict());
        }

        Ok(write_revision(documents, id, document))
    }

    async fn delete(
        &self,
        database: &str,
        id: &str,
        revision: &str,
    ) -> DocumentStoreResult<StoreResponse> {
        debug!(database, id, revision, "memory delete");
        let mut databases = self.databases.write().await;
        let Some(documents) = databases.get_mut(database) else {
            return Ok(missing_database());
        };

        let Some(doc) = documents.get_mut(id) else {
            return Ok(StoreResponse::failure(StoreStatus::NotFound, "not_found", "missing"));
        };
        if doc.deleted {
            return Ok(StoreResponse::failure(StoreStatus::NotFound, "not_found", "deleted"));
        }
        if doc.revision != revision {
            return Ok(conflict());
        }

        doc.sequence += 1;
        doc.revision = format!("{}-{}", doc.sequence, Uuid::new_v4().simple());
        doc.deleted = true;
        doc.body = DocumentBody::from_iter([
            ("_id".to_string(), Value::from(id)),
            ("_rev".to_string(), Value::from(doc.revision.as_str())),
            ("_deleted".to_string(), Value::Bool(true)),
        ]);

        Ok(StoreResponse::new(StoreStatus::Ok, write_ack(id, &doc.revision)))
    }

    async fn find(&self, database: &str, request: FindRequest) -> DocumentStoreResult<StoreResponse> {
        debug!(database, limit = request.limit, skip = request.skip, "memory find");
        let condition = match Condition::parse(request.selector.as_map()) {
            Ok(condition) => condition,
            Err(reason) => return Ok(bad_request(&reason)),
        };

        let databases = self.databases.read().await;
        let Some(documents) = databases.get(database) else {
            return Ok(missing_database());
        };

        let docs = documents
            .values()
            .filter(|doc| doc.is_live() && condition.matches(&doc.body))
            .skip(request.skip)
            .take(request.limit)
            .map(|doc| Value::Object(doc.body.clone()))
            .collect::<Vec<_>>();

        let mut body = DocumentBody::new();
        body.insert("docs".into(), Value::Array(docs));
        Ok(StoreResponse::new(StoreStatus::Ok, body))
    }

    async fn create_database(&self, name: &str) -> DocumentStoreResult<StoreStatus> {
        if !is_valid_database_name(name) {
            debug!(database = name, "rejecting illegal database name");
            return Ok(StoreStatus::Other(400));
        }

        let mut databases = self.databases.write().await;
        if databases.contains_key(name) {
            return Ok(StoreStatus::PreconditionFailed);
        }

        databases.insert(name.to_string(), Database::new());
        Ok(StoreStatus::Created)
    }
}

/// Builder for constructing [`InMemoryCouch`] clients.
///
/// Databases listed with [`with_database`](Self::with_database) exist as soon as the client is
/// built.
#[derive(Default, Debug)]
pub struct InMemoryCouchBuilder {
    databases: Vec<String>,
}

impl InMemoryCouchBuilder {
    pub fn with_database(mut self, name: impl Into<String>) -> Self {
        self.databases.push(name.into());
        self
    }
}

#[async_trait]
impl StoreClientBuilder for InMemoryCouchBuilder {
    type Client = InMemoryCouch;

    async fn build(self) -> DocumentStoreResult<Self::Client> {
        let client = InMemoryCouch::new();
        for name in &self.databases {
            match client.create_database(name).await? {
                StoreStatus::Created | StoreStatus::PreconditionFailed => {}
                status => {
                    return Err(DocumentStoreError::Initialization(
                        format!("cannot create database {name}: {status}"),
                    ));
                }
            }
        }
        Ok(client)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use couchlayer_core::client::Selector;
    use serde_json::json;

    fn body(value: Value) -> DocumentBody {
        value.as_object().cloned().unwrap()
    }

    async fn client_with(database: &str) -> InMemoryCouch {
        InMemoryCouch::builder().with_database(database).build().await.unwrap()
    }

    #[tokio::test]
    async fn missing_database_is_not_found() {
        let client = InMemoryCouch::new();

        let response = client.get("users", "u1").await.unwrap();

        assert_eq!(response.status, StoreStatus::NotFound);
        assert_eq!(response.str_field("reason"), Some(MISSING_DATABASE));
    }

    #[tokio::test]
    async fn create_database_reports_existing_and_illegal_names() {
        let client = InMemoryCouch::new();

        assert_eq!(client.create_database("users").await.unwrap(), StoreStatus::Created);
        assert_eq!(
            client.create_database("users").await.unwrap(),
            StoreStatus::PreconditionFailed
        );
        assert_eq!(client.create_database("Users").await.unwrap(), StoreStatus::Other(400));
        assert_eq!(client.create_database("").await.unwrap(), StoreStatus::Other(400));
        assert_eq!(client.create_database("a1_$()+-/").await.unwrap(), StoreStatus::Created);
        assert_eq!(client.database_names().await, vec!["a1_$()+-/", "users"]);
    }

    #[tokio::test]
    async fn create_assigns_id_and_first_revision() {
        let client = client_with("users").await;

        let response = client.create("users", None, body(json!({ "name": "X" }))).await.unwrap();

        assert_eq!(response.status, StoreStatus::Created);
        let id = response.str_field("id").unwrap();
        let rev = response.str_field("rev").unwrap();
        assert_eq!(id.len(), 32);
        assert!(rev.starts_with("1-"));
        assert_eq!(rev.len(), 34);

        let fetched = client.get("users", id).await.unwrap();
        assert_eq!(fetched.status, StoreStatus::Ok);
        assert_eq!(fetched.body, body(json!({ "name": "X", "_id": id, "_rev": rev })));
    }

    #[tokio::test]
    async fn create_with_taken_id_conflicts() {
        let client = client_with("users").await;
        client.create("users", Some("u1"), DocumentBody::new()).await.unwrap();

        let response = client.create("users", Some("u1"), DocumentBody::new()).await.unwrap();

        assert_eq!(response.status, StoreStatus::Conflict);
        assert_eq!(response.detail(), "conflict: Document update conflict.");
    }

    #[tokio::test]
    async fn update_requires_current_revision() {
        let client = client_with("users").await;
        let created = client.create("users", Some("u1"), DocumentBody::new()).await.unwrap();
        let rev = created.str_field("rev").unwrap().to_string();

        let stale = client.update("users", "u1", DocumentBody::new(), "1-stale").await.unwrap();
        assert_eq!(stale.status, StoreStatus::Conflict);

        let updated = client
            .update("users", "u1", body(json!({ "name": "A" })), &rev)
            .await
            .unwrap();
        assert_eq!(updated.status, StoreStatus::Created);
        assert!(updated.str_field("rev").unwrap().starts_with("2-"));
    }

    #[tokio::test]
    async fn update_without_live_document_creates_only_without_revision() {
        let client = client_with("users").await;

        let with_rev = client.update("users", "new", DocumentBody::new(), "1-a").await.unwrap();
        assert_eq!(with_rev.status, StoreStatus::Conflict);

        let without_rev = client.update("users", "new", DocumentBody::new(), "").await.unwrap();
        assert_eq!(without_rev.status, StoreStatus::Created);
    }

    #[tokio::test]
    async fn delete_leaves_a_tombstone() {
        let client = client_with("users").await;
        let created = client.create("users", Some("u1"), DocumentBody::new()).await.unwrap();
        let rev = created.str_field("rev").unwrap().to_string();

        assert_eq!(
            client.delete("users", "u1", "9-wrong").await.unwrap().status,
            StoreStatus::Conflict
        );

        let deleted = client.delete("users", "u1", &rev).await.unwrap();
        assert_eq!(deleted.status, StoreStatus::Ok);
        assert!(deleted.str_field("rev").unwrap().starts_with("2-"));

        let fetched = client.get("users", "u1").await.unwrap();
        assert_eq!(fetched.status, StoreStatus::NotFound);
        assert_eq!(fetched.str_field("reason"), Some("deleted"));
        assert_eq!(client.document_count("users").await, Some(0));

        let recreated = client.create("users", Some("u1"), DocumentBody::new()).await.unwrap();
        assert!(recreated.str_field("rev").unwrap().starts_with("3-"));
    }

    #[tokio::test]
    async fn find_filters_in_id_order_then_pages() {
        let client = client_with("users").await;
        for (id, age) in [("c", 30), ("a", 10), ("d", 40), ("b", 20)] {
            client
                .create("users", Some(id), body(json!({ "age": age })))
                .await
                .unwrap();
        }

        let request = FindRequest::new(
            Selector::try_from(json!({ "age": { "$gte": 20 } })).unwrap(),
            2,
            1,
        );
        let response = client.find("users", request).await.unwrap();

        assert_eq!(response.status, StoreStatus::Ok);
        let ids = response.body["docs"]
            .as_array()
            .unwrap()
            .iter()
            .map(|doc| doc["_id"].as_str().unwrap())
            .collect::<Vec<_>>();
        assert_eq!(ids, vec!["c", "d"]);
    }

    #[tokio::test]
    async fn find_skips_deleted_documents() {
        let client = client_with("users").await;
        let created = client.create("users", Some("gone"), DocumentBody::new()).await.unwrap();
        client
            .delete("users", "gone", created.str_field("rev").unwrap())
            .await
            .unwrap();

        let response = client
            .find("users", FindRequest::new(Selector::all(), 50, 0))
            .await
            .unwrap();

        assert_eq!(response.body["docs"], json!([]));
    }

    #[tokio::test]
    async fn find_rejects_unsupported_operators() {
        let client = client_with("users").await;
        let request = FindRequest::new(
            Selector::try_from(json!({ "name": { "$regex": "^a" } })).unwrap(),
            50,
            0,
        );

        let response = client.find("users", request).await.unwrap();

        assert_eq!(response.status, StoreStatus::Other(400));
        assert_eq!(response.str_field("error"), Some("bad_request"));
    }

    #[tokio::test]
    async fn clones_share_state() {
        let client = client_with("users").await;
        let clone = client.clone();

        clone.create("users", Some("u1"), DocumentBody::new()).await.unwrap();

        assert_eq!(client.get("users", "u1").await.unwrap().status, StoreStatus::Ok);
    }

    #[tokio::test]
    async fn builder_rejects_illegal_database_names() {
        let err = InMemoryCouch::builder()
            .with_database("Bad Name")
            .build()
            .await
            .unwrap_err();

        assert!(matches!(err, DocumentStoreError::Initialization(_)));
    }
}
