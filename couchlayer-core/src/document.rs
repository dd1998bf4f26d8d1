//! CRUD operations over a single mapped record.
//!
//! [`DocumentRecord`] wraps one [`Record`] together with the bookkeeping the store requires:
//! the revision token, the rows of the last fetch and the last failure. Its operations decide
//! between create and update, enforce the revision discipline and translate store statuses into
//! [`DocumentStoreError`]s.
//!
//! # Lifecycle
//!
//! A record starts [`Unsaved`](RecordState::Unsaved), becomes
//! [`Persisted`](RecordState::Persisted) once it has both an identity and a revision, and ends
//! [`Deleted`](RecordState::Deleted). Every operation on a deleted record fails with a
//! validation error before reaching the store.
//!
//! # Accepted statuses
//!
//! | Operation | Success | Not an error |
//! |---|---|---|
//! | `save` | `Created`, `Accepted` | |
//! | `create` | `Created` | |
//! | `get` / `reload` | `Ok`, `NotModified` | `NotFound` (no rows) |
//! | `find` | `Ok` | |
//! | `delete` | `Ok`, `Accepted` | |
//! | `setup` | `Created`, `Accepted` | `PreconditionFailed` (already exists) |
//!
//! Every other status fails the operation.
//!
//! # Example
//!
//! ```ignore
//! let store = DocumentStore::new(InMemoryCouch::new());
//! store.setup::<User>().await?;
//!
//! let mut user = store.record(User::default());
//! user.firstname = "X".into();
//!
//! let outcome = user.save().await?;
//! user.set_identity(outcome.id);
//!
//! user.firstname = "A".into();
//! user.save().await?;
//! ```

use std::ops::{Deref, DerefMut};
use tracing::{Level, debug, error, warn};

use crate::{
    client::{FindRequest, Selector, StoreClient, StoreResponse, StoreStatus},
    cursor::Cursor,
    error::{DocumentStoreError, DocumentStoreResult, Operation},
    normalize::normalize,
    record::Record,
    row::Row,
    store::{DatabaseSetup, ensure_database},
};

const SAVE_ACCEPTS: &[StoreStatus] = &[StoreStatus::Created, StoreStatus::Accepted];
const CREATE_ACCEPTS: &[StoreStatus] = &[StoreStatus::Created];
const GET_ACCEPTS: &[StoreStatus] = &[StoreStatus::Ok, StoreStatus::NotModified];
const FIND_ACCEPTS: &[StoreStatus] = &[StoreStatus::Ok];
const DELETE_ACCEPTS: &[StoreStatus] = &[StoreStatus::Ok, StoreStatus::Accepted];

/// Where a record stands relative to the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordState {
    /// No identity or no revision yet.
    Unsaved,
    /// Identity and revision are both known.
    Persisted,
    /// Deleted from the store; terminal.
    Deleted,
}

/// Whether a write created a new document or replaced an existing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveKind {
    Created,
    Updated,
}

/// The identity and revision the store reported for a successful write.
///
/// The record's revision is updated automatically; its identity is not. Callers that let the
/// store assign an id copy it back with [`DocumentRecord::set_identity`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveOutcome {
    pub id: String,
    pub revision: String,
    pub kind: SaveKind,
}

/// A record bound to a store client, with its revision and last result set.
#[derive(Debug)]
pub struct DocumentRecord<'a, C: StoreClient + ?Sized, R: Record> {
    client: &'a C,
    database: String,
    record: R,
    revision: String,
    rows: Vec<Row>,
    last_error: Option<DocumentStoreError>,
    deleted: bool,
    auto_populate: bool,
}

impl<'a, C: StoreClient + ?Sized, R: Record> DocumentRecord<'a, C, R> {
    /// Binds `record` to `client`, targeting `R::database_name()`.
    pub fn new(client: &'a C, record: R) -> Self {
        Self {
            client,
            database: R::database_name().to_string(),
            record,
            revision: String::new(),
            rows: Vec::new(),
            last_error: None,
            deleted: false,
            auto_populate: true,
        }
    }

    /// Targets a different database than the record type's default.
    pub fn with_database(mut self, database: impl Into<String>) -> Self {
        self.database = database.into();
        self
    }

    /// Starts from a revision obtained elsewhere.
    pub fn with_revision(mut self, revision: impl Into<String>) -> Self {
        self.revision = revision.into();
        self
    }

    /// Stops [`find`](Self::find) from populating the record when exactly one row matches.
    pub fn without_auto_populate(mut self) -> Self {
        self.auto_populate = false;
        self
    }

    pub fn database(&self) -> &str {
        &self.database
    }

    /// The current revision token, empty until the document was written or fetched.
    pub fn revision(&self) -> &str {
        &self.revision
    }

    /// The rows of the last operation. Writes leave this empty.
    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    /// Materializes one record per row of the last result set.
    pub fn rows_as(&self) -> Vec<R>
    where
        R: Default,
    {
        self.rows
            .iter()
            .map(|row| {
                let mut record = R::default();
                record.populate(row);
                record
            })
            .collect()
    }

    /// The failure of the last operation, if it failed.
    pub fn last_error(&self) -> Option<&DocumentStoreError> {
        self.last_error.as_ref()
    }

    pub fn state(&self) -> RecordState {
        if self.deleted {
            RecordState::Deleted
        } else if self.record.identity().is_empty() || self.revision.is_empty() {
            RecordState::Unsaved
        } else {
            RecordState::Persisted
        }
    }

    pub fn record(&self) -> &R {
        &self.record
    }

    pub fn record_mut(&mut self) -> &mut R {
        &mut self.record
    }

    pub fn into_inner(self) -> R {
        self.record
    }

    pub fn set_identity(&mut self, identity: impl Into<String>) {
        self.record.set_identity(identity.into());
    }

    /// Populates the record from the first row, if there is one.
    ///
    /// The revision follows the populated row so that a later write is made against it.
    pub fn make_row(&mut self) {
        if let Some(row) = self.rows.first() {
            self.record.populate(row);
            if let Some(revision) = row.revision() {
                self.revision = revision.to_string();
            }
        }
    }

    /// Writes the record: an update when it has an identity, otherwise a create with a
    /// store-assigned id.
    ///
    /// # Errors
    ///
    /// Fails when the store answers anything but `Created` or `Accepted`, or when the call
    /// itself fails. The revision is left unchanged on failure.
    pub async fn save(&mut self) -> DocumentStoreResult<SaveOutcome> {
        self.begin();
        let result = self.save_document().await;
        self.finish(result)
    }

    /// Adopts `revision` (when non-empty) and then behaves like [`save`](Self::save).
    pub async fn save_with_revision(
        &mut self,
        revision: impl Into<String>,
    ) -> DocumentStoreResult<SaveOutcome> {
        let revision = revision.into();
        if !revision.is_empty() {
            self.revision = revision;
        }
        self.save().await
    }

    /// Creates a new document keyed by the record's current identity, regardless of whether
    /// one already exists. An empty identity lets the store assign one.
    ///
    /// # Errors
    ///
    /// Fails with a status error for anything but `Created`, including an id that is taken.
    pub async fn create(&mut self) -> DocumentStoreResult<SaveOutcome> {
        self.begin();
        let result = self.create_document().await;
        self.finish(result)
    }

    /// Fetches the document `id` and populates the record from it.
    ///
    /// Returns `Ok(false)` without touching the record when the store reports the document
    /// as not found.
    pub async fn get(&mut self, id: &str) -> DocumentStoreResult<bool> {
        self.begin();
        let result = self.fetch(id).await;
        self.finish(result)
    }

    /// Fetches the document named by the record's own identity. See [`get`](Self::get).
    ///
    /// # Errors
    ///
    /// Fails with a validation error, before any store call, when the identity is empty.
    pub async fn reload(&mut self) -> DocumentStoreResult<bool> {
        self.begin();
        let id = self.record.identity().to_string();
        let result = self.fetch(&id).await;
        self.finish(result)
    }

    /// Runs a selector query over the record's database and keeps the matches as rows.
    ///
    /// When exactly one row matches, the record is populated from it unless
    /// [`without_auto_populate`](Self::without_auto_populate) was set. Returns the row count.
    pub async fn find(&mut self, selector: Selector, cursor: Cursor) -> DocumentStoreResult<usize> {
        self.begin();
        let result = self.run_find(selector, cursor).await;
        self.finish(result)
    }

    /// Deletes the document. Requires both a revision and an identity.
    ///
    /// # Errors
    ///
    /// Fails with a validation error, before any store call, when the revision or the identity
    /// is empty, and with a status error for anything but `Ok` or `Accepted`.
    pub async fn delete(&mut self) -> DocumentStoreResult<()> {
        self.begin();
        let result = self.delete_document().await;
        self.finish(result)
    }

    /// Creates the record's database. An existing database is not an error.
    pub async fn setup(&mut self) -> DocumentStoreResult<DatabaseSetup> {
        self.begin();
        let result = ensure_database(self.client, &self.database).await;
        self.finish(result)
    }

    async fn save_document(&mut self) -> DocumentStoreResult<SaveOutcome> {
        self.ensure_live()?;
        let body = self.record.serialize();

        if self.record.identity().is_empty() {
            debug!(database = %self.database, "creating document with store-assigned id");
            let response = self.client.create(&self.database, None, body).await?;
            self.check_status(Operation::Create, &response, SAVE_ACCEPTS)?;
            self.adopt_write(Operation::Create, &response, SaveKind::Created, None)
        } else {
            let id = self.record.identity().to_string();
            debug!(database = %self.database, id = %id, revision = %self.revision, "updating document");
            let response = self
                .client
                .update(&self.database, &id, body, &self.revision)
                .await?;
            self.check_status(Operation::Update, &response, SAVE_ACCEPTS)?;
            self.adopt_write(Operation::Update, &response, SaveKind::Updated, Some(id))
        }
    }

    async fn create_document(&mut self) -> DocumentStoreResult<SaveOutcome> {
        self.ensure_live()?;
        let id = self.record.identity().to_string();
        let key = (!id.is_empty()).then_some(id.as_str());

        debug!(database = %self.database, id = %id, "creating document");
        let response = self
            .client
            .create(&self.database, key, self.record.serialize())
            .await?;
        self.check_status(Operation::Create, &response, CREATE_ACCEPTS)?;
        self.adopt_write(Operation::Create, &response, SaveKind::Created, key.map(str::to_string))
    }

    async fn fetch(&mut self, id: &str) -> DocumentStoreResult<bool> {
        self.ensure_live()?;
        if id.is_empty() {
            return Err(DocumentStoreError::Validation("No id specified.".into()));
        }

        debug!(database = %self.database, id, "fetching document");
        let response = self.client.get(&self.database, id).await?;
        if response.status == StoreStatus::NotFound {
            debug!(database = %self.database, id, detail = %response.detail(), "document not found");
            return Ok(false);
        }
        self.check_status(Operation::Get, &response, GET_ACCEPTS)?;

        self.rows = normalize(&response.body)?;
        self.make_row();
        Ok(!self.rows.is_empty())
    }

    async fn run_find(&mut self, selector: Selector, cursor: Cursor) -> DocumentStoreResult<usize> {
        self.ensure_live()?;

        debug!(database = %self.database, limit = cursor.limit, skip = cursor.offset, "finding documents");
        let request = FindRequest::new(selector, cursor.limit, cursor.offset);
        let response = self.client.find(&self.database, request).await?;
        self.check_status(Operation::Find, &response, FIND_ACCEPTS)?;

        self.rows = normalize(&response.body)?;
        if self.rows.len() == 1 && self.auto_populate {
            self.make_row();
        }
        Ok(self.rows.len())
    }

    async fn delete_document(&mut self) -> DocumentStoreResult<()> {
        self.ensure_live()?;
        if self.revision.is_empty() {
            return Err(DocumentStoreError::Validation("No revision specified.".into()));
        }
        if self.record.identity().is_empty() {
            return Err(DocumentStoreError::Validation("No id specified.".into()));
        }

        let id = self.record.identity().to_string();
        debug!(database = %self.database, id = %id, revision = %self.revision, "deleting document");
        let response = self
            .client
            .delete(&self.database, &id, &self.revision)
            .await?;
        self.check_status(Operation::Delete, &response, DELETE_ACCEPTS)?;

        if let Some(revision) = response.str_field("rev") {
            self.revision = revision.to_string();
        }
        self.deleted = true;
        Ok(())
    }

    /// Records the revision of a successful write and reports what the store returned.
    fn adopt_write(
        &mut self,
        operation: Operation,
        response: &StoreResponse,
        kind: SaveKind,
        known_id: Option<String>,
    ) -> DocumentStoreResult<SaveOutcome> {
        let revision = response
            .str_field("rev")
            .ok_or_else(|| {
                DocumentStoreError::MalformedResponse(format!("{operation} response carries no rev"))
            })?
            .to_string();
        let id = response
            .str_field("id")
            .map(str::to_string)
            .or(known_id)
            .ok_or_else(|| {
                DocumentStoreError::MalformedResponse(format!("{operation} response carries no id"))
            })?;

        self.revision = revision.clone();
        Ok(SaveOutcome { id, revision, kind })
    }

    fn check_status(
        &self,
        operation: Operation,
        response: &StoreResponse,
        accepted: &[StoreStatus],
    ) -> DocumentStoreResult<()> {
        if accepted.contains(&response.status) {
            return Ok(());
        }

        Err(DocumentStoreError::Status {
            operation,
            database: self.database.clone(),
            status: response.status,
            detail: response.detail(),
        })
    }

    fn ensure_live(&self) -> DocumentStoreResult<()> {
        if self.deleted {
            return Err(DocumentStoreError::Validation(format!(
                "document {} has been deleted",
                self.record.identity()
            )));
        }
        Ok(())
    }

    fn begin(&mut self) {
        self.rows.clear();
        self.last_error = None;
    }

    fn finish<T>(&mut self, result: DocumentStoreResult<T>) -> DocumentStoreResult<T> {
        if let Err(err) = &result {
            match failure_level(err) {
                Some(level) if level == Level::ERROR => {
                    error!(database = %self.database, error = %err, "store rejected write")
                }
                Some(_) => warn!(database = %self.database, error = %err, "document operation failed"),
                None => {}
            }
            self.last_error = Some(err.clone());
        }
        result
    }
}

/// The level a failed operation is logged at, `None` when it was logged where it happened.
fn failure_level(err: &DocumentStoreError) -> Option<Level> {
    match err {
        DocumentStoreError::Status {
            operation: Operation::Create | Operation::Update | Operation::Delete,
            ..
        } => Some(Level::ERROR),
        DocumentStoreError::Status {
            operation: Operation::CreateDatabase,
            ..
        } => None,
        _ => Some(Level::WARN),
    }
}

impl<C: StoreClient + ?Sized, R: Record> Deref for DocumentRecord<'_, C, R> {
    type Target = R;

    fn deref(&self) -> &Self::Target {
        &self.record
    }
}

impl<C: StoreClient + ?Sized, R: Record> DerefMut for DocumentRecord<'_, C, R> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.record
    }
}
