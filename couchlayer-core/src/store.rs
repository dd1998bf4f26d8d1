//! Entry point binding records to a store client.
//!
//! [`DocumentStore`] owns a [`StoreClient`] and hands out [`DocumentRecord`]s borrowing it, so
//! every record of a process shares one connection.
//!
//! # Example
//!
//! ```ignore
//! use couchlayer::store::DocumentStore;
//!
//! let store = DocumentStore::new(client);
//! store.setup::<User>().await?;
//!
//! let mut user = store.record(User::default());
//! user.save().await?;
//! ```

use tracing::{debug, error, info};

use crate::{
    client::{StoreClient, StoreStatus},
    document::DocumentRecord,
    error::{DocumentStoreError, DocumentStoreResult, Operation},
    record::Record,
};

/// Result of creating a database.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatabaseSetup {
    Created,
    AlreadyExists,
}

/// A store bound to a specific client implementation.
#[derive(Debug)]
pub struct DocumentStore<C: StoreClient> {
    client: C,
}

/// A store whose client is chosen at runtime.
pub type DynDocumentStore = DocumentStore<Box<dyn StoreClient>>;

impl<C: StoreClient> DocumentStore<C> {
    pub fn new(client: C) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    /// Binds `record` to this store's client.
    pub fn record<R: Record>(&self, record: R) -> DocumentRecord<'_, C, R> {
        DocumentRecord::new(&self.client, record)
    }

    /// Creates the database of record type `R`. An existing database is not an error.
    pub async fn setup<R: Record>(&self) -> DocumentStoreResult<DatabaseSetup> {
        ensure_database(&self.client, R::database_name()).await
    }

    /// Creates the database `name`. An existing database is not an error.
    ///
    /// # Errors
    ///
    /// Returns a status error for anything but `Created`, `Accepted` or `PreconditionFailed`.
    pub async fn ensure_database(&self, name: &str) -> DocumentStoreResult<DatabaseSetup> {
        ensure_database(&self.client, name).await
    }

    /// Shuts down the store and releases client resources.
    pub async fn shutdown(self) -> DocumentStoreResult<()> {
        Box::new(self.client).shutdown_boxed().await
    }
}

pub(crate) async fn ensure_database<C: StoreClient + ?Sized>(
    client: &C,
    name: &str,
) -> DocumentStoreResult<DatabaseSetup> {
    debug!(database = name, "creating database");

    match client.create_database(name).await? {
        StoreStatus::Created | StoreStatus::Accepted => {
            info!(database = name, "database created");
            Ok(DatabaseSetup::Created)
        }
        StoreStatus::PreconditionFailed => {
            debug!(database = name, "database already exists");
            Ok(DatabaseSetup::AlreadyExists)
        }
        status => {
            error!(database = name, %status, "database creation failed");
            Err(DocumentStoreError::Status {
                operation: Operation::CreateDatabase,
                database: name.to_string(),
                status,
                detail: format!("database {name} creation experienced {status}"),
            })
        }
    }
}
