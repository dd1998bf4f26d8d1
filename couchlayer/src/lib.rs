//! Main couchlayer crate providing typed records over revision-versioned document stores.
//!
//! This crate is the primary entry point for users of the couchlayer framework.
//! It re-exports the core types from the sub-crates, the `#[derive(Record)]` macro and the
//! available store clients.
//!
//! # Features
//!
//! - **Typed records** - Map structs onto JSON documents with `#[derive(Record)]`
//! - **Revision discipline** - Updates and deletes carry the document revision
//! - **Selector queries** - Find documents with Mango selectors and a paging cursor
//! - **Multiple clients** - In-memory for tests, HTTP for a CouchDB server (`couchdb` feature)
//!
//! # Quick Start
//!
//! ```ignore
//! use couchlayer::{prelude::*, memory::InMemoryCouch};
//!
//! #[derive(Debug, Default, Record)]
//! #[record(database = "users")]
//! pub struct User {
//!     pub id: String,
//!     pub firstname: String,
//!     pub lastname: String,
//!     pub email: String,
//! }
//!
//! #[tokio::main]
//! async fn main() -> DocumentStoreResult<()> {
//!     let store = DocumentStore::new(InMemoryCouch::builder().build().await?);
//!     store.setup::<User>().await?;
//!
//!     let mut user = store.record(User::default());
//!     user.firstname = "X".into();
//!     user.lastname = "Y".into();
//!     user.email = "X@Y.com".into();
//!
//!     // Without an identity the store assigns one
//!     let outcome = user.save().await?;
//!     user.set_identity(outcome.id);
//!
//!     // With an identity, save updates under the current revision
//!     user.firstname = "A".into();
//!     user.save().await?;
//!
//!     let found = user
//!         .find(Selector::try_from(serde_json::json!({ "firstname": "A" }))?, Cursor::default())
//!         .await?;
//!     assert_eq!(found, 1);
//!
//!     user.delete().await?;
//!     store.shutdown().await
//! }
//! ```
//!
//! # Connecting to CouchDB
//!
//! ```ignore
//! use couchlayer::{prelude::*, couchdb::CouchDbClient};
//!
//! let config = ConnectionConfig::builder()
//!     .with_host("couch.internal")
//!     .with_credentials("admin", "secret")
//!     .build()?;
//! let store = DocumentStore::new(CouchDbClient::builder(config).build().await?);
//! ```
//!
//! # Clients
//!
//! - [`memory`] - In-process client with CouchDB semantics for development and testing
//! - `couchdb` - HTTP client for a CouchDB server (requires the `couchdb` feature)

#[allow(unused_extern_crates)]
extern crate self as couchlayer;

pub mod prelude;

pub use couchlayer_core::{
    client, config, cursor, document, error, field, normalize, record, row, store,
};
pub use couchlayer_macros::Record;

pub use async_trait::async_trait;
pub use chrono;
pub use serde_json;
pub use uuid;

/// In-memory store client.
pub mod memory {
    pub use couchlayer_memory::{InMemoryCouch, InMemoryCouchBuilder};
}

/// CouchDB HTTP store client.
///
/// This module is only available when the `couchdb` feature is enabled.
#[cfg(feature = "couchdb")]
pub mod couchdb {
    pub use couchlayer_couchdb::{CouchDbClient, CouchDbClientBuilder};
}
