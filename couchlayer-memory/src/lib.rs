//! In-memory store client for couchlayer.
//!
//! This crate provides [`InMemoryCouch`], a thread-safe implementation of the `StoreClient`
//! trait that behaves like a CouchDB server: statuses, `_rev` tokens, tombstones and a subset of
//! Mango selectors. It is intended for development and tests.
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
//!     pub name: String,
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = DocumentStore::new(InMemoryCouch::new());
//!     store.setup::<User>().await?;
//!
//!     let mut user = store.record(User { name: "Alice".into(), ..User::default() });
//!     let outcome = user.save().await?;
//!     user.set_identity(outcome.id);
//!
//!     Ok(())
//! }
//! ```

#[allow(unused_extern_crates)]
extern crate self as couchlayer_memory;

mod selector;
pub mod store;

pub use store::{InMemoryCouch, InMemoryCouchBuilder};
