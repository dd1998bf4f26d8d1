//! An object-document mapping layer for revision-versioned JSON document stores.
//!
//! This crate is the core of the couchlayer project and provides:
//!
//! - **Store client abstraction** ([`client`]) - The calls a document store must answer
//! - **Records** ([`record`], [`field`]) - Typed records and their field descriptors
//! - **Rows** ([`row`], [`normalize`]) - Result sets decoded from store responses
//! - **Document operations** ([`document`]) - Save, create, get, find, delete and setup
//! - **Document store** ([`store`]) - Binds records to a shared client
//! - **Connection configuration** ([`config`]) - Host, credentials, port and TLS
//! - **Pagination** ([`cursor`]) - Limit and offset for selector queries
//! - **Error handling** ([`error`]) - Error types and result types
//!
//! # Example
//!
//! ```ignore
//! use couchlayer_core::{field::Fields, record::Record};
//!
//! #[derive(Debug, Default)]
//! pub struct User {
//!     pub id: String,
//!     pub name: String,
//! }
//!
//! impl Record for User {
//!     fn database_name() -> &'static str {
//!         "users"
//!     }
//!
//!     fn identity(&self) -> &str {
//!         &self.id
//!     }
//!
//!     fn set_identity(&mut self, identity: String) {
//!         self.id = identity;
//!     }
//!
//!     fn fields() -> Fields<Self> {
//!         Fields::builder()
//!             .field("name", |u: &User| &u.name, |u: &mut User| &mut u.name)
//!             .build()
//!     }
//! }
//! ```

#[allow(unused_extern_crates)]
extern crate self as couchlayer_core;

pub mod client;
pub mod config;
pub mod cursor;
pub mod document;
pub mod error;
pub mod field;
pub mod normalize;
pub mod record;
pub mod row;
pub mod store;
