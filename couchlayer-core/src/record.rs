//! The capability interface implemented by every mapped record type.
//!
//! A record type provides its identity accessors, the name of the database it lives in and its
//! [`Fields`] descriptor list. Serialization and population are derived from those descriptors
//! but remain overridable for types that need custom behavior.
//!
//! Records are usually implemented with `#[derive(Record)]` from the facade crate:
//!
//! ```ignore
//! use couchlayer::prelude::*;
//!
//! #[derive(Debug, Default, Record)]
//! #[record(database = "users")]
//! pub struct User {
//!     pub id: String,
//!     pub firstname: String,
//!     pub lastname: String,
//!     pub email: String,
//! }
//! ```
//!
//! or by hand:
//!
//! ```ignore
//! impl Record for User {
//!     fn database_name() -> &'static str { "users" }
//!     fn identity(&self) -> &str { &self.id }
//!     fn set_identity(&mut self, identity: String) { self.id = identity; }
//!     fn fields() -> Fields<Self> {
//!         Fields::builder()
//!             .field("firstname", |u: &User| &u.firstname, |u: &mut User| &mut u.firstname)
//!             .build()
//!     }
//! }
//! ```

use serde_json::{Map, Value};

use crate::{field::Fields, row::Row};

/// A typed object that maps onto one JSON document.
///
/// The identity is kept out of [`fields`](Record::fields): it travels as the document key
/// (`_id`) rather than as part of the body. The revision is tracked by
/// [`DocumentRecord`](crate::document::DocumentRecord), not by the record.
pub trait Record: Sized + Send + Sync + 'static {
    /// The database this record type is stored in.
    fn database_name() -> &'static str;

    /// The document id, empty while the store has not assigned one.
    fn identity(&self) -> &str;

    fn set_identity(&mut self, identity: String);

    /// The ordered descriptors of the document body.
    fn fields() -> Fields<Self>;

    /// Produces the body sent on create and update. Neither `_id` nor `_rev` is included.
    fn serialize(&self) -> Map<String, Value> {
        Self::fields().serialize(self)
    }

    /// Assigns the identity and every typed field from `row`, using zero values for
    /// anything missing.
    fn populate(&mut self, row: &Row) {
        self.set_identity(row.id().unwrap_or_default().to_string());
        Self::fields().populate(self, row);
    }
}
