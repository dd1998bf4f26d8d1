//! CouchDB store client for couchlayer.
//!
//! This crate provides an HTTP implementation of the `StoreClient` trait that talks to a
//! CouchDB server with JSON bodies and basic authentication.
//!
//! To use this client, include the `couchdb` feature in your `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! couchlayer = { version = "x.y.z", features = ["couchdb"] }
//! ```
//!
//! # Example
//!
//! ```ignore
//! use couchlayer::{prelude::*, couchdb::CouchDbClient};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ConnectionConfig::builder()
//!         .with_host("localhost")
//!         .with_credentials("admin", "secret")
//!         .build()?;
//!     let client = CouchDbClient::builder(config).build().await?;
//!
//!     Ok(())
//! }
//! ```

#[allow(unused_extern_crates)]
extern crate self as couchlayer_couchdb;

pub mod store;

pub use store::{CouchDbClient, CouchDbClientBuilder};
