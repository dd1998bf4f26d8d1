//! Convenient re-exports of commonly used types from couchlayer.
//!
//! ```ignore
//! use couchlayer::prelude::*;
//! ```

pub use couchlayer_core::{
    client::{FindRequest, Selector, StoreClient, StoreClientBuilder, StoreResponse, StoreStatus},
    config::ConnectionConfig,
    cursor::Cursor,
    document::{DocumentRecord, RecordState, SaveKind, SaveOutcome},
    error::{DocumentStoreError, DocumentStoreResult, Operation},
    field::{FieldValue, Fields},
    record::Record,
    row::Row,
    store::{DatabaseSetup, DocumentStore, DynDocumentStore},
};
pub use couchlayer_macros::Record;
