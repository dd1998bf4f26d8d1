//! Pagination window for selector queries.
//!
//! A [`Cursor`] carries the `limit`/`skip` pair handed to the store with every
//! [`find`](crate::document::DocumentRecord::find) call.

use serde::{Deserialize, Serialize};

/// A page window over a query result: at most `limit` documents after skipping `offset`.
///
/// # Example
///
/// ```ignore
/// use couchlayer::cursor::Cursor;
///
/// let cursor = Cursor::page(3, 20);
/// assert_eq!(cursor.offset, 40);
/// assert_eq!(cursor.next().offset, 60);
/// ```
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cursor {
    /// Maximum number of documents to return.
    pub limit: usize,
    /// Number of documents to skip.
    pub offset: usize,
}

impl Cursor {
    pub const DEFAULT_LIMIT: usize = 50;

    pub fn new(limit: usize, offset: usize) -> Self {
        Self { limit, offset }
    }

    /// The cursor for a 1-indexed page of `per_page` documents. Page 0 is treated as page 1.
    pub fn page(page: usize, per_page: usize) -> Self {
        Self {
            limit: per_page,
            offset: page.saturating_sub(1).saturating_mul(per_page),
        }
    }

    pub fn builder() -> CursorBuilder {
        CursorBuilder::new()
    }

    /// The window immediately following this one.
    pub fn next(&self) -> Self {
        Self {
            limit: self.limit,
            offset: self.offset.saturating_add(self.limit),
        }
    }

    /// The window immediately preceding this one, or `None` at the start.
    pub fn previous(&self) -> Option<Self> {
        (self.offset > 0).then(|| Self {
            limit: self.limit,
            offset: self.offset.saturating_sub(self.limit),
        })
    }
}

impl Default for Cursor {
    fn default() -> Self {
        Self { limit: Self::DEFAULT_LIMIT, offset: 0 }
    }
}

/// Builder for [`Cursor`]; unset values use the defaults (limit 50, offset 0).
#[derive(Debug, Default)]
pub struct CursorBuilder {
    limit: Option<usize>,
    offset: Option<usize>,
}

impl CursorBuilder {
    pub fn new() -> Self {
        Self { limit: None, offset: None }
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_offset(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }

    pub fn build(self) -> Cursor {
        Cursor {
            limit: self.limit.unwrap_or(Cursor::DEFAULT_LIMIT),
            offset: self.offset.unwrap_or(0),
        }
    }
}
