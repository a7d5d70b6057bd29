//! Message source trait definition.
//!
//! Defines the read-only interface the feed and export engines pull pages
//! from. The store behind it (and the transport used to reach it) is an
//! external collaborator; timeouts and retries belong there or to the
//! caller, never to the engines.

use crate::core::{Page, PageQuery};
use crate::error::SourceError;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Trait for ordered, filterable, countable message stores.
///
/// Implementations must return rows in a total order by `created_at`
/// (ties broken by `id`) that is stable across repeated identical queries
/// while the underlying data is unchanged. Returned pages hold at most
/// `query.limit` messages.
pub trait MessageSource {
    /// Fetches one page of messages.
    ///
    /// A successful response with zero rows is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be queried.
    fn fetch_page(&self, query: &PageQuery) -> Result<Page, SourceError>;
}

impl<S: MessageSource + ?Sized> MessageSource for &S {
    fn fetch_page(&self, query: &PageQuery) -> Result<Page, SourceError> {
        (**self).fetch_page(query)
    }
}

impl<S: MessageSource + ?Sized> MessageSource for Box<S> {
    fn fetch_page(&self, query: &PageQuery) -> Result<Page, SourceError> {
        (**self).fetch_page(query)
    }
}

/// Summary of a message store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SourceStats {
    /// Number of messages stored.
    pub message_count: usize,
    /// Oldest `created_at`, if any message exists.
    pub oldest: Option<DateTime<Utc>>,
    /// Newest `created_at`, if any message exists.
    pub newest: Option<DateTime<Utc>>,
    /// Database file size in bytes (if applicable).
    pub db_size: Option<u64>,
}
