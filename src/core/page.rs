//! Page requests and responses exchanged with a message source.

use crate::core::{Message, TimeRange};
use serde::Serialize;

/// Order in which a source returns rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    /// Descending by `created_at` (then `id`). Used by the feed.
    NewestFirst,
    /// Ascending by `created_at` (then `id`). Used by export.
    OldestFirst,
}

/// One bounded read against a message source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageQuery {
    /// Optional inclusive `created_at` bound.
    pub filter: Option<TimeRange>,
    /// Row order.
    pub order: SortOrder,
    /// Rows to skip in the filtered, ordered result set.
    pub offset: usize,
    /// Maximum rows to return; always positive.
    pub limit: usize,
    /// Whether the source should also report the exact filtered row count.
    pub with_count: bool,
}

/// A page of messages returned by a source.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Page {
    /// Messages in the order requested.
    pub messages: Vec<Message>,
    /// Total row count for the query's filter, when the source reports one.
    pub total: Option<usize>,
}

impl Page {
    /// Creates a page without a count hint.
    #[must_use]
    pub const fn new(messages: Vec<Message>) -> Self {
        Self {
            messages,
            total: None,
        }
    }

    /// Attaches a total-count hint.
    #[must_use]
    pub const fn with_total(mut self, total: usize) -> Self {
        self.total = Some(total);
        self
    }

    /// Number of messages on this page.
    #[must_use]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Returns `true` if the page holds no messages.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

/// Decides whether a result set is exhausted after a page arrived.
///
/// Either signal is sufficient: a page shorter than requested, or a count
/// hint that `offset + returned` has reached. A stale or missing hint can
/// therefore never cause an extra round of fetching past a short page.
///
/// # Examples
///
/// ```
/// use logscope::core::is_exhausted;
///
/// assert!(is_exhausted(0, 10, 25, None));
/// assert!(!is_exhausted(0, 25, 25, None));
/// assert!(is_exhausted(25, 25, 25, Some(50)));
/// ```
#[must_use]
pub const fn is_exhausted(
    offset: usize,
    returned: usize,
    page_size: usize,
    total: Option<usize>,
) -> bool {
    if returned < page_size {
        return true;
    }
    match total {
        Some(total) => offset.saturating_add(returned) >= total,
        None => false,
    }
}
