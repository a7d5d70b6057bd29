//! In-memory message source.

use crate::core::{Message, Page, PageQuery, SortOrder};
use crate::error::SourceError;
use crate::source::traits::MessageSource;
use std::cell::Cell;

/// A message source over a fixed, in-memory set of messages.
///
/// Rows are kept in ascending `(created_at, id)` order and served with the
/// same offset/limit semantics as a database. Counts every fetch so callers
/// can assert how many round trips an operation made.
///
/// # Examples
///
/// ```
/// use logscope::core::{Message, PageQuery, SortOrder};
/// use logscope::source::{MemorySource, MessageSource};
/// use chrono::{TimeZone, Utc};
///
/// let at = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
/// let source = MemorySource::new(vec![Message::new("a", None, at)]);
/// let query = PageQuery {
///     filter: None,
///     order: SortOrder::NewestFirst,
///     offset: 0,
///     limit: 10,
///     with_count: true,
/// };
/// let page = source.fetch_page(&query).unwrap();
/// assert_eq!(page.len(), 1);
/// assert_eq!(source.fetch_count(), 1);
/// ```
#[derive(Debug, Default)]
pub struct MemorySource {
    messages: Vec<Message>,
    report_count: bool,
    fetches: Cell<usize>,
}

impl MemorySource {
    /// Creates a source that reports exact counts when asked.
    #[must_use]
    pub fn new(messages: impl IntoIterator<Item = Message>) -> Self {
        let mut messages: Vec<Message> = messages.into_iter().collect();
        messages.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
        Self {
            messages,
            report_count: true,
            fetches: Cell::new(0),
        }
    }

    /// Stops reporting count hints, like a store that omits them.
    #[must_use]
    pub const fn without_count_hint(mut self) -> Self {
        self.report_count = false;
        self
    }

    /// Number of `fetch_page` calls served so far.
    #[must_use]
    pub fn fetch_count(&self) -> usize {
        self.fetches.get()
    }

    /// Number of stored messages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Returns `true` if the source holds no messages.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

impl MessageSource for MemorySource {
    fn fetch_page(&self, query: &PageQuery) -> Result<Page, SourceError> {
        self.fetches.set(self.fetches.get() + 1);

        let mut matching: Vec<&Message> = self
            .messages
            .iter()
            .filter(|m| query.filter.is_none_or(|r| r.contains(&m.created_at)))
            .collect();
        if query.order == SortOrder::NewestFirst {
            matching.reverse();
        }

        let messages = matching
            .iter()
            .skip(query.offset)
            .take(query.limit)
            .map(|m| (*m).clone())
            .collect();

        let total = (query.with_count && self.report_count).then_some(matching.len());
        Ok(Page { messages, total })
    }
}
