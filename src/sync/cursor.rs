//! Bounded-page cursor over an ordered message source.
//!
//! The single "fetch until exhausted" primitive shared by the feed and the
//! exporter. A cursor knows the filter, order and page size of one result
//! set and where the next page starts; it decides exhaustion with
//! [`is_exhausted`] after every page.

use crate::core::{Page, PageQuery, SortOrder, TimeRange, is_exhausted};
use crate::error::{Error, Result};
use crate::source::MessageSource;
use tracing::{debug, warn};

/// Page-at-a-time iteration state over one filtered result set.
///
/// The cursor can be driven in two ways: [`PagedCursor::next_page`] performs
/// the fetch itself, while [`PagedCursor::next_query`] plus
/// [`PagedCursor::advance`] let a caller issue the request elsewhere and
/// report the page back when it resolves.
///
/// # Examples
///
/// ```
/// use logscope::core::{Message, SortOrder};
/// use logscope::source::MemorySource;
/// use logscope::sync::PagedCursor;
/// use chrono::{Duration, TimeZone, Utc};
///
/// let t0 = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
/// let source = MemorySource::new(
///     (0..5).map(|i| Message::new(format!("m{i}"), None, t0 + Duration::minutes(i))),
/// );
/// let mut cursor = PagedCursor::new(SortOrder::OldestFirst, 2).unwrap();
/// let mut seen = 0;
/// while let Some(page) = cursor.next_page(&source).unwrap() {
///     seen += page.len();
/// }
/// assert_eq!(seen, 5);
/// assert_eq!(cursor.pages_fetched(), 3);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PagedCursor {
    filter: Option<TimeRange>,
    order: SortOrder,
    page_size: usize,
    with_count: bool,
    next_offset: usize,
    exhausted: bool,
    pages: usize,
    total: Option<usize>,
}

impl PagedCursor {
    /// Creates a cursor at the start of the unfiltered result set.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if `page_size` is zero.
    pub fn new(order: SortOrder, page_size: usize) -> Result<Self> {
        if page_size == 0 {
            return Err(Error::config("page size must be greater than zero"));
        }
        Ok(Self {
            filter: None,
            order,
            page_size,
            with_count: false,
            next_offset: 0,
            exhausted: false,
            pages: 0,
            total: None,
        })
    }

    /// Restricts the result set to an inclusive time range.
    ///
    /// Changing the filter invalidates any position, so the cursor restarts.
    #[must_use]
    pub fn with_filter(mut self, filter: Option<TimeRange>) -> Self {
        self.filter = filter;
        self.reset();
        self
    }

    /// Asks the source for an exact count alongside every page.
    #[must_use]
    pub const fn with_count_hint(mut self, enabled: bool) -> Self {
        self.with_count = enabled;
        self
    }

    /// Requested rows per page.
    #[must_use]
    pub const fn page_size(&self) -> usize {
        self.page_size
    }

    /// Offset the next page will be requested at.
    #[must_use]
    pub const fn offset(&self) -> usize {
        self.next_offset
    }

    /// Returns `true` once no further rows exist for the filter.
    #[must_use]
    pub const fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    /// Number of pages consumed since the last reset.
    #[must_use]
    pub const fn pages_fetched(&self) -> usize {
        self.pages
    }

    /// Count hint reported with the most recent page, if any.
    #[must_use]
    pub const fn total_hint(&self) -> Option<usize> {
        self.total
    }

    /// The active filter.
    #[must_use]
    pub const fn filter(&self) -> Option<TimeRange> {
        self.filter
    }

    /// Rewinds to the start of the result set.
    pub const fn reset(&mut self) {
        self.next_offset = 0;
        self.exhausted = false;
        self.pages = 0;
        self.total = None;
    }

    /// Builds the request for a page starting at `offset`.
    #[must_use]
    pub const fn query_at(&self, offset: usize) -> PageQuery {
        PageQuery {
            filter: self.filter,
            order: self.order,
            offset,
            limit: self.page_size,
            with_count: self.with_count,
        }
    }

    /// Builds the request for the next page, or `None` when exhausted.
    #[must_use]
    pub const fn next_query(&self) -> Option<PageQuery> {
        if self.exhausted {
            None
        } else {
            Some(self.query_at(self.next_offset))
        }
    }

    /// Fetches one page at an arbitrary offset without moving the cursor.
    ///
    /// # Errors
    ///
    /// Returns [`Error::FetchFailed`] with the source's error unchanged.
    pub fn fetch_page<S: MessageSource + ?Sized>(&self, source: &S, offset: usize) -> Result<Page> {
        let query = self.query_at(offset);
        let page = source.fetch_page(&query)?;
        debug!(
            offset,
            limit = query.limit,
            returned = page.len(),
            total = ?page.total,
            "fetched page"
        );
        Ok(page)
    }

    /// Records a resolved page and returns whether the set is now exhausted.
    ///
    /// The next offset advances by the number of rows actually returned.
    pub fn advance(&mut self, query: &PageQuery, page: &Page) -> bool {
        let returned = page.len();

        if let Some(total) = page.total
            && returned < query.limit
            && query.offset + returned < total
        {
            warn!(
                offset = query.offset,
                returned, total, "short page contradicts count hint"
            );
        }

        self.next_offset = query.offset + returned;
        self.pages += 1;
        self.total = page.total;
        self.exhausted = is_exhausted(query.offset, returned, query.limit, page.total);
        self.exhausted
    }

    /// Fetches the next page and advances past it.
    ///
    /// Returns `Ok(None)` without contacting the source once exhausted. A
    /// failed fetch leaves the cursor exactly where it was.
    ///
    /// # Errors
    ///
    /// Returns [`Error::FetchFailed`] with the source's error unchanged.
    pub fn next_page<S: MessageSource + ?Sized>(&mut self, source: &S) -> Result<Option<Page>> {
        let Some(query) = self.next_query() else {
            return Ok(None);
        };
        let page = self.fetch_page(source, query.offset)?;
        self.advance(&query, &page);
        Ok(Some(page))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Message;
    use crate::error::SourceError;
    use crate::source::MemorySource;
    use chrono::{DateTime, Duration, TimeZone, Utc};

    fn minute(n: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + Duration::minutes(n)
    }

    fn source(n: i64) -> MemorySource {
        MemorySource::new((1..=n).map(|i| Message::new(format!("m{i}"), None, minute(i))))
    }

    struct Failing;

    impl MessageSource for Failing {
        fn fetch_page(&self, _query: &PageQuery) -> std::result::Result<Page, SourceError> {
            Err(SourceError::Unavailable("offline".to_string()))
        }
    }

    #[test]
    fn test_zero_page_size_rejected() {
        assert!(matches!(
            PagedCursor::new(SortOrder::NewestFirst, 0),
            Err(Error::Config { .. })
        ));
    }

    #[test]
    fn test_drains_in_order() {
        let src = source(7);
        let mut cursor = PagedCursor::new(SortOrder::OldestFirst, 3).unwrap();
        let mut ids = Vec::new();
        while let Some(page) = cursor.next_page(&src).unwrap() {
            ids.extend(page.messages.into_iter().map(|m| m.id));
        }
        assert_eq!(ids, ["m1", "m2", "m3", "m4", "m5", "m6", "m7"]);
        assert_eq!(cursor.pages_fetched(), 3);
        assert_eq!(src.fetch_count(), 3);
    }

    #[test]
    fn test_exact_multiple_needs_empty_page_without_hint() {
        let src = source(6).without_count_hint();
        let mut cursor = PagedCursor::new(SortOrder::OldestFirst, 3).unwrap();
        while cursor.next_page(&src).unwrap().is_some() {}
        assert_eq!(src.fetch_count(), 3);
    }

    #[test]
    fn test_count_hint_stops_on_exact_multiple() {
        let src = source(6);
        let mut cursor = PagedCursor::new(SortOrder::OldestFirst, 3)
            .unwrap()
            .with_count_hint(true);
        while cursor.next_page(&src).unwrap().is_some() {}
        assert_eq!(src.fetch_count(), 2);
        assert_eq!(cursor.total_hint(), Some(6));
    }

    #[test]
    fn test_exhausted_cursor_does_not_fetch() {
        let src = source(2);
        let mut cursor = PagedCursor::new(SortOrder::NewestFirst, 5).unwrap();
        assert!(cursor.next_page(&src).unwrap().is_some());
        assert!(cursor.is_exhausted());
        assert!(cursor.next_page(&src).unwrap().is_none());
        assert_eq!(src.fetch_count(), 1);
    }

    #[test]
    fn test_failure_leaves_cursor_unchanged() {
        let mut cursor = PagedCursor::new(SortOrder::NewestFirst, 5).unwrap();
        let before = cursor.clone();
        let err = cursor.next_page(&Failing).unwrap_err();
        assert!(err.is_fetch_failure());
        assert_eq!(cursor, before);
    }

    #[test]
    fn test_advance_uses_returned_length() {
        let mut cursor = PagedCursor::new(SortOrder::OldestFirst, 10).unwrap();
        let query = cursor.next_query().unwrap();
        let page = Page::new(vec![Message::new("a", None, minute(1))]);
        assert!(cursor.advance(&query, &page));
        assert_eq!(cursor.offset(), 1);
    }

    #[test]
    fn test_filter_resets_position() {
        let src = source(4);
        let mut cursor = PagedCursor::new(SortOrder::OldestFirst, 2).unwrap();
        cursor.next_page(&src).unwrap();
        assert_eq!(cursor.offset(), 2);

        let cursor = cursor.with_filter(TimeRange::new(minute(2), minute(3)));
        assert_eq!(cursor.offset(), 0);
        assert_eq!(cursor.pages_fetched(), 0);
        assert!(cursor.filter().is_some());
    }
}
