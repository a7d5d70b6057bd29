//! Exhaustive paged export.
//!
//! Drains every message matching an optional time range, oldest first, into
//! one buffer and serializes it. The drain is strictly sequential and ends
//! only on a page shorter than the step: no count hint is requested, since
//! a stale hint would end the loop early.

use crate::core::{Message, SortOrder, TimeRange};
use crate::error::{Error, Result};
use crate::export::format::ExportFormat;
use crate::source::MessageSource;
use crate::sync::PagedCursor;
use serde::Serialize;
use tracing::info;

/// Default rows requested per export page.
pub const DEFAULT_EXPORT_STEP: usize = 1000;

/// Exporter configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExportConfig {
    step: usize,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            step: DEFAULT_EXPORT_STEP,
        }
    }
}

impl ExportConfig {
    /// Creates the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the rows requested per page.
    #[must_use]
    pub const fn with_step(mut self, step: usize) -> Self {
        self.step = step;
        self
    }

    /// Rows requested per page.
    #[must_use]
    pub const fn step(&self) -> usize {
        self.step
    }
}

/// Progress after each drained page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ExportProgress {
    /// Pages fetched so far.
    pub pages: usize,
    /// Records buffered so far.
    pub records: usize,
}

/// Every message matching a filter, in ascending `created_at` order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Drained {
    /// The export buffer.
    pub messages: Vec<Message>,
    /// Pages fetched, including the final short page.
    pub pages: usize,
}

/// A serialized export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportOutput {
    /// Encoding of `bytes`.
    pub format: ExportFormat,
    /// Serialized artifact; empty when nothing matched.
    pub bytes: Vec<u8>,
    /// Records serialized.
    pub records: usize,
    /// Pages fetched.
    pub pages: usize,
}

impl ExportOutput {
    /// Returns `true` when the filter matched no records.
    ///
    /// Not an error: callers report it and write no file.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.records == 0
    }
}

/// Drains a message source to completion for export.
///
/// # Examples
///
/// ```
/// use logscope::core::Message;
/// use logscope::export::{ExhaustiveExporter, ExportConfig, ExportFormat};
/// use logscope::source::MemorySource;
/// use chrono::{Duration, TimeZone, Utc};
///
/// let t0 = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
/// let source = MemorySource::new(
///     (0..25).map(|i| Message::new(format!("m{i}"), None, t0 + Duration::seconds(i))),
/// );
/// let exporter = ExhaustiveExporter::new(&source, ExportConfig::new().with_step(10)).unwrap();
/// let output = exporter.export_all(None, ExportFormat::Json).unwrap();
/// assert_eq!(output.records, 25);
/// assert_eq!(output.pages, 3);
/// ```
#[derive(Debug)]
pub struct ExhaustiveExporter<S> {
    source: S,
    config: ExportConfig,
}

impl<S: MessageSource> ExhaustiveExporter<S> {
    /// Creates an exporter over `source`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the step is zero.
    pub fn new(source: S, config: ExportConfig) -> Result<Self> {
        if config.step == 0 {
            return Err(Error::config("export step must be greater than zero"));
        }
        Ok(Self { source, config })
    }

    /// The exporter configuration.
    pub const fn config(&self) -> ExportConfig {
        self.config
    }

    /// Fetches every matching message into one buffer.
    ///
    /// # Errors
    ///
    /// Returns [`Error::FetchFailed`] on the first failed page; everything
    /// buffered so far is discarded.
    pub fn drain(&self, filter: Option<TimeRange>) -> Result<Drained> {
        self.drain_with_progress(filter, |_| {})
    }

    /// Like [`Self::drain`], reporting progress after every page.
    ///
    /// # Errors
    ///
    /// Returns [`Error::FetchFailed`] on the first failed page.
    pub fn drain_with_progress<F>(
        &self,
        filter: Option<TimeRange>,
        mut progress: F,
    ) -> Result<Drained>
    where
        F: FnMut(ExportProgress),
    {
        let mut cursor = PagedCursor::new(SortOrder::OldestFirst, self.config.step)?
            .with_filter(filter)
            .with_count_hint(false);
        let mut messages = Vec::new();

        while let Some(page) = cursor.next_page(&self.source)? {
            messages.extend(page.messages);
            progress(ExportProgress {
                pages: cursor.pages_fetched(),
                records: messages.len(),
            });
        }

        Ok(Drained {
            messages,
            pages: cursor.pages_fetched(),
        })
    }

    /// Drains every matching message and serializes the buffer.
    ///
    /// # Errors
    ///
    /// Returns [`Error::FetchFailed`] if any page fails, or
    /// [`Error::Export`] if serialization fails. No partial output is
    /// produced in either case.
    pub fn export_all(
        &self,
        filter: Option<TimeRange>,
        format: ExportFormat,
    ) -> Result<ExportOutput> {
        self.export_with_progress(filter, format, |_| {})
    }

    /// Like [`Self::export_all`], reporting progress after every page.
    ///
    /// # Errors
    ///
    /// See [`Self::export_all`].
    pub fn export_with_progress<F>(
        &self,
        filter: Option<TimeRange>,
        format: ExportFormat,
        progress: F,
    ) -> Result<ExportOutput>
    where
        F: FnMut(ExportProgress),
    {
        let drained = self.drain_with_progress(filter, progress)?;
        let bytes = format.serialize(&drained.messages)?;

        info!(
            records = drained.messages.len(),
            pages = drained.pages,
            bytes = bytes.len(),
            %format,
            "export drained"
        );

        Ok(ExportOutput {
            format,
            bytes,
            records: drained.messages.len(),
            pages: drained.pages,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Page, PageQuery};
    use crate::error::SourceError;
    use crate::source::MemorySource;
    use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
    use std::cell::Cell;

    fn at(day: u32, minute: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, day, 9, 0, 0).unwrap() + Duration::minutes(minute)
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, d).unwrap()
    }

    fn exporter(source: &MemorySource, step: usize) -> ExhaustiveExporter<&MemorySource> {
        ExhaustiveExporter::new(source, ExportConfig::new().with_step(step)).unwrap()
    }

    /// Serves pages until the n-th fetch, then fails.
    struct FailsOn {
        inner: MemorySource,
        fetch: usize,
        seen: Cell<usize>,
    }

    impl MessageSource for FailsOn {
        fn fetch_page(&self, query: &PageQuery) -> std::result::Result<Page, SourceError> {
            self.seen.set(self.seen.get() + 1);
            if self.seen.get() == self.fetch {
                return Err(SourceError::Database("disk I/O error".to_string()));
            }
            self.inner.fetch_page(query)
        }
    }

    #[test]
    fn test_zero_step_rejected() {
        let src = MemorySource::default();
        assert!(ExhaustiveExporter::new(&src, ExportConfig::new().with_step(0)).is_err());
    }

    #[test]
    fn test_drain_is_complete_and_ordered() {
        let src = MemorySource::new(
            (0..23)
                .rev()
                .map(|i| Message::new(format!("m{i:02}"), None, at(1, i))),
        );
        let drained = exporter(&src, 5).drain(None).unwrap();
        let ids: Vec<_> = drained.messages.iter().map(|m| m.id.as_str()).collect();
        let expected: Vec<String> = (0..23).map(|i| format!("m{i:02}")).collect();
        assert_eq!(ids, expected);
        assert_eq!(drained.pages, 5);
        assert_eq!(src.fetch_count(), 5);
    }

    #[test]
    fn test_exact_multiple_ends_on_empty_page() {
        let src = MemorySource::new((0..10).map(|i| Message::new(format!("m{i}"), None, at(1, i))));
        let drained = exporter(&src, 5).drain(None).unwrap();
        assert_eq!(drained.messages.len(), 10);
        assert_eq!(drained.pages, 3);
    }

    #[test]
    fn test_day_filter() {
        let mut messages = Vec::new();
        messages.extend((0..5).map(|i| Message::new(format!("a{i}"), None, at(1, i))));
        messages.extend((0..3).map(|i| Message::new(format!("b{i}"), None, at(2, i))));
        let src = MemorySource::new(messages);

        let filter = TimeRange::days(day(2), day(2));
        let output = exporter(&src, 2).export_all(filter, ExportFormat::Json).unwrap();
        assert_eq!(output.records, 3);

        let empty = exporter(&src, 2)
            .export_all(TimeRange::days(day(3), day(3)), ExportFormat::Csv)
            .unwrap();
        assert!(empty.is_empty());
        assert!(empty.bytes.is_empty());
        assert_eq!(empty.pages, 1);
    }

    #[test]
    fn test_failure_aborts_export() {
        let src = FailsOn {
            inner: MemorySource::new(
                (0..12).map(|i| Message::new(format!("m{i}"), None, at(1, i))),
            ),
            fetch: 2,
            seen: Cell::new(0),
        };
        let exporter = ExhaustiveExporter::new(&src, ExportConfig::new().with_step(5)).unwrap();
        let err = exporter.export_all(None, ExportFormat::Json).unwrap_err();
        assert!(err.is_fetch_failure());
        assert_eq!(src.seen.get(), 2);
    }

    #[test]
    fn test_progress_reports_every_page() {
        let src = MemorySource::new((0..7).map(|i| Message::new(format!("m{i}"), None, at(1, i))));
        let mut reports = Vec::new();
        exporter(&src, 3)
            .export_with_progress(None, ExportFormat::Csv, |p| reports.push(p))
            .unwrap();
        assert_eq!(
            reports,
            vec![
                ExportProgress { pages: 1, records: 3 },
                ExportProgress { pages: 2, records: 6 },
                ExportProgress { pages: 3, records: 7 },
            ]
        );
    }
}
