//! Feed synchronization.
//!
//! Maintains the viewer's in-memory window over the message log: an initial
//! newest-first page installed in chronological order, then older pages
//! prepended one at a time as the reader scrolls back. The window is always
//! ascending by `(created_at, id)` and never holds the same `id` twice.
//!
//! Loads are split into a `begin_*` step that yields the request and a
//! [`FeedSynchronizer::complete`] step that applies the response, so the
//! fetch itself can run wherever the caller's event loop runs. At most one
//! load is in flight; triggers arriving meanwhile are dropped, not queued.

use crate::core::{Message, Page, PageQuery, SortOrder};
use crate::error::{Error, Result, SourceError};
use crate::source::MessageSource;
use crate::sync::cursor::PagedCursor;
use serde::Serialize;
use std::collections::HashSet;
use tracing::{debug, warn};

/// Default rows per feed page.
pub const DEFAULT_PAGE_SIZE: usize = 100;

/// Feed configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncConfig {
    page_size: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl SyncConfig {
    /// Creates the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets rows per page.
    #[must_use]
    pub const fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    /// Rows per page.
    #[must_use]
    pub const fn page_size(&self) -> usize {
        self.page_size
    }
}

/// Result of a load request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum LoadOutcome {
    /// The request was a no-op: already exhausted, already in flight, or
    /// not applicable in the current state.
    Skipped,
    /// A page was applied.
    Loaded {
        /// Messages that entered the window.
        added: usize,
        /// Messages dropped because their `id` was already present.
        dropped: usize,
        /// Whether history is now exhausted.
        exhausted: bool,
    },
}

impl LoadOutcome {
    /// Returns `true` if the window gained messages.
    #[must_use]
    pub const fn grew(&self) -> bool {
        matches!(self, Self::Loaded { added, .. } if *added > 0)
    }

    /// Number of messages that entered the window.
    #[must_use]
    pub const fn added(&self) -> usize {
        match self {
            Self::Loaded { added, .. } => *added,
            Self::Skipped => 0,
        }
    }
}

/// Snapshot of the synchronizer's flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct FeedStatus {
    /// Whether an initial load has completed.
    pub loaded: bool,
    /// Whether older history is exhausted.
    pub exhausted: bool,
    /// Whether a load is outstanding.
    pub in_flight: bool,
    /// Messages in the window.
    pub len: usize,
    /// Total-count hint from the latest page.
    pub total_hint: Option<usize>,
}

impl FeedStatus {
    /// Returns `true` if a backward load would be issued now.
    #[must_use]
    pub const fn can_load_older(&self) -> bool {
        self.loaded && !self.exhausted && !self.in_flight
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LoadKind {
    Initial,
    Older,
    Refresh,
}

#[derive(Debug, Clone)]
struct Pending {
    kind: LoadKind,
    query: PageQuery,
}

/// Owner of the viewer's message window.
///
/// # Examples
///
/// ```
/// use logscope::core::Message;
/// use logscope::source::MemorySource;
/// use logscope::sync::{FeedSynchronizer, SyncConfig};
/// use chrono::{Duration, TimeZone, Utc};
///
/// let t0 = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
/// let source = MemorySource::new(
///     (1..=30).map(|i| Message::new(format!("m{i}"), None, t0 + Duration::minutes(i))),
/// );
/// let mut feed = FeedSynchronizer::new(SyncConfig::new().with_page_size(25)).unwrap();
///
/// feed.load_initial(&source).unwrap();
/// assert_eq!(feed.window().first().unwrap().id, "m6");
///
/// feed.load_older(&source).unwrap();
/// assert_eq!(feed.len(), 30);
/// assert!(feed.is_exhausted());
/// ```
#[derive(Debug, Clone)]
pub struct FeedSynchronizer {
    window: Vec<Message>,
    ids: HashSet<String>,
    cursor: PagedCursor,
    cursor_offset: usize,
    loaded: bool,
    pending: Option<Pending>,
}

impl FeedSynchronizer {
    /// Creates an empty synchronizer.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the page size is zero.
    pub fn new(config: SyncConfig) -> Result<Self> {
        let cursor = PagedCursor::new(SortOrder::NewestFirst, config.page_size())?
            .with_count_hint(true);
        Ok(Self {
            window: Vec::new(),
            ids: HashSet::new(),
            cursor,
            cursor_offset: 0,
            loaded: false,
            pending: None,
        })
    }

    /// The window, oldest message first.
    #[must_use]
    pub fn window(&self) -> &[Message] {
        &self.window
    }

    /// Messages in the window.
    #[must_use]
    pub fn len(&self) -> usize {
        self.window.len()
    }

    /// Returns `true` if the window is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.window.is_empty()
    }

    /// Returns `true` once older history is exhausted.
    #[must_use]
    pub const fn is_exhausted(&self) -> bool {
        self.cursor.is_exhausted()
    }

    /// Returns `true` while a load is outstanding.
    #[must_use]
    pub const fn is_in_flight(&self) -> bool {
        self.pending.is_some()
    }

    /// Offset of the most recently loaded page.
    #[must_use]
    pub const fn cursor_offset(&self) -> usize {
        self.cursor_offset
    }

    /// Rows per page.
    #[must_use]
    pub const fn page_size(&self) -> usize {
        self.cursor.page_size()
    }

    /// Snapshot of the synchronizer's flags.
    #[must_use]
    pub fn status(&self) -> FeedStatus {
        FeedStatus {
            loaded: self.loaded,
            exhausted: self.is_exhausted(),
            in_flight: self.is_in_flight(),
            len: self.window.len(),
            total_hint: self.cursor.total_hint(),
        }
    }

    /// Starts the initial load.
    ///
    /// Returns the request to issue, or `None` when the window is not empty
    /// or a load is already in flight.
    pub fn begin_initial(&mut self) -> Option<PageQuery> {
        if !self.window.is_empty() || self.pending.is_some() {
            return None;
        }
        self.start(LoadKind::Initial, self.cursor.query_at(0))
    }

    /// Starts a backward load of the next older page.
    ///
    /// Returns `None` before the initial load, once exhausted, or while a
    /// load is in flight.
    pub fn begin_older(&mut self) -> Option<PageQuery> {
        if !self.status().can_load_older() {
            return None;
        }
        let query = self.cursor.next_query()?;
        self.start(LoadKind::Older, query)
    }

    /// Starts a full refresh that will replace the window.
    ///
    /// Returns `None` while a load is in flight.
    pub fn begin_refresh(&mut self) -> Option<PageQuery> {
        if self.pending.is_some() {
            return None;
        }
        self.start(LoadKind::Refresh, self.cursor.query_at(0))
    }

    fn start(&mut self, kind: LoadKind, query: PageQuery) -> Option<PageQuery> {
        debug!(?kind, offset = query.offset, limit = query.limit, "feed load started");
        self.pending = Some(Pending {
            kind,
            query: query.clone(),
        });
        Some(query)
    }

    /// Applies the response to the outstanding load.
    ///
    /// On failure nothing but the in-flight flag changes: the window, the
    /// cursor position and exhaustion stay as they were, and the load can be
    /// retried.
    ///
    /// # Errors
    ///
    /// Returns [`Error::FetchFailed`] for a failed response, or
    /// [`Error::InvalidState`] if no load was started.
    pub fn complete(
        &mut self,
        result: std::result::Result<Page, SourceError>,
    ) -> Result<LoadOutcome> {
        let Some(pending) = self.pending.take() else {
            return Err(Error::invalid_state("no feed load in flight"));
        };

        let page = match result {
            Ok(page) => page,
            Err(cause) => {
                warn!(
                    kind = ?pending.kind,
                    offset = pending.query.offset,
                    %cause,
                    "feed load failed"
                );
                return Err(Error::FetchFailed { cause });
            }
        };

        let outcome = match pending.kind {
            LoadKind::Initial | LoadKind::Refresh => self.install(&pending.query, page),
            LoadKind::Older => self.prepend(&pending.query, page),
        };
        debug!(kind = ?pending.kind, ?outcome, len = self.window.len(), "feed load applied");
        Ok(outcome)
    }

    /// Replaces the window with a newest-first page, reversed.
    fn install(&mut self, query: &PageQuery, page: Page) -> LoadOutcome {
        let mut cursor = self.cursor.clone();
        cursor.reset();
        let exhausted = cursor.advance(query, &page);

        let mut ids = HashSet::with_capacity(page.len());
        let mut window = Vec::with_capacity(page.len());
        let mut dropped = 0;
        for message in page.messages.into_iter().rev() {
            if ids.insert(message.id.clone()) {
                window.push(message);
            } else {
                dropped += 1;
            }
        }
        sort_if_needed(&mut window);

        let added = window.len();
        self.window = window;
        self.ids = ids;
        self.cursor = cursor;
        self.cursor_offset = query.offset;
        self.loaded = true;

        LoadOutcome::Loaded {
            added,
            dropped,
            exhausted,
        }
    }

    /// Prepends an older newest-first page, reversed, minus known ids.
    fn prepend(&mut self, query: &PageQuery, page: Page) -> LoadOutcome {
        let exhausted = self.cursor.advance(query, &page);
        self.cursor_offset = query.offset;

        let mut older = Vec::with_capacity(page.len());
        let mut dropped = 0;
        for message in page.messages.into_iter().rev() {
            if self.ids.insert(message.id.clone()) {
                older.push(message);
            } else {
                dropped += 1;
            }
        }
        if dropped > 0 {
            warn!(
                dropped,
                offset = query.offset,
                "dropped duplicate messages from overlapping page"
            );
        }

        let added = older.len();
        if added > 0 {
            older.append(&mut self.window);
            self.window = older;
            sort_if_needed(&mut self.window);
        }

        LoadOutcome::Loaded {
            added,
            dropped,
            exhausted,
        }
    }

    /// Performs the initial load against `source`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::FetchFailed`] if the page cannot be fetched.
    pub fn load_initial<S: MessageSource + ?Sized>(&mut self, source: &S) -> Result<LoadOutcome> {
        match self.begin_initial() {
            Some(query) => self.complete(source.fetch_page(&query)),
            None => Ok(LoadOutcome::Skipped),
        }
    }

    /// Loads the next older page from `source`.
    ///
    /// A no-op once exhausted or while a load is in flight; in that case the
    /// source is not contacted.
    ///
    /// # Errors
    ///
    /// Returns [`Error::FetchFailed`] if the page cannot be fetched.
    pub fn load_older<S: MessageSource + ?Sized>(&mut self, source: &S) -> Result<LoadOutcome> {
        match self.begin_older() {
            Some(query) => self.complete(source.fetch_page(&query)),
            None => Ok(LoadOutcome::Skipped),
        }
    }

    /// Reloads the newest page from `source`, replacing the window.
    ///
    /// The old window survives a failed refresh untouched.
    ///
    /// # Errors
    ///
    /// Returns [`Error::FetchFailed`] if the page cannot be fetched.
    pub fn refresh<S: MessageSource + ?Sized>(&mut self, source: &S) -> Result<LoadOutcome> {
        match self.begin_refresh() {
            Some(query) => self.complete(source.fetch_page(&query)),
            None => Ok(LoadOutcome::Skipped),
        }
    }
}

/// Restores ascending order if a misbehaving source broke it.
fn sort_if_needed(window: &mut [Message]) {
    if !window.is_sorted_by(|a, b| a.sort_key() <= b.sort_key()) {
        warn!("source returned out-of-order rows; re-sorting window");
        window.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
    }
}
