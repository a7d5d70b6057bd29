//! Viewer session wiring the feed to a rendered viewport.
//!
//! A [`ViewerSession`] owns one [`FeedSynchronizer`] and one
//! [`ScrollAnchorController`] and drives them from viewport events. The
//! rendering itself stays behind the [`Viewport`] trait.

use crate::core::Message;
use crate::error::Result;
use crate::source::MessageSource;
use crate::sync::anchor::{
    AnchorConfig, AnchorCorrection, AnchorState, ScrollAnchorController, ViewportMetrics,
};
use crate::sync::feed::{FeedStatus, FeedSynchronizer, LoadOutcome, SyncConfig};
use serde::Serialize;
use tracing::debug;

/// Rendering collaborator for a [`ViewerSession`].
pub trait Viewport {
    /// Current scroll geometry.
    fn metrics(&self) -> ViewportMetrics;

    /// Re-renders the window in ascending order. After this returns,
    /// [`Viewport::metrics`] must report the reflowed content height.
    fn render(&mut self, window: &[Message]);

    /// Writes the scroll offset.
    fn set_scroll_offset(&mut self, offset: f64);
}

/// Result of handling one scroll event.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ScrollOutcome {
    /// No backward load was triggered.
    Idle,
    /// Older messages were prepended and the view was corrected.
    Prepended {
        /// Messages that entered the window.
        added: usize,
        /// The offset write that kept the view steady.
        correction: AnchorCorrection,
    },
    /// A load ran but nothing new entered the window.
    NothingNew {
        /// Whether history is now exhausted.
        exhausted: bool,
    },
}

/// Feed, anchor and source for one open conversation view.
#[derive(Debug)]
pub struct ViewerSession<S> {
    source: S,
    feed: FeedSynchronizer,
    anchor: ScrollAnchorController,
}

impl<S: MessageSource> ViewerSession<S> {
    /// Creates a session with an empty window.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Config`] if either configuration is invalid.
    pub fn new(source: S, sync: SyncConfig, anchor: AnchorConfig) -> Result<Self> {
        Ok(Self {
            source,
            feed: FeedSynchronizer::new(sync)?,
            anchor: ScrollAnchorController::new(anchor)?,
        })
    }

    /// The message source.
    pub const fn source(&self) -> &S {
        &self.source
    }

    /// The feed state.
    pub const fn feed(&self) -> &FeedSynchronizer {
        &self.feed
    }

    /// Feed flags.
    pub fn status(&self) -> FeedStatus {
        self.feed.status()
    }

    /// Anchor controller state.
    pub const fn anchor_state(&self) -> AnchorState {
        self.anchor.state()
    }

    /// Loads the newest page, renders it and scrolls to the bottom once.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::FetchFailed`] if the page cannot be fetched.
    pub fn open<V: Viewport + ?Sized>(&mut self, viewport: &mut V) -> Result<LoadOutcome> {
        let outcome = self.feed.load_initial(&self.source)?;
        if outcome != LoadOutcome::Skipped {
            self.show_newest(viewport);
        }
        Ok(outcome)
    }

    /// Handles a scroll event, prepending older history near the top.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::FetchFailed`] if the backward load fails. The
    /// window and scroll position are untouched and [`Self::retry`] may be
    /// called.
    pub fn on_scroll<V: Viewport + ?Sized>(&mut self, viewport: &mut V) -> Result<ScrollOutcome> {
        let metrics = viewport.metrics();
        if !self.anchor.on_scroll(&metrics, self.feed.status()) {
            return Ok(ScrollOutcome::Idle);
        }
        self.prepend(viewport)
    }

    /// Retries a backward load regardless of scroll position.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::FetchFailed`] if the backward load fails.
    pub fn retry<V: Viewport + ?Sized>(&mut self, viewport: &mut V) -> Result<ScrollOutcome> {
        if !self.feed.status().can_load_older() {
            return Ok(ScrollOutcome::Idle);
        }
        let metrics = viewport.metrics();
        if !self.anchor.begin_prepend(&metrics) {
            return Ok(ScrollOutcome::Idle);
        }
        self.prepend(viewport)
    }

    /// Replaces the window with the newest page and scrolls to the bottom.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::FetchFailed`] if the page cannot be fetched;
    /// the previous window stays rendered.
    pub fn refresh<V: Viewport + ?Sized>(&mut self, viewport: &mut V) -> Result<LoadOutcome> {
        let outcome = self.feed.refresh(&self.source)?;
        if outcome != LoadOutcome::Skipped {
            self.anchor.reset();
            self.show_newest(viewport);
        }
        Ok(outcome)
    }

    fn prepend<V: Viewport + ?Sized>(&mut self, viewport: &mut V) -> Result<ScrollOutcome> {
        let outcome = match self.feed.load_older(&self.source) {
            Ok(outcome) => outcome,
            Err(err) => {
                self.anchor.on_load_resolved(false);
                return Err(err);
            }
        };

        self.anchor.on_load_resolved(outcome.grew());
        if !outcome.grew() {
            return Ok(ScrollOutcome::NothingNew {
                exhausted: self.feed.is_exhausted(),
            });
        }

        viewport.render(self.feed.window());
        let Some(correction) = self.anchor.on_layout(&viewport.metrics()) else {
            return Ok(ScrollOutcome::NothingNew {
                exhausted: self.feed.is_exhausted(),
            });
        };
        viewport.set_scroll_offset(correction.offset);
        debug!(
            added = outcome.added(),
            delta = correction.delta,
            offset = correction.offset,
            "prepended older messages"
        );

        Ok(ScrollOutcome::Prepended {
            added: outcome.added(),
            correction,
        })
    }

    fn show_newest<V: Viewport + ?Sized>(&mut self, viewport: &mut V) {
        viewport.render(self.feed.window());
        let offset = ScrollAnchorController::bottom_offset(&viewport.metrics());
        viewport.set_scroll_offset(offset);
    }
}
