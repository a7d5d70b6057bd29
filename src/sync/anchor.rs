//! Scroll anchoring for backward pagination.
//!
//! When older messages are prepended above the viewport, everything the
//! reader was looking at moves down by the height of the new content. The
//! controller captures the content height before the load and, once the
//! view has reflowed, shifts the scroll offset by exactly the growth so the
//! visible messages stay put.
//!
//! ```text
//!  Idle --near top, can load--> AwaitingPrepend --grew--> Correcting --offset written--> Idle
//!                                      |
//!                                      +--nothing new / failed--> Idle
//! ```

use crate::error::{Error, Result};
use crate::sync::feed::FeedStatus;
use serde::Serialize;

/// Distance from the top that counts as "near the top".
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "unit", content = "value", rename_all = "snake_case")]
pub enum NearTop {
    /// Fixed margin in pixels.
    Pixels(f64),
    /// Margin as a fraction of the viewport height.
    Fraction(f64),
}

impl NearTop {
    /// Margin in pixels for a viewport of the given height.
    #[must_use]
    pub fn margin(self, viewport_height: f64) -> f64 {
        match self {
            Self::Pixels(px) => px,
            Self::Fraction(f) => f * viewport_height,
        }
    }
}

/// Default near-top margin.
pub const DEFAULT_NEAR_TOP: NearTop = NearTop::Pixels(48.0);

/// Anchor controller configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnchorConfig {
    threshold: NearTop,
}

impl Default for AnchorConfig {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_NEAR_TOP,
        }
    }
}

impl AnchorConfig {
    /// Creates the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the near-top threshold.
    #[must_use]
    pub const fn with_threshold(mut self, threshold: NearTop) -> Self {
        self.threshold = threshold;
        self
    }

    /// The near-top threshold.
    #[must_use]
    pub const fn threshold(&self) -> NearTop {
        self.threshold
    }

    /// Checks the threshold is finite and non-negative.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] for negative or non-finite margins.
    pub fn validate(&self) -> Result<()> {
        let value = match self.threshold {
            NearTop::Pixels(v) | NearTop::Fraction(v) => v,
        };
        if !value.is_finite() || value < 0.0 {
            return Err(Error::config(format!(
                "near-top threshold must be finite and non-negative, got {value}"
            )));
        }
        Ok(())
    }
}

/// Scroll geometry reported by the rendering collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct ViewportMetrics {
    /// Distance scrolled from the top of the content.
    pub scroll_offset: f64,
    /// Total scrollable content height.
    pub content_height: f64,
    /// Visible height.
    pub viewport_height: f64,
}

impl ViewportMetrics {
    /// Largest valid scroll offset.
    #[must_use]
    pub fn max_scroll_offset(&self) -> f64 {
        (self.content_height - self.viewport_height).max(0.0)
    }
}

/// Controller state.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum AnchorState {
    /// Waiting for the reader to approach the top.
    Idle,
    /// A backward load is outstanding.
    AwaitingPrepend {
        /// Content height captured when the load was triggered.
        pre_height: f64,
    },
    /// The window grew; waiting for the reflowed height.
    Correcting {
        /// Content height captured when the load was triggered.
        pre_height: f64,
    },
}

/// A scroll offset write produced by the controller.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AnchorCorrection {
    /// Height the prepended content introduced.
    pub delta: f64,
    /// New scroll offset to apply.
    pub offset: f64,
}

/// State machine keeping the viewport steady across prepends.
#[derive(Debug, Clone, PartialEq)]
pub struct ScrollAnchorController {
    config: AnchorConfig,
    state: AnchorState,
}

impl ScrollAnchorController {
    /// Creates an idle controller.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the threshold is invalid.
    pub fn new(config: AnchorConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            state: AnchorState::Idle,
        })
    }

    /// Current state.
    #[must_use]
    pub const fn state(&self) -> AnchorState {
        self.state
    }

    /// Returns `true` if the scroll position is within the near-top margin.
    #[must_use]
    pub fn is_near_top(&self, metrics: &ViewportMetrics) -> bool {
        metrics.scroll_offset <= self.config.threshold.margin(metrics.viewport_height)
    }

    /// Handles a scroll event.
    ///
    /// Returns `true` when the caller must now issue a backward load: the
    /// controller was idle, the viewport is near the top, and the feed can
    /// load older history.
    pub fn on_scroll(&mut self, metrics: &ViewportMetrics, feed: FeedStatus) -> bool {
        self.is_near_top(metrics) && feed.can_load_older() && self.begin_prepend(metrics)
    }

    /// Captures the pre-load height regardless of scroll position.
    ///
    /// Used for an explicit retry. Returns `false` unless idle.
    pub fn begin_prepend(&mut self, metrics: &ViewportMetrics) -> bool {
        if self.state != AnchorState::Idle {
            return false;
        }
        self.state = AnchorState::AwaitingPrepend {
            pre_height: metrics.content_height,
        };
        true
    }

    /// Handles the outcome of the backward load.
    ///
    /// Moves to `Correcting` only if the window actually grew; otherwise
    /// (nothing new, or a failed load) returns to `Idle` with no correction.
    pub fn on_load_resolved(&mut self, grew: bool) {
        if let AnchorState::AwaitingPrepend { pre_height } = self.state {
            self.state = if grew {
                AnchorState::Correcting { pre_height }
            } else {
                AnchorState::Idle
            };
        }
    }

    /// Computes the single offset write once the view has reflowed.
    ///
    /// `metrics` must reflect the new window; its `scroll_offset` is the
    /// offset before correction. Returns `None` unless correcting.
    pub fn on_layout(&mut self, metrics: &ViewportMetrics) -> Option<AnchorCorrection> {
        let AnchorState::Correcting { pre_height } = self.state else {
            return None;
        };
        self.state = AnchorState::Idle;

        let delta = metrics.content_height - pre_height;
        let offset = (metrics.scroll_offset + delta).clamp(0.0, metrics.max_scroll_offset());
        Some(AnchorCorrection { delta, offset })
    }

    /// Offset that shows the newest message, for the one-shot scroll after
    /// an initial load or refresh.
    #[must_use]
    pub fn bottom_offset(metrics: &ViewportMetrics) -> f64 {
        metrics.max_scroll_offset()
    }

    /// Drops any pending correction.
    pub const fn reset(&mut self) {
        self.state = AnchorState::Idle;
    }
}
