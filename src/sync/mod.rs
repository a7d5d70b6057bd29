//! Paged synchronization engines.
//!
//! - [`PagedCursor`]: the "fetch until exhausted" primitive
//! - [`FeedSynchronizer`]: the viewer's ascending message window
//! - [`ScrollAnchorController`]: scroll correction across prepends
//! - [`ViewerSession`]: the three wired to a [`Viewport`]

pub mod anchor;
pub mod cursor;
pub mod feed;
pub mod session;

pub use anchor::{
    AnchorConfig, AnchorCorrection, AnchorState, NearTop, ScrollAnchorController, ViewportMetrics,
};
pub use cursor::PagedCursor;
pub use feed::{DEFAULT_PAGE_SIZE, FeedStatus, FeedSynchronizer, LoadOutcome, SyncConfig};
pub use session::{ScrollOutcome, ViewerSession, Viewport};
