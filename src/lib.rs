//! # logscope
//!
//! Read-only inspector for an append-only message log.
//!
//! logscope keeps a growing in-memory window over a store ordered by
//! `created_at`, pages backward into history without moving what the reader
//! is looking at, and drains whole filtered result sets for JSON or CSV
//! export.
//!
//! ## Features
//!
//! - **Paged cursor**: one offset/limit iteration primitive with exhaustion
//!   detection, shared by the feed and the exporter
//! - **Feed synchronization**: newest-first loading with de-duplication and
//!   an in-flight gate
//! - **Scroll anchoring**: viewport correction across prepends
//! - **Exhaustive export**: sequential drains serialized to JSON or CSV
//! - **`SQLite` source**: read-only access to a `messages` table

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod cli;
pub mod core;
pub mod error;
pub mod export;
pub mod io;
pub mod source;
pub mod sync;

// Re-export commonly used types at crate root
pub use error::{Error, Result};

// Re-export core domain types
pub use core::{Message, Page, PageQuery, SortOrder, TimeRange};

// Re-export source types
pub use source::{DEFAULT_DB_PATH, MemorySource, MessageSource, SqliteSource};

// Re-export engine types
pub use sync::{
    AnchorConfig, FeedSynchronizer, NearTop, PagedCursor, ScrollAnchorController, ScrollOutcome,
    SyncConfig, ViewerSession, Viewport,
};

// Re-export export types
pub use export::{ExhaustiveExporter, ExportConfig, ExportFormat};

// Re-export CLI types
pub use cli::{Cli, Commands, OutputFormat};
