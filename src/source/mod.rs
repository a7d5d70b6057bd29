//! Message source layer for logscope.
//!
//! The engines read pages through the [`MessageSource`] trait. The
//! `SQLite` implementation reads a `messages` table read-only; the
//! in-memory implementation serves fixed data sets.

pub mod memory;
pub mod schema;
pub mod sqlite;
pub mod traits;

pub use memory::MemorySource;
pub use schema::SCHEMA_SQL;
pub use sqlite::SqliteSource;
pub use traits::{MessageSource, SourceStats};

/// Default database path relative to the working directory.
pub const DEFAULT_DB_PATH: &str = "logscope.db";
