//! Expected layout of the message table.
//!
//! logscope never creates or migrates the store; these statements describe
//! the table it reads and are used to build fixtures.

/// SQL describing the `messages` table.
pub const SCHEMA_SQL: &str = r"
CREATE TABLE IF NOT EXISTS messages (
    id TEXT PRIMARY KEY,
    sender_id TEXT,
    text TEXT,
    media_url TEXT,
    type TEXT NOT NULL DEFAULT 'text',
    created_at TEXT NOT NULL,   -- RFC 3339 or SQLite datetime text
    read_at TEXT,
    reactions TEXT,             -- JSON object
    is_edited INTEGER NOT NULL DEFAULT 0,
    reply_to_id TEXT,
    is_deleted INTEGER NOT NULL DEFAULT 0,
    delivered_at TEXT
);

-- Ordering index for both pagination directions
CREATE INDEX IF NOT EXISTS idx_messages_created ON messages(created_at, id);
";

/// SQL to check if the message table exists.
pub const CHECK_SCHEMA_SQL: &str = r"
SELECT COUNT(*) FROM sqlite_master
WHERE type='table' AND name='messages';
";

/// Column list shared by every message read, in decode order.
pub const SELECT_MESSAGES_SQL: &str = r"
SELECT id, sender_id, text, media_url, type, created_at,
       read_at, reactions, is_edited, reply_to_id, is_deleted, delivered_at
FROM messages";

/// SQL counting messages, before any filter clause.
pub const COUNT_MESSAGES_SQL: &str = "SELECT COUNT(*) FROM messages";

/// Name of the connection-local function mapping stored `created_at` text
/// to its canonical fixed-width form.
///
/// Every comparison and ordering on `created_at` goes through it.
pub const CANONICAL_TS_FN: &str = "canonical_ts";

/// SQL for store statistics.
pub const STATS_SQL: &str = "SELECT COUNT(*), MIN(canonical_ts(created_at)), \
     MAX(canonical_ts(created_at)) FROM messages";

/// Inclusive `created_at` range clause; binds `?1` and `?2`.
pub const RANGE_CLAUSE_SQL: &str =
    " WHERE canonical_ts(created_at) >= ?1 AND canonical_ts(created_at) <= ?2";

/// Newest-first ordering clause.
pub const ORDER_NEWEST_SQL: &str = " ORDER BY canonical_ts(created_at) DESC, id DESC";

/// Oldest-first ordering clause.
pub const ORDER_OLDEST_SQL: &str = " ORDER BY canonical_ts(created_at) ASC, id ASC";

/// SQL inserting one message, in [`SELECT_MESSAGES_SQL`] column order.
pub const INSERT_MESSAGE_SQL: &str = r"
INSERT INTO messages (
    id, sender_id, text, media_url, type, created_at,
    read_at, reactions, is_edited, reply_to_id, is_deleted, delivered_at
) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
";
