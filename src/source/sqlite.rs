//! `SQLite` message source.
//!
//! Serves the two access patterns the engines need from a `messages`
//! table: newest-first offset/limit pages with an exact count, and
//! oldest-first pages under an inclusive `created_at` range. The database
//! is opened read-only.
//!
//! `created_at` is compared and ordered through the `canonical_ts` function
//! registered on every connection, never as raw text.

// SQLite stores all integers as i64. These casts are intentional and safe
// because offsets, limits and counts are never negative.
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_possible_wrap)]

use crate::core::{Message, Page, PageQuery, SortOrder, format_timestamp};
use crate::error::{Result, SourceError};
use crate::source::schema::{
    CANONICAL_TS_FN, CHECK_SCHEMA_SQL, COUNT_MESSAGES_SQL, ORDER_NEWEST_SQL, ORDER_OLDEST_SQL,
    RANGE_CLAUSE_SQL, SELECT_MESSAGES_SQL, STATS_SQL,
};
use crate::source::traits::{MessageSource, SourceStats};
use chrono::{DateTime, NaiveDateTime, Utc};
use rusqlite::functions::FunctionFlags;
use rusqlite::types::Value;
use rusqlite::{Connection, OpenFlags, Row, params_from_iter};
use std::path::{Path, PathBuf};
use tracing::debug;

/// SQLite-backed message source.
///
/// # Examples
///
/// ```no_run
/// use logscope::source::SqliteSource;
///
/// let source = SqliteSource::open("chat.db").unwrap();
/// let stats = source.stats().unwrap();
/// println!("{} messages", stats.message_count);
/// ```
pub struct SqliteSource {
    /// `SQLite` connection.
    conn: Connection,
    /// Path to the database file (None for in-memory or borrowed connections).
    path: Option<PathBuf>,
}

impl std::fmt::Debug for SqliteSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteSource")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

impl SqliteSource {
    /// Opens an existing database read-only.
    ///
    /// # Errors
    ///
    /// Returns an error if the file does not exist or cannot be opened.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if !path.exists() {
            return Err(SourceError::Unavailable(format!(
                "database not found: {}",
                path.display()
            ))
            .into());
        }

        let conn = Connection::open_with_flags(
            &path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(SourceError::from)?;
        register_functions(&conn)?;

        debug!(path = %path.display(), "opened message store");

        Ok(Self {
            conn,
            path: Some(path),
        })
    }

    /// Wraps an already open connection.
    ///
    /// Useful for testing against an in-memory database.
    ///
    /// # Errors
    ///
    /// Returns an error if the timestamp function cannot be registered.
    pub fn from_connection(conn: Connection) -> Result<Self> {
        register_functions(&conn)?;
        Ok(Self { conn, path: None })
    }

    /// Returns the database path (None for wrapped connections).
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Checks if the store has a `messages` table.
    ///
    /// # Errors
    ///
    /// Returns an error if the check cannot be performed.
    pub fn is_initialized(&self) -> Result<bool> {
        let count: i64 = self
            .conn
            .query_row(CHECK_SCHEMA_SQL, [], |row| row.get(0))
            .map_err(SourceError::from)?;
        Ok(count > 0)
    }

    /// Gets store statistics.
    ///
    /// # Errors
    ///
    /// Returns an error if the store is not initialized or the query fails.
    pub fn stats(&self) -> Result<SourceStats> {
        if !self.is_initialized()? {
            return Err(SourceError::NotInitialized.into());
        }

        let (count, oldest, newest): (i64, Option<String>, Option<String>) = self
            .conn
            .query_row(STATS_SQL, [], |row| {
                Ok((row.get(0)?, row.get(1)?, row.get(2)?))
            })
            .map_err(SourceError::from)?;

        let db_size = self
            .path
            .as_ref()
            .and_then(|p| std::fs::metadata(p).ok())
            .map(|m| m.len());

        Ok(SourceStats {
            message_count: count as usize,
            oldest: oldest.as_deref().map(decode_timestamp).transpose()?,
            newest: newest.as_deref().map(decode_timestamp).transpose()?,
            db_size,
        })
    }
}

impl MessageSource for SqliteSource {
    fn fetch_page(&self, query: &PageQuery) -> std::result::Result<Page, SourceError> {
        let mut filter_params = Vec::new();
        if let Some(range) = &query.filter {
            filter_params.push(Value::Text(format_timestamp(&range.start())));
            filter_params.push(Value::Text(format_timestamp(&range.end())));
        }

        // Page and count read from one snapshot.
        let tx = self.conn.unchecked_transaction()?;

        let sql = page_sql(query);
        let mut page_params = filter_params.clone();
        page_params.push(Value::Integer(query.limit as i64));
        page_params.push(Value::Integer(query.offset as i64));

        let rows = {
            let mut stmt = tx.prepare(&sql)?;
            stmt.query_map(params_from_iter(page_params), MessageRow::from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?
        };

        let total = if query.with_count {
            let mut sql = String::from(COUNT_MESSAGES_SQL);
            if query.filter.is_some() {
                sql.push_str(RANGE_CLAUSE_SQL);
            }
            let count: i64 = tx.query_row(&sql, params_from_iter(filter_params), |row| {
                row.get(0)
            })?;
            Some(count as usize)
        } else {
            None
        };

        tx.commit()?;

        let messages = rows
            .into_iter()
            .map(MessageRow::into_message)
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(Page { messages, total })
    }
}

/// Builds the page SELECT for a query.
///
/// Placeholders are numbered so the range bounds (when present) come first,
/// followed by `LIMIT` and `OFFSET`.
fn page_sql(query: &PageQuery) -> String {
    let mut sql = String::from(SELECT_MESSAGES_SQL);
    let next = if query.filter.is_some() {
        sql.push_str(RANGE_CLAUSE_SQL);
        3
    } else {
        1
    };
    sql.push_str(match query.order {
        SortOrder::NewestFirst => ORDER_NEWEST_SQL,
        SortOrder::OldestFirst => ORDER_OLDEST_SQL,
    });
    sql.push_str(&format!(" LIMIT ?{next} OFFSET ?{}", next + 1));
    sql
}

/// A `messages` row before payload decoding.
struct MessageRow {
    id: String,
    sender_id: Option<String>,
    text: Option<String>,
    media_url: Option<String>,
    kind: Option<String>,
    created_at: String,
    read_at: Option<String>,
    reactions: Option<String>,
    is_edited: Option<bool>,
    reply_to_id: Option<String>,
    is_deleted: Option<bool>,
    delivered_at: Option<String>,
}

impl MessageRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            sender_id: row.get(1)?,
            text: row.get(2)?,
            media_url: row.get(3)?,
            kind: row.get(4)?,
            created_at: row.get(5)?,
            read_at: row.get(6)?,
            reactions: row.get(7)?,
            is_edited: row.get(8)?,
            reply_to_id: row.get(9)?,
            is_deleted: row.get(10)?,
            delivered_at: row.get(11)?,
        })
    }

    fn into_message(self) -> std::result::Result<Message, SourceError> {
        let reactions = self
            .reactions
            .as_deref()
            .map(serde_json::from_str)
            .transpose()
            .map_err(|e| SourceError::Decode {
                column: "reactions".to_string(),
                reason: e.to_string(),
            })?;

        Ok(Message {
            created_at: decode_timestamp(&self.created_at)?,
            id: self.id,
            sender_id: self.sender_id,
            text: self.text,
            media_url: self.media_url,
            kind: self.kind.unwrap_or_else(|| "text".to_string()),
            read_at: self.read_at,
            reactions,
            is_edited: self.is_edited.unwrap_or(false),
            reply_to_id: self.reply_to_id,
            is_deleted: self.is_deleted.unwrap_or(false),
            delivered_at: self.delivered_at,
        })
    }
}

/// Registers `canonical_ts(text)` on `conn`.
///
/// Decodable text maps to [`format_timestamp`] output, which orders the same
/// as the instant it names and matches the bound format. Undecodable text is
/// passed through so the row still surfaces and fails in
/// [`MessageRow::into_message`].
fn register_functions(conn: &Connection) -> std::result::Result<(), SourceError> {
    conn.create_scalar_function(
        CANONICAL_TS_FN,
        1,
        FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
        |ctx| {
            let raw: String = ctx.get(0)?;
            Ok(decode_timestamp(&raw).map_or(raw, |at| format_timestamp(&at)))
        },
    )?;
    Ok(())
}

/// Parses a stored `created_at`.
///
/// Accepts RFC 3339 and `SQLite`'s own `YYYY-MM-DD HH:MM:SS[.fff]` (UTC),
/// with either a space or `T` separator.
fn decode_timestamp(raw: &str) -> std::result::Result<DateTime<Utc>, SourceError> {
    if let Ok(at) = DateTime::parse_from_rfc3339(raw) {
        return Ok(at.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f"))
        .map(|naive| naive.and_utc())
        .map_err(|e| SourceError::Decode {
            column: "created_at".to_string(),
            reason: format!("{raw}: {e}"),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::TimeRange;
    use crate::source::schema::{INSERT_MESSAGE_SQL, SCHEMA_SQL};
    use chrono::{Duration, TimeZone};
    use rusqlite::params;

    fn minute(n: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap() + Duration::minutes(n)
    }

    fn setup(count: i64) -> SqliteSource {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(SCHEMA_SQL).unwrap();
        for n in 1..=count {
            conn.execute(
                INSERT_MESSAGE_SQL,
                params![
                    format!("m{n:03}"),
                    if n % 2 == 0 { Some("alice") } else { None },
                    format!("message {n}"),
                    None::<String>,
                    "text",
                    format_timestamp(&minute(n)),
                    None::<String>,
                    if n == 1 { Some(r#"{"+1":["bob"]}"#) } else { None },
                    false,
                    None::<String>,
                    false,
                    None::<String>,
                ],
            )
            .unwrap();
        }
        SqliteSource::from_connection(conn).unwrap()
    }

    fn query(order: SortOrder, offset: usize, limit: usize) -> PageQuery {
        PageQuery {
            filter: None,
            order,
            offset,
            limit,
            with_count: true,
        }
    }

    #[test]
    fn test_is_initialized() {
        let source = setup(0);
        assert!(source.is_initialized().unwrap());

        let bare = SqliteSource::from_connection(Connection::open_in_memory().unwrap()).unwrap();
        assert!(!bare.is_initialized().unwrap());
    }

    #[test]
    fn test_newest_first_page() {
        let source = setup(30);
        let page = source
            .fetch_page(&query(SortOrder::NewestFirst, 0, 25))
            .unwrap();
        assert_eq!(page.len(), 25);
        assert_eq!(page.total, Some(30));
        assert_eq!(page.messages[0].id, "m030");
        assert_eq!(page.messages[24].id, "m006");
    }

    #[test]
    fn test_oldest_first_offset() {
        let source = setup(30);
        let page = source
            .fetch_page(&query(SortOrder::OldestFirst, 25, 25))
            .unwrap();
        assert_eq!(page.len(), 5);
        assert_eq!(page.messages[0].id, "m026");
    }

    #[test]
    fn test_range_filter_is_inclusive() {
        let source = setup(30);
        let range = TimeRange::new(minute(10), minute(12)).unwrap();
        let page = source
            .fetch_page(&PageQuery {
                filter: Some(range),
                ..query(SortOrder::OldestFirst, 0, 100)
            })
            .unwrap();
        let ids: Vec<_> = page.messages.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, ["m010", "m011", "m012"]);
        assert_eq!(page.total, Some(3));
    }

    #[test]
    fn test_count_omitted_when_not_requested() {
        let source = setup(3);
        let page = source
            .fetch_page(&PageQuery {
                with_count: false,
                ..query(SortOrder::NewestFirst, 0, 10)
            })
            .unwrap();
        assert_eq!(page.total, None);
    }

    #[test]
    fn test_payload_decoded() {
        let source = setup(2);
        let page = source
            .fetch_page(&query(SortOrder::OldestFirst, 0, 10))
            .unwrap();
        let first = &page.messages[0];
        assert!(first.is_system());
        assert_eq!(first.reactions.as_ref().unwrap()["+1"][0], "bob");
        assert_eq!(page.messages[1].sender_id.as_deref(), Some("alice"));
        assert_eq!(first.created_at, minute(1));
    }

    #[test]
    fn test_missing_table_is_not_initialized() {
        let bare = SqliteSource::from_connection(Connection::open_in_memory().unwrap()).unwrap();
        let err = bare
            .fetch_page(&query(SortOrder::NewestFirst, 0, 10))
            .unwrap_err();
        assert_eq!(err, SourceError::NotInitialized);
        assert!(bare.stats().is_err());
    }

    #[test]
    fn test_stats() {
        let source = setup(4);
        let stats = source.stats().unwrap();
        assert_eq!(stats.message_count, 4);
        assert_eq!(stats.oldest, Some(minute(1)));
        assert_eq!(stats.newest, Some(minute(4)));
        assert_eq!(stats.db_size, None);
    }

    #[test]
    fn test_decode_timestamp_formats() {
        let expected = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
        assert_eq!(decode_timestamp("2024-01-02T03:04:05Z").unwrap(), expected);
        assert_eq!(
            decode_timestamp("2024-01-02T03:04:05+00:00").unwrap(),
            expected
        );
        assert_eq!(decode_timestamp("2024-01-02 03:04:05").unwrap(), expected);
        assert_eq!(decode_timestamp("2024-01-02T03:04:05").unwrap(), expected);
        assert!(decode_timestamp("yesterday").is_err());
    }

    /// Source whose `created_at` values are stored verbatim.
    fn setup_raw(rows: &[(&str, &str)]) -> SqliteSource {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(SCHEMA_SQL).unwrap();
        for (id, created_at) in rows {
            conn.execute(
                "INSERT INTO messages (id, created_at) VALUES (?1, ?2)",
                params![id, created_at],
            )
            .unwrap();
        }
        SqliteSource::from_connection(conn).unwrap()
    }

    fn ids(page: &Page) -> Vec<&str> {
        page.messages.iter().map(|m| m.id.as_str()).collect()
    }

    #[test]
    fn test_day_filter_over_mixed_timestamp_formats() {
        let source = setup_raw(&[
            ("a", "2024-01-02 10:00:00"),
            ("b", "2024-01-02T23:59:59Z"),
            ("c", "2024-01-02T12:00:00.000000Z"),
            ("d", "2024-01-01T23:59:59.999999Z"),
            ("e", "2024-01-03 00:00:00"),
            ("f", "2024-01-02T08:00:00+02:00"),
            ("g", "2024-01-03T01:00:00+02:00"),
        ]);
        let day = chrono::NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        let page = source
            .fetch_page(&PageQuery {
                filter: TimeRange::days(day, day),
                ..query(SortOrder::OldestFirst, 0, 100)
            })
            .unwrap();
        assert_eq!(ids(&page), ["f", "a", "c", "g", "b"]);
        assert_eq!(page.total, Some(5));
    }

    #[test]
    fn test_ordering_by_instant_not_text() {
        let source = setup_raw(&[
            ("x", "2024-01-02T10:00:00Z"),
            ("y", "2024-01-02T10:00:00.500000Z"),
            ("z", "2024-01-02 09:59:59.9"),
        ]);
        let oldest = source
            .fetch_page(&query(SortOrder::OldestFirst, 0, 10))
            .unwrap();
        assert_eq!(ids(&oldest), ["z", "x", "y"]);
        assert!(oldest.messages.windows(2).all(|w| w[0].created_at < w[1].created_at));

        let newest = source
            .fetch_page(&query(SortOrder::NewestFirst, 0, 10))
            .unwrap();
        assert_eq!(ids(&newest), ["y", "x", "z"]);
    }

    #[test]
    fn test_stats_over_mixed_timestamp_formats() {
        let source = setup_raw(&[
            ("early", "2024-01-02 09:00:00"),
            ("late", "2024-01-02T10:00:00Z"),
            ("mid", "2024-01-02T09:30:00.250000Z"),
        ]);
        let stats = source.stats().unwrap();
        assert_eq!(
            stats.oldest,
            Some(Utc.with_ymd_and_hms(2024, 1, 2, 9, 0, 0).unwrap())
        );
        assert_eq!(
            stats.newest,
            Some(Utc.with_ymd_and_hms(2024, 1, 2, 10, 0, 0).unwrap())
        );
    }

    #[test]
    fn test_undecodable_timestamp_surfaces_as_decode_error() {
        let source = setup_raw(&[("bad", "yesterday")]);
        let err = source
            .fetch_page(&query(SortOrder::NewestFirst, 0, 10))
            .unwrap_err();
        assert!(matches!(err, SourceError::Decode { ref column, .. } if column == "created_at"));
    }

    #[test]
    fn test_debug_omits_connection() {
        let source = setup(0);
        assert_eq!(format!("{source:?}"), "SqliteSource { path: None, .. }");
    }

    #[test]
    fn test_page_sql_placeholders() {
        let q = query(SortOrder::NewestFirst, 0, 1);
        assert!(page_sql(&q).ends_with("LIMIT ?1 OFFSET ?2"));
        let ranged = PageQuery {
            filter: TimeRange::new(minute(0), minute(1)),
            ..q
        };
        assert!(page_sql(&ranged).ends_with("LIMIT ?3 OFFSET ?4"));
    }

    #[test]
    fn test_open_missing_file() {
        let result = SqliteSource::open("/definitely/not/here.db");
        assert!(result.is_err());
    }
}
