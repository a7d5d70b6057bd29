//! Message records and time filters.
//!
//! Messages are created by the remote store and never mutated here. The
//! only field the engine reads is `created_at` (ordering) and `id`
//! (de-duplication); everything else is carried through untouched.

use chrono::{DateTime, NaiveDate, NaiveTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// A single record of the message log.
///
/// Field names match the store's column names so JSON and CSV exports
/// reproduce the table layout.
///
/// # Examples
///
/// ```
/// use logscope::core::Message;
/// use chrono::{TimeZone, Utc};
///
/// let at = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
/// let msg = Message::new("m-1", Some("u-1"), at).with_text("hello");
/// assert!(!msg.is_system());
/// assert_eq!(msg.text.as_deref(), Some("hello"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Unique identifier, used for de-duplication and as a render key.
    pub id: String,

    /// Author; `None` for system-authored messages.
    pub sender_id: Option<String>,

    /// Message body.
    pub text: Option<String>,

    /// Attached media location.
    pub media_url: Option<String>,

    /// Message kind as stored (usually `"text"`).
    #[serde(rename = "type")]
    pub kind: String,

    /// Creation timestamp; the sole ordering key.
    pub created_at: DateTime<Utc>,

    /// Read receipt timestamp, as stored.
    pub read_at: Option<String>,

    /// Reaction map, as stored.
    pub reactions: Option<serde_json::Value>,

    /// Whether the message was edited.
    pub is_edited: bool,

    /// Message this one replies to.
    pub reply_to_id: Option<String>,

    /// Whether the message was deleted.
    pub is_deleted: bool,

    /// Delivery receipt timestamp, as stored.
    pub delivered_at: Option<String>,
}

impl Message {
    /// Creates a plain text message with no payload.
    #[must_use]
    pub fn new(id: impl Into<String>, sender_id: Option<&str>, created_at: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            sender_id: sender_id.map(ToString::to_string),
            text: None,
            media_url: None,
            kind: "text".to_string(),
            created_at,
            read_at: None,
            reactions: None,
            is_edited: false,
            reply_to_id: None,
            is_deleted: false,
            delivered_at: None,
        }
    }

    /// Sets the message body.
    #[must_use]
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    /// Returns `true` for system-authored messages.
    #[must_use]
    pub const fn is_system(&self) -> bool {
        self.sender_id.is_none()
    }

    /// Total ordering key: `created_at`, ties broken by `id`.
    #[must_use]
    pub fn sort_key(&self) -> (DateTime<Utc>, &str) {
        (self.created_at, self.id.as_str())
    }
}

/// Formats a timestamp the way the store keeps `created_at`.
///
/// Fixed-width RFC 3339 in UTC with microseconds, so lexical order on the
/// stored text equals chronological order.
#[must_use]
pub fn format_timestamp(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Inclusive `[start, end]` bound on `created_at`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TimeRange {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl TimeRange {
    /// Creates a range; returns `None` when `start > end`.
    #[must_use]
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Option<Self> {
        (start <= end).then_some(Self { start, end })
    }

    /// Whole calendar days `from ..= to`, in UTC.
    ///
    /// Starts at `from 00:00:00` and ends at the last microsecond of `to`.
    ///
    /// # Examples
    ///
    /// ```
    /// use logscope::core::TimeRange;
    /// use chrono::NaiveDate;
    ///
    /// let day = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
    /// let range = TimeRange::days(day, day).unwrap();
    /// assert!(range.start() < range.end());
    /// ```
    #[must_use]
    pub fn days(from: NaiveDate, to: NaiveDate) -> Option<Self> {
        let first = NaiveTime::from_hms_opt(0, 0, 0)?;
        let last = NaiveTime::from_hms_micro_opt(23, 59, 59, 999_999)?;
        let start = from.and_time(first).and_utc();
        let end = to.and_time(last).and_utc();
        Self::new(start, end)
    }

    /// Inclusive lower bound.
    #[must_use]
    pub const fn start(&self) -> DateTime<Utc> {
        self.start
    }

    /// Inclusive upper bound.
    #[must_use]
    pub const fn end(&self) -> DateTime<Utc> {
        self.end
    }

    /// Returns `true` if `at` falls inside the range.
    #[must_use]
    pub fn contains(&self, at: &DateTime<Utc>) -> bool {
        self.start <= *at && *at <= self.end
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 2, h, m, 0).unwrap()
    }

    #[test]
    fn test_message_new() {
        let msg = Message::new("a", None, at(1, 0));
        assert!(msg.is_system());
        assert_eq!(msg.kind, "text");
        assert!(!msg.is_edited);
    }

    #[test]
    fn test_sort_key_breaks_ties_by_id() {
        let a = Message::new("a", None, at(1, 0));
        let b = Message::new("b", None, at(1, 0));
        assert!(a.sort_key() < b.sort_key());
    }

    #[test]
    fn test_serialize_uses_column_names() {
        let msg = Message::new("a", Some("u"), at(1, 0));
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["type"], "text");
        assert_eq!(json["sender_id"], "u");
        assert!(json["reply_to_id"].is_null());
    }

    #[test]
    fn test_format_timestamp_is_fixed_width() {
        assert_eq!(format_timestamp(&at(9, 5)), "2024-01-02T09:05:00.000000Z");
        assert_eq!(
            format_timestamp(&at(9, 5)).len(),
            format_timestamp(&at(23, 59)).len()
        );
    }

    #[test]
    fn test_time_range_rejects_inverted() {
        assert!(TimeRange::new(at(2, 0), at(1, 0)).is_none());
        assert!(TimeRange::new(at(1, 0), at(1, 0)).is_some());
    }

    #[test]
    fn test_time_range_days_covers_whole_day() {
        let day = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        let range = TimeRange::days(day, day).unwrap();
        assert!(range.contains(&at(0, 0)));
        assert!(range.contains(&at(23, 59)));
        assert!(!range.contains(&Utc.with_ymd_and_hms(2024, 1, 3, 0, 0, 0).unwrap()));
        assert!(!range.contains(&Utc.with_ymd_and_hms(2024, 1, 1, 23, 59, 59).unwrap()));
    }
}
