//! Output formatting for CLI commands.
//!
//! Supports text and JSON output formats. The text renderer is the
//! terminal counterpart of a chat view: messages grouped by day, senders
//! shown by a stable nickname, and the chosen perspective's own messages
//! marked.

use crate::core::{Message, format_timestamp};
use crate::error::Error;
use crate::io::{preview, single_line};
use crate::source::SourceStats;
use crate::sync::FeedStatus;
use serde::Serialize;
use std::fmt::Write;

/// Output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable text output.
    Text,
    /// JSON output.
    Json,
}

impl OutputFormat {
    /// Parses format from string.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "json" => Self::Json,
            _ => Self::Text,
        }
    }
}

/// Alias shown for messages without a sender.
pub const SYSTEM_ALIAS: &str = "System";

/// Nickname preferred as the default perspective.
pub const PREFERRED_ALIAS: &str = "Silent Echo";

const ADJECTIVES: [&str; 10] = [
    "Neon", "Swift", "Silent", "Crimson", "Azure", "Golden", "Mystic", "Iron", "Vibrant", "Frost",
];

const NAMES: [&str; 10] = [
    "Phoenix", "Shadow", "Falcon", "Nova", "Titan", "Echo", "Ghost", "Orion", "Raven", "Wolf",
];

const PREVIEW_GRAPHEMES: usize = 160;

/// Deterministic two-word nickname for a sender id.
///
/// The same id always maps to the same nickname, across runs and machines.
///
/// # Examples
///
/// ```
/// use logscope::cli::output::nickname;
///
/// assert_eq!(nickname(Some("u-1")), "Swift Phoenix");
/// assert_eq!(nickname(None), "System");
/// ```
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn nickname(sender_id: Option<&str>) -> String {
    let Some(id) = sender_id.filter(|s| !s.is_empty()) else {
        return SYSTEM_ALIAS.to_string();
    };

    // String hash over UTF-16 code units; the shift wraps at 32 bits while
    // the running sum does not.
    let mut hash: i64 = 0;
    for unit in id.encode_utf16() {
        let shifted = i64::from((hash as i32).wrapping_shl(5));
        hash = i64::from(unit) + shifted - hash;
    }

    let adjective = (hash.unsigned_abs() % 10) as usize;
    let name = (i64::from((hash as i32) >> 1).unsigned_abs() % 10) as usize;
    format!("{} {}", ADJECTIVES[adjective], NAMES[name])
}

/// Picks whose messages count as "own".
///
/// An explicit sender wins; otherwise the first sender nicknamed
/// [`PREFERRED_ALIAS`], otherwise the first sender seen.
#[must_use]
pub fn resolve_perspective(window: &[Message], explicit: Option<&str>) -> Option<String> {
    if let Some(sender) = explicit {
        return Some(sender.to_string());
    }
    let mut senders = window.iter().filter_map(|m| m.sender_id.as_deref());
    let first = senders.clone().next();
    senders
        .find(|s| nickname(Some(*s)) == PREFERRED_ALIAS)
        .or(first)
        .map(ToString::to_string)
}

/// Formats a status response.
#[must_use]
pub fn format_status(stats: &SourceStats, format: OutputFormat) -> String {
    match format {
        OutputFormat::Text => format_status_text(stats),
        OutputFormat::Json => format_json(stats),
    }
}

fn format_status_text(stats: &SourceStats) -> String {
    let mut output = String::new();
    output.push_str("logscope status\n");
    output.push_str("===============\n\n");
    let _ = writeln!(output, "  Messages:  {}", stats.message_count);
    let _ = writeln!(output, "  Oldest:    {}", timestamp_or_dash(stats.oldest.as_ref()));
    let _ = writeln!(output, "  Newest:    {}", timestamp_or_dash(stats.newest.as_ref()));
    if let Some(size) = stats.db_size {
        let _ = writeln!(output, "  DB size:   {}", format_size(size));
    }
    output
}

fn timestamp_or_dash(at: Option<&chrono::DateTime<chrono::Utc>>) -> String {
    at.map_or_else(|| "-".to_string(), format_timestamp)
}

/// Formats the loaded message window.
#[must_use]
pub fn format_window(
    window: &[Message],
    perspective: Option<&str>,
    status: &FeedStatus,
    format: OutputFormat,
) -> String {
    match format {
        OutputFormat::Text => format_window_text(window, perspective, status),
        OutputFormat::Json => {
            #[derive(Serialize)]
            struct Window<'a> {
                perspective: Option<&'a str>,
                status: &'a FeedStatus,
                messages: &'a [Message],
            }
            format_json(&Window {
                perspective,
                status,
                messages: window,
            })
        }
    }
}

fn format_window_text(
    window: &[Message],
    perspective: Option<&str>,
    status: &FeedStatus,
) -> String {
    if window.is_empty() {
        return "No messages found.\n".to_string();
    }

    let mut output = String::new();
    let mut current_day = None;

    for message in window {
        let day = message.created_at.date_naive();
        if current_day != Some(day) {
            if current_day.is_some() {
                output.push('\n');
            }
            let _ = writeln!(output, "── {} ──", day.format("%d %B %Y"));
            current_day = Some(day);
        }

        let own = perspective.is_some() && message.sender_id.as_deref() == perspective;
        let _ = writeln!(output, "{}", format_message_line(message, own));
    }

    output.push('\n');
    let more = if status.exhausted {
        "start of history"
    } else {
        "older messages available"
    };
    let _ = writeln!(output, "{} messages loaded ({more})", window.len());
    output
}

fn format_message_line(message: &Message, own: bool) -> String {
    let mut line = format!(
        "{} {} {:<16}",
        message.created_at.format("%H:%M"),
        if own { '>' } else { ' ' },
        nickname(message.sender_id.as_deref())
    );

    if let Some(reply) = &message.reply_to_id {
        let short = reply.split('-').next().unwrap_or(reply);
        let _ = write!(line, " [reply #{short}]");
    }
    if message.is_deleted {
        line.push_str(" [deleted]");
    }
    if let Some(url) = &message.media_url
        && !message.is_deleted
    {
        let _ = write!(line, " [{}: {url}]", message.kind);
    }
    match message.text.as_deref() {
        Some(text) => {
            let _ = write!(line, " {}", preview(&single_line(text), PREVIEW_GRAPHEMES));
        }
        None if message.is_deleted => line.push_str(" (content removed)"),
        None => {}
    }
    if message.is_edited {
        line.push_str(" (edited)");
    }
    if let Some(reactions) = format_reactions(message.reactions.as_ref()) {
        let _ = write!(line, "  {reactions}");
    }
    if own {
        line.push_str(receipt(message));
    }

    line.trim_end().to_string()
}

fn format_reactions(reactions: Option<&serde_json::Value>) -> Option<String> {
    let map = reactions?.as_object()?;
    if map.is_empty() {
        return None;
    }
    let parts: Vec<String> = map
        .iter()
        .map(|(emoji, users)| {
            let count = users.as_array().map_or(1, Vec::len);
            format!("{emoji}{count}")
        })
        .collect();
    Some(parts.join(" "))
}

fn receipt(message: &Message) -> &'static str {
    if message.read_at.is_some() {
        "  ✓✓ read"
    } else if message.delivered_at.is_some() {
        "  ✓✓"
    } else {
        "  ✓"
    }
}

/// Summary of one export command.
#[derive(Debug, Clone, Serialize)]
pub struct ExportReport {
    /// Records exported.
    pub records: usize,
    /// Pages fetched.
    pub pages: usize,
    /// Bytes written.
    pub bytes: u64,
    /// Format written.
    pub format: crate::export::ExportFormat,
    /// Destination; `None` when nothing was written.
    pub path: Option<String>,
}

/// Formats an export summary.
#[must_use]
pub fn format_export(report: &ExportReport, format: OutputFormat) -> String {
    match format {
        OutputFormat::Json => format_json(report),
        OutputFormat::Text => match &report.path {
            None => "No records in range; nothing written.\n".to_string(),
            Some(path) => format!(
                "Exported {} records ({} pages, {}) to {path}\n",
                report.records,
                report.pages,
                format_size(report.bytes)
            ),
        },
    }
}

/// Formats an error for display.
#[must_use]
pub fn format_error(error: &Error, format: OutputFormat) -> String {
    match format {
        OutputFormat::Text => error.to_string(),
        OutputFormat::Json => {
            #[derive(Serialize)]
            struct ErrorBody<'a> {
                error: String,
                kind: &'a str,
            }
            let kind = match error {
                Error::FetchFailed { .. } => "fetch_failed",
                Error::Export(_) => "export",
                Error::Io(_) => "io",
                Error::Command(_) => "command",
                Error::InvalidState { .. } => "invalid_state",
                Error::Config { .. } => "config",
            };
            format_json(&ErrorBody {
                error: error.to_string(),
                kind,
            })
        }
    }
}

/// Formats a value as JSON.
fn format_json<T: Serialize>(value: &T) -> String {
    let mut json = serde_json::to_string_pretty(value).unwrap_or_else(|_| "{}".to_string());
    json.push('\n');
    json
}

/// Formats a byte size as human-readable.
#[allow(clippy::cast_precision_loss)]
fn format_size(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{bytes} B")
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else if bytes < 1024 * 1024 * 1024 {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    } else {
        format!("{:.1} GB", bytes as f64 / (1024.0 * 1024.0 * 1024.0))
    }
}
