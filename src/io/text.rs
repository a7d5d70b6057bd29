//! Grapheme-aware text helpers for terminal output.

use std::borrow::Cow;
use unicode_segmentation::UnicodeSegmentation;

/// Counts grapheme clusters (user-perceived characters).
///
/// # Examples
///
/// ```
/// use logscope::io::grapheme_count;
///
/// assert_eq!(grapheme_count("héllo"), 5);
/// assert_eq!(grapheme_count("👨‍👩‍👧"), 1);
/// ```
#[must_use]
pub fn grapheme_count(s: &str) -> usize {
    s.graphemes(true).count()
}

/// Shortens `s` to at most `max` grapheme clusters, ending in `…` when cut.
///
/// Never splits a cluster.
#[must_use]
pub fn preview(s: &str, max: usize) -> Cow<'_, str> {
    if max == 0 {
        return Cow::Borrowed("");
    }
    match s.grapheme_indices(true).nth(max) {
        None => Cow::Borrowed(s),
        Some(_) => {
            let keep = s
                .grapheme_indices(true)
                .nth(max - 1)
                .map_or(0, |(i, _)| i);
            Cow::Owned(format!("{}…", &s[..keep]))
        }
    }
}

/// Collapses every run of whitespace, line breaks included, to one space.
#[must_use]
pub fn single_line(s: &str) -> Cow<'_, str> {
    if s.contains(|c: char| c.is_whitespace() && c != ' ') || s.contains("  ") {
        Cow::Owned(s.split_whitespace().collect::<Vec<_>>().join(" "))
    } else {
        Cow::Borrowed(s)
    }
}
