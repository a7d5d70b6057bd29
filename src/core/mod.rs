//! Core domain models for logscope.
//!
//! Messages, time filters, and the page request/response shapes shared by
//! the feed and export engines. These are pure data types with no I/O.

pub mod message;
pub mod page;

pub use message::{Message, TimeRange, format_timestamp};
pub use page::{Page, PageQuery, SortOrder, is_exhausted};
