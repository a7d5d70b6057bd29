//! File output and text helpers.
//!
//! Export artifacts are written whole through [`write_file`]; the text
//! helpers keep terminal previews from splitting grapheme clusters.

pub mod text;
pub mod writer;

pub use text::{grapheme_count, preview, single_line};
pub use writer::{write_file, write_stdout};
