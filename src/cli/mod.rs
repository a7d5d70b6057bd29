//! CLI layer for logscope.
//!
//! Provides the command-line interface using clap, with commands for
//! inspecting the store, browsing recent history, and exporting.

pub mod commands;
pub mod output;
pub mod parser;

pub use commands::execute;
pub use output::OutputFormat;
pub use parser::{Cli, Commands};
