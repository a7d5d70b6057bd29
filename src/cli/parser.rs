//! Command-line argument parsing.
//!
//! Defines the CLI structure using clap derive macros.

use crate::export::{DEFAULT_EXPORT_STEP, ExportFormat};
use crate::sync::DEFAULT_PAGE_SIZE;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// logscope: read-only inspector for an append-only message log.
///
/// Browses history newest to oldest, one page at a time, and exports
/// whole date ranges to JSON or CSV.
#[derive(Parser, Debug)]
#[command(name = "logscope")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to the message database.
    ///
    /// Defaults to `logscope.db` in the current directory.
    #[arg(short, long, env = "LOGSCOPE_DB")]
    pub db_path: Option<PathBuf>,

    /// Enable debug logging.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Log filter (e.g. `warn`, `logscope=debug`).
    #[arg(long, env = "LOGSCOPE_LOG", default_value = "warn", global = true)]
    pub log_level: String,

    /// Output format (text, json).
    #[arg(long, default_value = "text", global = true)]
    pub format: String,

    /// The subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show message count and time span.
    Status,

    /// Print the newest messages, optionally paging back into history.
    Browse {
        /// Older pages to load after the newest one.
        #[arg(short, long, default_value = "0")]
        pages: usize,

        /// Messages per page.
        #[arg(long, default_value_t = DEFAULT_PAGE_SIZE)]
        page_size: usize,

        /// Sender whose messages are marked as your own.
        #[arg(long = "as", value_name = "SENDER")]
        perspective: Option<String>,
    },

    /// Export every message, or an inclusive day range, to a file.
    Export {
        /// First day to include (YYYY-MM-DD).
        #[arg(long, requires = "to")]
        from: Option<NaiveDate>,

        /// Last day to include (YYYY-MM-DD).
        #[arg(long, requires = "from")]
        to: Option<NaiveDate>,

        /// File format.
        #[arg(long, value_enum, default_value_t = ExportFormat::Json)]
        file_format: ExportFormat,

        /// Output file; `-` writes to stdout. Defaults to a name derived
        /// from the range.
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Rows requested per page.
        #[arg(long, default_value_t = DEFAULT_EXPORT_STEP)]
        step: usize,
    },
}

impl Cli {
    /// Returns the database path, using the default if not specified.
    #[must_use]
    pub fn get_db_path(&self) -> PathBuf {
        self.db_path
            .clone()
            .unwrap_or_else(|| PathBuf::from(crate::source::DEFAULT_DB_PATH))
    }

    /// Effective log filter: `debug` when verbose.
    #[must_use]
    pub fn log_filter(&self) -> &str {
        if self.verbose {
            "debug"
        } else {
            &self.log_level
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    fn cli(command: Commands) -> Cli {
        Cli {
            db_path: None,
            verbose: false,
            log_level: "warn".to_string(),
            format: "text".to_string(),
            command,
        }
    }

    #[test]
    fn test_cli_parse() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_default_db_path() {
        assert_eq!(
            cli(Commands::Status).get_db_path(),
            PathBuf::from(crate::source::DEFAULT_DB_PATH)
        );
    }

    #[test]
    fn test_verbose_forces_debug() {
        let mut c = cli(Commands::Status);
        assert_eq!(c.log_filter(), "warn");
        c.verbose = true;
        assert_eq!(c.log_filter(), "debug");
    }

    #[test]
    fn test_export_args() {
        let c = Cli::try_parse_from([
            "logscope",
            "export",
            "--from",
            "2024-01-01",
            "--to",
            "2024-01-31",
            "--file-format",
            "csv",
        ])
        .unwrap();
        let Commands::Export {
            from,
            to,
            file_format,
            step,
            ..
        } = c.command
        else {
            unreachable!("expected export");
        };
        assert_eq!(from, NaiveDate::from_ymd_opt(2024, 1, 1));
        assert_eq!(to, NaiveDate::from_ymd_opt(2024, 1, 31));
        assert_eq!(file_format, ExportFormat::Csv);
        assert_eq!(step, DEFAULT_EXPORT_STEP);
    }

    #[test]
    fn test_export_needs_both_dates() {
        assert!(Cli::try_parse_from(["logscope", "export", "--from", "2024-01-01"]).is_err());
        assert!(Cli::try_parse_from(["logscope", "export", "--to", "2024-01-01"]).is_err());
        assert!(
            Cli::try_parse_from(["logscope", "export", "--from", "01/02/2024", "--to", "x"])
                .is_err()
        );
    }

    #[test]
    fn test_browse_perspective() {
        let c = Cli::try_parse_from(["logscope", "browse", "--as", "u-1", "-p", "2"]).unwrap();
        assert!(matches!(
            c.command,
            Commands::Browse { pages: 2, perspective: Some(ref s), .. } if s == "u-1"
        ));
    }
}
