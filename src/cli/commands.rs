//! CLI command implementations.
//!
//! Contains the business logic for each CLI command.

use crate::cli::output::{
    ExportReport, OutputFormat, format_export, format_status, format_window, resolve_perspective,
};
use crate::cli::parser::{Cli, Commands};
use crate::core::TimeRange;
use crate::error::{CommandError, Result, SourceError};
use crate::export::{ExhaustiveExporter, ExportConfig, ExportFormat};
use crate::io::{write_file, write_stdout};
use crate::source::SqliteSource;
use crate::sync::{FeedSynchronizer, LoadOutcome, SyncConfig};
use chrono::{NaiveDate, Utc};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Output path that selects standard output.
pub const STDOUT_PATH: &str = "-";

/// Executes the CLI command.
///
/// # Arguments
///
/// * `cli` - Parsed CLI arguments.
///
/// # Returns
///
/// Result with output string on success.
///
/// # Errors
///
/// Returns an error if the command fails to execute.
pub fn execute(cli: &Cli) -> Result<String> {
    let format = OutputFormat::parse(&cli.format);
    let db_path = cli.get_db_path();

    match &cli.command {
        Commands::Status => cmd_status(&db_path, format),
        Commands::Browse {
            pages,
            page_size,
            perspective,
        } => cmd_browse(
            &db_path,
            *pages,
            *page_size,
            perspective.as_deref(),
            format,
        ),
        Commands::Export {
            from,
            to,
            file_format,
            output,
            step,
        } => {
            let filter = day_filter(*from, *to)?;
            let target = output.clone().unwrap_or_else(|| {
                default_export_path(*from, *to, *file_format, Utc::now().date_naive())
            });
            cmd_export(&db_path, filter, *file_format, &target, *step, format)
        }
    }
}

/// Opens the store and verifies it has a `messages` table.
fn open_source(db_path: &Path) -> Result<SqliteSource> {
    let source = SqliteSource::open(db_path)?;

    if !source.is_initialized()? {
        return Err(SourceError::NotInitialized.into());
    }

    Ok(source)
}

fn cmd_status(db_path: &Path, format: OutputFormat) -> Result<String> {
    let source = open_source(db_path)?;
    let stats = source.stats()?;
    Ok(format_status(&stats, format))
}

fn cmd_browse(
    db_path: &Path,
    pages: usize,
    page_size: usize,
    perspective: Option<&str>,
    format: OutputFormat,
) -> Result<String> {
    let source = open_source(db_path)?;
    let mut feed = FeedSynchronizer::new(SyncConfig::new().with_page_size(page_size))?;

    feed.load_initial(&source)?;
    for _ in 0..pages {
        if feed.load_older(&source)? == LoadOutcome::Skipped {
            break;
        }
    }
    debug!(loaded = feed.len(), exhausted = feed.is_exhausted(), "browse window ready");

    let perspective = resolve_perspective(feed.window(), perspective);
    Ok(format_window(
        feed.window(),
        perspective.as_deref(),
        &feed.status(),
        format,
    ))
}

fn cmd_export(
    db_path: &Path,
    filter: Option<TimeRange>,
    file_format: ExportFormat,
    target: &Path,
    step: usize,
    format: OutputFormat,
) -> Result<String> {
    let source = open_source(db_path)?;
    let exporter = ExhaustiveExporter::new(&source, ExportConfig::new().with_step(step))?;

    let output = exporter.export_with_progress(filter, file_format, |progress| {
        debug!(pages = progress.pages, records = progress.records, "export progress");
    })?;

    let mut report = ExportReport {
        records: output.records,
        pages: output.pages,
        bytes: output.bytes.len() as u64,
        format: file_format,
        path: None,
    };

    if output.is_empty() {
        info!("export matched no records; nothing written");
        return Ok(format_export(&report, format));
    }

    if target.as_os_str() == STDOUT_PATH {
        write_stdout(&output.bytes)?;
        return Ok(String::new());
    }

    write_file(target, &output.bytes)?;
    report.path = Some(target.to_string_lossy().to_string());
    Ok(format_export(&report, format))
}

/// Builds the inclusive whole-day filter from optional bounds.
///
/// # Errors
///
/// Returns [`CommandError::MissingArgument`] if only one bound is given,
/// or [`CommandError::InvalidArgument`] if `from` is after `to`.
pub fn day_filter(from: Option<NaiveDate>, to: Option<NaiveDate>) -> Result<Option<TimeRange>> {
    match (from, to) {
        (None, None) => Ok(None),
        (Some(_), None) => Err(CommandError::MissingArgument("--to".to_string()).into()),
        (None, Some(_)) => Err(CommandError::MissingArgument("--from".to_string()).into()),
        (Some(from), Some(to)) => TimeRange::days(from, to).map(Some).ok_or_else(|| {
            CommandError::InvalidArgument(format!("--from {from} is after --to {to}")).into()
        }),
    }
}

/// File name used when no output path is given.
///
/// `export_range_<from>_to_<to>.<ext>` for a day range, otherwise
/// `export_full_db_<today>.<ext>`.
#[must_use]
pub fn default_export_path(
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
    format: ExportFormat,
    today: NaiveDate,
) -> PathBuf {
    let ext = format.extension();
    match (from, to) {
        (Some(from), Some(to)) => PathBuf::from(format!("export_range_{from}_to_{to}.{ext}")),
        _ => PathBuf::from(format!("export_full_db_{today}.{ext}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_day_filter() {
        assert!(day_filter(None, None).unwrap().is_none());

        let range = day_filter(Some(date(2024, 1, 2)), Some(date(2024, 1, 3)))
            .unwrap()
            .unwrap();
        assert_eq!(range.start().to_rfc3339(), "2024-01-02T00:00:00+00:00");
    }

    #[test]
    fn test_day_filter_errors() {
        assert!(matches!(
            day_filter(Some(date(2024, 1, 2)), None),
            Err(Error::Command(CommandError::MissingArgument(_)))
        ));
        assert!(matches!(
            day_filter(None, Some(date(2024, 1, 2))),
            Err(Error::Command(CommandError::MissingArgument(_)))
        ));
        assert!(matches!(
            day_filter(Some(date(2024, 1, 3)), Some(date(2024, 1, 2))),
            Err(Error::Command(CommandError::InvalidArgument(_)))
        ));
    }

    #[test]
    fn test_default_export_path() {
        let today = date(2024, 7, 9);
        assert_eq!(
            default_export_path(None, None, ExportFormat::Json, today),
            PathBuf::from("export_full_db_2024-07-09.json")
        );
        assert_eq!(
            default_export_path(
                Some(date(2024, 1, 1)),
                Some(date(2024, 1, 31)),
                ExportFormat::Csv,
                today
            ),
            PathBuf::from("export_range_2024-01-01_to_2024-01-31.csv")
        );
    }

    #[test]
    fn test_missing_database() {
        let err = open_source(Path::new("/nonexistent/logscope.db")).unwrap_err();
        assert!(matches!(
            err,
            Error::FetchFailed {
                cause: SourceError::Unavailable(_)
            }
        ));
    }
}
