//! Whole-file writes for export artifacts.
//!
//! Content is written to a temporary file in the target's directory and
//! persisted over the target, so a failed write never leaves a truncated
//! artifact at the target path.

use crate::error::{IoError, Result};
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

/// Writes `content` to `path`, replacing any existing file.
///
/// Parent directories are created as needed.
///
/// # Errors
///
/// Returns [`IoError::DirectoryFailed`] if a parent directory cannot be
/// created, or [`IoError::WriteFailed`] if the content cannot be written or
/// moved into place.
///
/// # Examples
///
/// ```no_run
/// use logscope::io::write_file;
///
/// write_file("exports/log.json", b"[]").unwrap();
/// ```
pub fn write_file<P: AsRef<Path>>(path: P, content: &[u8]) -> Result<()> {
    let path = path.as_ref();
    let path_str = path.to_string_lossy().to_string();
    let write_failed = |e: std::io::Error| IoError::WriteFailed {
        path: path_str.clone(),
        reason: e.to_string(),
    };

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    if !dir.exists() {
        std::fs::create_dir_all(dir).map_err(|e| IoError::DirectoryFailed {
            path: dir.to_string_lossy().to_string(),
            reason: e.to_string(),
        })?;
    }

    // Removed on drop unless persisted.
    let mut temp = NamedTempFile::new_in(dir).map_err(write_failed)?;
    temp.write_all(content)
        .and_then(|()| temp.as_file().sync_all())
        .map_err(write_failed)?;
    temp.persist(path).map_err(|e| write_failed(e.error))?;

    Ok(())
}

/// Writes `content` to standard output.
///
/// # Errors
///
/// Returns [`IoError::Generic`] if stdout is closed.
pub fn write_stdout(content: &[u8]) -> Result<()> {
    let mut stdout = std::io::stdout().lock();
    stdout
        .write_all(content)
        .and_then(|()| stdout.flush())
        .map_err(|e| IoError::Generic(e.to_string()).into())
}
