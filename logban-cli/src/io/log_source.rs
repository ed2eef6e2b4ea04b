//! Access log source.
//!
//! Reads the last N lines of the log. A missing/unreadable file and a file
//! with no lines are both reported as an unreadable source, never as a quiet
//! empty scan.

use std::path::{Path, PathBuf};

use logban_fs::{Filesystem, FsError};
use thiserror::Error;

/// Errors from reading the log source.
#[derive(Debug, Error)]
pub enum LogSourceError {
    #[error("failed to read log file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: FsError,
    },

    #[error("log file {path} is empty")]
    Empty { path: PathBuf },
}

impl LogSourceError {
    /// Path of the log that could not be read.
    pub fn path(&self) -> &Path {
        match self {
            LogSourceError::Read { path, .. } | LogSourceError::Empty { path } => path,
        }
    }
}

/// Read at most `max_lines` trailing lines from the log at `path`.
pub fn read_log_tail<F: Filesystem>(
    fs: &F,
    path: &Path,
    max_lines: usize,
) -> Result<Vec<String>, LogSourceError> {
    let lines = fs
        .read_tail(path, max_lines)
        .map_err(|source| LogSourceError::Read {
            path: path.to_path_buf(),
            source,
        })?;

    if lines.is_empty() {
        return Err(LogSourceError::Empty {
            path: path.to_path_buf(),
        });
    }
    Ok(lines)
}
