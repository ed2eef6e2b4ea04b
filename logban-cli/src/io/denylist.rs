//! Fallback denylist writer.
//!
//! Plain text, one IP per line, append-only. Each append holds an exclusive
//! lock so overlapping runs cannot interleave partial lines.

use std::net::IpAddr;
use std::path::{Path, PathBuf};

use logban_fs::{Filesystem, FsError};
use thiserror::Error;

/// Errors from denylist writes.
#[derive(Debug, Error)]
pub enum DenylistError {
    #[error("refusing to write invalid denylist entry {0:?}")]
    InvalidEntry(String),

    #[error("failed to append to denylist {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: FsError,
    },
}

/// Handle to the denylist file.
#[derive(Debug)]
pub struct Denylist<'a, F: Filesystem> {
    fs: &'a F,
    path: PathBuf,
}

impl<'a, F: Filesystem> Denylist<'a, F> {
    pub fn new(fs: &'a F, path: impl Into<PathBuf>) -> Self {
        Self {
            fs,
            path: path.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append `ip` followed by a newline. Creates the file if absent.
    pub fn append(&self, ip: &str) -> Result<(), DenylistError> {
        if ip.parse::<IpAddr>().is_err() {
            return Err(DenylistError::InvalidEntry(ip.to_string()));
        }

        let line = format!("{}\n", ip);
        self.fs
            .append_locked(&self.path, line.as_bytes())
            .map_err(|source| DenylistError::Write {
                path: self.path.clone(),
                source,
            })
    }
}
