//! Filesystem trait and implementations.

use std::collections::{HashMap, HashSet};
use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use fs2::FileExt;
use thiserror::Error;

/// Bytes read per backward step when tailing a file.
pub const TAIL_CHUNK_SIZE: u64 = 64 * 1024;

/// Errors from filesystem operations.
#[derive(Debug, Error)]
pub enum FsError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// Trait for filesystem operations.
/// Abstracted for testing with mock implementations.
pub trait Filesystem: Send + Sync {
    /// Read at most the last `max_lines` lines of a text file.
    ///
    /// Line terminators are stripped. Invalid UTF-8 is replaced rather than
    /// rejected, since access logs routinely carry raw request bytes.
    fn read_tail(&self, path: &Path, max_lines: usize) -> Result<Vec<String>, FsError>;

    /// Append data to a file while holding an exclusive lock on it.
    /// Creates the file if it doesn't exist. Never truncates.
    fn append_locked(&self, path: &Path, data: &[u8]) -> Result<(), FsError>;
}

/// Read the last `max_lines` lines from `reader`, walking backwards from the
/// end in `TAIL_CHUNK_SIZE` steps. Only the chunks covering the tail are read.
pub fn tail_lines<R: Read + Seek>(reader: &mut R, max_lines: usize) -> io::Result<Vec<String>> {
    if max_lines == 0 {
        return Ok(Vec::new());
    }

    let len = reader.seek(SeekFrom::End(0))?;
    let mut pos = len;
    let mut chunks: Vec<Vec<u8>> = Vec::new();
    let mut newlines = 0usize;
    let mut trailing_newline = false;

    // Stop once there are `max_lines` separators, not counting the one that
    // terminates the last line; the leading segment may then be partial.
    while pos > 0 {
        let step = TAIL_CHUNK_SIZE.min(pos);
        pos -= step;
        reader.seek(SeekFrom::Start(pos))?;
        let mut chunk = vec![0u8; step as usize];
        reader.read_exact(&mut chunk)?;

        if chunks.is_empty() {
            trailing_newline = chunk.last() == Some(&b'\n');
        }
        newlines += chunk.iter().filter(|&&b| b == b'\n').count();
        chunks.push(chunk);

        if newlines - usize::from(trailing_newline) >= max_lines {
            break;
        }
    }

    let data: Vec<u8> = chunks.into_iter().rev().flatten().collect();
    let body = match data.strip_suffix(b"\n") {
        Some(body) => body,
        None => &data[..],
    };
    if body.is_empty() && !trailing_newline {
        return Ok(Vec::new());
    }

    let lines: Vec<&[u8]> = body.split(|&b| b == b'\n').collect();
    let skip = lines.len().saturating_sub(max_lines);
    Ok(lines[skip..]
        .iter()
        .map(|&line| {
            let line = line.strip_suffix(b"\r").unwrap_or(line);
            String::from_utf8_lossy(line).into_owned()
        })
        .collect())
}

/// Real filesystem implementation.
#[derive(Debug, Default, Clone, Copy)]
pub struct RealFilesystem;

impl Filesystem for RealFilesystem {
    fn read_tail(&self, path: &Path, max_lines: usize) -> Result<Vec<String>, FsError> {
        let mut file = File::open(path)?;
        Ok(tail_lines(&mut file, max_lines)?)
    }

    fn append_locked(&self, path: &Path, data: &[u8]) -> Result<(), FsError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let mut file = OpenOptions::new().create(true).append(true).open(path)?;

        // Held until unlock (or drop) so overlapping runs cannot interleave lines.
        file.lock_exclusive()?;
        let written = file.write_all(data).and_then(|()| file.sync_data());
        let unlocked = FileExt::unlock(&file);

        written?;
        unlocked?;
        Ok(())
    }
}

/// Mock filesystem for testing.
/// Cloning creates a new handle to the same underlying data.
#[derive(Debug, Clone, Default)]
pub struct MockFilesystem {
    files: Arc<RwLock<HashMap<PathBuf, Vec<u8>>>>,
    failing_reads: Arc<RwLock<HashSet<PathBuf>>>,
    failing_appends: Arc<RwLock<HashSet<PathBuf>>>,
}

impl MockFilesystem {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get content of a specific file.
    pub fn get_file(&self, path: &Path) -> Option<Vec<u8>> {
        self.files.read().unwrap().get(path).cloned()
    }

    /// Get content of a specific file as text.
    pub fn get_text(&self, path: &Path) -> Option<String> {
        self.get_file(path)
            .map(|data| String::from_utf8_lossy(&data).into_owned())
    }

    /// Check if a file exists.
    pub fn exists(&self, path: &Path) -> bool {
        self.files.read().unwrap().contains_key(path)
    }

    /// Add a file directly (for test setup).
    pub fn add_file(&self, path: PathBuf, data: Vec<u8>) {
        self.files.write().unwrap().insert(path, data);
    }

    /// Add a file built from lines, each terminated with a newline.
    pub fn add_lines<S: AsRef<str>>(&self, path: PathBuf, lines: &[S]) {
        let mut data = Vec::new();
        for line in lines {
            data.extend_from_slice(line.as_ref().as_bytes());
            data.push(b'\n');
        }
        self.add_file(path, data);
    }

    /// Make every subsequent read of `path` fail with a permission error.
    pub fn fail_reads(&self, path: PathBuf) {
        self.failing_reads.write().unwrap().insert(path);
    }

    /// Make every subsequent append to `path` fail with a storage error.
    pub fn fail_appends(&self, path: PathBuf) {
        self.failing_appends.write().unwrap().insert(path);
    }

    fn read_bytes(&self, path: &Path) -> Result<Vec<u8>, FsError> {
        if self.failing_reads.read().unwrap().contains(path) {
            return Err(FsError::Io(io::Error::new(
                io::ErrorKind::PermissionDenied,
                format!("permission denied: {}", path.display()),
            )));
        }
        match self.files.read().unwrap().get(path) {
            Some(data) => Ok(data.clone()),
            None => Err(FsError::Io(io::Error::new(
                io::ErrorKind::NotFound,
                format!("file not found: {}", path.display()),
            ))),
        }
    }
}

impl Filesystem for MockFilesystem {
    fn read_tail(&self, path: &Path, max_lines: usize) -> Result<Vec<String>, FsError> {
        let data = self.read_bytes(path)?;
        Ok(tail_lines(&mut io::Cursor::new(data), max_lines)?)
    }

    fn append_locked(&self, path: &Path, data: &[u8]) -> Result<(), FsError> {
        if self.failing_appends.read().unwrap().contains(path) {
            return Err(FsError::Io(io::Error::other(format!(
                "no space left on device: {}",
                path.display()
            ))));
        }
        let mut files = self.files.write().unwrap();
        let entry = files.entry(path.to_path_buf()).or_default();
        entry.extend_from_slice(data);
        Ok(())
    }
}
