//! Filesystem abstraction for logban.
//!
//! This crate provides:
//! - Filesystem trait for tailing the access log and appending to the denylist
//! - RealFilesystem backed by `std::fs` with an exclusive advisory lock on appends
//! - MockFilesystem with failure injection for tests

pub mod filesystem;

pub use filesystem::{tail_lines, Filesystem, FsError, MockFilesystem, RealFilesystem, TAIL_CHUNK_SIZE};
