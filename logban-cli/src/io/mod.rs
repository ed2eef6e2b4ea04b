//! IO helpers for the scan pipeline.
//!
//! Provides utilities for:
//! - Reading the tail of the access log
//! - Appending IPs to the fallback denylist

pub mod denylist;
pub mod log_source;

pub use denylist::{Denylist, DenylistError};
pub use log_source::{read_log_tail, LogSourceError};
