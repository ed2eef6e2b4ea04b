//! Command orchestration for CLI subcommands.
//!
//! Provides execute functions for:
//! - `detect` - Classify the log tail
//! - `scan` - Classify, look up reputation, block or record

pub mod detect;
pub mod scan;

pub use detect::execute_detect;
pub use scan::execute_scan;

use crate::cli::CliError;
use crate::io::LogSourceError;
use logban_remote::RemoteError;
use thiserror::Error;

/// Errors from command execution.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("invalid argument: {0}")]
    InvalidArgument(#[from] CliError),

    #[error("log source unreadable: {0}")]
    SourceUnreadable(#[from] LogSourceError),

    #[error("remote client error: {0}")]
    Remote(#[from] RemoteError),

    #[error("{0} IP(s) could be neither blocked nor written to the denylist")]
    FallbackFailed(usize),
}

/// Result of command execution.
pub type CommandResult<T> = Result<T, CommandError>;
