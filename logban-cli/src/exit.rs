//! Exit codes for the logban CLI.
//!
//! Following Unix conventions for exit codes.

use crate::commands::CommandError;

/// Exit code constants.
pub mod codes {
    /// Successful execution, including scans that found nothing to block.
    pub const SUCCESS: i32 = 0;
    /// Invalid arguments.
    pub const INVALID_ARGS: i32 = 1;
    /// Log file missing, unreadable or empty.
    pub const SOURCE_UNREADABLE: i32 = 2;
    /// HTTP client could not be constructed.
    pub const REMOTE_ERROR: i32 = 3;
    /// At least one abusive IP was neither blocked nor written to the denylist.
    pub const FALLBACK_FAILED: i32 = 4;
}

/// Map a CommandError to an exit code.
pub fn exit_code(error: &CommandError) -> i32 {
    match error {
        CommandError::InvalidArgument(_) => codes::INVALID_ARGS,
        CommandError::SourceUnreadable(_) => codes::SOURCE_UNREADABLE,
        CommandError::Remote(_) => codes::REMOTE_ERROR,
        CommandError::FallbackFailed(_) => codes::FALLBACK_FAILED,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::CliError;
    use crate::io::LogSourceError;
    use logban_remote::RemoteError;
    use std::path::PathBuf;

    #[test]
    fn test_exit_code_invalid_argument() {
        let error = CommandError::InvalidArgument(CliError::InvalidLineCount(0));
        assert_eq!(exit_code(&error), codes::INVALID_ARGS);
    }

    #[test]
    fn test_exit_code_source_unreadable() {
        let error = CommandError::SourceUnreadable(LogSourceError::Empty {
            path: PathBuf::from("/var/log/nginx/access.log"),
        });
        assert_eq!(exit_code(&error), codes::SOURCE_UNREADABLE);
    }

    #[test]
    fn test_exit_code_remote() {
        let error = CommandError::Remote(RemoteError::Config("empty key".to_string()));
        assert_eq!(exit_code(&error), codes::REMOTE_ERROR);
    }

    #[test]
    fn test_exit_code_fallback_failed() {
        let error = CommandError::FallbackFailed(2);
        assert_eq!(exit_code(&error), codes::FALLBACK_FAILED);
    }

    #[test]
    fn test_exit_codes_are_distinct() {
        let all = [
            codes::SUCCESS,
            codes::INVALID_ARGS,
            codes::SOURCE_UNREADABLE,
            codes::REMOTE_ERROR,
            codes::FALLBACK_FAILED,
        ];
        for (i, a) in all.iter().enumerate() {
            for b in &all[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }
}
