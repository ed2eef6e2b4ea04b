//! Logging abstraction for testable output.
//!
//! Run narration goes through the `Logger` trait so tests can assert on what a
//! scan reported. The production implementation forwards to `tracing`.

use std::sync::{Arc, RwLock};

use tracing::level_filters::LevelFilter;

/// Severity/verbosity of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Verbosity {
    /// Something was lost: an abusive IP is neither blocked nor recorded.
    Error,
    /// A per-IP step failed but the run carries on.
    Warn,
    /// Normal output (always shown)
    Normal,
    /// Verbose output (-v flag)
    Verbose,
    /// Debug output (-vv flag)
    Debug,
}

impl Verbosity {
    /// Create verbosity from CLI flag count.
    pub fn from_count(count: u8) -> Self {
        match count {
            0 => Verbosity::Normal,
            1 => Verbosity::Verbose,
            _ => Verbosity::Debug,
        }
    }

    /// Maximum `tracing` level shown at this verbosity.
    pub fn level_filter(self) -> LevelFilter {
        match self {
            Verbosity::Error => LevelFilter::ERROR,
            Verbosity::Warn => LevelFilter::WARN,
            Verbosity::Normal => LevelFilter::INFO,
            Verbosity::Verbose => LevelFilter::DEBUG,
            Verbosity::Debug => LevelFilter::TRACE,
        }
    }
}

/// Trait for logging output.
pub trait Logger: Send + Sync {
    /// Log a message at the given verbosity level.
    fn log(&self, level: Verbosity, message: &str);

    fn error(&self, message: &str) {
        self.log(Verbosity::Error, message);
    }

    fn warn(&self, message: &str) {
        self.log(Verbosity::Warn, message);
    }

    /// Log at normal level (always visible).
    fn info(&self, message: &str) {
        self.log(Verbosity::Normal, message);
    }

    /// Log at verbose level (requires -v).
    fn verbose(&self, message: &str) {
        self.log(Verbosity::Verbose, message);
    }

    /// Log at debug level (requires -vv).
    fn debug(&self, message: &str) {
        self.log(Verbosity::Debug, message);
    }
}

/// Logger that forwards to the `tracing` subscriber installed by the binary.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingLogger;

impl Logger for TracingLogger {
    fn log(&self, level: Verbosity, message: &str) {
        match level {
            Verbosity::Error => tracing::error!("{}", message),
            Verbosity::Warn => tracing::warn!("{}", message),
            Verbosity::Normal => tracing::info!("{}", message),
            Verbosity::Verbose => tracing::debug!("{}", message),
            Verbosity::Debug => tracing::trace!("{}", message),
        }
    }
}

/// Install a stderr `tracing` subscriber for the given verbosity.
pub fn init_tracing(verbosity: Verbosity) {
    let _ = tracing_subscriber::fmt()
        .with_max_level(verbosity.level_filter())
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

/// Mock logger for testing that captures all messages.
#[derive(Debug, Clone, Default)]
pub struct MockLogger {
    messages: Arc<RwLock<Vec<LogEntry>>>,
}

/// A captured log entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub level: Verbosity,
    pub message: String,
}

impl MockLogger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get all captured log entries.
    pub fn entries(&self) -> Vec<LogEntry> {
        self.messages.read().unwrap().clone()
    }

    /// Get all captured messages (just the text).
    pub fn messages(&self) -> Vec<String> {
        self.entries().iter().map(|e| e.message.clone()).collect()
    }

    /// Get messages at a specific level.
    pub fn messages_at_level(&self, level: Verbosity) -> Vec<String> {
        self.entries()
            .iter()
            .filter(|e| e.level == level)
            .map(|e| e.message.clone())
            .collect()
    }

    /// Check if any message contains the given substring.
    pub fn contains(&self, substring: &str) -> bool {
        self.messages().iter().any(|m| m.contains(substring))
    }
}

impl Logger for MockLogger {
    fn log(&self, level: Verbosity, message: &str) {
        self.messages.write().unwrap().push(LogEntry {
            level,
            message: message.to_string(),
        });
    }
}

/// A no-op logger that discards all messages.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullLogger;

impl Logger for NullLogger {
    fn log(&self, _level: Verbosity, _message: &str) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    // ===========================================
    // Verbosity Tests
    // ===========================================

    #[test]
    fn test_verbosity_ordering() {
        assert!(Verbosity::Error < Verbosity::Warn);
        assert!(Verbosity::Warn < Verbosity::Normal);
        assert!(Verbosity::Normal < Verbosity::Verbose);
        assert!(Verbosity::Verbose < Verbosity::Debug);
    }

    #[test]
    fn test_verbosity_from_count() {
        assert_eq!(Verbosity::from_count(0), Verbosity::Normal);
        assert_eq!(Verbosity::from_count(1), Verbosity::Verbose);
        assert_eq!(Verbosity::from_count(2), Verbosity::Debug);
        assert_eq!(Verbosity::from_count(255), Verbosity::Debug);
    }

    #[test]
    fn test_level_filter() {
        assert_eq!(Verbosity::Normal.level_filter(), LevelFilter::INFO);
        assert_eq!(Verbosity::Verbose.level_filter(), LevelFilter::DEBUG);
        assert_eq!(Verbosity::Debug.level_filter(), LevelFilter::TRACE);
    }

    // ===========================================
    // MockLogger Tests
    // ===========================================

    #[test]
    fn test_mock_logger_captures_levels() {
        let logger = MockLogger::new();
        logger.error("lost");
        logger.warn("skipped");
        logger.info("hello");
        logger.debug("details");

        assert_eq!(logger.entries().len(), 4);
        assert_eq!(logger.messages_at_level(Verbosity::Error), vec!["lost"]);
        assert_eq!(logger.messages_at_level(Verbosity::Warn), vec!["skipped"]);
        assert!(logger.contains("hell"));
        assert!(!logger.contains("absent"));
    }

    #[test]
    fn test_mock_logger_clone_shares_messages() {
        let logger = MockLogger::new();
        let handle = logger.clone();
        handle.info("shared");
        assert_eq!(logger.messages(), vec!["shared"]);
    }

    #[test]
    fn test_tracing_logger_without_subscriber_does_not_panic() {
        let logger = TracingLogger;
        logger.error("e");
        logger.info("i");
        logger.debug("d");
    }

    #[test]
    fn test_null_logger_discards() {
        NullLogger.info("ignored");
    }
}
