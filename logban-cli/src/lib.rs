//! logban CLI.
//!
//! This crate provides the command-line interface for scanning an access log,
//! checking flagged IPs against a reputation service and blocking them at the
//! firewall, with a local denylist as fallback.

pub mod cli;
pub mod commands;
pub mod exit;
pub mod io;
pub mod logger;

pub use cli::{parse_from, Cli, CliError, Command, DetectArgs, ScanArgs};
pub use commands::scan::{IpOutcome, IpReport, OrchestratorConfig, ScanReport, ScanStatus};
pub use commands::{execute_detect, execute_scan, CommandError, CommandResult};
pub use io::{Denylist, DenylistError, LogSourceError};
pub use logger::{init_tracing, Logger, MockLogger, NullLogger, TracingLogger, Verbosity};
