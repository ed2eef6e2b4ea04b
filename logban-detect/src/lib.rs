//! logban detection core.
//!
//! Consumes the tail of a web server access log and produces the ordered set
//! of suspicious client IPs:
//! - `parser` - extracts client IP and timestamp from one access log line
//! - `classifier` - windowed per-IP counting and keyword matching
//!
//! Triggers:
//! - FREQUENCY: at least `request_threshold` requests inside the window
//! - KEYWORD: at least one request inside the window hit a suspicious path

pub mod classifier;
pub mod config;
pub mod parser;
pub mod types;

pub use classifier::{classify, ClassifyError, WindowCounter};
pub use config::DetectConfig;
pub use parser::{parse_line, parse_timestamp};
pub use types::{Classification, IpStats, ParsedEntry, ScanOutcome, ScanStats, SuspiciousIp, Trigger};
