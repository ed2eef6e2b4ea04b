//! Access log line parsing.
//!
//! Recognises the common/combined log layout:
//!
//! ```text
//! 203.0.113.7 - - [02/Jun/2025:08:25:22 +0900] "GET /wp-login.php HTTP/1.1" 404 153
//! ```
//!
//! Only the leading client address and the bracketed timestamp are extracted.
//! Anything else on the line is left to keyword matching.

use std::net::IpAddr;
use std::sync::LazyLock;

use chrono::{DateTime, FixedOffset};
use regex::Regex;

use crate::types::ParsedEntry;

/// `DD/Mon/YYYY:HH:MM:SS +ZZZZ`
pub const TIMESTAMP_FORMAT: &str = "%d/%b/%Y:%H:%M:%S %z";

static LINE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([0-9A-Fa-f:.]+) [^\[]+ \[([^\]]+)\]").expect("valid access log pattern")
});

/// Parse one raw log line.
///
/// Returns `None` for lines that do not match the layout, whose address is not
/// an IPv4/IPv6 literal, or whose timestamp does not parse. None of these are
/// errors; such lines are simply not counted.
pub fn parse_line(line: &str) -> Option<ParsedEntry> {
    let caps = LINE_PATTERN.captures(line)?;
    let ip = caps.get(1)?.as_str();
    ip.parse::<IpAddr>().ok()?;
    let timestamp = parse_timestamp(caps.get(2)?.as_str())?;

    Some(ParsedEntry {
        ip: ip.to_string(),
        timestamp,
    })
}

/// Parse an access log timestamp, including its numeric UTC offset.
pub fn parse_timestamp(s: &str) -> Option<DateTime<FixedOffset>> {
    DateTime::parse_from_str(s.trim(), TIMESTAMP_FORMAT).ok()
}
