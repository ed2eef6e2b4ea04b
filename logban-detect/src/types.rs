//! Core types for log classification.

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

/// One access log line that matched the expected layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedEntry {
    pub ip: String,
    pub timestamp: DateTime<FixedOffset>,
}

impl ParsedEntry {
    /// Timestamp as Unix seconds.
    pub fn unix_sec(&self) -> i64 {
        self.timestamp.timestamp()
    }
}

/// Per-IP aggregate for a single scan.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct IpStats {
    pub ip: String,
    /// In-window requests only.
    pub request_count: u64,
    /// Most recent in-window line that matched a keyword, with that keyword.
    pub keyword_hit: Option<(String, String)>,
}

impl IpStats {
    pub fn new(ip: impl Into<String>) -> Self {
        Self {
            ip: ip.into(),
            ..Self::default()
        }
    }
}

/// Why an IP was flagged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "lowercase")]
pub enum Trigger {
    /// Request count reached the threshold.
    Frequency { count: u64 },
    /// A request contained a suspicious keyword.
    Keyword { keyword: String, line: String },
}

impl Trigger {
    /// Short reason label.
    pub fn reason(&self) -> &'static str {
        match self {
            Trigger::Frequency { .. } => "frequency",
            Trigger::Keyword { .. } => "keyword",
        }
    }
}

impl std::fmt::Display for Trigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Trigger::Frequency { count } => write!(f, "frequency ({} requests)", count),
            Trigger::Keyword { keyword, .. } => write!(f, "keyword ({})", keyword),
        }
    }
}

/// A candidate IP emitted by the classifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuspiciousIp {
    pub ip: String,
    #[serde(flatten)]
    pub trigger: Trigger,
}

/// Line accounting for one scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ScanStats {
    /// Lines handed to the classifier.
    pub scanned_lines: usize,
    /// Lines that matched the access log layout with a valid timestamp.
    pub parsed_lines: usize,
    /// Parsed lines inside the window.
    pub recent_lines: usize,
    /// Distinct IPs among recent lines.
    pub distinct_ips: usize,
}

/// Result of classifying a readable, non-empty log tail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanOutcome {
    /// No parsed line fell inside the window.
    NoRecentActivity,
    /// Recent lines existed but no IP qualified.
    NoSuspiciousActivity,
    /// One entry per qualifying IP, in first-seen order.
    Suspicious(Vec<SuspiciousIp>),
}

impl ScanOutcome {
    /// Candidate IPs, empty for the two quiet outcomes.
    pub fn candidates(&self) -> &[SuspiciousIp] {
        match self {
            ScanOutcome::Suspicious(ips) => ips,
            _ => &[],
        }
    }
}

/// Classifier output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub outcome: ScanOutcome,
    pub stats: ScanStats,
}
