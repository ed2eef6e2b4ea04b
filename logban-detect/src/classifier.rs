//! Suspicious-IP classification over a trailing time window.
//!
//! Detection logic:
//! 1. Lines that do not parse, or whose timestamp is at or before
//!    `now - window_sec`, are ignored.
//! 2. Every remaining line increments its IP's request count, and records a
//!    keyword hit if it contains any configured keyword.
//! 3. An IP qualifies on FREQUENCY when its count reaches the threshold, else
//!    on KEYWORD when it has a hit. Frequency wins when both hold.
//! 4. Output preserves first-seen order.

use std::collections::HashMap;

use thiserror::Error;

use crate::config::DetectConfig;
use crate::parser::parse_line;
use crate::types::{Classification, IpStats, ScanOutcome, ScanStats, SuspiciousIp, Trigger};

/// Errors from classification.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ClassifyError {
    #[error("log source returned no lines")]
    EmptySource,
}

/// Incremental per-IP counter for one scan.
///
/// Built fresh for every scan; nothing carries over between runs.
#[derive(Debug)]
pub struct WindowCounter<'a> {
    config: &'a DetectConfig,
    window_start: i64,
    stats: Vec<IpStats>,
    index: HashMap<String, usize>,
    scan: ScanStats,
}

impl<'a> WindowCounter<'a> {
    /// Start a scan whose window ends at `now_unix_sec`.
    pub fn new(config: &'a DetectConfig, now_unix_sec: i64) -> Self {
        Self {
            config,
            window_start: config.window_start(now_unix_sec),
            stats: Vec::new(),
            index: HashMap::new(),
            scan: ScanStats::default(),
        }
    }

    /// Feed one raw log line.
    pub fn observe(&mut self, line: &str) {
        self.scan.scanned_lines += 1;

        let Some(entry) = parse_line(line) else {
            return;
        };
        self.scan.parsed_lines += 1;

        if entry.unix_sec() <= self.window_start {
            return;
        }
        self.scan.recent_lines += 1;

        let slot = match self.index.get(&entry.ip) {
            Some(&slot) => slot,
            None => {
                self.stats.push(IpStats::new(entry.ip.clone()));
                self.index.insert(entry.ip, self.stats.len() - 1);
                self.stats.len() - 1
            }
        };

        let stats = &mut self.stats[slot];
        stats.request_count += 1;
        if let Some(keyword) = self.config.matching_keyword(line) {
            stats.keyword_hit = Some((keyword.to_string(), line.to_string()));
        }
    }

    /// Per-IP aggregates so far, in first-seen order.
    pub fn stats(&self) -> &[IpStats] {
        &self.stats
    }

    /// Close the scan and classify every IP seen.
    pub fn finish(self) -> Classification {
        let mut scan = self.scan;
        scan.distinct_ips = self.stats.len();

        if scan.recent_lines == 0 {
            return Classification {
                outcome: ScanOutcome::NoRecentActivity,
                stats: scan,
            };
        }

        let threshold = self.config.request_threshold;
        let suspicious: Vec<SuspiciousIp> = self
            .stats
            .into_iter()
            .filter_map(|s| {
                let trigger = if s.request_count >= threshold {
                    Trigger::Frequency {
                        count: s.request_count,
                    }
                } else {
                    let (keyword, line) = s.keyword_hit?;
                    Trigger::Keyword { keyword, line }
                };
                Some(SuspiciousIp { ip: s.ip, trigger })
            })
            .collect();

        let outcome = if suspicious.is_empty() {
            ScanOutcome::NoSuspiciousActivity
        } else {
            ScanOutcome::Suspicious(suspicious)
        };

        Classification {
            outcome,
            stats: scan,
        }
    }
}

/// Classify a tail of log lines against a window ending at `now_unix_sec`.
///
/// An empty input is an error, distinct from a log whose lines are all stale.
pub fn classify<S: AsRef<str>>(
    lines: &[S],
    now_unix_sec: i64,
    config: &DetectConfig,
) -> Result<Classification, ClassifyError> {
    if lines.is_empty() {
        return Err(ClassifyError::EmptySource);
    }

    let mut counter = WindowCounter::new(config, now_unix_sec);
    for line in lines {
        counter.observe(line.as_ref());
    }
    Ok(counter.finish())
}
