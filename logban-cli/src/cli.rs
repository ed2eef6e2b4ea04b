//! CLI argument parsing for logban.
//!
//! `scan` runs the whole pipeline; `detect` stops after classification.
//! Credentials can be supplied through the environment instead of flags.

use std::path::PathBuf;
use std::time::Duration;

use clap::{ArgAction, Args, Parser, Subcommand};
use logban_detect::config::{DEFAULT_KEYWORDS, DEFAULT_REQUEST_THRESHOLD, DEFAULT_WINDOW_SEC};
use logban_detect::DetectConfig;
use logban_remote::firewall::DEFAULT_NOTE;
use logban_remote::reputation::DEFAULT_MAX_AGE_DAYS;
use logban_remote::{AbuseIpDbConfig, CloudflareConfig, RuleScope};
use thiserror::Error;

use crate::commands::scan::OrchestratorConfig;

/// Default access log location.
pub const DEFAULT_LOG_PATH: &str = "/var/log/nginx/access.log";

/// Default number of trailing log lines scanned.
pub const DEFAULT_LINE_COUNT: usize = 10_000;

/// Default abuse confidence score at or above which an IP is blocked.
pub const DEFAULT_SCORE_THRESHOLD: u8 = 60;

/// Default fallback denylist location.
pub const DEFAULT_DENYLIST_PATH: &str = "/home/web/ipban.txt";

/// Default timeout for each outbound request, in seconds.
pub const DEFAULT_TIMEOUT_SEC: u64 = 10;

/// Errors from CLI argument validation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CliError {
    #[error("lines must be at least 1, got {0}")]
    InvalidLineCount(usize),

    #[error("window-sec must be at least 1, got {0}")]
    InvalidWindowSec(u64),

    #[error("request-threshold must be at least 1, got {0}")]
    InvalidRequestThreshold(u64),

    #[error("score-threshold must be between 0 and 100, got {0}")]
    InvalidScoreThreshold(u8),

    #[error("timeout-sec must be at least 1, got {0}")]
    InvalidTimeout(u64),

    #[error("keywords must not be empty")]
    EmptyKeyword,

    #[error("an AbuseIPDB API key is required (--abuseipdb-key or ABUSEIPDB_API_KEY)")]
    MissingReputationKey,

    #[error("a Cloudflare account or zone id is required unless --dry-run is set")]
    MissingFirewallScope,

    #[error("Cloudflare email and API key are required unless --dry-run is set")]
    MissingFirewallCredentials,
}

/// logban - flag abusive clients in a web server access log and block them.
#[derive(Parser, Debug, Clone, PartialEq)]
#[command(name = "logban")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Increase log output (-v verbose, -vv debug).
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Classify the log, check reputation and block the worst offenders.
    Scan(ScanArgs),
    /// Classify the log and list suspicious IPs without contacting any service.
    Detect(DetectArgs),
}

fn default_keywords() -> Vec<String> {
    DEFAULT_KEYWORDS.iter().map(|k| k.to_string()).collect()
}

/// Arguments controlling log classification.
#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct DetectArgs {
    /// Access log to scan.
    #[arg(long, default_value = DEFAULT_LOG_PATH)]
    pub log: PathBuf,

    /// Number of trailing log lines to scan.
    #[arg(long, default_value_t = DEFAULT_LINE_COUNT)]
    pub lines: usize,

    /// Trailing window in seconds; older lines are ignored.
    #[arg(long, default_value_t = DEFAULT_WINDOW_SEC)]
    pub window_sec: u64,

    /// In-window request count that flags an IP.
    #[arg(long, default_value_t = DEFAULT_REQUEST_THRESHOLD)]
    pub request_threshold: u64,

    /// Suspicious substring (repeatable). Replaces the built-in list when given.
    #[arg(long = "keyword", value_name = "KEYWORD", default_values_t = default_keywords())]
    pub keywords: Vec<String>,

    /// Print the result as JSON.
    #[arg(long, default_value_t = false)]
    pub json: bool,
}

impl DetectArgs {
    /// Validate the arguments.
    pub fn validate(&self) -> Result<(), CliError> {
        if self.lines == 0 {
            return Err(CliError::InvalidLineCount(self.lines));
        }
        if self.window_sec == 0 {
            return Err(CliError::InvalidWindowSec(self.window_sec));
        }
        if self.request_threshold == 0 {
            return Err(CliError::InvalidRequestThreshold(self.request_threshold));
        }
        if self.keywords.iter().any(|k| k.is_empty()) {
            return Err(CliError::EmptyKeyword);
        }
        Ok(())
    }

    /// Convert to the classifier configuration.
    pub fn to_detect_config(&self) -> DetectConfig {
        DetectConfig::default()
            .with_window_sec(self.window_sec)
            .with_request_threshold(self.request_threshold)
            .with_keywords(self.keywords.iter().cloned())
    }
}

/// Arguments for the scan command (detect, look up, block).
#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct ScanArgs {
    #[command(flatten)]
    pub detect: DetectArgs,

    /// Abuse confidence score (0-100) at or above which an IP is blocked.
    #[arg(long, default_value_t = DEFAULT_SCORE_THRESHOLD)]
    pub score_threshold: u8,

    /// Only consider reputation reports newer than this many days.
    #[arg(long, default_value_t = DEFAULT_MAX_AGE_DAYS)]
    pub max_age_days: u32,

    /// File that receives IPs the firewall could not block.
    #[arg(long, default_value = DEFAULT_DENYLIST_PATH)]
    pub denylist: PathBuf,

    /// AbuseIPDB API key.
    #[arg(long, env = "ABUSEIPDB_API_KEY", hide_env_values = true)]
    pub abuseipdb_key: Option<String>,

    /// Cloudflare account email.
    #[arg(long, env = "CLOUDFLARE_EMAIL")]
    pub cf_email: Option<String>,

    /// Cloudflare global API key.
    #[arg(long, env = "CLOUDFLARE_API_KEY", hide_env_values = true)]
    pub cf_key: Option<String>,

    /// Create account-wide rules. Takes precedence over --cf-zone-id.
    #[arg(long, env = "CLOUDFLARE_ACCOUNT_ID")]
    pub cf_account_id: Option<String>,

    /// Create rules for a single zone.
    #[arg(long, env = "CLOUDFLARE_ZONE_ID")]
    pub cf_zone_id: Option<String>,

    /// Note attached to created firewall rules.
    #[arg(long, default_value = DEFAULT_NOTE)]
    pub note: String,

    /// Timeout for each outbound request, in seconds.
    #[arg(long, default_value_t = DEFAULT_TIMEOUT_SEC)]
    pub timeout_sec: u64,

    /// Look up reputation but never block or write the denylist.
    #[arg(long, default_value_t = false)]
    pub dry_run: bool,
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

impl ScanArgs {
    /// Validate the arguments.
    pub fn validate(&self) -> Result<(), CliError> {
        self.detect.validate()?;
        if self.score_threshold > 100 {
            return Err(CliError::InvalidScoreThreshold(self.score_threshold));
        }
        if self.timeout_sec == 0 {
            return Err(CliError::InvalidTimeout(self.timeout_sec));
        }
        if present(&self.abuseipdb_key).is_none() {
            return Err(CliError::MissingReputationKey);
        }
        if !self.dry_run {
            if self.rule_scope().is_none() {
                return Err(CliError::MissingFirewallScope);
            }
            if present(&self.cf_email).is_none() || present(&self.cf_key).is_none() {
                return Err(CliError::MissingFirewallCredentials);
            }
        }
        Ok(())
    }

    fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_sec)
    }

    /// Firewall rule scope; the account id wins when both are set.
    pub fn rule_scope(&self) -> Option<RuleScope> {
        RuleScope::select(present(&self.cf_account_id), present(&self.cf_zone_id))
    }

    /// Convert to the reputation client configuration.
    pub fn to_reputation_config(&self) -> Result<AbuseIpDbConfig, CliError> {
        let key = present(&self.abuseipdb_key).ok_or(CliError::MissingReputationKey)?;
        Ok(AbuseIpDbConfig::new(key)
            .with_max_age_days(self.max_age_days)
            .with_timeout(self.timeout()))
    }

    /// Convert to the firewall client configuration.
    pub fn to_firewall_config(&self) -> Result<CloudflareConfig, CliError> {
        let scope = self.rule_scope().ok_or(CliError::MissingFirewallScope)?;
        let (email, key) = present(&self.cf_email)
            .zip(present(&self.cf_key))
            .ok_or(CliError::MissingFirewallCredentials)?;
        Ok(CloudflareConfig::new(email, key, scope).with_timeout(self.timeout()))
    }

    /// Convert to the orchestrator configuration.
    pub fn to_orchestrator_config(&self) -> OrchestratorConfig {
        OrchestratorConfig {
            score_threshold: self.score_threshold,
            note: self.note.clone(),
            denylist: self.denylist.clone(),
        }
    }
}

/// Parse CLI from an iterator (for testing).
pub fn parse_from<I, T>(iter: I) -> Result<Cli, clap::Error>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    Cli::try_parse_from(iter)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scan_args(extra: &[&str]) -> ScanArgs {
        let mut argv = vec!["logban", "scan", "--abuseipdb-key", "k"];
        argv.extend_from_slice(extra);
        let mut args = match parse_from(argv.clone()).expect("parse").command {
            Command::Scan(args) => args,
            other => panic!("expected scan, got {:?}", other),
        };
        clear_unpassed_credentials(&mut args, &argv);
        args
    }

    /// Drop credential values clap picked up from the environment rather
    /// than from `argv`, so results do not depend on the host.
    fn clear_unpassed_credentials(args: &mut ScanArgs, argv: &[&str]) {
        let passed = |flag: &str| argv.iter().any(|a| *a == flag);
        if !passed("--cf-email") {
            args.cf_email = None;
        }
        if !passed("--cf-key") {
            args.cf_key = None;
        }
        if !passed("--cf-account-id") {
            args.cf_account_id = None;
        }
        if !passed("--cf-zone-id") {
            args.cf_zone_id = None;
        }
    }

    fn detect_args(extra: &[&str]) -> DetectArgs {
        let mut argv = vec!["logban", "detect"];
        argv.extend_from_slice(extra);
        match parse_from(argv).expect("parse").command {
            Command::Detect(args) => args,
            other => panic!("expected detect, got {:?}", other),
        }
    }

    // ===========================================
    // Defaults
    // ===========================================

    #[test]
    fn test_detect_defaults() {
        let args = detect_args(&[]);
        assert_eq!(args.log, PathBuf::from(DEFAULT_LOG_PATH));
        assert_eq!(args.lines, 10_000);
        assert_eq!(args.window_sec, 3600);
        assert_eq!(args.request_threshold, 30);
        assert_eq!(
            args.keywords,
            vec!["wp-login.php", "xmlrpc.php", "admin", "sqlmap"]
        );
        assert!(!args.json);
        assert_eq!(args.validate(), Ok(()));
    }

    #[test]
    fn test_scan_defaults() {
        let args = scan_args(&["--dry-run"]);
        assert_eq!(args.score_threshold, 60);
        assert_eq!(args.max_age_days, 30);
        assert_eq!(args.denylist, PathBuf::from(DEFAULT_DENYLIST_PATH));
        assert_eq!(args.note, "Auto-blocked by script");
        assert_eq!(args.timeout_sec, 10);
        assert_eq!(args.validate(), Ok(()));
    }

    #[test]
    fn test_keywords_replace_defaults() {
        let args = detect_args(&["--keyword", "/.env", "--keyword", "/.git/"]);
        assert_eq!(args.keywords, vec!["/.env", "/.git/"]);
    }

    #[test]
    fn test_verbose_count() {
        let cli = parse_from(["logban", "-vv", "detect"]).expect("parse");
        assert_eq!(cli.verbose, 2);
        let cli = parse_from(["logban", "detect", "-v"]).expect("parse");
        assert_eq!(cli.verbose, 1);
    }

    #[test]
    fn test_requires_subcommand() {
        assert!(parse_from(["logban"]).is_err());
    }

    // ===========================================
    // Validation
    // ===========================================

    #[test]
    fn test_zero_lines_rejected() {
        let args = detect_args(&["--lines", "0"]);
        assert_eq!(args.validate(), Err(CliError::InvalidLineCount(0)));
    }

    #[test]
    fn test_zero_window_rejected() {
        let args = detect_args(&["--window-sec", "0"]);
        assert_eq!(args.validate(), Err(CliError::InvalidWindowSec(0)));
    }

    #[test]
    fn test_zero_request_threshold_rejected() {
        let args = detect_args(&["--request-threshold", "0"]);
        assert_eq!(args.validate(), Err(CliError::InvalidRequestThreshold(0)));
    }

    #[test]
    fn test_empty_keyword_rejected() {
        let args = detect_args(&["--keyword", ""]);
        assert_eq!(args.validate(), Err(CliError::EmptyKeyword));
    }

    #[test]
    fn test_score_threshold_above_100_rejected() {
        let args = scan_args(&["--dry-run", "--score-threshold", "101"]);
        assert_eq!(args.validate(), Err(CliError::InvalidScoreThreshold(101)));
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let args = scan_args(&["--dry-run", "--timeout-sec", "0"]);
        assert_eq!(args.validate(), Err(CliError::InvalidTimeout(0)));
    }

    #[test]
    fn test_missing_reputation_key_rejected() {
        let mut args = scan_args(&["--dry-run"]);
        args.abuseipdb_key = None;
        assert_eq!(args.validate(), Err(CliError::MissingReputationKey));
        args.abuseipdb_key = Some("  ".to_string());
        assert_eq!(args.validate(), Err(CliError::MissingReputationKey));
    }

    #[test]
    fn test_missing_scope_rejected_without_dry_run() {
        let mut args = scan_args(&["--cf-email", "e", "--cf-key", "k"]);
        args.cf_account_id = None;
        args.cf_zone_id = None;
        assert_eq!(args.validate(), Err(CliError::MissingFirewallScope));
    }

    #[test]
    fn test_missing_firewall_credentials_rejected() {
        let mut args = scan_args(&["--cf-zone-id", "z", "--cf-email", "e"]);
        args.cf_key = None;
        assert_eq!(args.validate(), Err(CliError::MissingFirewallCredentials));
    }

    #[test]
    fn test_full_scan_args_valid() {
        let args = scan_args(&[
            "--cf-zone-id",
            "z",
            "--cf-email",
            "e@example.com",
            "--cf-key",
            "k",
        ]);
        assert_eq!(args.validate(), Ok(()));
    }

    // ===========================================
    // Conversions
    // ===========================================

    #[test]
    fn test_rule_scope_account_precedence() {
        let args = scan_args(&["--cf-account-id", "acc", "--cf-zone-id", "zone"]);
        assert_eq!(args.rule_scope(), Some(RuleScope::Account("acc".to_string())));
    }

    #[test]
    fn test_unpassed_credentials_are_cleared() {
        let mut args = scan_args(&["--cf-zone-id", "z1"]);
        args.cf_account_id = Some("from-env".to_string());
        args.cf_email = Some("from-env".to_string());

        clear_unpassed_credentials(&mut args, &["logban", "scan", "--cf-zone-id", "z1"]);

        assert_eq!(args.cf_account_id, None);
        assert_eq!(args.cf_email, None);
        assert_eq!(args.cf_zone_id, Some("z1".to_string()));
        assert_eq!(args.rule_scope(), Some(RuleScope::Zone("z1".to_string())));
    }

    #[test]
    fn test_to_detect_config() {
        let args = detect_args(&[
            "--window-sec",
            "600",
            "--request-threshold",
            "5",
            "--keyword",
            "sqlmap",
        ]);
        let config = args.to_detect_config();
        assert_eq!(config.window_sec, 600);
        assert_eq!(config.request_threshold, 5);
        assert_eq!(config.keywords, vec!["sqlmap"]);
    }

    #[test]
    fn test_to_client_configs() {
        let args = scan_args(&[
            "--max-age-days",
            "7",
            "--timeout-sec",
            "3",
            "--cf-zone-id",
            "z1",
            "--cf-email",
            "e",
            "--cf-key",
            "ck",
        ]);

        let reputation = args.to_reputation_config().expect("reputation");
        assert_eq!(reputation.api_key, "k");
        assert_eq!(reputation.max_age_days, 7);
        assert_eq!(reputation.timeout, Duration::from_secs(3));

        let firewall = args.to_firewall_config().expect("firewall");
        assert_eq!(firewall.scope, RuleScope::Zone("z1".to_string()));
        assert_eq!(firewall.email, "e");
        assert_eq!(firewall.api_key, "ck");
        assert_eq!(firewall.timeout, Duration::from_secs(3));
    }

    #[test]
    fn test_to_orchestrator_config() {
        let args = scan_args(&[
            "--dry-run",
            "--score-threshold",
            "75",
            "--denylist",
            "/tmp/ban.txt",
            "--note",
            "logban",
        ]);
        let config = args.to_orchestrator_config();
        assert_eq!(config.score_threshold, 75);
        assert_eq!(config.denylist, PathBuf::from("/tmp/ban.txt"));
        assert_eq!(config.note, "logban");
    }

    #[test]
    fn test_error_display() {
        assert_eq!(
            CliError::InvalidScoreThreshold(150).to_string(),
            "score-threshold must be between 0 and 100, got 150"
        );
    }
}
