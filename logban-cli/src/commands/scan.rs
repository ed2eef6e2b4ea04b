//! Scan command orchestration.
//!
//! Runs detection, then for each candidate IP in order:
//! 1. Look up its abuse confidence score
//! 2. Block it at the firewall when the score reaches the threshold
//! 3. Append it to the denylist when the firewall did not confirm the block
//!
//! A failure for one IP is recorded in the report and never stops the others.

use std::path::PathBuf;

use logban_clock::Clock;
use logban_detect::{ScanOutcome, ScanStats, SuspiciousIp, Trigger};
use logban_fs::Filesystem;
use logban_remote::{BlockEnforcer, ReputationLookup};
use serde::Serialize;

use crate::cli::ScanArgs;
use crate::io::Denylist;
use crate::logger::Logger;

use super::detect::execute_detect;
use super::{CommandError, CommandResult};

/// Orchestrator settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrchestratorConfig {
    /// Scores at or above this are blocked.
    pub score_threshold: u8,
    /// Note attached to firewall rules.
    pub note: String,
    pub denylist: PathBuf,
}

/// Overall status of a scan that read the log successfully.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanStatus {
    NoRecentActivity,
    NoSuspiciousActivity,
    SuspiciousFound,
}

impl From<&ScanOutcome> for ScanStatus {
    fn from(outcome: &ScanOutcome) -> Self {
        match outcome {
            ScanOutcome::NoRecentActivity => ScanStatus::NoRecentActivity,
            ScanOutcome::NoSuspiciousActivity => ScanStatus::NoSuspiciousActivity,
            ScanOutcome::Suspicious(_) => ScanStatus::SuspiciousFound,
        }
    }
}

/// What happened to one candidate IP.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum IpOutcome {
    /// Score below the threshold.
    Passed,
    /// Score unknown; not blocked.
    LookupFailed { error: String },
    /// Score reached the threshold but the firewall was not called (dry run).
    WouldBlock,
    /// The firewall confirmed the block.
    Blocked,
    /// The firewall did not confirm; the IP was written to the denylist.
    FallbackRecorded { block_response: String },
    /// Neither blocked nor recorded.
    FallbackFailed {
        block_response: String,
        error: String,
    },
}

/// Per-IP entry in the scan report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IpReport {
    pub ip: String,
    #[serde(flatten)]
    pub trigger: Trigger,
    pub score: Option<u8>,
    #[serde(flatten)]
    pub outcome: IpOutcome,
}

/// Result of a scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScanReport {
    pub status: ScanStatus,
    pub stats: ScanStats,
    pub candidates: Vec<IpReport>,
}

impl ScanReport {
    fn count(&self, pred: impl Fn(&IpOutcome) -> bool) -> usize {
        self.candidates.iter().filter(|c| pred(&c.outcome)).count()
    }

    pub fn blocked(&self) -> usize {
        self.count(|o| matches!(o, IpOutcome::Blocked))
    }

    pub fn recorded(&self) -> usize {
        self.count(|o| matches!(o, IpOutcome::FallbackRecorded { .. }))
    }

    pub fn passed(&self) -> usize {
        self.count(|o| matches!(o, IpOutcome::Passed))
    }

    pub fn lookup_failures(&self) -> usize {
        self.count(|o| matches!(o, IpOutcome::LookupFailed { .. }))
    }

    pub fn would_block(&self) -> usize {
        self.count(|o| matches!(o, IpOutcome::WouldBlock))
    }

    pub fn fallback_failures(&self) -> usize {
        self.count(|o| matches!(o, IpOutcome::FallbackFailed { .. }))
    }

    /// Error if any abusive IP ended up neither blocked nor recorded.
    pub fn ensure_recorded(&self) -> CommandResult<()> {
        match self.fallback_failures() {
            0 => Ok(()),
            n => Err(CommandError::FallbackFailed(n)),
        }
    }
}

/// Process candidates in order. `enforcer` is `None` for a dry run.
pub fn process_candidates<F, R, B, L>(
    candidates: &[SuspiciousIp],
    config: &OrchestratorConfig,
    reputation: &R,
    enforcer: Option<&B>,
    denylist: &Denylist<'_, F>,
    logger: &L,
) -> Vec<IpReport>
where
    F: Filesystem,
    R: ReputationLookup,
    B: BlockEnforcer,
    L: Logger,
{
    candidates
        .iter()
        .map(|candidate| {
            let (score, outcome) =
                process_one(&candidate.ip, config, reputation, enforcer, denylist, logger);
            IpReport {
                ip: candidate.ip.clone(),
                trigger: candidate.trigger.clone(),
                score,
                outcome,
            }
        })
        .collect()
}

fn process_one<F, R, B, L>(
    ip: &str,
    config: &OrchestratorConfig,
    reputation: &R,
    enforcer: Option<&B>,
    denylist: &Denylist<'_, F>,
    logger: &L,
) -> (Option<u8>, IpOutcome)
where
    F: Filesystem,
    R: ReputationLookup,
    B: BlockEnforcer,
    L: Logger,
{
    logger.verbose(&format!("checking {}", ip));

    let score = match reputation.score(ip) {
        Ok(score) => score,
        Err(e) => {
            logger.warn(&format!(
                "reputation lookup failed for {}: {}; not blocking",
                ip, e
            ));
            return (
                None,
                IpOutcome::LookupFailed {
                    error: e.to_string(),
                },
            );
        }
    };

    if score < config.score_threshold {
        logger.info(&format!("passed {} (score {})", ip, score));
        return (Some(score), IpOutcome::Passed);
    }

    let Some(enforcer) = enforcer else {
        logger.info(&format!("would block {} (score {}, dry run)", ip, score));
        return (Some(score), IpOutcome::WouldBlock);
    };

    logger.info(&format!("blocking {} (score {})", ip, score));
    let result = enforcer.block(ip, &config.note);
    logger.debug(&format!("firewall response for {}: {}", ip, result.raw));
    if result.success {
        return (Some(score), IpOutcome::Blocked);
    }

    logger.warn(&format!(
        "firewall block failed for {}, falling back to denylist {}",
        ip,
        denylist.path().display()
    ));
    let outcome = match denylist.append(ip) {
        Ok(()) => IpOutcome::FallbackRecorded {
            block_response: result.raw,
        },
        Err(e) => {
            logger.error(&format!(
                "{} is neither blocked nor recorded: {}",
                ip, e
            ));
            IpOutcome::FallbackFailed {
                block_response: result.raw,
                error: e.to_string(),
            }
        }
    };
    (Some(score), outcome)
}

/// Execute the scan command.
///
/// Log source failures abort with an error. Everything after classification
/// is per-IP and lands in the returned report.
pub fn execute_scan<F, C, R, B, L>(
    args: &ScanArgs,
    fs: &F,
    clock: &C,
    reputation: &R,
    enforcer: Option<&B>,
    logger: &L,
) -> CommandResult<ScanReport>
where
    F: Filesystem,
    C: Clock,
    R: ReputationLookup,
    B: BlockEnforcer,
    L: Logger,
{
    args.validate()?;

    let classification = execute_detect(&args.detect, fs, clock, logger)?;
    let config = args.to_orchestrator_config();
    let denylist = Denylist::new(fs, config.denylist.clone());

    let candidates = process_candidates(
        classification.outcome.candidates(),
        &config,
        reputation,
        enforcer,
        &denylist,
        logger,
    );

    Ok(ScanReport {
        status: ScanStatus::from(&classification.outcome),
        stats: classification.stats,
        candidates,
    })
}
