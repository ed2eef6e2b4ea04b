//! Detect command: read the log tail and classify it.

use logban_clock::Clock;
use logban_detect::{classify, Classification, ClassifyError, ScanOutcome};
use logban_fs::Filesystem;

use crate::cli::DetectArgs;
use crate::io::{read_log_tail, LogSourceError};
use crate::logger::Logger;

use super::CommandResult;

/// Execute the detection phase.
///
/// "Now" is read once from `clock` and fixes the window for the whole scan.
pub fn execute_detect<F, C, L>(
    args: &DetectArgs,
    fs: &F,
    clock: &C,
    logger: &L,
) -> CommandResult<Classification>
where
    F: Filesystem,
    C: Clock,
    L: Logger,
{
    args.validate()?;

    let lines = match read_log_tail(fs, &args.log, args.lines) {
        Ok(lines) => lines,
        Err(e) => {
            logger.error(&format!("failed to read log: {}", e));
            return Err(e.into());
        }
    };
    logger.verbose(&format!(
        "read {} line(s) from {}",
        lines.len(),
        args.log.display()
    ));

    let config = args.to_detect_config();
    let classification = classify(&lines, clock.now_unix_sec(), &config).map_err(|e| match e {
        ClassifyError::EmptySource => LogSourceError::Empty {
            path: args.log.clone(),
        },
    })?;

    let stats = classification.stats;
    logger.debug(&format!(
        "parsed {} of {} line(s), {} inside the last {}s from {} IP(s)",
        stats.parsed_lines,
        stats.scanned_lines,
        stats.recent_lines,
        config.window_sec,
        stats.distinct_ips
    ));

    match &classification.outcome {
        ScanOutcome::NoRecentActivity => logger.info(&format!(
            "no log entries within the past {}s",
            config.window_sec
        )),
        ScanOutcome::NoSuspiciousActivity => logger.info(&format!(
            "no suspicious IPs found within the past {}s",
            config.window_sec
        )),
        ScanOutcome::Suspicious(ips) => {
            logger.info(&format!("{} suspicious IP(s) found", ips.len()))
        }
    }

    Ok(classification)
}
