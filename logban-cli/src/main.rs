//! logban CLI binary.
//!
//! Entry point for the `logban` command-line tool.

use std::process::ExitCode;

use clap::Parser;
use logban_clock::SystemClock;
use logban_cli::exit::{codes, exit_code};
use logban_cli::{
    execute_detect, execute_scan, init_tracing, Cli, Command, CommandError, DetectArgs, IpOutcome,
    ScanArgs, ScanReport, ScanStatus, TracingLogger, Verbosity,
};
use logban_detect::Classification;
use logban_fs::RealFilesystem;
use logban_remote::{AbuseIpDbClient, CloudflareClient};
use serde::Serialize;

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(Verbosity::from_count(cli.verbose));

    let result = match cli.command {
        Command::Scan(args) => run_scan(args),
        Command::Detect(args) => run_detect(args),
    };

    match result {
        Ok(()) => ExitCode::from(codes::SUCCESS as u8),
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::from(exit_code(&e) as u8)
        }
    }
}

fn print_json<T: Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("error: failed to serialize output: {}", e),
    }
}

/// Run the detect command.
fn run_detect(args: DetectArgs) -> Result<(), CommandError> {
    let classification = execute_detect(&args, &RealFilesystem, &SystemClock, &TracingLogger)?;

    if args.json {
        print_json(&serde_json::json!({
            "status": ScanStatus::from(&classification.outcome),
            "stats": classification.stats,
            "candidates": classification.outcome.candidates(),
        }));
    } else {
        print_classification(&classification);
    }

    Ok(())
}

/// Run the scan command (detect + reputation + block).
fn run_scan(args: ScanArgs) -> Result<(), CommandError> {
    args.validate()?;

    let reputation = AbuseIpDbClient::new(args.to_reputation_config()?)?;
    let enforcer = if args.dry_run {
        None
    } else {
        Some(CloudflareClient::new(args.to_firewall_config()?)?)
    };

    let report = execute_scan(
        &args,
        &RealFilesystem,
        &SystemClock,
        &reputation,
        enforcer.as_ref(),
        &TracingLogger,
    )?;

    if args.detect.json {
        print_json(&report);
    } else {
        print_report(&report);
    }

    report.ensure_recorded()
}

fn print_classification(classification: &Classification) {
    let stats = &classification.stats;
    println!(
        "Scanned {} lines ({} parsed, {} recent) from {} IPs",
        stats.scanned_lines, stats.parsed_lines, stats.recent_lines, stats.distinct_ips
    );
    for candidate in classification.outcome.candidates() {
        println!("  {:<39} {}", candidate.ip, candidate.trigger);
    }
}

fn print_report(report: &ScanReport) {
    let stats = &report.stats;
    println!(
        "Scanned {} lines ({} parsed, {} recent) from {} IPs",
        stats.scanned_lines, stats.parsed_lines, stats.recent_lines, stats.distinct_ips
    );
    match report.status {
        ScanStatus::NoRecentActivity => println!("No recent activity"),
        ScanStatus::NoSuspiciousActivity => println!("No suspicious activity"),
        ScanStatus::SuspiciousFound => {
            for entry in &report.candidates {
                let score = entry
                    .score
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| "-".to_string());
                println!(
                    "  {:<39} score {:>3}  {:<16} {}",
                    entry.ip,
                    score,
                    outcome_label(&entry.outcome),
                    entry.trigger
                );
            }
            println!();
            println!("Blocked: {}", report.blocked());
            println!("Recorded in denylist: {}", report.recorded());
            println!("Would block (dry run): {}", report.would_block());
            println!("Passed: {}", report.passed());
            println!("Lookup failures: {}", report.lookup_failures());
            println!("Unrecorded: {}", report.fallback_failures());
        }
    }
}

fn outcome_label(outcome: &IpOutcome) -> &'static str {
    match outcome {
        IpOutcome::Passed => "passed",
        IpOutcome::LookupFailed { .. } => "lookup failed",
        IpOutcome::WouldBlock => "would block",
        IpOutcome::Blocked => "blocked",
        IpOutcome::FallbackRecorded { .. } => "denylisted",
        IpOutcome::FallbackFailed { .. } => "NOT RECORDED",
    }
}
