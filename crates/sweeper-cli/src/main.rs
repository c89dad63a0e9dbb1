//! Audit-query CLI for the Storage Sage cleanup daemon: reads the Audit
//! Store directly and renders either a tab-aligned table or JSON.

use clap::Parser;
use std::path::PathBuf;
use sweeper_audit::{AuditStats, AuditStore};
use sweeper_core::model::{Action, AuditRecord, PrimaryReason};

#[derive(Parser)]
#[command(name = "sweeper-cli")]
#[command(about = "Query the Storage Sage audit trail", long_about = None)]
struct Cli {
    /// Path to the audit database.
    #[arg(long, default_value = "/var/lib/storage-sage/audit.db")]
    db: PathBuf,

    /// Show the N most recent records.
    #[arg(long, value_name = "N")]
    recent: Option<i64>,

    /// Show aggregate statistics over `--days`.
    #[arg(long)]
    stats: bool,

    /// Filter by primary reason (stacked_cleanup, combined, disk_threshold, age_threshold, unknown).
    #[arg(long, value_name = "REASON")]
    reason: Option<String>,

    /// Filter by action (delete, dry_run, skip, error).
    #[arg(long, value_name = "ACTION")]
    action: Option<String>,

    /// Filter by a SQL LIKE pattern against the path.
    #[arg(long, value_name = "PATTERN")]
    path: Option<String>,

    /// Show the N largest deleted/dry-run objects by size.
    #[arg(long, value_name = "N")]
    largest: Option<i64>,

    /// Skip the first N matching records before applying the limit, for
    /// paging past the first page of `--recent`/`--largest`/`--reason`/
    /// `--action`/`--path` results.
    #[arg(long, default_value_t = 0)]
    offset: i64,

    /// Lookback window in days, used with `--stats`.
    #[arg(long, default_value_t = 90)]
    days: u32,

    /// Emit JSON instead of a human-readable table.
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> std::process::ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => std::process::ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            std::process::ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> sweeper_core::Result<()> {
    let store = AuditStore::open(&cli.db).await?;

    if cli.stats {
        let stats = store.stats(cli.days).await?;
        print_stats(&stats, cli.json);
        return Ok(());
    }

    let (records, total) = if let Some(reason) = &cli.reason {
        let reason = parse_reason(reason)?;
        store.by_reason(reason, cli.largest.or(cli.recent).unwrap_or(50), cli.offset).await?
    } else if let Some(action) = &cli.action {
        let action = parse_action(action)?;
        store.by_action(action, cli.largest.or(cli.recent).unwrap_or(50), cli.offset).await?
    } else if let Some(pattern) = &cli.path {
        store.by_path(pattern, cli.largest.or(cli.recent).unwrap_or(50), cli.offset).await?
    } else if let Some(n) = cli.largest {
        store.largest(n, cli.offset).await?
    } else {
        store.recent(cli.recent.unwrap_or(20), cli.offset).await?
    };

    print_records(&records, total, cli.json);
    Ok(())
}

fn parse_action(s: &str) -> sweeper_core::Result<Action> {
    match s.to_ascii_lowercase().as_str() {
        "delete" => Ok(Action::Delete),
        "dry_run" | "dry-run" => Ok(Action::DryRun),
        "skip" => Ok(Action::Skip),
        "error" => Ok(Action::Error),
        other => Err(sweeper_core::Error::Config(format!("unknown action: {other}"))),
    }
}

fn parse_reason(s: &str) -> sweeper_core::Result<PrimaryReason> {
    match s.to_ascii_lowercase().as_str() {
        "stacked_cleanup" | "stacked-cleanup" => Ok(PrimaryReason::StackedCleanup),
        "combined" => Ok(PrimaryReason::Combined),
        "disk_threshold" | "disk-threshold" => Ok(PrimaryReason::DiskThreshold),
        "age_threshold" | "age-threshold" => Ok(PrimaryReason::AgeThreshold),
        "unknown" => Ok(PrimaryReason::Unknown),
        other => Err(sweeper_core::Error::Config(format!("unknown reason: {other}"))),
    }
}

fn print_stats(stats: &AuditStats, json: bool) {
    if json {
        println!("{}", serde_json::to_string_pretty(&StatsJson::from(stats)).unwrap());
        return;
    }

    println!("total_records\t{}", stats.total_records);
    println!("deleted\t{}", stats.deleted);
    println!("dry_run\t{}", stats.dry_run);
    println!("skipped\t{}", stats.skipped);
    println!("errored\t{}", stats.errored);
    println!("bytes_freed\t{}", stats.bytes_freed);
    println!(
        "start\t{}",
        stats.start.map(|t| t.to_rfc3339()).unwrap_or_else(|| "-".to_string())
    );
    println!(
        "end\t{}",
        stats.end.map(|t| t.to_rfc3339()).unwrap_or_else(|| "-".to_string())
    );
    for (reason, n) in &stats.counts_by_reason {
        println!("counts_by_reason.{reason}\t{n}");
    }
    for (action, n) in &stats.counts_by_action {
        println!("counts_by_action.{action}\t{n}");
    }
}

fn print_records(records: &[AuditRecord], total: i64, json: bool) {
    if json {
        println!("{}", serde_json::to_string_pretty(records).unwrap());
        return;
    }

    println!("TIMESTAMP\t\t\tACTION\tSIZE\tREASON\tPATH");
    for record in records {
        println!(
            "{}\t{}\t{}\t{:?}\t{}",
            record.timestamp.to_rfc3339(),
            record.action,
            record.size,
            record.primary_reason,
            record.path.display()
        );
    }
    println!("-- {} of {} matching records shown --", records.len(), total);
}

#[derive(serde::Serialize)]
struct StatsJson {
    total_records: i64,
    deleted: i64,
    dry_run: i64,
    skipped: i64,
    errored: i64,
    bytes_freed: i64,
    counts_by_reason: std::collections::HashMap<String, i64>,
    counts_by_action: std::collections::HashMap<String, i64>,
    start: Option<chrono::DateTime<chrono::Utc>>,
    end: Option<chrono::DateTime<chrono::Utc>>,
}

impl From<&AuditStats> for StatsJson {
    fn from(s: &AuditStats) -> Self {
        Self {
            total_records: s.total_records,
            deleted: s.deleted,
            dry_run: s.dry_run,
            skipped: s.skipped,
            errored: s.errored,
            bytes_freed: s.bytes_freed,
            counts_by_reason: s.counts_by_reason.clone(),
            counts_by_action: s.counts_by_action.clone(),
            start: s.start,
            end: s.end,
        }
    }
}
