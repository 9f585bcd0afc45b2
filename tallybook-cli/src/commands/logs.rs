//! Logs command - inspect and prune the event log

use anyhow::Result;
use chrono::{DateTime, Duration, TimeZone, Utc};
use clap::Subcommand;
use colored::Colorize;
use dialoguer::Confirm;
use tallybook_core::services::LogEntry;
use tallybook_core::{EntryPoint, LoggingService};

use super::get_data_dir;
use crate::output;

#[derive(Subcommand)]
pub enum LogsCommands {
    /// Show recent events
    List {
        /// Number of events to show
        #[arg(short, long, default_value = "50")]
        limit: usize,
        /// Show only failures
        #[arg(long)]
        errors: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete old events
    Clear {
        /// Delete events older than N days
        #[arg(long, default_value = "30", value_parser = clap::value_parser!(i64).range(0..=MAX_RETENTION_DAYS))]
        older_than_days: i64,
        /// Skip confirmation prompt
        #[arg(long, short = 'f')]
        force: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show event counts and where the log lives
    Stats {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

/// About a century
const MAX_RETENTION_DAYS: i64 = 36_500;

/// Millisecond cutoff for events older than `days`
///
/// A cutoff before the earliest representable time keeps every event.
fn cutoff_millis(now: DateTime<Utc>, days: i64) -> i64 {
    Duration::try_days(days.max(0))
        .and_then(|age| now.checked_sub_signed(age))
        .map(|cutoff| cutoff.timestamp_millis())
        .unwrap_or(i64::MIN)
}

fn open_log() -> Result<LoggingService> {
    let data_dir = get_data_dir()?;
    std::fs::create_dir_all(&data_dir)?;
    LoggingService::new(&data_dir, EntryPoint::Cli, env!("CARGO_PKG_VERSION"))
}

fn format_timestamp(timestamp_ms: i64) -> String {
    Utc.timestamp_millis_opt(timestamp_ms)
        .single()
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| timestamp_ms.to_string())
}

fn context_of(entry: &LogEntry) -> String {
    [
        entry.command.as_deref(),
        entry.route.as_deref(),
        entry.backend.as_deref(),
    ]
    .into_iter()
    .flatten()
    .collect::<Vec<_>>()
    .join(", ")
}

pub fn run(command: LogsCommands) -> Result<()> {
    let service = open_log()?;

    match command {
        LogsCommands::List {
            limit,
            errors,
            json,
        } => {
            let entries = if errors {
                service.get_errors(limit)?
            } else {
                service.get_recent(limit)?
            };

            if json {
                println!("{}", serde_json::to_string_pretty(&entries)?);
                return Ok(());
            }

            if entries.is_empty() {
                println!("No events logged.");
                return Ok(());
            }

            let mut table = output::create_table();
            table.set_header(vec!["Time", "Event", "Context", "Error"]);
            for entry in &entries {
                table.add_row(vec![
                    format_timestamp(entry.timestamp),
                    entry.event.clone(),
                    context_of(entry),
                    if entry.error_message.is_some() {
                        "!".red().to_string()
                    } else {
                        String::new()
                    },
                ]);
            }
            println!("{}", table);

            if !errors {
                let failures = service.get_errors(3)?;
                if !failures.is_empty() {
                    println!();
                    println!("{}", "Recent failures:".red().bold());
                    for failure in &failures {
                        println!(
                            "  {} [{}]: {}",
                            format_timestamp(failure.timestamp).dimmed(),
                            failure.event,
                            failure.error_message.as_deref().unwrap_or("unknown error")
                        );
                    }
                }
            }
        }
        LogsCommands::Clear {
            older_than_days,
            force,
            json,
        } => {
            let cutoff = cutoff_millis(Utc::now(), older_than_days);

            if !force
                && !json
                && !Confirm::new()
                    .with_prompt(format!("Delete events older than {} days?", older_than_days))
                    .default(false)
                    .interact()?
            {
                println!("Cancelled.");
                return Ok(());
            }

            let deleted = service.delete_before(cutoff)?;
            if json {
                println!("{}", serde_json::json!({ "deleted": deleted }));
            } else {
                output::success(&format!("Deleted {} events", deleted));
            }
        }
        LogsCommands::Stats { json } => {
            let total = service.count()?;
            let failures = service.count_errors()?;
            let db_path = service.db_path().to_path_buf();
            let size_bytes = std::fs::metadata(&db_path).map(|m| m.len()).unwrap_or(0);

            if json {
                println!(
                    "{}",
                    serde_json::json!({
                        "total_events": total,
                        "failure_count": failures,
                        "database_path": db_path.to_string_lossy(),
                        "database_size_bytes": size_bytes,
                    })
                );
            } else {
                println!("{}", "Event log".bold());
                println!("  Events: {}", total);
                println!("  Failures: {}", failures);
                println!("  Database: {}", db_path.display());
                println!("  Size: {} bytes", size_bytes);
            }
        }
    }

    Ok(())
}
