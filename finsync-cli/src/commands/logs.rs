//! Logs command - inspect the sync event log

use anyhow::Result;
use chrono::{DateTime, Duration, TimeZone, Utc};
use clap::Subcommand;
use colored::Colorize;
use dialoguer::Confirm;
use finsync_core::services::LogEntry;
use finsync_core::{EntryPoint, LogFilter, LoggingService};

use super::get_data_dir;
use crate::output;

#[derive(Subcommand)]
pub enum LogsCommands {
    /// Show recent events, newest first
    List {
        /// Only events about this item
        #[arg(long)]
        item: Option<String>,
        /// Only failed syncs and other errors
        #[arg(long)]
        errors: bool,
        #[arg(short, long, default_value = "50")]
        limit: usize,
        #[arg(long)]
        json: bool,
    },
    /// Delete events older than the given age
    Clear {
        #[arg(long, default_value = "30")]
        older_than_days: i64,
        /// Skip confirmation prompt
        #[arg(long, short)]
        force: bool,
    },
    /// Per-item sync history and failure kinds
    Stats {
        #[arg(long)]
        json: bool,
    },
}

pub fn run(command: LogsCommands) -> Result<()> {
    let data_dir = get_data_dir()?;
    std::fs::create_dir_all(&data_dir)?;
    let service = LoggingService::new(&data_dir, EntryPoint::Cli, env!("CARGO_PKG_VERSION"))?;

    match command {
        LogsCommands::List {
            item,
            errors,
            limit,
            json,
        } => list(&service, LogFilter { item, errors_only: errors }, limit, json),
        LogsCommands::Clear {
            older_than_days,
            force,
        } => clear(&service, older_than_days, force),
        LogsCommands::Stats { json } => stats(&service, json),
    }
}

fn list(service: &LoggingService, filter: LogFilter, limit: usize, json: bool) -> Result<()> {
    let entries = service.query(&filter, limit)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    if entries.is_empty() {
        match &filter.item {
            Some(item) => output::info(&format!("No events logged for '{}'", item)),
            None => output::info("No events logged yet"),
        }
        return Ok(());
    }

    let mut table = output::create_table();
    table.set_header(vec!["Time", "Event", "Item", "Kind", "Message"]);
    for entry in &entries {
        table.add_row(vec![
            output::format_datetime(to_datetime(entry.timestamp)),
            event_label(entry),
            entry
                .item
                .clone()
                .or_else(|| entry.command.as_ref().map(|c| format!("({})", c)))
                .unwrap_or_default(),
            entry.error_details.clone().unwrap_or_default(),
            entry.error_message.clone().unwrap_or_default(),
        ]);
    }
    println!("{}", table);

    Ok(())
}

fn clear(service: &LoggingService, older_than_days: i64, force: bool) -> Result<()> {
    if older_than_days < 0 {
        anyhow::bail!("--older-than-days must not be negative");
    }

    if !force {
        let confirmed = Confirm::new()
            .with_prompt(format!(
                "Delete events older than {} days?",
                older_than_days
            ))
            .default(false)
            .interact()?;
        if !confirmed {
            output::info("Nothing deleted");
            return Ok(());
        }
    }

    let cutoff = Utc::now() - Duration::days(older_than_days);
    let deleted = service.delete_before(cutoff.timestamp_millis())?;
    println!("Deleted {} events", deleted);
    Ok(())
}

fn stats(service: &LoggingService, json: bool) -> Result<()> {
    let history = service.item_history()?;
    let failure_kinds = service.failure_kinds()?;
    let total = service.count()?;
    let size_bytes = std::fs::metadata(service.db_path())
        .map(|m| m.len())
        .unwrap_or(0);

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "total_events": total,
                "items": history,
                "failure_kinds": failure_kinds,
                "database_path": service.db_path(),
                "database_size_bytes": size_bytes,
            }))?
        );
        return Ok(());
    }

    println!(
        "{} events in {} ({})",
        total,
        service.db_path().display(),
        output::format_size(size_bytes)
    );

    if !history.is_empty() {
        let mut table = output::create_table();
        table.set_header(vec!["Item", "Last success", "Failures", "Reauth requests"]);
        for h in &history {
            table.add_row(vec![
                h.item.clone(),
                output::format_datetime(h.last_success.and_then(to_datetime)),
                h.failures.to_string(),
                h.reauthentication_requests.to_string(),
            ]);
        }
        println!();
        println!("{}", table);
    }

    if !failure_kinds.is_empty() {
        println!();
        println!("{}", "Failures by kind".bold());
        for k in &failure_kinds {
            println!("  {:<20} {}", k.kind, k.count);
        }
    }

    Ok(())
}

fn event_label(entry: &LogEntry) -> String {
    match entry.event.as_str() {
        "sync_completed" => entry.event.green().to_string(),
        "sync_requires_update" => entry.event.yellow().to_string(),
        "sync_failed" => entry.event.red().to_string(),
        _ => entry.event.clone(),
    }
}

fn to_datetime(timestamp_ms: i64) -> Option<DateTime<Utc>> {
    Utc.timestamp_millis_opt(timestamp_ms).single()
}
