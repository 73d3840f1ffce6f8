//! Sync command - run an import pass for every linked item

use std::time::Duration;

use anyhow::Result;
use colored::Colorize;
use finsync_core::services::ImportOutcome;
use indicatif::{ProgressBar, ProgressStyle};

use super::get_context_with_logger;

pub fn run(item: Option<String>, json: bool) -> Result<()> {
    let ctx = get_context_with_logger()?;

    let spinner = if json {
        ProgressBar::hidden()
    } else {
        let pb = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::with_template("{spinner} {msg}") {
            pb.set_style(style);
        }
        pb.set_message(format!("Syncing from {}...", ctx.sync_service.provider_name()));
        pb.enable_steady_tick(Duration::from_millis(100));
        pb
    };

    let report = ctx.sync_service.sync(item.as_deref());
    spinner.finish_and_clear();
    let report = report?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        for result in &report.results {
            if let Some(error) = &result.error {
                println!("{} {} - {}", "Error:".red(), result.item, error);
            } else if result.outcome == Some(ImportOutcome::RequiresUpdate) {
                println!(
                    "{} {} needs to be re-linked (run 'finsync relink {}')",
                    "Action required:".yellow(),
                    result.item,
                    result.item
                );
            } else {
                println!("{} {}", "Synced:".green(), result.item);
                println!("  Accounts imported: {}", result.accounts_imported);
                println!(
                    "  Transactions since {}",
                    result.start_date.format("%Y-%m-%d")
                );
            }
            println!();
        }
    }

    if report.has_failures() {
        anyhow::bail!("One or more items failed to sync");
    }

    Ok(())
}
