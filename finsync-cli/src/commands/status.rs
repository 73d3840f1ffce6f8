//! Status command - show linked items and their sync state

use anyhow::Result;
use colored::Colorize;
use finsync_core::ItemStatus;

use super::get_context;
use crate::output;

pub fn run(json: bool) -> Result<()> {
    let ctx = get_context()?;
    let status = ctx.status_service.get_status()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&status)?);
        return Ok(());
    }

    println!("{}", "SimpleFIN Sync Status".bold());
    if ctx.config.demo_mode {
        output::warning("Demo mode is on");
    }
    println!();

    if status.items.is_empty() {
        output::info("No items linked. Run 'finsync setup <NAME>' to link one.");
        return Ok(());
    }

    let mut table = output::create_table();
    table.set_header(vec!["Item", "Status", "Institution", "Accounts", "Last sync"]);

    for item in &status.items {
        let state = match item.status {
            ItemStatus::Active => item.status.to_string().green().to_string(),
            ItemStatus::RequiresUpdate => item.status.to_string().red().to_string(),
        };
        table.add_row(vec![
            item.name.clone(),
            state,
            item.institution_name.clone().unwrap_or_else(|| "-".to_string()),
            item.account_count.to_string(),
            output::format_datetime(item.last_synced_at),
        ]);
    }

    println!("{}", table);
    println!();
    println!(
        "{} items, {} accounts",
        status.total_items, status.total_accounts
    );

    if status.items_requiring_update > 0 {
        println!();
        output::warning(&format!(
            "{} item(s) need to be re-linked. Run 'finsync relink <NAME>'.",
            status.items_requiring_update
        ));
    }

    Ok(())
}
