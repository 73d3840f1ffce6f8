//! Demo command - manage demo mode

use anyhow::Result;
use clap::Subcommand;
use colored::Colorize;
use finsync_core::config::{Config, DEMO_MODE_ENV};
use finsync_core::FinsyncContext;

use super::get_data_dir;
use crate::output;

/// Name of the item created when demo mode is switched on
const DEMO_ITEM: &str = "demo";

#[derive(Subcommand)]
pub enum DemoCommands {
    /// Enable demo mode
    #[command(name = "on")]
    On,
    /// Disable demo mode
    #[command(name = "off")]
    Off,
    /// Show demo mode status
    Status,
}

pub fn run(command: Option<DemoCommands>) -> Result<()> {
    let data_dir = get_data_dir()?;
    std::fs::create_dir_all(&data_dir)?;
    let mut config = Config::load(&data_dir)?;

    match command {
        Some(DemoCommands::On) => {
            config.enable_demo_mode();
            config.save(&data_dir)?;

            println!("{}", "Demo mode enabled".green());

            // Demo data lives in its own database file
            let ctx = FinsyncContext::new(&data_dir)?;
            if seed_demo_item(&ctx)? {
                println!("Demo data has been populated. Run 'finsync status' to see it.");
            } else if !ctx.config.demo_mode {
                output::warning(&format!(
                    "{} overrides the saved setting; no demo data was created",
                    DEMO_MODE_ENV
                ));
            }
        }
        Some(DemoCommands::Off) => {
            config.disable_demo_mode();
            config.save(&data_dir)?;
            println!("{}", "Demo mode disabled".yellow());
        }
        Some(DemoCommands::Status) | None => {
            if config.demo_mode {
                println!("Demo mode is {}", "ON".green());
            } else {
                println!("Demo mode is {}", "OFF".yellow());
            }
        }
    }

    Ok(())
}

/// Create and sync the demo item when the demo database is empty
///
/// Returns whether anything was seeded. Nothing is written when the
/// environment keeps demo mode off, since the context then points at the
/// real database.
fn seed_demo_item(ctx: &FinsyncContext) -> Result<bool> {
    if !ctx.config.demo_mode || !ctx.sync_service.list_items()?.is_empty() {
        return Ok(false);
    }

    ctx.sync_service.setup_item(DEMO_ITEM, "demo")?;
    ctx.sync_service.sync(Some(DEMO_ITEM))?;
    Ok(true)
}
