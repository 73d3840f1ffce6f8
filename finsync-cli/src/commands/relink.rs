//! Relink command - replace the access URL of an existing item

use anyhow::Result;
use colored::Colorize;

use super::{get_context, resolve_token};

pub fn run(name: &str, token: Option<String>) -> Result<()> {
    let ctx = get_context()?;

    let setup_token = if ctx.config.demo_mode {
        token.unwrap_or_else(|| "demo".to_string())
    } else {
        resolve_token(token)?
    };

    let item = ctx.sync_service.relink_item(name, &setup_token)?;
    println!(
        "{} Item '{}' re-linked and marked {}",
        "Success!".green(),
        item.name,
        item.status
    );

    Ok(())
}
