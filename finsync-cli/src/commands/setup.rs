//! Setup command - link a new SimpleFIN item

use anyhow::Result;
use colored::Colorize;

use super::{get_context, resolve_token};

pub fn run(name: &str, token: Option<String>) -> Result<()> {
    let ctx = get_context()?;

    // Demo items need no real token
    let setup_token = if ctx.config.demo_mode {
        token.unwrap_or_else(|| "demo".to_string())
    } else {
        resolve_token(token)?
    };

    let item = ctx.sync_service.setup_item(name, &setup_token)?;
    println!("{} Item '{}' linked", "Success!".green(), item.name);
    println!("Run 'finsync sync {}' to import your accounts.", item.name);

    Ok(())
}
