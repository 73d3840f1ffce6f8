//! Remove command - remove an item and its accounts

use anyhow::Result;
use colored::Colorize;
use dialoguer::Confirm;

use super::get_context;

pub fn run(name: &str, force: bool) -> Result<()> {
    let ctx = get_context()?;

    let items = ctx.sync_service.list_items()?;
    let name_lower = name.to_lowercase();
    let Some(matched) = items.iter().find(|i| i.name.to_lowercase() == name_lower) else {
        let mut message = format!("Item '{}' not found", name);
        if !items.is_empty() {
            let names: Vec<_> = items.iter().map(|i| i.name.as_str()).collect();
            message.push_str(&format!(". Linked items: {}", names.join(", ")));
        }
        anyhow::bail!(message);
    };

    // Use the actual item name from the database
    let actual_name = &matched.name;

    if !force {
        println!(
            "\n{}",
            format!("This will remove '{}' and all of its imported accounts.", actual_name)
                .yellow()
        );

        if !Confirm::new()
            .with_prompt("Are you sure?")
            .default(false)
            .interact()?
        {
            println!("{}\n", "Cancelled".dimmed());
            return Ok(());
        }
    }

    ctx.sync_service.remove_item(actual_name)?;
    println!("\n{} Item '{}' removed\n", "✓".green(), actual_name);

    Ok(())
}
