//! Accounts command - list imported accounts

use anyhow::Result;
use colored::Colorize;
use rust_decimal::Decimal;
use serde::Serialize;

use super::get_context;
use crate::output;

#[derive(Serialize)]
struct AccountRow {
    item: String,
    account_id: String,
    name: Option<String>,
    currency: Option<String>,
    balance: Option<Decimal>,
    available_balance: Option<Decimal>,
    transactions: usize,
}

pub fn run(item: Option<&str>, json: bool) -> Result<()> {
    let ctx = get_context()?;

    let items = match item {
        Some(name) => {
            let found = ctx
                .repository
                .get_item_by_name(name)?
                .ok_or_else(|| anyhow::anyhow!("Item '{}' not found", name))?;
            vec![found]
        }
        None => ctx.sync_service.list_items()?,
    };

    let mut rows = Vec::new();
    for item in &items {
        for account in ctx.repository.get_accounts_for_item(item.id)? {
            rows.push(AccountRow {
                item: item.name.clone(),
                transactions: account.transaction_count(),
                account_id: account.account_id,
                name: account.name,
                currency: account.currency,
                balance: account.balance,
                available_balance: account.available_balance,
            });
        }
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }

    if rows.is_empty() {
        println!("{}", "No accounts imported yet. Run 'finsync sync'.".yellow());
        return Ok(());
    }

    let mut table = output::create_table();
    table.set_header(vec!["Item", "Account", "Balance", "Available", "Transactions"]);

    for row in &rows {
        let currency = row.currency.as_deref().unwrap_or("");
        table.add_row(vec![
            row.item.clone(),
            row.name.clone().unwrap_or_else(|| row.account_id.clone()),
            output::format_amount(row.balance, currency),
            output::format_amount(row.available_balance, currency),
            row.transactions.to_string(),
        ]);
    }

    println!("{}", table);
    Ok(())
}
