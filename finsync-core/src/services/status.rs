//! Status service - item and account summaries

use std::sync::Arc;

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::adapters::duckdb::DuckDbRepository;
use crate::domain::ItemStatus;

/// Status service for item summaries
pub struct StatusService {
    repository: Arc<DuckDbRepository>,
}

impl StatusService {
    pub fn new(repository: Arc<DuckDbRepository>) -> Self {
        Self { repository }
    }

    /// Get overall status summary
    pub fn get_status(&self) -> Result<StatusSummary> {
        let items = self.repository.get_items()?;

        let mut summaries = Vec::with_capacity(items.len());
        for item in items {
            let account_count = self.repository.count_accounts(item.id)?;
            summaries.push(ItemSummary {
                id: item.id.to_string(),
                name: item.name,
                status: item.status,
                institution_name: item.institution.map(|i| i.name),
                last_synced_at: item.last_synced_at,
                account_count,
            });
        }

        Ok(StatusSummary {
            total_items: summaries.len() as i64,
            total_accounts: summaries.iter().map(|s| s.account_count).sum(),
            items_requiring_update: summaries
                .iter()
                .filter(|s| s.status == ItemStatus::RequiresUpdate)
                .count() as i64,
            items: summaries,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct StatusSummary {
    pub total_items: i64,
    pub total_accounts: i64,
    pub items_requiring_update: i64,
    pub items: Vec<ItemSummary>,
}

#[derive(Debug, Serialize)]
pub struct ItemSummary {
    pub id: String,
    pub name: String,
    pub status: ItemStatus,
    pub institution_name: Option<String>,
    pub last_synced_at: Option<DateTime<Utc>>,
    pub account_count: i64,
}
