//! Sync service - link SimpleFIN items and run import passes over them

use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::adapters::duckdb::DuckDbRepository;
use crate::domain::{Item, ItemStatus};
use crate::ports::{IntegrationProvider, SimplefinProvider, SnapshotStore};
use crate::services::fetch_window::sync_start_date;
use crate::services::{ImportOutcome, Importer, LogEvent, LoggingService};

/// Sync service for SimpleFIN items
pub struct SyncService {
    repository: Arc<DuckDbRepository>,
    provider: Arc<dyn SimplefinProvider>,
    integration: Arc<dyn IntegrationProvider>,
    logger: Option<Arc<LoggingService>>,
}

impl SyncService {
    pub fn new(
        repository: Arc<DuckDbRepository>,
        provider: Arc<dyn SimplefinProvider>,
        integration: Arc<dyn IntegrationProvider>,
    ) -> Self {
        Self {
            repository,
            provider,
            integration,
            logger: None,
        }
    }

    /// Record sync events to the given event log
    pub fn with_logger(mut self, logger: Arc<LoggingService>) -> Self {
        self.logger = Some(logger);
        self
    }

    /// Name of the provider in use ("simplefin" or "demo")
    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// Link a new item by claiming a setup token
    pub fn setup_item(&self, name: &str, setup_token: &str) -> Result<Item> {
        let name = name.trim();
        if name.is_empty() {
            anyhow::bail!("Item name cannot be empty");
        }
        // Setup tokens are single-use, check the name before claiming
        if self.repository.get_item_by_name(name)?.is_some() {
            anyhow::bail!("An item named '{}' already exists", name);
        }

        let access_url = self
            .integration
            .claim_access_url(setup_token)
            .context("Failed to claim setup token")?;

        let item = Item::new(name, access_url);
        self.repository.create_item(&item)?;
        Ok(item)
    }

    /// Replace an item's access URL with a freshly claimed one
    ///
    /// This is the only way an item leaves `requires_update`.
    pub fn relink_item(&self, name: &str, setup_token: &str) -> Result<Item> {
        let mut item = self.find_item(name)?;

        let access_url = self
            .integration
            .claim_access_url(setup_token)
            .context("Failed to claim setup token")?;

        self.repository.update_item_access_url(item.id, &access_url)?;
        item.access_url = access_url;
        item.status = ItemStatus::Active;
        Ok(item)
    }

    pub fn list_items(&self) -> Result<Vec<Item>> {
        Ok(self.repository.get_items()?)
    }

    /// Delete an item and its accounts
    pub fn remove_item(&self, name: &str) -> Result<()> {
        let item = self.find_item(name)?;
        self.repository.delete_item(item.id)?;
        Ok(())
    }

    /// Sync all items, or the named one
    ///
    /// Items are processed one after another. A failing item records its
    /// error in the report and the remaining items still run.
    pub fn sync(&self, item_name: Option<&str>) -> Result<SyncReport> {
        let items = match item_name {
            Some(name) => vec![self.find_item(name)?],
            None => self.repository.get_items()?,
        };

        if items.is_empty() {
            anyhow::bail!("No items configured. Run `finsync setup` first.");
        }

        let results = items
            .into_iter()
            .map(|mut item| self.sync_item(&mut item, Utc::now()))
            .collect();

        Ok(SyncReport { results })
    }

    /// Run one import pass for `item` and describe how it went
    pub fn sync_item(&self, item: &mut Item, now: DateTime<Utc>) -> ItemSyncResult {
        let start_date = sync_start_date(item.last_synced_at, now);
        self.log(LogEvent::new("sync_started").with_item(&item.name));

        let store: Arc<dyn SnapshotStore> = self.repository.clone();
        let importer = Importer::new(store, Arc::clone(&self.provider));

        match importer.import(item, now) {
            Ok(outcome) => {
                let (event, accounts_imported) = match outcome {
                    ImportOutcome::Imported { accounts } => ("sync_completed", accounts),
                    ImportOutcome::RequiresUpdate => ("sync_requires_update", 0),
                };
                self.log(LogEvent::new(event).with_item(&item.name));

                ItemSyncResult {
                    item: item.name.clone(),
                    outcome: Some(outcome),
                    status: item.status,
                    accounts_imported,
                    start_date,
                    error: None,
                }
            }
            Err(e) => {
                let mut event = LogEvent::new("sync_failed")
                    .with_item(&item.name)
                    .with_error(e.to_string());
                if let Some(kind) = e.provider_kind() {
                    event = event.with_error_details(kind.as_str());
                }
                self.log(event);

                ItemSyncResult {
                    item: item.name.clone(),
                    outcome: None,
                    status: item.status,
                    accounts_imported: 0,
                    start_date,
                    error: Some(e.to_string()),
                }
            }
        }
    }

    fn find_item(&self, name: &str) -> Result<Item> {
        self.repository
            .get_item_by_name(name)?
            .ok_or_else(|| anyhow::anyhow!("Item '{}' not found", name))
    }

    fn log(&self, event: LogEvent) {
        if let Some(logger) = &self.logger {
            // Logging must never break a sync
            let _ = logger.log(event);
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SyncReport {
    pub results: Vec<ItemSyncResult>,
}

impl SyncReport {
    pub fn has_failures(&self) -> bool {
        self.results.iter().any(|r| r.error.is_some())
    }
}

#[derive(Debug, Serialize)]
pub struct ItemSyncResult {
    pub item: String,
    #[serde(skip_serializing_if = "Option::is_none", flatten)]
    pub outcome: Option<ImportOutcome>,
    pub status: ItemStatus,
    pub accounts_imported: usize,
    pub start_date: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::demo::{DemoProvider, DEMO_ACCESS_URL};
    use crate::domain::result::Result as DomainResult;
    use crate::domain::AccountsPayload;
    use crate::services::EntryPoint;
    use tempfile::TempDir;

    fn demo_service(dir: &TempDir) -> SyncService {
        let repo = Arc::new(DuckDbRepository::new(&dir.path().join("test.duckdb")).unwrap());
        repo.ensure_schema().unwrap();
        let demo = Arc::new(DemoProvider::new());
        SyncService::new(repo, demo.clone(), demo)
    }

    struct FailingProvider;

    impl SimplefinProvider for FailingProvider {
        fn name(&self) -> &str {
            "failing"
        }

        fn get_accounts(&self, access_url: &str, _: DateTime<Utc>) -> DomainResult<AccountsPayload> {
            if access_url.contains("broken") {
                Ok(AccountsPayload {
                    errors: vec!["Bank is down".to_string()],
                    ..AccountsPayload::default()
                })
            } else {
                Ok(AccountsPayload::default())
            }
        }
    }

    #[test]
    fn test_setup_and_sync_demo_item() {
        let dir = TempDir::new().unwrap();
        let service = demo_service(&dir);

        let item = service.setup_item("household", "token").unwrap();
        assert_eq!(item.access_url, DEMO_ACCESS_URL);

        let report = service.sync(None).unwrap();
        assert_eq!(report.results.len(), 1);
        assert!(!report.has_failures());
        assert_eq!(report.results[0].accounts_imported, 2);

        let items = service.list_items().unwrap();
        assert!(items[0].last_synced_at.is_some());
        assert_eq!(
            items[0].institution.as_ref().map(|i| i.name.as_str()),
            Some("Demo Credit Union")
        );
    }

    #[test]
    fn test_setup_rejects_duplicate_name() {
        let dir = TempDir::new().unwrap();
        let service = demo_service(&dir);

        service.setup_item("household", "token").unwrap();
        let err = service.setup_item("Household", "token").unwrap_err();
        assert!(err.to_string().contains("already exists"));
    }

    #[test]
    fn test_sync_unknown_item() {
        let dir = TempDir::new().unwrap();
        let service = demo_service(&dir);

        let err = service.sync(Some("nope")).unwrap_err();
        assert!(err.to_string().contains("not found"));
    }

    #[test]
    fn test_sync_without_items() {
        let dir = TempDir::new().unwrap();
        let service = demo_service(&dir);

        assert!(service.sync(None).is_err());
    }

    #[test]
    fn test_failing_item_does_not_stop_others() {
        let dir = TempDir::new().unwrap();
        let repo = Arc::new(DuckDbRepository::new(&dir.path().join("test.duckdb")).unwrap());
        repo.ensure_schema().unwrap();
        repo.create_item(&Item::new("broken", "https://u:p@broken.example"))
            .unwrap();
        repo.create_item(&Item::new("fine", "https://u:p@fine.example"))
            .unwrap();

        let logger = Arc::new(LoggingService::new(dir.path(), EntryPoint::Cli, "test").unwrap());
        let service = SyncService::new(
            repo,
            Arc::new(FailingProvider),
            Arc::new(DemoProvider::new()),
        )
        .with_logger(Arc::clone(&logger));

        let report = service.sync(None).unwrap();
        assert!(report.has_failures());

        let broken = report.results.iter().find(|r| r.item == "broken").unwrap();
        assert!(broken.error.as_deref().unwrap().contains("Bank is down"));
        let fine = report.results.iter().find(|r| r.item == "fine").unwrap();
        assert!(fine.error.is_none());
        assert_eq!(fine.outcome, Some(ImportOutcome::Imported { accounts: 0 }));

        let errors = logger.get_errors(10).unwrap();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].item.as_deref(), Some("broken"));
        assert_eq!(errors[0].error_details.as_deref(), Some("api_error"));
    }

    #[test]
    fn test_relink_and_remove() {
        let dir = TempDir::new().unwrap();
        let service = demo_service(&dir);

        service.setup_item("household", "token").unwrap();
        let item = service.relink_item("household", "token-2").unwrap();
        assert_eq!(item.status, ItemStatus::Active);

        service.remove_item("household").unwrap();
        assert!(service.list_items().unwrap().is_empty());
        assert!(service.remove_item("household").is_err());
    }
}
