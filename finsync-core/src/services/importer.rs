//! Importer - one synchronization pass for a SimpleFIN item
//!
//! Fetches the item's accounts, stores the raw payload, then reconciles each
//! account against local records. Writes are committed one at a time; a pass
//! interrupted half-way leaves earlier accounts updated, and the next pass
//! brings the rest up to date.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::domain::result::{requires_reauthentication, Error, ProviderErrorKind, Result};
use crate::domain::{AccountPayload, AccountSnapshot, Institution, Item, ItemStatus, OrgPayload};
use crate::ports::{SimplefinProvider, SnapshotStore};
use crate::services::fetch_window::sync_start_date;

/// How an import pass ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "outcome")]
pub enum ImportOutcome {
    /// Payload stored and every account processed
    Imported { accounts: usize },
    /// Provider asked for re-authentication; item flagged, nothing else written
    RequiresUpdate,
}

/// Imports SimpleFIN data for one item at a time
///
/// Callers must not run two imports of the same item concurrently.
pub struct Importer {
    store: Arc<dyn SnapshotStore>,
    provider: Arc<dyn SimplefinProvider>,
}

impl Importer {
    pub fn new(store: Arc<dyn SnapshotStore>, provider: Arc<dyn SimplefinProvider>) -> Self {
        Self { store, provider }
    }

    /// Run one sync pass for `item`
    ///
    /// `item` is updated in place with whatever was persisted (status,
    /// institution, snapshot, last sync time). Provider transport failures
    /// propagate unchanged.
    pub fn import(&self, item: &mut Item, now: DateTime<Utc>) -> Result<ImportOutcome> {
        let start_date = sync_start_date(item.last_synced_at, now);

        let payload = self.provider.get_accounts(&item.access_url, start_date)?;

        if payload.has_errors() {
            return self.handle_errors(item, &payload.errors);
        }

        let raw = serde_json::to_value(&payload)?;
        self.store.upsert_item_snapshot(item.id, &raw)?;
        item.raw_payload = Some(raw);

        let count = payload.accounts.len();
        for account_data in payload.accounts {
            self.import_account(item, account_data)?;
        }

        self.store.mark_item_synced(item.id, now)?;
        item.last_synced_at = Some(now);

        Ok(ImportOutcome::Imported { accounts: count })
    }

    /// Reconcile one account entry against local records
    pub fn import_account(&self, item: &mut Item, account_data: AccountPayload) -> Result<()> {
        if let Some(org) = &account_data.org {
            if !item.has_institution() {
                self.import_organization(item, org)?;
            }
        }

        let account = self
            .store
            .find_or_create_account(item.id, &account_data.id)?;

        let (snapshot_data, transactions) = account_data.split_transactions();

        let snapshot = AccountSnapshot::from_payload(&snapshot_data)?;
        self.store.upsert_account_snapshot(account.id, &snapshot)?;

        // Separate write so a payload without transactions keeps the stored ones
        if let Some(transactions) = transactions.filter(|t| !t.is_empty()) {
            self.store
                .update_account_transactions(account.id, &transactions)?;
        }

        Ok(())
    }

    /// Store the org block as the item's institution
    pub fn import_organization(&self, item: &mut Item, org: &OrgPayload) -> Result<()> {
        let institution = Institution::from_org(org);
        self.store
            .upsert_institution_snapshot(item.id, &institution)?;
        item.institution = Some(institution);
        Ok(())
    }

    /// Route provider-reported errors
    ///
    /// A re-authentication request flags the item and ends the pass normally;
    /// anything else is raised as an `api_error`.
    pub fn handle_errors(&self, item: &mut Item, errors: &[String]) -> Result<ImportOutcome> {
        let error_messages = errors.join(", ");

        if requires_reauthentication(&error_messages) {
            self.store
                .update_item_status(item.id, ItemStatus::RequiresUpdate)?;
            item.status = ItemStatus::RequiresUpdate;
            return Ok(ImportOutcome::RequiresUpdate);
        }

        Err(Error::provider(
            ProviderErrorKind::ApiError,
            format!("SimpleFIN API errors: {}", error_messages),
        ))
    }
}
