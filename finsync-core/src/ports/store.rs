//! Snapshot store port - persistence abstraction for the import core

use chrono::{DateTime, Utc};
use serde_json::Value as JsonValue;
use uuid::Uuid;

use crate::domain::result::Result;
use crate::domain::{AccountSnapshot, Institution, ItemStatus, SimplefinAccount, TransactionPayload};

/// Persistence operations needed by the importer
///
/// Every write commits on its own; the importer relies on no transaction
/// spanning a whole payload.
pub trait SnapshotStore: Send + Sync {
    // === Items ===

    /// Replace the item's raw accounts payload
    fn upsert_item_snapshot(&self, item_id: Uuid, payload: &JsonValue) -> Result<()>;

    /// Set the item's connection status
    fn update_item_status(&self, item_id: Uuid, status: ItemStatus) -> Result<()>;

    /// Link (or replace) the item's institution snapshot
    fn upsert_institution_snapshot(&self, item_id: Uuid, institution: &Institution) -> Result<()>;

    /// Record a completed sync pass
    fn mark_item_synced(&self, item_id: Uuid, synced_at: DateTime<Utc>) -> Result<()>;

    // === Accounts ===

    /// Get the account for `(item_id, account_id)`, creating it if absent
    fn find_or_create_account(&self, item_id: Uuid, account_id: &str) -> Result<SimplefinAccount>;

    /// Replace the account's snapshot fields, leaving its transactions alone
    fn upsert_account_snapshot(&self, id: Uuid, snapshot: &AccountSnapshot) -> Result<()>;

    /// Replace the account's stored transactions
    fn update_account_transactions(&self, id: Uuid, transactions: &[TransactionPayload]) -> Result<()>;
}
