//! DuckDB repository implementation

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use std::thread;
use std::time::Duration;

use chrono::{DateTime, Utc};
use duckdb::{params, Connection, OptionalExt};
use rust_decimal::Decimal;
use serde_json::Value as JsonValue;
use uuid::Uuid;

use crate::domain::institution::UNKNOWN_INSTITUTION;
use crate::migrations::MIGRATIONS;
use crate::domain::result::{Error, Result};
use crate::domain::{
    AccountSnapshot, Institution, Item, ItemStatus, SimplefinAccount, TransactionPayload,
};
use crate::ports::SnapshotStore;
use crate::services::{MigrationResult, MigrationService};

/// Maximum number of retries when database file is locked
const MAX_RETRIES: u32 = 5;

/// Initial retry delay in milliseconds (doubles each retry: 50, 100, 200, 400, 800ms)
const INITIAL_RETRY_DELAY_MS: u64 = 50;

const ITEM_COLUMNS: &str = "item_id, name, access_url, status,
    institution_id, institution_name, institution_url,
    CAST(raw_institution_payload AS VARCHAR), CAST(raw_payload AS VARCHAR),
    last_synced_at, created_at, updated_at";

const ACCOUNT_COLUMNS: &str = "id, item_id, account_id, name, currency,
    balance, available_balance, balance_date,
    CAST(raw_payload AS VARCHAR), CAST(raw_transactions_payload AS VARCHAR),
    created_at, updated_at";

/// Check if an error message indicates a file locking issue that should be retried
fn is_retryable_error(err_msg: &str) -> bool {
    let lower = err_msg.to_lowercase();
    // Windows error messages
    lower.contains("being used by another process")
        || lower.contains("cannot access the file")
        // Unix/macOS error messages
        || lower.contains("resource temporarily unavailable")
        || lower.contains("database is locked")
        || lower.contains("file is already open")
}

/// DuckDB repository implementation
pub struct DuckDbRepository {
    conn: Mutex<Connection>,
    db_path: PathBuf,
}

impl DuckDbRepository {
    /// Create a new DuckDB repository
    ///
    /// Includes retry logic with exponential backoff for file locking errors,
    /// which can occur when a scheduled sync and an interactive command open
    /// the database at the same time.
    pub fn new(db_path: &Path) -> Result<Self> {
        let mut last_error = None;

        for attempt in 0..MAX_RETRIES {
            match Self::try_open_connection(db_path) {
                Ok(conn) => {
                    return Ok(Self {
                        conn: Mutex::new(conn),
                        db_path: db_path.to_path_buf(),
                    });
                }
                Err(e) => {
                    let err_msg = e.to_string();
                    if is_retryable_error(&err_msg) && attempt < MAX_RETRIES - 1 {
                        let delay =
                            Duration::from_millis(INITIAL_RETRY_DELAY_MS * 2u64.pow(attempt));
                        eprintln!(
                            "[finsync] Database busy, retrying in {}ms (attempt {}/{}): {}",
                            delay.as_millis(),
                            attempt + 1,
                            MAX_RETRIES,
                            err_msg
                        );
                        thread::sleep(delay);
                        last_error = Some(e);
                        continue;
                    }
                    return Err(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| {
            Error::database(format!("Failed to open database after {} retries", MAX_RETRIES))
        }))
    }

    /// Attempt to open a database connection (called by new() with retry logic)
    fn try_open_connection(db_path: &Path) -> Result<Connection> {
        // Extension autoloading off: the JSON extension is statically linked
        let config = duckdb::Config::default().enable_autoload_extension(false)?;
        let conn = Connection::open_with_flags(db_path, config)?;
        Ok(conn)
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| Error::database(format!("Lock poisoned: {}", e)))
    }

    /// Path of the database file
    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    /// Run database migrations using the MigrationService
    pub fn run_migrations(&self) -> Result<MigrationResult> {
        let conn = self.conn()?;
        MigrationService::new(&conn, MIGRATIONS).run_pending()
    }

    /// Ensure database schema exists (runs pending migrations)
    pub fn ensure_schema(&self) -> Result<()> {
        self.run_migrations()?;
        Ok(())
    }

    // === Item operations ===

    /// Insert a new item; names are unique (case-insensitive)
    pub fn create_item(&self, item: &Item) -> Result<()> {
        item.validate().map_err(Error::validation)?;

        if self.get_item_by_name(&item.name)?.is_some() {
            return Err(Error::validation(format!(
                "An item named '{}' already exists",
                item.name
            )));
        }

        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO sys_items (item_id, name, access_url, status, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?)",
            params![
                item.id.to_string(),
                item.name,
                item.access_url,
                item.status.as_str(),
                item.created_at.to_rfc3339(),
                item.updated_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    pub fn get_items(&self) -> Result<Vec<Item>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM sys_items ORDER BY created_at",
            ITEM_COLUMNS
        ))?;

        let rows = stmt
            .query_map([], ItemRow::from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        rows.into_iter().map(ItemRow::into_item).collect()
    }

    pub fn get_item(&self, id: Uuid) -> Result<Option<Item>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM sys_items WHERE item_id = ?",
            ITEM_COLUMNS
        ))?;

        stmt.query_row([id.to_string()], ItemRow::from_row)
            .optional()?
            .map(ItemRow::into_item)
            .transpose()
    }

    /// Look up an item by name, ignoring case
    pub fn get_item_by_name(&self, name: &str) -> Result<Option<Item>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM sys_items WHERE lower(name) = lower(?)",
            ITEM_COLUMNS
        ))?;

        stmt.query_row([name], ItemRow::from_row)
            .optional()?
            .map(ItemRow::into_item)
            .transpose()
    }

    /// Store a new access URL and mark the item active again
    pub fn update_item_access_url(&self, id: Uuid, access_url: &str) -> Result<()> {
        let conn = self.conn()?;
        let rows = conn.execute(
            "UPDATE sys_items SET access_url = ?, status = ?, updated_at = ? WHERE item_id = ?",
            params![
                access_url,
                ItemStatus::Active.as_str(),
                Utc::now().to_rfc3339(),
                id.to_string(),
            ],
        )?;
        ensure_updated(rows, "item", id)
    }

    /// Delete an item and its accounts
    ///
    /// Accounts go first; each statement auto-commits.
    pub fn delete_item(&self, id: Uuid) -> Result<bool> {
        let conn = self.conn()?;
        conn.execute(
            "DELETE FROM sys_accounts WHERE item_id = ?",
            params![id.to_string()],
        )?;
        let rows = conn.execute(
            "DELETE FROM sys_items WHERE item_id = ?",
            params![id.to_string()],
        )?;
        Ok(rows > 0)
    }

    // === Account operations ===

    pub fn get_accounts_for_item(&self, item_id: Uuid) -> Result<Vec<SimplefinAccount>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM sys_accounts WHERE item_id = ? ORDER BY created_at, account_id",
            ACCOUNT_COLUMNS
        ))?;

        let rows = stmt
            .query_map([item_id.to_string()], AccountRow::from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        rows.into_iter().map(AccountRow::into_account).collect()
    }

    pub fn get_account(&self, item_id: Uuid, account_id: &str) -> Result<Option<SimplefinAccount>> {
        let conn = self.conn()?;
        Self::select_account(&conn, item_id, account_id)
    }

    pub fn count_accounts(&self, item_id: Uuid) -> Result<i64> {
        let conn = self.conn()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM sys_accounts WHERE item_id = ?",
            [item_id.to_string()],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    fn select_account(
        conn: &Connection,
        item_id: Uuid,
        account_id: &str,
    ) -> Result<Option<SimplefinAccount>> {
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM sys_accounts WHERE item_id = ? AND account_id = ?",
            ACCOUNT_COLUMNS
        ))?;

        stmt.query_row(
            params![item_id.to_string(), account_id],
            AccountRow::from_row,
        )
        .optional()?
        .map(AccountRow::into_account)
        .transpose()
    }
}

impl SnapshotStore for DuckDbRepository {
    fn upsert_item_snapshot(&self, item_id: Uuid, payload: &JsonValue) -> Result<()> {
        let conn = self.conn()?;
        let rows = conn.execute(
            "UPDATE sys_items SET raw_payload = ?, updated_at = ? WHERE item_id = ?",
            params![
                serde_json::to_string(payload)?,
                Utc::now().to_rfc3339(),
                item_id.to_string(),
            ],
        )?;
        ensure_updated(rows, "item", item_id)
    }

    fn update_item_status(&self, item_id: Uuid, status: ItemStatus) -> Result<()> {
        let conn = self.conn()?;
        let rows = conn.execute(
            "UPDATE sys_items SET status = ?, updated_at = ? WHERE item_id = ?",
            params![status.as_str(), Utc::now().to_rfc3339(), item_id.to_string()],
        )?;
        ensure_updated(rows, "item", item_id)
    }

    fn upsert_institution_snapshot(&self, item_id: Uuid, institution: &Institution) -> Result<()> {
        let conn = self.conn()?;
        let rows = conn.execute(
            "UPDATE sys_items SET
                institution_id = ?,
                institution_name = ?,
                institution_url = ?,
                raw_institution_payload = ?,
                updated_at = ?
             WHERE item_id = ?",
            params![
                institution.id,
                institution.name,
                institution.url,
                serde_json::to_string(&institution.raw_org_data)?,
                Utc::now().to_rfc3339(),
                item_id.to_string(),
            ],
        )?;
        ensure_updated(rows, "item", item_id)
    }

    fn mark_item_synced(&self, item_id: Uuid, synced_at: DateTime<Utc>) -> Result<()> {
        let conn = self.conn()?;
        let rows = conn.execute(
            "UPDATE sys_items SET last_synced_at = ?, updated_at = ? WHERE item_id = ?",
            params![
                synced_at.to_rfc3339(),
                Utc::now().to_rfc3339(),
                item_id.to_string(),
            ],
        )?;
        ensure_updated(rows, "item", item_id)
    }

    fn find_or_create_account(&self, item_id: Uuid, account_id: &str) -> Result<SimplefinAccount> {
        // One lock for lookup and insert so two callers cannot both insert
        let conn = self.conn()?;

        if let Some(existing) = Self::select_account(&conn, item_id, account_id)? {
            return Ok(existing);
        }

        let account = SimplefinAccount::new(item_id, account_id);
        conn.execute(
            "INSERT INTO sys_accounts (id, item_id, account_id, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?)",
            params![
                account.id.to_string(),
                item_id.to_string(),
                account.account_id,
                account.created_at.to_rfc3339(),
                account.updated_at.to_rfc3339(),
            ],
        )?;
        Ok(account)
    }

    fn upsert_account_snapshot(&self, id: Uuid, snapshot: &AccountSnapshot) -> Result<()> {
        let conn = self.conn()?;
        let rows = conn.execute(
            "UPDATE sys_accounts SET
                name = ?,
                currency = ?,
                balance = ?,
                available_balance = ?,
                balance_date = ?,
                raw_payload = ?,
                updated_at = ?
             WHERE id = ?",
            params![
                snapshot.name,
                snapshot.currency,
                snapshot.balance.map(|b| b.to_string()),
                snapshot.available_balance.map(|b| b.to_string()),
                snapshot.balance_date.map(|d| d.to_rfc3339()),
                serde_json::to_string(&snapshot.raw_payload)?,
                Utc::now().to_rfc3339(),
                id.to_string(),
            ],
        )?;
        ensure_updated(rows, "account", id)
    }

    fn update_account_transactions(&self, id: Uuid, transactions: &[TransactionPayload]) -> Result<()> {
        let conn = self.conn()?;
        let rows = conn.execute(
            "UPDATE sys_accounts SET raw_transactions_payload = ?, updated_at = ? WHERE id = ?",
            params![
                serde_json::to_string(transactions)?,
                Utc::now().to_rfc3339(),
                id.to_string(),
            ],
        )?;
        ensure_updated(rows, "account", id)
    }
}

// Row mapping
//
// Rows are read into plain structs inside the duckdb closure, then converted
// with our own error type so malformed ids surface as errors instead of
// being silently replaced.

struct ItemRow {
    item_id: String,
    name: String,
    access_url: String,
    status: String,
    institution_id: Option<String>,
    institution_name: Option<String>,
    institution_url: Option<String>,
    raw_institution_payload: Option<String>,
    raw_payload: Option<String>,
    last_synced_at: Option<String>,
    created_at: String,
    updated_at: String,
}

impl ItemRow {
    fn from_row(row: &duckdb::Row) -> duckdb::Result<Self> {
        Ok(Self {
            item_id: row.get(0)?,
            name: row.get(1)?,
            access_url: row.get(2)?,
            status: row.get(3)?,
            institution_id: row.get(4)?,
            institution_name: row.get(5)?,
            institution_url: row.get(6)?,
            raw_institution_payload: row.get(7)?,
            raw_payload: row.get(8)?,
            last_synced_at: row.get(9)?,
            created_at: row.get(10)?,
            updated_at: row.get(11)?,
        })
    }

    fn into_item(self) -> Result<Item> {
        let institution = if self.institution_id.is_some() || self.institution_name.is_some() {
            Some(Institution {
                id: self.institution_id,
                name: self
                    .institution_name
                    .unwrap_or_else(|| UNKNOWN_INSTITUTION.to_string()),
                url: self.institution_url,
                raw_org_data: parse_json(self.raw_institution_payload.as_deref())?
                    .unwrap_or(JsonValue::Null),
            })
        } else {
            None
        };

        Ok(Item {
            id: parse_uuid(&self.item_id)?,
            name: self.name,
            access_url: self.access_url,
            status: self.status.parse().map_err(Error::Database)?,
            last_synced_at: self.last_synced_at.as_deref().and_then(parse_optional_timestamp),
            institution,
            raw_payload: parse_json(self.raw_payload.as_deref())?,
            created_at: parse_timestamp(&self.created_at),
            updated_at: parse_timestamp(&self.updated_at),
        })
    }
}

struct AccountRow {
    id: String,
    item_id: String,
    account_id: String,
    name: Option<String>,
    currency: Option<String>,
    balance: Option<String>,
    available_balance: Option<String>,
    balance_date: Option<String>,
    raw_payload: Option<String>,
    raw_transactions_payload: Option<String>,
    created_at: String,
    updated_at: String,
}

impl AccountRow {
    fn from_row(row: &duckdb::Row) -> duckdb::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            item_id: row.get(1)?,
            account_id: row.get(2)?,
            name: row.get(3)?,
            currency: row.get(4)?,
            balance: row.get(5)?,
            available_balance: row.get(6)?,
            balance_date: row.get(7)?,
            raw_payload: row.get(8)?,
            raw_transactions_payload: row.get(9)?,
            created_at: row.get(10)?,
            updated_at: row.get(11)?,
        })
    }

    fn into_account(self) -> Result<SimplefinAccount> {
        Ok(SimplefinAccount {
            id: parse_uuid(&self.id)?,
            item_id: parse_uuid(&self.item_id)?,
            account_id: self.account_id,
            name: self.name,
            currency: self.currency,
            balance: self.balance.as_deref().and_then(parse_decimal),
            available_balance: self.available_balance.as_deref().and_then(parse_decimal),
            balance_date: self.balance_date.as_deref().and_then(parse_optional_timestamp),
            raw_payload: parse_json(self.raw_payload.as_deref())?,
            raw_transactions_payload: parse_json(self.raw_transactions_payload.as_deref())?,
            created_at: parse_timestamp(&self.created_at),
            updated_at: parse_timestamp(&self.updated_at),
        })
    }
}

// Helper functions

fn ensure_updated(rows: usize, entity: &str, id: Uuid) -> Result<()> {
    if rows == 0 {
        return Err(Error::not_found(format!("{} {}", entity, id)));
    }
    Ok(())
}

fn parse_uuid(s: &str) -> Result<Uuid> {
    Uuid::parse_str(s).map_err(|e| Error::database(format!("Invalid id '{}': {}", s, e)))
}

fn parse_json(s: Option<&str>) -> Result<Option<JsonValue>> {
    s.map(serde_json::from_str::<JsonValue>)
        .transpose()
        .map_err(Error::from)
}

fn parse_decimal(s: &str) -> Option<Decimal> {
    s.parse().ok()
}

fn parse_timestamp(s: &str) -> DateTime<Utc> {
    parse_optional_timestamp(s).unwrap_or_else(Utc::now)
}

fn parse_optional_timestamp(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}
