//! Logging service - structured event logging to DuckDB
//!
//! Stores events in logs.duckdb next to the main database. Events carry item
//! names and error text only: no account data, balances or transactions are
//! ever logged, and access URLs never leave the items table.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};

use chrono::Utc;
use duckdb::Connection;
use serde::{Deserialize, Serialize};

use crate::domain::result::{Error, Result};
use crate::log_migrations::LOG_MIGRATIONS;
use crate::services::MigrationService;

/// Counter for generating unique IDs within the same millisecond
static ID_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Unique ID: timestamp in the upper 48 bits, counter in the lower 16
fn generate_id() -> u64 {
    let timestamp = now_ms() as u64;
    let counter = ID_COUNTER.fetch_add(1, Ordering::Relaxed) & 0xFFFF;
    (timestamp << 16) | counter
}

/// Current unix timestamp in milliseconds
fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

fn detect_platform() -> &'static str {
    if cfg!(target_os = "macos") {
        "macos"
    } else if cfg!(target_os = "windows") {
        "windows"
    } else if cfg!(target_os = "linux") {
        "linux"
    } else {
        "unknown"
    }
}

/// What started the process writing the log
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryPoint {
    /// Interactive command line use
    Cli,
    /// Unattended runs (cron, systemd timers)
    Scheduler,
}

impl EntryPoint {
    fn as_str(&self) -> &'static str {
        match self {
            EntryPoint::Cli => "cli",
            EntryPoint::Scheduler => "scheduler",
        }
    }
}

/// A log event to be recorded
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEvent {
    pub event: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub item: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_details: Option<String>,
}

impl LogEvent {
    pub fn new(event: impl Into<String>) -> Self {
        Self {
            event: event.into(),
            item: None,
            command: None,
            error_message: None,
            error_details: None,
        }
    }

    /// Set the item context (item name, never its access URL)
    pub fn with_item(mut self, item: impl Into<String>) -> Self {
        self.item = Some(item.into());
        self
    }

    pub fn with_command(mut self, command: impl Into<String>) -> Self {
        self.command = Some(command.into());
        self
    }

    pub fn with_error(mut self, message: impl Into<String>) -> Self {
        self.error_message = Some(message.into());
        self
    }

    pub fn with_error_details(mut self, details: impl Into<String>) -> Self {
        self.error_details = Some(details.into());
        self
    }
}

/// A log entry as stored in the database
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub id: u64,
    pub timestamp: i64,
    pub entry_point: String,
    pub app_version: String,
    pub platform: String,
    pub event: String,
    pub item: Option<String>,
    pub command: Option<String>,
    pub error_message: Option<String>,
    pub error_details: Option<String>,
}

/// Which entries `LoggingService::query` returns
#[derive(Debug, Clone, Default)]
pub struct LogFilter {
    /// Only entries about this item
    pub item: Option<String>,
    /// Only entries that carry an error
    pub errors_only: bool,
}

/// Logged sync history of one item
#[derive(Debug, Clone, Serialize)]
pub struct ItemHistory {
    pub item: String,
    /// Unix ms of the last completed sync
    pub last_success: Option<i64>,
    pub failures: u64,
    pub reauthentication_requests: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct FailureKindCount {
    pub kind: String,
    pub count: u64,
}

const ENTRY_COLUMNS: &str = "id, timestamp, entry_point, app_version, platform,
    event, item, command, error_message, error_details";

/// Service for structured event logging
pub struct LoggingService {
    conn: Mutex<Connection>,
    db_path: PathBuf,
    entry_point: EntryPoint,
    app_version: String,
    platform: &'static str,
}

impl LoggingService {
    /// Open or create logs.duckdb in `data_dir` and run pending migrations
    pub fn new(
        data_dir: &Path,
        entry_point: EntryPoint,
        app_version: impl Into<String>,
    ) -> Result<Self> {
        let db_path = data_dir.join("logs.duckdb");
        let conn = Connection::open(&db_path)?;
        MigrationService::new(&conn, LOG_MIGRATIONS).run_pending()?;

        Ok(Self {
            conn: Mutex::new(conn),
            db_path,
            entry_point,
            app_version: app_version.into(),
            platform: detect_platform(),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| Error::database(format!("Lock poisoned: {}", e)))
    }

    /// Record an event; entry point, version and platform are filled in
    pub fn log(&self, event: LogEvent) -> Result<()> {
        let conn = self.conn()?;

        conn.execute(
            r#"
            INSERT INTO sys_logs (
                id, timestamp, entry_point, app_version, platform,
                event, item, command, error_message, error_details
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
            duckdb::params![
                generate_id(),
                now_ms(),
                self.entry_point.as_str(),
                &self.app_version,
                self.platform,
                &event.event,
                &event.item,
                &event.command,
                &event.error_message,
                &event.error_details,
            ],
        )?;

        Ok(())
    }

    pub fn log_event(&self, event: &str) -> Result<()> {
        self.log(LogEvent::new(event))
    }

    /// Log a CLI command execution
    pub fn log_command(&self, command: &str) -> Result<()> {
        self.log(LogEvent::new("command_executed").with_command(command))
    }

    pub fn log_error(&self, event: &str, message: &str, details: Option<&str>) -> Result<()> {
        let mut log_event = LogEvent::new(event).with_error(message);
        if let Some(d) = details {
            log_event = log_event.with_error_details(d);
        }
        self.log(log_event)
    }

    /// Most recent entries, newest first
    pub fn get_recent(&self, limit: usize) -> Result<Vec<LogEntry>> {
        self.query(&LogFilter::default(), limit)
    }

    /// Most recent entries that carry an error, newest first
    pub fn get_errors(&self, limit: usize) -> Result<Vec<LogEntry>> {
        self.query(
            &LogFilter {
                errors_only: true,
                ..LogFilter::default()
            },
            limit,
        )
    }

    /// Most recent entries matching `filter`, newest first
    ///
    /// Item names compare case-insensitively, like item lookups elsewhere.
    pub fn query(&self, filter: &LogFilter, limit: usize) -> Result<Vec<LogEntry>> {
        let mut clauses = Vec::new();
        let mut params: Vec<&str> = Vec::new();
        if let Some(item) = &filter.item {
            clauses.push("lower(item) = lower(?)");
            params.push(item);
        }
        if filter.errors_only {
            clauses.push("error_message IS NOT NULL");
        }
        let where_clause = if clauses.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", clauses.join(" AND "))
        };

        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM sys_logs {} ORDER BY timestamp DESC, id DESC LIMIT {}",
            ENTRY_COLUMNS, where_clause, limit
        ))?;

        let entries = stmt
            .query_map(duckdb::params_from_iter(params), |row| {
                Ok(LogEntry {
                    id: row.get(0)?,
                    timestamp: row.get(1)?,
                    entry_point: row.get(2)?,
                    app_version: row.get(3)?,
                    platform: row.get(4)?,
                    event: row.get(5)?,
                    item: row.get(6)?,
                    command: row.get(7)?,
                    error_message: row.get(8)?,
                    error_details: row.get(9)?,
                })
            })?
            .collect::<duckdb::Result<Vec<_>>>()?;

        Ok(entries)
    }

    /// Sync history per item: last success, failures and reauthentication requests
    pub fn item_history(&self) -> Result<Vec<ItemHistory>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT
                item,
                MAX(timestamp) FILTER (WHERE event = 'sync_completed'),
                COUNT(*) FILTER (WHERE event = 'sync_failed'),
                COUNT(*) FILTER (WHERE event = 'sync_requires_update')
            FROM sys_logs
            WHERE item IS NOT NULL
            GROUP BY item
            ORDER BY item
            "#,
        )?;

        let history = stmt
            .query_map([], |row| {
                Ok(ItemHistory {
                    item: row.get(0)?,
                    last_success: row.get(1)?,
                    failures: row.get::<_, i64>(2)? as u64,
                    reauthentication_requests: row.get::<_, i64>(3)? as u64,
                })
            })?
            .collect::<duckdb::Result<Vec<_>>>()?;

        Ok(history)
    }

    /// Failed syncs grouped by provider error kind, most frequent first
    pub fn failure_kinds(&self) -> Result<Vec<FailureKindCount>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT COALESCE(error_details, 'unknown') AS kind, COUNT(*) AS n
            FROM sys_logs
            WHERE event = 'sync_failed'
            GROUP BY kind
            ORDER BY n DESC, kind
            "#,
        )?;

        let kinds = stmt
            .query_map([], |row| {
                Ok(FailureKindCount {
                    kind: row.get(0)?,
                    count: row.get::<_, i64>(1)? as u64,
                })
            })?
            .collect::<duckdb::Result<Vec<_>>>()?;

        Ok(kinds)
    }

    /// Total number of log entries
    pub fn count(&self) -> Result<u64> {
        let conn = self.conn()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM sys_logs", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    /// Delete logs older than the specified timestamp (unix ms)
    pub fn delete_before(&self, timestamp_ms: i64) -> Result<u64> {
        let conn = self.conn()?;
        let deleted = conn.execute("DELETE FROM sys_logs WHERE timestamp < ?", [timestamp_ms])?;
        Ok(deleted as u64)
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_logging_service_creation() {
        let dir = tempdir().unwrap();
        let service = LoggingService::new(dir.path(), EntryPoint::Cli, "1.0.0").unwrap();

        assert!(service.db_path().exists());
    }

    #[test]
    fn test_log_event() {
        let dir = tempdir().unwrap();
        let service = LoggingService::new(dir.path(), EntryPoint::Cli, "1.0.0").unwrap();

        service.log_event("test_event").unwrap();

        let entries = service.get_recent(10).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].event, "test_event");
        assert_eq!(entries[0].entry_point, "cli");
        assert_eq!(entries[0].app_version, "1.0.0");
    }

    #[test]
    fn test_log_with_item_context() {
        let dir = tempdir().unwrap();
        let service = LoggingService::new(dir.path(), EntryPoint::Scheduler, "2.0.0").unwrap();

        service
            .log(
                LogEvent::new("sync_completed")
                    .with_item("household")
                    .with_command("sync"),
            )
            .unwrap();

        let entries = service.get_recent(10).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].item.as_deref(), Some("household"));
        assert_eq!(entries[0].command.as_deref(), Some("sync"));
        assert_eq!(entries[0].entry_point, "scheduler");
    }

    #[test]
    fn test_log_error() {
        let dir = tempdir().unwrap();
        let service = LoggingService::new(dir.path(), EntryPoint::Cli, "1.0.0").unwrap();

        service.log_event("sync_started").unwrap();
        service
            .log_error("sync_failed", "SimpleFIN API errors: boom", Some("api_error"))
            .unwrap();

        let errors = service.get_errors(10).unwrap();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].event, "sync_failed");
        assert_eq!(errors[0].error_details.as_deref(), Some("api_error"));
    }

    #[test]
    fn test_count_and_delete() {
        let dir = tempdir().unwrap();
        let service = LoggingService::new(dir.path(), EntryPoint::Cli, "1.0.0").unwrap();

        service.log_event("event1").unwrap();
        service.log_event("event2").unwrap();
        service.log_event("event3").unwrap();
        assert_eq!(service.count().unwrap(), 3);

        let deleted = service.delete_before(now_ms() + 1000).unwrap();
        assert_eq!(deleted, 3);
        assert_eq!(service.count().unwrap(), 0);
    }

    #[test]
    fn test_query_by_item() {
        let dir = tempdir().unwrap();
        let service = LoggingService::new(dir.path(), EntryPoint::Cli, "1.0.0").unwrap();

        service.log(LogEvent::new("sync_started").with_item("Household")).unwrap();
        service.log(LogEvent::new("sync_started").with_item("business")).unwrap();
        service
            .log(
                LogEvent::new("sync_failed")
                    .with_item("Household")
                    .with_error("SimpleFIN API errors: boom")
                    .with_error_details("api_error"),
            )
            .unwrap();

        let filter = LogFilter {
            item: Some("household".to_string()),
            errors_only: false,
        };
        let entries = service.query(&filter, 10).unwrap();
        assert_eq!(entries.len(), 2);
        assert!(entries.iter().all(|e| e.item.as_deref() == Some("Household")));

        let failures = service
            .query(
                &LogFilter {
                    errors_only: true,
                    ..filter
                },
                10,
            )
            .unwrap();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].event, "sync_failed");

        assert_eq!(service.query(&LogFilter::default(), 2).unwrap().len(), 2);
    }

    #[test]
    fn test_item_history_and_failure_kinds() {
        let dir = tempdir().unwrap();
        let service = LoggingService::new(dir.path(), EntryPoint::Scheduler, "1.0.0").unwrap();

        service.log(LogEvent::new("sync_completed").with_item("household")).unwrap();
        service
            .log(
                LogEvent::new("sync_failed")
                    .with_item("household")
                    .with_error("timed out")
                    .with_error_details("transport"),
            )
            .unwrap();
        service
            .log(
                LogEvent::new("sync_failed")
                    .with_item("business")
                    .with_error("SimpleFIN API errors: boom")
                    .with_error_details("api_error"),
            )
            .unwrap();
        service
            .log(
                LogEvent::new("sync_failed")
                    .with_item("business")
                    .with_error("SimpleFIN API errors: boom")
                    .with_error_details("api_error"),
            )
            .unwrap();
        service
            .log(LogEvent::new("sync_requires_update").with_item("business"))
            .unwrap();
        service.log_command("status").unwrap();

        let history = service.item_history().unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].item, "business");
        assert_eq!(history[0].last_success, None);
        assert_eq!(history[0].failures, 2);
        assert_eq!(history[0].reauthentication_requests, 1);
        assert_eq!(history[1].item, "household");
        assert!(history[1].last_success.is_some());
        assert_eq!(history[1].failures, 1);

        let kinds = service.failure_kinds().unwrap();
        assert_eq!(kinds.len(), 2);
        assert_eq!(kinds[0].kind, "api_error");
        assert_eq!(kinds[0].count, 2);
        assert_eq!(kinds[1].kind, "transport");
        assert_eq!(kinds[1].count, 1);
    }

    #[test]
    fn test_reopen_keeps_entries() {
        let dir = tempdir().unwrap();
        {
            let service = LoggingService::new(dir.path(), EntryPoint::Cli, "1.0.0").unwrap();
            service.log_command("status").unwrap();
        }

        let service = LoggingService::new(dir.path(), EntryPoint::Cli, "1.0.0").unwrap();
        let entries = service.get_recent(10).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].event, "command_executed");
    }
}
