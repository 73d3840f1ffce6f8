//! CLI command implementations

pub mod accounts;
pub mod demo;
pub mod logs;
pub mod relink;
pub mod remove;
pub mod setup;
pub mod status;
pub mod sync;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use dialoguer::Input;
use finsync_core::{EntryPoint, FinsyncContext, LogEvent, LoggingService};

/// Environment variable overriding the data directory
const DATA_DIR_ENV: &str = "FINSYNC_DIR";

/// Get the logging service for CLI operations
///
/// Returns None if logging fails to initialize (shouldn't block operations)
pub fn get_logger() -> Option<LoggingService> {
    let data_dir = get_data_dir().ok()?;
    std::fs::create_dir_all(&data_dir).ok()?;
    LoggingService::new(&data_dir, EntryPoint::Cli, env!("CARGO_PKG_VERSION")).ok()
}

/// Log an event, ignoring any errors (logging should never break the app)
pub fn log_event(logger: &Option<LoggingService>, event: LogEvent) {
    if let Some(l) = logger {
        let _ = l.log(event);
    }
}

/// Get the finsync data directory from environment or default
pub fn get_data_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var(DATA_DIR_ENV) {
        return Ok(PathBuf::from(dir));
    }
    let home = dirs::home_dir().context("Could not find home directory")?;
    Ok(home.join(".finsync"))
}

fn ensure_data_dir() -> Result<PathBuf> {
    let data_dir = get_data_dir()?;
    std::fs::create_dir_all(&data_dir)
        .with_context(|| format!("Failed to create finsync directory: {:?}", data_dir))?;
    Ok(data_dir)
}

/// Get or create finsync context
pub fn get_context() -> Result<FinsyncContext> {
    let data_dir = ensure_data_dir()?;
    FinsyncContext::new(&data_dir).context("Failed to initialize finsync context")
}

/// Context whose sync service writes to the event log, when available
pub fn get_context_with_logger() -> Result<FinsyncContext> {
    let data_dir = ensure_data_dir()?;
    let ctx = match get_logger() {
        Some(logger) => FinsyncContext::with_logger(&data_dir, Arc::new(logger)),
        None => FinsyncContext::new(&data_dir),
    };
    ctx.context("Failed to initialize finsync context")
}

/// Use the given setup token or prompt for one
pub fn resolve_token(token: Option<String>) -> Result<String> {
    match token {
        Some(t) => Ok(t),
        None => Ok(Input::new()
            .with_prompt("SimpleFIN setup token")
            .interact_text()?),
    }
}
