//! finsync core - SimpleFIN import engine
//!
//! This crate implements the core domain logic following hexagonal architecture:
//!
//! - **domain**: Core entities (Item, SimplefinAccount, Institution) and payload types
//! - **ports**: Trait definitions for external dependencies (SnapshotStore, SimplefinProvider)
//! - **services**: Business logic orchestration (Importer, SyncService, ...)
//! - **adapters**: Concrete implementations (DuckDB, SimpleFIN, demo)

pub mod adapters;
pub mod config;
pub mod domain;
pub mod log_migrations;
pub mod migrations;
pub mod ports;
pub mod services;

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;

use adapters::demo::DemoProvider;
use adapters::duckdb::DuckDbRepository;
use adapters::simplefin::SimpleFINProvider;
use config::Config;
use ports::{IntegrationProvider, SimplefinProvider};
use services::*;

// Re-export commonly used types at crate root
pub use domain::result::{Error, ProviderErrorKind};
pub use domain::{Institution, Item, ItemStatus, SimplefinAccount};
pub use services::{EntryPoint, LogEvent, LogFilter, LoggingService};

/// Main context for finsync operations
///
/// This is the primary entry point for all business logic. It holds
/// the database connection, configuration, and all services.
pub struct FinsyncContext {
    pub config: Config,
    pub repository: Arc<DuckDbRepository>,
    pub status_service: StatusService,
    pub sync_service: SyncService,
}

impl FinsyncContext {
    /// Create a new finsync context
    pub fn new(data_dir: &Path) -> Result<Self> {
        Self::open(data_dir, None)
    }

    /// Create a context whose sync service records events to `logger`
    pub fn with_logger(data_dir: &Path, logger: Arc<LoggingService>) -> Result<Self> {
        Self::open(data_dir, Some(logger))
    }

    fn open(data_dir: &Path, logger: Option<Arc<LoggingService>>) -> Result<Self> {
        let config = Config::load(data_dir)?;

        let db_path = data_dir.join(config.db_filename());
        let repository = Arc::new(DuckDbRepository::new(&db_path)?);

        // Initialize schema
        repository.ensure_schema()?;

        let (provider, integration): (Arc<dyn SimplefinProvider>, Arc<dyn IntegrationProvider>) =
            if config.demo_mode {
                let demo = Arc::new(DemoProvider::new());
                (demo.clone(), demo)
            } else {
                let simplefin = Arc::new(SimpleFINProvider::new(config.simplefin.clone()));
                (simplefin.clone(), simplefin)
            };

        let status_service = StatusService::new(Arc::clone(&repository));
        let mut sync_service = SyncService::new(Arc::clone(&repository), provider, integration);
        if let Some(logger) = logger {
            sync_service = sync_service.with_logger(logger);
        }

        Ok(Self {
            config,
            repository,
            status_service,
            sync_service,
        })
    }
}
