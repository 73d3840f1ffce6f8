//! Service layer - business logic orchestration
//!
//! Services coordinate domain logic and port interactions. Each service
//! focuses on a specific use case or feature area.

pub mod fetch_window;
mod importer;
pub mod logging;
pub mod migration;
mod status;
mod sync;

pub use importer::{ImportOutcome, Importer};
pub use logging::{
    EntryPoint, FailureKindCount, ItemHistory, LogEntry, LogEvent, LogFilter, LoggingService,
};
pub use migration::{MigrationResult, MigrationService};
pub use status::{ItemSummary, StatusService, StatusSummary};
pub use sync::{ItemSyncResult, SyncReport, SyncService};
