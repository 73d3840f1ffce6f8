//! Port definitions (hexagonal architecture)
//!
//! Ports define the interfaces for external dependencies. The import core
//! depends only on these traits, not on concrete implementations.

mod provider;
mod store;

pub use provider::{IntegrationProvider, SimplefinProvider};
pub use store::SnapshotStore;
