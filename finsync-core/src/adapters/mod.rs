//! Adapter implementations
//!
//! Adapters implement the port traits with concrete technologies:
//! - DuckDB for the SnapshotStore port
//! - SimpleFIN HTTP client for SimplefinProvider / IntegrationProvider
//! - Demo data provider for demo mode and testing

pub mod demo;
pub mod duckdb;
pub mod simplefin;
