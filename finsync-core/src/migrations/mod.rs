//! Main database migrations - embedded SQL files
//!
//! SQL is compiled into the binary with include_str! and applied in list
//! order by `MigrationService`, which records each name in sys_migrations.

/// Ordered `(name, sql)` pairs for finsync.duckdb / demo.duckdb
///
/// New migrations get the next NNN_ prefix and are appended here; applied
/// files are never edited.
pub const MIGRATIONS: &[(&str, &str)] = &[
    ("000_migrations.sql", include_str!("000_migrations.sql")),
    ("001_initial_schema.sql", include_str!("001_initial_schema.sql")),
];
