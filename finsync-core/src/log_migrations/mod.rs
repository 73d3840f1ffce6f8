//! Event log migrations for logs.duckdb
//!
//! Kept apart from the main schema so the log file can be deleted or
//! rotated without touching synced data. Applied by `MigrationService`.

/// Ordered `(name, sql)` pairs; the first entry bootstraps `sys_migrations`
pub const LOG_MIGRATIONS: &[(&str, &str)] = &[
    ("000_migrations.sql", include_str!("000_migrations.sql")),
    ("001_initial_schema.sql", include_str!("001_initial_schema.sql")),
];
