//! Migration service - manages database schema migrations
//!
//! Migrations are SQL files embedded at compile time and tracked in the
//! sys_migrations table. The same runner serves the main database and the
//! event log database, each with its own migration list.

use duckdb::Connection;

use crate::domain::result::Result;

/// Name of the bootstrap migration that creates sys_migrations
const BOOTSTRAP: &str = "000_migrations.sql";

/// Result of running migrations
#[derive(Debug)]
pub struct MigrationResult {
    /// Names of newly applied migrations
    pub applied: Vec<String>,
    /// Count of migrations that were already applied
    pub already_applied: usize,
}

/// Applies an ordered list of `(name, sql)` migrations to one connection
pub struct MigrationService<'a> {
    conn: &'a Connection,
    migrations: &'static [(&'static str, &'static str)],
}

impl<'a> MigrationService<'a> {
    pub fn new(conn: &'a Connection, migrations: &'static [(&'static str, &'static str)]) -> Self {
        Self { conn, migrations }
    }

    /// Run all pending migrations, bootstrapping sys_migrations first if needed
    pub fn run_pending(&self) -> Result<MigrationResult> {
        let mut applied = Vec::new();

        if !self.migrations_table_exists()? {
            if let Some((name, sql)) = self.migrations.iter().find(|(n, _)| *n == BOOTSTRAP) {
                self.apply(name, sql)?;
                applied.push(name.to_string());
            }
        }

        let already = self.get_applied()?;
        let already_applied = already.len() - applied.len();

        for (name, sql) in self.migrations {
            if *name == BOOTSTRAP || already.iter().any(|a| a == name) {
                continue;
            }
            self.apply(name, sql)?;
            applied.push(name.to_string());
        }

        Ok(MigrationResult {
            applied,
            already_applied,
        })
    }

    /// Names of applied migrations, sorted
    pub fn get_applied(&self) -> Result<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT migration_name FROM sys_migrations ORDER BY migration_name")?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<duckdb::Result<Vec<_>>>()?;
        Ok(names)
    }

    /// Names of migrations not yet applied
    pub fn get_pending(&self) -> Result<Vec<String>> {
        let applied = if self.migrations_table_exists()? {
            self.get_applied()?
        } else {
            Vec::new()
        };

        Ok(self
            .migrations
            .iter()
            .map(|(name, _)| name.to_string())
            .filter(|name| !applied.contains(name))
            .collect())
    }

    fn migrations_table_exists(&self) -> Result<bool> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM information_schema.tables WHERE table_name = 'sys_migrations'",
            [],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    fn apply(&self, name: &str, sql: &str) -> Result<()> {
        self.conn.execute_batch(sql)?;
        self.conn.execute(
            "INSERT INTO sys_migrations (migration_name) VALUES (?)",
            [name],
        )?;
        Ok(())
    }
}
