//! Migration service - embedded schema migrations
//!
//! Each embedded migration is recorded in `sys_migrations` once applied, so
//! running the service again is a no-op. The store and the event log share
//! this service with their own migration sets.

use anyhow::{Context, Result};
use duckdb::Connection;

use crate::migrations::MIGRATIONS;

/// Ordered `(name, sql)` pairs; the first one creates `sys_migrations`
pub type MigrationSet = &'static [(&'static str, &'static str)];

#[derive(Debug)]
pub struct MigrationResult {
    /// Newly applied migrations, in order
    pub applied: Vec<String>,
    pub already_applied: usize,
}

pub struct MigrationService<'a> {
    conn: &'a Connection,
    migrations: MigrationSet,
}

impl<'a> MigrationService<'a> {
    /// Service for the entry store schema
    pub fn new(conn: &'a Connection) -> Self {
        Self::with_migrations(conn, MIGRATIONS)
    }

    pub fn with_migrations(conn: &'a Connection, migrations: MigrationSet) -> Self {
        Self { conn, migrations }
    }

    /// Apply every migration not yet recorded
    pub fn run_pending(&self) -> Result<MigrationResult> {
        let applied = if self.migrations_table_exists() {
            self.get_applied()?
        } else {
            Vec::new()
        };

        let mut newly_applied = Vec::new();
        for (name, sql) in self.migrations {
            if applied.iter().any(|a| a == name) {
                continue;
            }
            self.conn
                .execute_batch(sql)
                .with_context(|| format!("Migration {} failed", name))?;
            self.record_migration(name)?;
            tracing::debug!(migration = *name, "migration applied");
            newly_applied.push(name.to_string());
        }

        Ok(MigrationResult {
            applied: newly_applied,
            already_applied: applied.len(),
        })
    }

    fn migrations_table_exists(&self) -> bool {
        self.conn
            .query_row(
                "SELECT COUNT(*) FROM information_schema.tables WHERE table_name = 'sys_migrations'",
                [],
                |row| row.get::<_, i64>(0),
            )
            .map(|count| count > 0)
            .unwrap_or(false)
    }

    pub fn get_applied(&self) -> Result<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT migration_name FROM sys_migrations ORDER BY migration_name")?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<duckdb::Result<Vec<_>>>()?;
        Ok(names)
    }

    pub fn get_pending(&self) -> Result<Vec<String>> {
        let applied = if self.migrations_table_exists() {
            self.get_applied()?
        } else {
            Vec::new()
        };
        Ok(self
            .migrations
            .iter()
            .filter(|(name, _)| !applied.iter().any(|a| a == name))
            .map(|(name, _)| name.to_string())
            .collect())
    }

    fn record_migration(&self, name: &str) -> Result<()> {
        self.conn.execute(
            "INSERT INTO sys_migrations (migration_name) VALUES (?)",
            [name],
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BOOTSTRAP: &str = "000_migrations.sql";

    #[test]
    fn test_fresh_database_gets_everything() {
        let conn = Connection::open_in_memory().unwrap();
        let service = MigrationService::new(&conn);

        assert_eq!(service.get_pending().unwrap().len(), MIGRATIONS.len());

        let result = service.run_pending().unwrap();
        assert_eq!(result.applied.len(), MIGRATIONS.len());
        assert_eq!(result.applied[0], BOOTSTRAP);
        assert_eq!(result.already_applied, 0);

        let again = service.run_pending().unwrap();
        assert!(again.applied.is_empty());
        assert_eq!(again.already_applied, MIGRATIONS.len());
        assert!(service.get_pending().unwrap().is_empty());
    }

    #[test]
    fn test_pending_after_bootstrap() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(MIGRATIONS[0].1).unwrap();
        conn.execute(
            "INSERT INTO sys_migrations (migration_name) VALUES (?)",
            [BOOTSTRAP],
        )
        .unwrap();

        let service = MigrationService::new(&conn);
        assert_eq!(service.get_pending().unwrap().len(), MIGRATIONS.len() - 1);
        assert_eq!(service.get_applied().unwrap(), vec![BOOTSTRAP.to_string()]);
    }

    #[test]
    fn test_log_migration_set() {
        use crate::log_migrations::LOG_MIGRATIONS;

        let conn = Connection::open_in_memory().unwrap();
        let log = MigrationService::with_migrations(&conn, LOG_MIGRATIONS);

        let result = log.run_pending().unwrap();
        assert_eq!(result.applied.len(), LOG_MIGRATIONS.len());
        assert!(log.run_pending().unwrap().applied.is_empty());
    }
}
