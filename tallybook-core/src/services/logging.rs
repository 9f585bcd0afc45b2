//! Logging service - structured event logging to DuckDB
//!
//! Events go to `logs.duckdb` next to the main store. Only event names,
//! routes, commands and error text are recorded: never descriptions,
//! amounts, emails or passwords.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};

use anyhow::{anyhow, Context, Result};
use chrono::Utc;
use duckdb::{Connection, Row};
use serde::{Deserialize, Serialize};

use crate::domain::Route;
use crate::log_migrations::LOG_MIGRATIONS;

use super::migration::MigrationService;

const LOG_DB_FILE: &str = "logs.duckdb";

static ID_COUNTER: AtomicU64 = AtomicU64::new(0);

fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

/// Millisecond timestamp in the high bits, a wrapping counter in the low 16
fn generate_id() -> u64 {
    let counter = ID_COUNTER.fetch_add(1, Ordering::Relaxed) & 0xFFFF;
    ((now_ms().max(0) as u64) << 16) | counter
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

/// Front end that produced the event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryPoint {
    Cli,
    Test,
}

impl EntryPoint {
    fn as_str(&self) -> &'static str {
        match self {
            EntryPoint::Cli => "cli",
            EntryPoint::Test => "test",
        }
    }
}

/// A log event to be recorded
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LogEvent {
    pub event: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backend: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub route: Option<String>,
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
            ..Self::default()
        }
    }

    /// Persistence backend in use (`local` or `remote`)
    pub fn with_backend(mut self, backend: impl Into<String>) -> Self {
        self.backend = Some(backend.into());
        self
    }

    pub fn with_route(mut self, route: Route) -> Self {
        self.route = Some(route.path());
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

/// A stored log row
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub id: u64,
    pub timestamp: i64,
    pub entry_point: String,
    pub app_version: String,
    pub platform: String,
    pub event: String,
    pub backend: Option<String>,
    pub route: Option<String>,
    pub command: Option<String>,
    pub error_message: Option<String>,
    pub error_details: Option<String>,
}

impl LogEntry {
    fn from_row(row: &Row<'_>) -> duckdb::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            timestamp: row.get(1)?,
            entry_point: row.get(2)?,
            app_version: row.get(3)?,
            platform: row.get(4)?,
            event: row.get(5)?,
            backend: row.get(6)?,
            route: row.get(7)?,
            command: row.get(8)?,
            error_message: row.get(9)?,
            error_details: row.get(10)?,
        })
    }
}

const SELECT_COLUMNS: &str = "SELECT id, timestamp, entry_point, app_version, platform, \
     event, backend, route, command, error_message, error_details FROM sys_logs";

/// Event log kept in `logs.duckdb`
pub struct LoggingService {
    conn: Mutex<Connection>,
    db_path: PathBuf,
    entry_point: EntryPoint,
    app_version: String,
    platform: &'static str,
}

impl LoggingService {
    /// Open or create the log database in `data_dir` and migrate it
    pub fn new(
        data_dir: &Path,
        entry_point: EntryPoint,
        app_version: impl Into<String>,
    ) -> Result<Self> {
        let db_path = data_dir.join(LOG_DB_FILE);
        let conn = Connection::open(&db_path)
            .with_context(|| format!("Failed to open log database {}", db_path.display()))?;

        let service = Self {
            conn: Mutex::new(conn),
            db_path,
            entry_point,
            app_version: app_version.into(),
            platform: detect_platform(),
        };
        service.run_migrations()?;
        Ok(service)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|e| anyhow!("Lock poisoned: {}", e))
    }

    fn run_migrations(&self) -> Result<()> {
        let conn = self.lock()?;
        let result = MigrationService::with_migrations(&conn, LOG_MIGRATIONS).run_pending()?;
        if !result.applied.is_empty() {
            tracing::debug!(applied = result.applied.len(), "log schema migrated");
        }
        Ok(())
    }

    /// Record an event, stamped with entry point, version and platform
    pub fn log(&self, event: LogEvent) -> Result<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO sys_logs (
                id, timestamp, entry_point, app_version, platform,
                event, backend, route, command, error_message, error_details
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            duckdb::params![
                generate_id(),
                now_ms(),
                self.entry_point.as_str(),
                &self.app_version,
                self.platform,
                &event.event,
                &event.backend,
                &event.route,
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

    pub fn log_command(&self, command: &str) -> Result<()> {
        self.log(LogEvent::new("command_executed").with_command(command))
    }

    /// Record a navigation to `route`
    pub fn log_route(&self, route: Route) -> Result<()> {
        self.log(LogEvent::new("route_opened").with_route(route))
    }

    pub fn log_error(&self, event: &str, message: &str, details: Option<&str>) -> Result<()> {
        let mut log_event = LogEvent::new(event).with_error(message);
        if let Some(d) = details {
            log_event = log_event.with_error_details(d);
        }
        self.log(log_event)
    }

    /// Most recent entries first
    pub fn get_recent(&self, limit: usize) -> Result<Vec<LogEntry>> {
        self.select("", limit)
    }

    pub fn get_errors(&self, limit: usize) -> Result<Vec<LogEntry>> {
        self.select("WHERE error_message IS NOT NULL", limit)
    }

    fn select(&self, condition: &str, limit: usize) -> Result<Vec<LogEntry>> {
        let conn = self.lock()?;
        let sql = format!(
            "{} {} ORDER BY timestamp DESC, id DESC LIMIT ?",
            SELECT_COLUMNS, condition
        );
        let mut stmt = conn.prepare(&sql)?;
        let entries = stmt
            .query_map([limit as i64], LogEntry::from_row)?
            .collect::<duckdb::Result<Vec<_>>>()?;
        Ok(entries)
    }

    pub fn count(&self) -> Result<u64> {
        let conn = self.lock()?;
        let count: u64 = conn.query_row("SELECT COUNT(*) FROM sys_logs", [], |row| row.get(0))?;
        Ok(count)
    }

    pub fn count_errors(&self) -> Result<u64> {
        let conn = self.lock()?;
        let count: u64 = conn.query_row(
            "SELECT COUNT(*) FROM sys_logs WHERE error_message IS NOT NULL",
            [],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// Delete entries older than `timestamp_ms`, returning how many went
    pub fn delete_before(&self, timestamp_ms: i64) -> Result<u64> {
        let conn = self.lock()?;
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

    fn service(dir: &Path) -> LoggingService {
        LoggingService::new(dir, EntryPoint::Test, "0.1.0").unwrap()
    }

    #[test]
    fn test_creates_database() {
        let dir = tempdir().unwrap();
        let service = service(dir.path());
        assert!(service.db_path().exists());
        assert_eq!(service.count().unwrap(), 0);
    }

    #[test]
    fn test_reopen_skips_applied_migrations() {
        let dir = tempdir().unwrap();
        service(dir.path()).log_event("first").unwrap();

        let reopened = service(dir.path());
        assert_eq!(reopened.count().unwrap(), 1);
    }

    #[test]
    fn test_log_with_context() {
        let dir = tempdir().unwrap();
        let service = service(dir.path());

        service
            .log(
                LogEvent::new("entry_submitted")
                    .with_backend("local")
                    .with_route(Route::EntryForm { id: Some(4) })
                    .with_command("entry add"),
            )
            .unwrap();
        service.log_route(Route::Home).unwrap();

        let entries = service.get_recent(10).unwrap();
        assert_eq!(entries.len(), 2);
        let submitted = entries.iter().find(|e| e.event == "entry_submitted").unwrap();
        assert_eq!(submitted.backend.as_deref(), Some("local"));
        assert_eq!(submitted.route.as_deref(), Some("/entries/form/4"));
        assert_eq!(submitted.command.as_deref(), Some("entry add"));
        assert_eq!(submitted.entry_point, "test");
        assert_eq!(submitted.app_version, "0.1.0");
    }

    #[test]
    fn test_errors_only() {
        let dir = tempdir().unwrap();
        let service = service(dir.path());

        service.log_command("whoami").unwrap();
        service
            .log_error("login_failed", "invalid password", Some("remote backend"))
            .unwrap();

        let errors = service.get_errors(10).unwrap();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].event, "login_failed");
        assert_eq!(errors[0].error_message.as_deref(), Some("invalid password"));
        assert_eq!(errors[0].error_details.as_deref(), Some("remote backend"));
        assert_eq!(service.count_errors().unwrap(), 1);
    }

    #[test]
    fn test_count_and_delete() {
        let dir = tempdir().unwrap();
        let service = service(dir.path());

        for event in ["a", "b", "c"] {
            service.log_event(event).unwrap();
        }
        assert_eq!(service.count().unwrap(), 3);
        assert_eq!(service.get_recent(2).unwrap().len(), 2);

        assert_eq!(service.delete_before(now_ms() + 1000).unwrap(), 3);
        assert_eq!(service.count().unwrap(), 0);
    }

    #[test]
    fn test_ids_are_unique() {
        let a = generate_id();
        let b = generate_id();
        assert_ne!(a, b);
    }
}
