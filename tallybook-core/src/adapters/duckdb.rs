//! DuckDB repository - the local store
//!
//! Implements the entry, user and balance ports against `tallybook.duckdb`.
//! Passwords are stored as Argon2id hashes with a per-user random salt.

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::{Mutex, MutexGuard};
use std::thread;
use std::time::Duration;

use argon2::Argon2;
use async_trait::async_trait;
use duckdb::types::Value;
use duckdb::{params, params_from_iter, Connection, OptionalExt, Row};
use rand::Rng;
use rust_decimal::Decimal;

use crate::domain::result::{Error, Result};
use crate::domain::{
    EntryFilter, EntryId, EntryStatus, EntryType, FinancialEntry, Identity, NewUser, UserId,
};
use crate::ports::{BalanceProvider, EntryRepository, UserRepository};
use crate::services::{MigrationResult, MigrationService};

pub const USER_NOT_FOUND: &str = "user not found for the given email";
pub const INVALID_PASSWORD: &str = "invalid password";
pub const EMAIL_TAKEN: &str = "email already registered";

const MAX_RETRIES: u32 = 5;

/// Doubles on every retry: 50, 100, 200, 400ms
const INITIAL_RETRY_DELAY_MS: u64 = 50;

const SALT_LEN: usize = 16;
const HASH_LEN: usize = 32;

const ENTRY_COLUMNS: &str = "SELECT entry_id, description, CAST(amount AS VARCHAR), month, year, \
     entry_type, status, owner_id FROM sys_entries";

/// Whether an open failure is a lock held by another process
fn is_retryable_error(err_msg: &str) -> bool {
    let lower = err_msg.to_lowercase();
    lower.contains("being used by another process")
        || lower.contains("cannot access the file")
        || lower.contains("resource temporarily unavailable")
        || lower.contains("database is locked")
        || lower.contains("could not set lock on file")
}

fn hash_password(password: &str, salt: &[u8]) -> Result<Vec<u8>> {
    let mut hash = vec![0u8; HASH_LEN];
    Argon2::default()
        .hash_password_into(password.as_bytes(), salt, &mut hash)
        .map_err(|e| Error::database(format!("Password hashing failed: {}", e)))?;
    Ok(hash)
}

/// Columns of an entry row before conversion to domain types
struct EntryRow {
    id: i64,
    description: String,
    amount: String,
    month: i32,
    year: i32,
    entry_type: String,
    status: String,
    owner_id: i64,
}

impl EntryRow {
    fn read(row: &Row<'_>) -> duckdb::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            description: row.get(1)?,
            amount: row.get(2)?,
            month: row.get(3)?,
            year: row.get(4)?,
            entry_type: row.get(5)?,
            status: row.get(6)?,
            owner_id: row.get(7)?,
        })
    }

    fn into_entry(self) -> Result<FinancialEntry> {
        let corrupt = |column: &str, value: &str| {
            Error::database(format!(
                "Entry {} has an unreadable {}: {}",
                self.id, column, value
            ))
        };
        let amount =
            Decimal::from_str(&self.amount).map_err(|_| corrupt("amount", &self.amount))?;
        let entry_type =
            EntryType::parse(&self.entry_type).ok_or_else(|| corrupt("type", &self.entry_type))?;
        let status =
            EntryStatus::parse(&self.status).ok_or_else(|| corrupt("status", &self.status))?;
        let month =
            u32::try_from(self.month).map_err(|_| corrupt("month", &self.month.to_string()))?;

        Ok(FinancialEntry {
            id: Some(self.id),
            description: self.description,
            amount,
            month,
            year: self.year,
            entry_type,
            status,
            owner_id: self.owner_id,
        })
    }
}

/// Local DuckDB store
pub struct DuckDbRepository {
    conn: Mutex<Connection>,
    db_path: Option<PathBuf>,
}

impl DuckDbRepository {
    /// Open or create the store at `db_path`
    ///
    /// Retries with exponential backoff while another process holds the
    /// file lock.
    pub fn new(db_path: &Path) -> anyhow::Result<Self> {
        let mut attempt = 0;
        loop {
            match Self::try_open_connection(db_path) {
                Ok(conn) => {
                    return Ok(Self {
                        conn: Mutex::new(conn),
                        db_path: Some(db_path.to_path_buf()),
                    })
                }
                Err(e) if attempt + 1 < MAX_RETRIES && is_retryable_error(&e.to_string()) => {
                    let delay = Duration::from_millis(INITIAL_RETRY_DELAY_MS * 2u64.pow(attempt));
                    tracing::warn!(
                        attempt = attempt + 1,
                        max = MAX_RETRIES,
                        "database busy, retrying in {}ms: {}",
                        delay.as_millis(),
                        e
                    );
                    thread::sleep(delay);
                    attempt += 1;
                }
                Err(e) => {
                    return Err(anyhow::Error::new(e)
                        .context(format!("Failed to open database {}", db_path.display())))
                }
            }
        }
    }

    /// Store that lives only as long as the process
    pub fn open_in_memory() -> anyhow::Result<Self> {
        let config = duckdb::Config::default().enable_autoload_extension(false)?;
        Ok(Self {
            conn: Mutex::new(Connection::open_in_memory_with_flags(config)?),
            db_path: None,
        })
    }

    fn try_open_connection(db_path: &Path) -> duckdb::Result<Connection> {
        // Autoloaded extensions from ~/.duckdb are never used
        let config = duckdb::Config::default().enable_autoload_extension(false)?;
        Connection::open_with_flags(db_path, config)
    }

    pub fn run_migrations(&self) -> anyhow::Result<MigrationResult> {
        let conn = self.lock()?;
        MigrationService::new(&conn).run_pending()
    }

    pub fn ensure_schema(&self) -> anyhow::Result<()> {
        self.run_migrations()?;
        Ok(())
    }

    pub fn db_path(&self) -> Option<&Path> {
        self.db_path.as_deref()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| Error::database(format!("Lock poisoned: {}", e)))
    }

    // === Entries ===

    fn select_entry(conn: &Connection, id: EntryId) -> Result<Option<FinancialEntry>> {
        let sql = format!("{} WHERE entry_id = ?", ENTRY_COLUMNS);
        conn.query_row(&sql, [id], EntryRow::read)
            .optional()?
            .map(EntryRow::into_entry)
            .transpose()
    }

    fn user_exists(conn: &Connection, id: UserId) -> Result<bool> {
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM sys_users WHERE user_id = ?",
            [id],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    pub fn insert_entry(&self, entry: &FinancialEntry) -> Result<FinancialEntry> {
        let conn = self.lock()?;
        if !Self::user_exists(&conn, entry.owner_id)? {
            return Err(Error::persistence(format!(
                "user not found for id {}",
                entry.owner_id
            )));
        }

        let id: i64 = conn.query_row("SELECT nextval('seq_entry_id')", [], |row| row.get(0))?;
        conn.execute(
            "INSERT INTO sys_entries (entry_id, description, amount, month, year, entry_type, status, owner_id)
             VALUES (?, ?, CAST(? AS DECIMAL(18, 2)), ?, ?, ?, ?, ?)",
            params![
                id,
                &entry.description,
                entry.amount.to_string(),
                entry.month,
                entry.year,
                entry.entry_type.as_str(),
                entry.status.as_str(),
                entry.owner_id,
            ],
        )?;

        Self::select_entry(&conn, id)?
            .ok_or_else(|| Error::database(format!("Entry {} vanished after insert", id)))
    }

    pub fn update_entry(&self, entry: &FinancialEntry) -> Result<FinancialEntry> {
        let id = entry
            .id
            .ok_or_else(|| Error::persistence("entry has no id and cannot be updated"))?;
        let conn = self.lock()?;

        let changed = conn.execute(
            "UPDATE sys_entries
             SET description = ?, amount = CAST(? AS DECIMAL(18, 2)), month = ?, year = ?,
                 entry_type = ?, status = ?, updated_at = CURRENT_TIMESTAMP
             WHERE entry_id = ? AND owner_id = ?",
            params![
                &entry.description,
                entry.amount.to_string(),
                entry.month,
                entry.year,
                entry.entry_type.as_str(),
                entry.status.as_str(),
                id,
                entry.owner_id,
            ],
        )?;
        if changed == 0 {
            return Err(Error::persistence(format!("entry {} not found", id)));
        }

        Self::select_entry(&conn, id)?
            .ok_or_else(|| Error::database(format!("Entry {} vanished after update", id)))
    }

    pub fn get_entry(&self, id: EntryId) -> Result<FinancialEntry> {
        let conn = self.lock()?;
        Self::select_entry(&conn, id)?.ok_or_else(|| Error::not_found(format!("entry {}", id)))
    }

    /// Entries matching `filter`, ordered by year, month and id
    pub fn find_entries(&self, filter: &EntryFilter) -> Result<Vec<FinancialEntry>> {
        let mut conditions = vec!["owner_id = ?"];
        let mut values: Vec<Value> = vec![filter.owner_id.into()];

        if let Some(description) = filter
            .description
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty())
        {
            conditions.push("contains(lower(description), ?)");
            values.push(description.to_lowercase().into());
        }
        if let Some(month) = filter.month {
            conditions.push("month = ?");
            values.push(month.into());
        }
        if let Some(year) = filter.year {
            conditions.push("year = ?");
            values.push(year.into());
        }
        if let Some(entry_type) = filter.entry_type {
            conditions.push("entry_type = ?");
            values.push(entry_type.as_str().to_string().into());
        }
        if let Some(status) = filter.status {
            conditions.push("status = ?");
            values.push(status.as_str().to_string().into());
        }

        let sql = format!(
            "{} WHERE {} ORDER BY year, month, entry_id",
            ENTRY_COLUMNS,
            conditions.join(" AND ")
        );

        let conn = self.lock()?;
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params_from_iter(values), EntryRow::read)?
            .collect::<duckdb::Result<Vec<_>>>()?;
        rows.into_iter().map(EntryRow::into_entry).collect()
    }

    /// Effective incomes minus effective expenses
    pub fn effective_balance(&self, owner_id: UserId) -> Result<Decimal> {
        let conn = self.lock()?;
        if !Self::user_exists(&conn, owner_id)? {
            return Err(Error::not_found(format!("user {}", owner_id)));
        }

        let total: String = conn.query_row(
            "SELECT CAST(COALESCE(SUM(CASE WHEN entry_type = 'INCOME' THEN amount ELSE -amount END), 0) AS VARCHAR)
             FROM sys_entries
             WHERE owner_id = ? AND status = 'EFFECTIVE'",
            [owner_id],
            |row| row.get(0),
        )?;
        Decimal::from_str(&total)
            .map_err(|e| Error::database(format!("Unreadable balance {}: {}", total, e)))
    }

    // === Users ===

    pub fn insert_user(&self, user: &NewUser) -> Result<Identity> {
        let email = user.email.trim();
        let conn = self.lock()?;

        let taken: i64 = conn.query_row(
            "SELECT COUNT(*) FROM sys_users WHERE lower(email) = lower(?)",
            [email],
            |row| row.get(0),
        )?;
        if taken > 0 {
            return Err(Error::persistence(EMAIL_TAKEN));
        }

        let salt: [u8; SALT_LEN] = rand::thread_rng().gen();
        let hash = hash_password(&user.password, &salt)?;

        let id: i64 = conn.query_row("SELECT nextval('seq_user_id')", [], |row| row.get(0))?;
        conn.execute(
            "INSERT INTO sys_users (user_id, name, email, password_salt, password_hash)
             VALUES (?, ?, ?, ?, ?)",
            params![id, user.name.trim(), email, salt.to_vec(), hash],
        )?;

        Ok(Identity::new(id, user.name.trim(), email))
    }

    pub fn verify_credentials(&self, email: &str, password: &str) -> Result<Identity> {
        let conn = self.lock()?;
        let found = conn
            .query_row(
                "SELECT user_id, name, email, password_salt, password_hash
                 FROM sys_users WHERE lower(email) = lower(?)",
                [email.trim()],
                |row| {
                    Ok((
                        Identity::new(row.get(0)?, row.get::<_, String>(1)?, row.get::<_, String>(2)?),
                        row.get::<_, Vec<u8>>(3)?,
                        row.get::<_, Vec<u8>>(4)?,
                    ))
                },
            )
            .optional()?;
        drop(conn);

        let (identity, salt, stored) = found.ok_or_else(|| Error::authentication(USER_NOT_FOUND))?;
        if hash_password(password, &salt)? != stored {
            return Err(Error::authentication(INVALID_PASSWORD));
        }
        Ok(identity)
    }
}

#[async_trait]
impl EntryRepository for DuckDbRepository {
    async fn create(&self, entry: &FinancialEntry) -> Result<FinancialEntry> {
        self.insert_entry(entry)
    }

    async fn update(&self, entry: &FinancialEntry) -> Result<FinancialEntry> {
        self.update_entry(entry)
    }

    async fn fetch_by_id(&self, id: EntryId) -> Result<FinancialEntry> {
        self.get_entry(id)
    }

    async fn query(&self, filter: &EntryFilter) -> Result<Vec<FinancialEntry>> {
        self.find_entries(filter)
    }
}

#[async_trait]
impl UserRepository for DuckDbRepository {
    async fn create(&self, user: &NewUser) -> Result<Identity> {
        self.insert_user(user)
    }

    async fn authenticate(&self, email: &str, password: &str) -> Result<Identity> {
        self.verify_credentials(email, password)
    }
}

#[async_trait]
impl BalanceProvider for DuckDbRepository {
    async fn balance_for_owner(&self, owner_id: UserId) -> Result<Decimal> {
        self.effective_balance(owner_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn store() -> DuckDbRepository {
        let repo = DuckDbRepository::open_in_memory().unwrap();
        repo.ensure_schema().unwrap();
        repo
    }

    fn ana(repo: &DuckDbRepository) -> Identity {
        repo.insert_user(&NewUser::new("Ana", "ana@example.com", "secret", "secret"))
            .unwrap()
    }

    fn entry(owner_id: UserId, description: &str, entry_type: EntryType, cents: i64) -> FinancialEntry {
        FinancialEntry {
            id: None,
            description: description.to_string(),
            amount: Decimal::new(cents, 2),
            month: 5,
            year: 2024,
            entry_type,
            status: EntryStatus::Pending,
            owner_id,
        }
    }

    #[test]
    fn test_retryable_errors() {
        assert!(is_retryable_error("IO Error: Could not set lock on file"));
        assert!(is_retryable_error("The process cannot access the file"));
        assert!(!is_retryable_error("Catalog Error: table does not exist"));
    }

    #[test]
    fn test_register_and_authenticate() {
        let repo = store();
        let identity = ana(&repo);
        assert_eq!(identity.name, "Ana");

        let signed_in = repo.verify_credentials("ANA@example.com", "secret").unwrap();
        assert_eq!(signed_in, identity);

        let err = repo.verify_credentials("ana@example.com", "nope").unwrap_err();
        assert!(matches!(err, Error::Authentication(ref m) if m == INVALID_PASSWORD));

        let err = repo.verify_credentials("bob@example.com", "secret").unwrap_err();
        assert!(matches!(err, Error::Authentication(ref m) if m == USER_NOT_FOUND));
    }

    #[test]
    fn test_duplicate_email_rejected() {
        let repo = store();
        ana(&repo);
        let err = repo
            .insert_user(&NewUser::new("Other", "Ana@Example.com", "x", "x"))
            .unwrap_err();
        assert_eq!(err.to_string(), EMAIL_TAKEN);
    }

    #[test]
    fn test_entry_create_fetch_update() {
        let repo = store();
        let owner = ana(&repo);

        let created = repo
            .insert_entry(&entry(owner.id, "Salary", EntryType::Income, 100000))
            .unwrap();
        let id = created.id.unwrap();
        assert_eq!(created.amount, Decimal::new(100000, 2));
        assert_eq!(created.status, EntryStatus::Pending);
        assert_eq!(repo.get_entry(id).unwrap(), created);

        let mut changed = created.clone();
        changed.description = "Salary May".to_string();
        changed.status = EntryStatus::Effective;
        let updated = repo.update_entry(&changed).unwrap();
        assert_eq!(updated, changed);
    }

    #[test]
    fn test_missing_entry() {
        let repo = store();
        let owner = ana(&repo);

        assert!(repo.get_entry(42).unwrap_err().is_not_found());

        let mut ghost = entry(owner.id, "Ghost", EntryType::Expense, 100);
        ghost.id = Some(42);
        let err = repo.update_entry(&ghost).unwrap_err();
        assert!(matches!(err, Error::Persistence(_)));
    }

    #[test]
    fn test_create_for_unknown_owner() {
        let repo = store();
        let err = repo
            .insert_entry(&entry(99, "Salary", EntryType::Income, 100))
            .unwrap_err();
        assert!(matches!(err, Error::Persistence(_)));
    }

    #[test]
    fn test_filters_and_ordering() {
        let repo = store();
        let owner = ana(&repo);
        let other = repo
            .insert_user(&NewUser::new("Bia", "bia@example.com", "pw", "pw"))
            .unwrap();

        let mut march = entry(owner.id, "Groceries", EntryType::Expense, 4550);
        march.month = 3;
        repo.insert_entry(&march).unwrap();
        repo.insert_entry(&entry(owner.id, "Salary", EntryType::Income, 100000))
            .unwrap();
        repo.insert_entry(&entry(other.id, "Salary", EntryType::Income, 5000))
            .unwrap();

        let all = repo.find_entries(&EntryFilter::for_owner(owner.id)).unwrap();
        assert_eq!(
            all.iter().map(|e| e.description.as_str()).collect::<Vec<_>>(),
            vec!["Groceries", "Salary"]
        );

        let mut filter = EntryFilter::for_owner(owner.id);
        filter.description = Some("SAL".to_string());
        let found = repo.find_entries(&filter).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].owner_id, owner.id);

        let mut filter = EntryFilter::for_owner(owner.id);
        filter.month = Some(3);
        filter.entry_type = Some(EntryType::Expense);
        assert_eq!(repo.find_entries(&filter).unwrap().len(), 1);

        filter.status = Some(EntryStatus::Effective);
        assert!(repo.find_entries(&filter).unwrap().is_empty());
    }

    #[test]
    fn test_balance_counts_effective_only() {
        let repo = store();
        let owner = ana(&repo);
        assert_eq!(repo.effective_balance(owner.id).unwrap(), Decimal::ZERO);

        let mut income = entry(owner.id, "Salary", EntryType::Income, 100000);
        income.status = EntryStatus::Effective;
        let mut expense = entry(owner.id, "Rent", EntryType::Expense, 45050);
        expense.status = EntryStatus::Effective;
        repo.insert_entry(&income).unwrap();
        repo.insert_entry(&expense).unwrap();
        repo.insert_entry(&entry(owner.id, "Bonus", EntryType::Income, 99900))
            .unwrap();

        assert_eq!(repo.effective_balance(owner.id).unwrap(), Decimal::new(54950, 2));
        assert!(repo.effective_balance(99).unwrap_err().is_not_found());
    }

    #[test]
    fn test_file_store_survives_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("tallybook.duckdb");

        let owner = {
            let repo = DuckDbRepository::new(&path).unwrap();
            repo.ensure_schema().unwrap();
            ana(&repo)
        };

        let repo = DuckDbRepository::new(&path).unwrap();
        let result = repo.run_migrations().unwrap();
        assert!(result.applied.is_empty());
        assert_eq!(repo.db_path(), Some(path.as_path()));
        assert_eq!(repo.verify_credentials("ana@example.com", "secret").unwrap(), owner);
    }
}
