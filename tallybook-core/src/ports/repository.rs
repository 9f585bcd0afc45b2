//! Persistence ports - entry, user and balance abstractions

use async_trait::async_trait;
use rust_decimal::Decimal;

use crate::domain::result::Result;
use crate::domain::{EntryFilter, EntryId, FinancialEntry, Identity, NewUser, UserId};

/// Entry persistence service
///
/// Implementations (adapters) talk to the actual store. Failures carry a
/// human-readable message; the core only distinguishes `Error::NotFound`
/// on `fetch_by_id`.
#[async_trait]
pub trait EntryRepository: Send + Sync {
    /// Persist a new entry, returning it with its assigned id and status
    async fn create(&self, entry: &FinancialEntry) -> Result<FinancialEntry>;

    /// Replace an existing entry, returning the stored version
    async fn update(&self, entry: &FinancialEntry) -> Result<FinancialEntry>;

    /// Fetch an entry by id
    async fn fetch_by_id(&self, id: EntryId) -> Result<FinancialEntry>;

    /// List entries matching the filter
    async fn query(&self, filter: &EntryFilter) -> Result<Vec<FinancialEntry>>;
}

/// User persistence service
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Register a new user
    async fn create(&self, user: &NewUser) -> Result<Identity>;

    /// Check credentials and return the matching identity
    async fn authenticate(&self, email: &str, password: &str) -> Result<Identity>;
}

/// Balance service
#[async_trait]
pub trait BalanceProvider: Send + Sync {
    /// Settled income minus settled expenses for the owner
    async fn balance_for_owner(&self, owner_id: UserId) -> Result<Decimal>;
}
