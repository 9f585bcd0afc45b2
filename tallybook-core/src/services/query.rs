//! Query service - entry listing for the signed-in user

use std::sync::Arc;

use rust_decimal::Decimal;

use crate::domain::result::{Error, Result};
use crate::domain::{EntryFilter, FinancialEntry};
use crate::ports::EntryRepository;

use super::session::SessionStore;

pub struct EntryQueryService {
    repository: Arc<dyn EntryRepository>,
}

impl EntryQueryService {
    pub fn new(repository: Arc<dyn EntryRepository>) -> Self {
        Self { repository }
    }

    /// Entries matching `filter`, as returned by the persistence side
    pub async fn list(&self, filter: &EntryFilter) -> Result<Vec<FinancialEntry>> {
        self.repository.query(filter).await
    }

    /// Entries of the signed-in user
    ///
    /// The owner of `filter` is replaced by the session identity.
    pub async fn list_own(
        &self,
        session: &SessionStore,
        mut filter: EntryFilter,
    ) -> Result<Vec<FinancialEntry>> {
        let identity = session.current_identity().ok_or(Error::Unauthenticated)?;
        filter.owner_id = identity.id;
        self.list(&filter).await
    }
}

/// Signed sum of a listing, incomes positive and expenses negative
pub fn net_total(entries: &[FinancialEntry]) -> Decimal {
    entries.iter().map(FinancialEntry::signed_amount).sum()
}
