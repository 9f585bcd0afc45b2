//! Balance service - settled balance of the signed-in user

use std::sync::Arc;

use rust_decimal::Decimal;
use serde::Serialize;

use crate::domain::result::{Error, Result};
use crate::domain::UserId;
use crate::ports::BalanceProvider;

use super::session::SessionStore;

/// Balance shown on the home page
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BalanceSummary {
    pub owner_id: UserId,
    pub owner_name: String,
    pub balance: Decimal,
}

pub struct BalanceService {
    provider: Arc<dyn BalanceProvider>,
}

impl BalanceService {
    pub fn new(provider: Arc<dyn BalanceProvider>) -> Self {
        Self { provider }
    }

    /// Balance of whoever is signed in
    pub async fn balance(&self, session: &SessionStore) -> Result<BalanceSummary> {
        let identity = session.current_identity().ok_or(Error::Unauthenticated)?;
        let balance = self.provider.balance_for_owner(identity.id).await?;
        Ok(BalanceSummary {
            owner_id: identity.id,
            owner_name: identity.name,
            balance,
        })
    }
}
