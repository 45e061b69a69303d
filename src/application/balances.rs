use tracing::{debug, info};

use crate::domain::Points;
use crate::storage::Repository;

use super::AppError;

/// Per-user point balances.
///
/// Cloning is cheap; every clone shares the same connection pool.
#[derive(Clone)]
pub struct BalanceStore {
    repo: Repository,
}

impl BalanceStore {
    /// Create a balance store over an existing repository.
    pub fn new(repo: Repository) -> Self {
        Self { repo }
    }

    /// Open (creating if needed) the database file and its schema.
    pub async fn init(database_path: &str) -> Result<Self, AppError> {
        let repo = Repository::init(database_path).await?;
        Ok(Self::new(repo))
    }

    pub(crate) fn repository(&self) -> &Repository {
        &self.repo
    }

    /// Stored balance, or 0 for users with no record.
    pub async fn get_balance(&self, telegram_id: &str) -> Result<Points, AppError> {
        let balance = self.repo.get_balance(telegram_id).await?.unwrap_or(0);
        debug!(telegram_id, balance, "balance read");
        Ok(balance)
    }

    /// Whether the user has a balance row.
    pub async fn is_registered(&self, telegram_id: &str) -> Result<bool, AppError> {
        Ok(self.repo.get_balance(telegram_id).await?.is_some())
    }

    /// Overwrite a user's balance. Negative amounts are accepted.
    pub async fn set_balance(&self, telegram_id: &str, amount: Points) -> Result<(), AppError> {
        self.repo.set_balance(telegram_id, amount).await?;
        info!(telegram_id, balance = amount, "balance set");
        Ok(())
    }

    /// Add `delta` to a user's balance and return the result.
    pub async fn increment_balance(
        &self,
        telegram_id: &str,
        delta: Points,
    ) -> Result<Points, AppError> {
        let balance = self
            .repo
            .increment_balance(telegram_id, delta)
            .await?
            .ok_or_else(|| AppError::BalanceOverflow {
                telegram_id: telegram_id.to_string(),
                delta,
            })?;
        info!(telegram_id, delta, balance, "balance incremented");
        Ok(balance)
    }

    /// Close the underlying connection pool.
    pub async fn close(&self) {
        self.repo.close().await;
    }
}
