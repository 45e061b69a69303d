use tracing::{info, warn};

use crate::domain::{Points, REFERRAL_REWARD, Referral, ReferralOutcome, validate_referral};
use crate::storage::RegistrationWrite;

use super::{AppError, BalanceStore};

/// Records referral edges and pays the referral reward.
#[derive(Clone)]
pub struct ReferralLedger {
    balances: BalanceStore,
    reward: Points,
}

impl ReferralLedger {
    /// Create a ledger paying the standard reward.
    pub fn new(balances: BalanceStore) -> Self {
        Self {
            balances,
            reward: REFERRAL_REWARD,
        }
    }

    pub fn reward(&self) -> Points {
        self.reward
    }

    /// Register `new_user_id` as referred by `referrer_id`.
    ///
    /// Self-referrals fail before storage is touched. A user that already has
    /// a balance row is reported as `AlreadyRegistered` and nothing is written.
    /// Otherwise the new user's row, the referral row and the referrer credit
    /// are committed together or not at all.
    pub async fn register_referral(
        &self,
        new_user_id: &str,
        referrer_id: &str,
    ) -> Result<ReferralOutcome, AppError> {
        if let Err(e) = validate_referral(new_user_id, referrer_id) {
            warn!(new_user_id, referrer_id, "referral rejected: {}", e);
            return Err(e.into());
        }

        let write = self
            .balances
            .repository()
            .register_referral(new_user_id, referrer_id, self.reward)
            .await?;

        match write {
            RegistrationWrite::Registered { referrer_balance } => {
                info!(
                    new_user_id,
                    referrer_id,
                    reward = self.reward,
                    referrer_balance,
                    "referral registered"
                );
                Ok(ReferralOutcome::Registered { referrer_balance })
            }
            RegistrationWrite::AlreadyRegistered => {
                info!(new_user_id, referrer_id, "referral skipped: user already registered");
                Ok(ReferralOutcome::AlreadyRegistered)
            }
            RegistrationWrite::RewardOverflow => Err(AppError::BalanceOverflow {
                telegram_id: referrer_id.to_string(),
                delta: self.reward,
            }),
        }
    }

    /// Referrals credited to `referrer_id`, oldest first.
    pub async fn referrals_by(&self, referrer_id: &str) -> Result<Vec<Referral>, AppError> {
        Ok(self
            .balances
            .repository()
            .list_referrals_by_referrer(referrer_id)
            .await?)
    }

    /// Number of referral rows recorded for `new_user_id` (0 or 1).
    pub async fn referral_count(&self, new_user_id: &str) -> Result<i64, AppError> {
        Ok(self
            .balances
            .repository()
            .count_referrals_for_new_user(new_user_id)
            .await?)
    }
}
