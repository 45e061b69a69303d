use crate::application::{BalanceStore, ReferralLedger};

/// Shared gateway state. Both components share one connection pool.
#[derive(Clone)]
pub struct AppState {
    pub balances: BalanceStore,
    pub referrals: ReferralLedger,
}

impl AppState {
    pub fn new(balances: BalanceStore) -> Self {
        let referrals = ReferralLedger::new(balances.clone());
        Self {
            balances,
            referrals,
        }
    }
}
