use thiserror::Error;

use crate::domain::{Points, ReferralError};

#[derive(Error, Debug)]
pub enum AppError {
    #[error("{0}")]
    InvalidReferral(#[from] ReferralError),

    #[error("Balance of user {telegram_id} would overflow applying {delta}")]
    BalanceOverflow { telegram_id: String, delta: Points },

    #[error("Database error: {0}")]
    Database(#[from] anyhow::Error),
}
