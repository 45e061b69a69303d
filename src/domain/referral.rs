use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Points, UserId};

/// Points credited to a referrer when the user they referred registers.
pub const REFERRAL_REWARD: Points = 500;

/// A recorded referrer -> new user edge. Rows are append-only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Referral {
    /// Assigned by the database (autoincrement)
    pub id: i64,
    pub referrer_id: UserId,
    pub new_user_id: UserId,
    /// Missing on rows written before timestamps were recorded
    pub created_at: Option<DateTime<Utc>>,
}

/// Result of a referral registration that did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferralOutcome {
    /// New user created, edge recorded and referrer credited.
    Registered { referrer_balance: Points },
    /// New user already had a balance row; nothing was written.
    AlreadyRegistered,
}

impl ReferralOutcome {
    pub fn status(&self) -> &'static str {
        match self {
            ReferralOutcome::Registered { .. } => "success",
            ReferralOutcome::AlreadyRegistered => "skipped",
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            ReferralOutcome::Registered { .. } => "Referral successful",
            ReferralOutcome::AlreadyRegistered => "User already registered",
        }
    }
}

/// Validate a referral request before it touches storage.
pub fn validate_referral(new_user_id: &str, referrer_id: &str) -> Result<(), ReferralError> {
    if new_user_id == referrer_id {
        return Err(ReferralError::SelfReferral);
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReferralError {
    SelfReferral,
}

impl std::fmt::Display for ReferralError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReferralError::SelfReferral => write!(f, "Self-referral is not allowed"),
        }
    }
}

impl std::error::Error for ReferralError {}
