// Application layer - the two components the HTTP gateway and CLI drive.
// BalanceStore owns the repository handle; ReferralLedger builds on it.

pub mod balances;
pub mod error;
pub mod referrals;

pub use balances::*;
pub use error::*;
pub use referrals::*;
