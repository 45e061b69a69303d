mod balance;
mod referral;

pub use balance::*;
pub use referral::*;
