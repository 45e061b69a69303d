/// Points are whole units. Negative balances are representable and accepted.
pub type Points = i64;

/// Users are keyed by the string form of their Telegram id.
pub type UserId = String;

/// Apply a delta to a balance, returning `None` if the result would overflow.
pub fn apply_delta(current: Points, delta: Points) -> Option<Points> {
    current.checked_add(delta)
}
