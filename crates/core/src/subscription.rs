//! Watchlist subscriptions.

use crate::Symbol;
use serde::{Deserialize, Serialize};

/// Telegram chat id of a registered user.
pub type UserId = i64;

/// Shortest polling interval a user may configure, in seconds.
pub const MIN_INTERVAL_SECS: u64 = 40;

/// Interval given to newly registered users, in seconds.
pub const DEFAULT_INTERVAL_SECS: u64 = MIN_INTERVAL_SECS;

/// A user with at least one watched symbol and their polling interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Subscription {
    pub user_id: UserId,
    pub interval_secs: u64,
}

impl Subscription {
    pub fn new(user_id: UserId, interval_secs: u64) -> Self {
        Self {
            user_id,
            interval_secs,
        }
    }
}

/// A user's interest in price-change notifications for one symbol.
///
/// Also the key of the scheduler's last-price memory.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WatchEntry {
    pub user_id: UserId,
    pub symbol: Symbol,
}

impl WatchEntry {
    pub fn new(user_id: UserId, symbol: Symbol) -> Self {
        Self { user_id, symbol }
    }
}
