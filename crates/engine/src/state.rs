//! Scheduler-private memory: last seen prices and next due times.
//!
//! Neither map is persisted. After a restart every (user, symbol) pair is
//! unseen again and every user is immediately due.

use chrono::{DateTime, Duration, Utc};
use coinwatch_core::{Symbol, UserId, WatchEntry};
use std::collections::HashMap;

/// In-memory state owned by the scheduler.
#[derive(Debug, Default, Clone)]
pub struct WatchState {
    last_prices: HashMap<WatchEntry, f64>,
    next_due: HashMap<UserId, DateTime<Utc>>,
}

impl WatchState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Last reference price reported to `user_id` for `symbol`.
    pub fn last_price(&self, user_id: UserId, symbol: &Symbol) -> Option<f64> {
        self.last_prices
            .get(&WatchEntry::new(user_id, symbol.clone()))
            .copied()
    }

    /// Overwrite the last reference price. Called on every successful fetch.
    pub fn record_price(&mut self, user_id: UserId, symbol: Symbol, price: f64) {
        self.last_prices
            .insert(WatchEntry::new(user_id, symbol), price);
    }

    pub fn next_due(&self) -> &HashMap<UserId, DateTime<Utc>> {
        &self.next_due
    }

    pub fn next_due_for(&self, user_id: UserId) -> Option<DateTime<Utc>> {
        self.next_due.get(&user_id).copied()
    }

    /// Schedule the next check for `user_id` at `now + delay`.
    pub fn reschedule(&mut self, user_id: UserId, now: DateTime<Utc>, delay: Duration) {
        self.next_due.insert(user_id, now + delay);
    }

    /// Number of tracked (user, symbol) prices.
    pub fn tracked_prices(&self) -> usize {
        self.last_prices.len()
    }
}
