//! Scheduler configuration.

use coinwatch_core::MIN_INTERVAL_SECS;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for the price watch scheduler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Sleep between ticks (seconds).
    pub tick_period_secs: u64,
    /// Delay before retrying a user whose check failed (seconds).
    pub failure_backoff_secs: u64,
    /// Minimum absolute move, in percent, that triggers a notification.
    pub change_threshold_pct: f64,
    /// Floor applied to every user's interval (seconds).
    pub min_interval_secs: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            tick_period_secs: 20,
            failure_backoff_secs: 300,
            change_threshold_pct: 0.01,
            min_interval_secs: MIN_INTERVAL_SECS,
        }
    }
}

impl SchedulerConfig {
    #[inline]
    pub fn tick_period(&self) -> Duration {
        Duration::from_secs(self.tick_period_secs)
    }

    /// Effective interval for a stored value, clamped to the minimum.
    #[inline]
    pub fn effective_interval_secs(&self, interval_secs: u64) -> u64 {
        interval_secs.max(self.min_interval_secs)
    }
}
