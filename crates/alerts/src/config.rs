//! User profile types stored in the database.

use chrono::NaiveDate;
use coinwatch_core::UserId;
use serde::{Deserialize, Serialize};

/// Registered bot user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    /// Telegram chat id
    pub id: UserId,
    pub username: Option<String>,
    pub full_name: String,
    /// Premium users may change their polling interval and have no lookup cap
    pub is_premium: bool,
    /// Polling interval for watchlist notifications (seconds)
    pub interval_secs: u64,
    /// Lifetime on-demand price lookups
    pub view_count: u64,
    /// Lookups on `last_view_date`
    pub daily_views: u32,
    pub last_view_date: Option<NaiveDate>,
}

impl UserProfile {
    /// Lookups already used on `today`.
    pub fn views_on(&self, today: NaiveDate) -> u32 {
        if self.last_view_date == Some(today) {
            self.daily_views
        } else {
            0
        }
    }

    /// Quota state on `today` before any further lookup is counted.
    pub fn lookup_quota(&self, today: NaiveDate, free_daily_limit: u32) -> LookupQuota {
        if self.is_premium {
            return LookupQuota::Allowed { remaining: None };
        }
        let used = self.views_on(today);
        if used >= free_daily_limit {
            LookupQuota::Exhausted {
                limit: free_daily_limit,
            }
        } else {
            LookupQuota::Allowed {
                remaining: Some(free_daily_limit - used),
            }
        }
    }
}

/// Daily on-demand lookup allowance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupQuota {
    /// Lookups left today. `None` for unlimited (premium) users.
    Allowed { remaining: Option<u32> },
    /// Daily free limit reached; nothing was counted.
    Exhausted { limit: u32 },
}

impl LookupQuota {
    pub fn is_allowed(&self) -> bool {
        matches!(self, LookupQuota::Allowed { .. })
    }
}
