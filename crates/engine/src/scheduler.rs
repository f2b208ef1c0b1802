//! The price watch scheduler: a perpetual tick loop over due subscribers.

use crate::change::{detect, PriceChange};
use crate::config::SchedulerConfig;
use crate::due::select_due;
use crate::error::{FetchFailure, SchedulerError};
use crate::message::format_price_changes;
use crate::ports::{Notifier, PriceGateway, SubscriptionSource};
use crate::state::WatchState;
use chrono::{DateTime, Duration, Utc};
use coinwatch_core::{Subscription, UserId};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Longest delay the scheduler will ever schedule, in seconds (one year).
const MAX_DELAY_SECS: u64 = 365 * 24 * 60 * 60;

fn delay(secs: u64) -> Duration {
    Duration::seconds(secs.min(MAX_DELAY_SECS) as i64)
}

/// Result of checking one due user.
#[derive(Debug)]
pub enum UserOutcome {
    /// At least one change detected and the message was delivered.
    Notified { user_id: UserId, changes: usize },
    /// Changes detected but delivery failed. Price memory was still updated.
    DeliveryFailed {
        user_id: UserId,
        changes: usize,
        error: SchedulerError,
    },
    /// Prices fetched, nothing moved enough to report.
    Quiet { user_id: UserId },
    /// The user no longer watches anything.
    NoWatches { user_id: UserId },
    /// Symbols or prices could not be loaded. The user was backed off.
    FetchFailed {
        user_id: UserId,
        error: SchedulerError,
    },
}

impl UserOutcome {
    pub fn user_id(&self) -> UserId {
        match self {
            UserOutcome::Notified { user_id, .. }
            | UserOutcome::DeliveryFailed { user_id, .. }
            | UserOutcome::Quiet { user_id }
            | UserOutcome::NoWatches { user_id }
            | UserOutcome::FetchFailed { user_id, .. } => *user_id,
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            UserOutcome::DeliveryFailed { .. } | UserOutcome::FetchFailed { .. }
        )
    }
}

/// Everything that happened during one tick.
#[derive(Debug, Default)]
pub struct TickReport {
    /// Users with at least one watch at the start of the tick.
    pub subscribers: usize,
    /// One entry per due user, in processing order.
    pub outcomes: Vec<UserOutcome>,
}

impl TickReport {
    pub fn due(&self) -> usize {
        self.outcomes.len()
    }

    pub fn notified(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, UserOutcome::Notified { .. }))
            .count()
    }

    pub fn failures(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_failure()).count()
    }

    pub fn outcome_for(&self, user_id: UserId) -> Option<&UserOutcome> {
        self.outcomes.iter().find(|o| o.user_id() == user_id)
    }
}

/// Background scheduler that polls prices for subscribers and notifies them
/// when a watched price moves.
pub struct PriceWatchScheduler {
    config: SchedulerConfig,
    store: Arc<dyn SubscriptionSource>,
    gateway: Arc<dyn PriceGateway>,
    notifier: Arc<dyn Notifier>,
    state: WatchState,
}

impl PriceWatchScheduler {
    pub fn new(
        config: SchedulerConfig,
        store: Arc<dyn SubscriptionSource>,
        gateway: Arc<dyn PriceGateway>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            config,
            store,
            gateway,
            notifier,
            state: WatchState::new(),
        }
    }

    pub fn state(&self) -> &WatchState {
        &self.state
    }

    /// Run one tick at `now`.
    ///
    /// Per-user failures are recorded in the report. `Err` is returned only
    /// when the subscriber list itself could not be loaded.
    pub async fn tick(&mut self, now: DateTime<Utc>) -> Result<TickReport, SchedulerError> {
        let subscribers = self
            .store
            .list_users_with_watches()
            .await
            .map_err(SchedulerError::Store)?;

        let mut report = TickReport {
            subscribers: subscribers.len(),
            outcomes: Vec::new(),
        };
        if subscribers.is_empty() {
            return Ok(report);
        }

        let due = select_due(now, &subscribers, self.state.next_due());
        debug!(
            subscribers = subscribers.len(),
            due = due.len(),
            "Checking due subscribers"
        );

        for sub in due {
            let outcome = self.check_user(sub, now).await;
            report.outcomes.push(outcome);
        }

        Ok(report)
    }

    async fn check_user(&mut self, sub: Subscription, now: DateTime<Utc>) -> UserOutcome {
        let user_id = sub.user_id;
        let interval_secs = self.config.effective_interval_secs(sub.interval_secs);

        let symbols = match self.store.list_watched_symbols(user_id).await {
            Ok(symbols) => symbols,
            Err(e) => return self.back_off(user_id, now, FetchFailure::Store(e)),
        };

        if symbols.is_empty() {
            self.state.reschedule(user_id, now, delay(interval_secs));
            return UserOutcome::NoWatches { user_id };
        }

        let prices = match self.gateway.fetch_prices(&symbols).await {
            Ok(prices) if prices.len() == symbols.len() => prices,
            Ok(prices) => {
                let reason = FetchFailure::Misaligned {
                    expected: symbols.len(),
                    got: prices.len(),
                };
                return self.back_off(user_id, now, reason);
            }
            Err(e) => return self.back_off(user_id, now, FetchFailure::Gateway(e)),
        };

        let threshold = self.config.change_threshold_pct;
        let mut changes = Vec::new();
        for (symbol, snapshot) in symbols.into_iter().zip(prices) {
            let Some(snapshot) = snapshot else {
                debug!(user_id, symbol = %symbol, "Price unavailable, skipping");
                continue;
            };

            let price = snapshot.reference_price();
            let previous = self.state.last_price(user_id, &symbol);
            if let Some(change) = detect(previous, price, threshold) {
                changes.push(PriceChange { snapshot, change });
            }
            self.state.record_price(user_id, symbol, price);
        }

        self.state.reschedule(user_id, now, delay(interval_secs));

        if changes.is_empty() {
            debug!(user_id, "No price changes");
            return UserOutcome::Quiet { user_id };
        }

        let message = format_price_changes(&changes, interval_secs);
        match self.notifier.notify(user_id, &message).await {
            Ok(()) => {
                info!(user_id, changes = changes.len(), "Sent price changes");
                UserOutcome::Notified {
                    user_id,
                    changes: changes.len(),
                }
            }
            Err(source) => {
                let error = SchedulerError::Delivery { user_id, source };
                warn!(user_id, error = %error, "Notification not delivered");
                UserOutcome::DeliveryFailed {
                    user_id,
                    changes: changes.len(),
                    error,
                }
            }
        }
    }

    fn back_off(
        &mut self,
        user_id: UserId,
        now: DateTime<Utc>,
        reason: FetchFailure,
    ) -> UserOutcome {
        let backoff_secs = self.config.failure_backoff_secs;
        let error = SchedulerError::Fetch { user_id, reason };
        warn!(user_id, backoff_secs, error = %error, "Price check failed, backing off");
        self.state.reschedule(user_id, now, delay(backoff_secs));
        UserOutcome::FetchFailed { user_id, error }
    }

    /// Tick forever. A failed tick is logged and the loop carries on.
    pub async fn run(mut self) {
        info!(
            tick_secs = self.config.tick_period_secs,
            threshold_pct = self.config.change_threshold_pct,
            "Price watch scheduler started"
        );

        loop {
            match self.tick(Utc::now()).await {
                Ok(report) if report.due() > 0 => {
                    info!(
                        subscribers = report.subscribers,
                        due = report.due(),
                        notified = report.notified(),
                        failures = report.failures(),
                        tracked = self.state.tracked_prices(),
                        "Tick complete"
                    );
                }
                Ok(_) => {}
                Err(e) => {
                    error!(error = %e, "Scheduler tick failed");
                }
            }

            tokio::time::sleep(self.config.tick_period()).await;
        }
    }
}
