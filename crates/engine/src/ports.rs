//! Collaborator interfaces consumed by the scheduler.

use crate::error::BoxError;
use async_trait::async_trait;
use coinwatch_core::{Subscription, Symbol, UserId};

pub use coinwatch_feeds::PriceGateway;

/// Read-only view of the subscription store.
#[async_trait]
pub trait SubscriptionSource: Send + Sync {
    /// Every user with at least one watched symbol, with their interval.
    async fn list_users_with_watches(&self) -> Result<Vec<Subscription>, BoxError>;

    /// Symbols watched by `user_id`.
    async fn list_watched_symbols(&self, user_id: UserId) -> Result<Vec<Symbol>, BoxError>;
}

/// Delivers a formatted message to a user.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, user_id: UserId, message: &str) -> Result<(), BoxError>;
}
