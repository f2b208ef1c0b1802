//! Scheduler error types.

use coinwatch_core::UserId;
use coinwatch_feeds::FeedError;
use thiserror::Error;

/// Boxed error returned by store and notifier collaborators.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors observed by the scheduler.
///
/// `Store` on the subscriber listing is a loop failure: the tick is abandoned
/// and the loop carries on. The other variants are scoped to one user.
#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("Subscription store error: {0}")]
    Store(#[source] BoxError),

    #[error("Price fetch failed for user {user_id}: {reason}")]
    Fetch { user_id: UserId, reason: FetchFailure },

    #[error("Delivery to user {user_id} failed: {source}")]
    Delivery {
        user_id: UserId,
        #[source]
        source: BoxError,
    },
}

/// Why a user's batched price fetch was rejected.
#[derive(Debug, Error)]
pub enum FetchFailure {
    #[error("{0}")]
    Gateway(#[from] FeedError),

    #[error("could not list watched symbols: {0}")]
    Store(BoxError),

    #[error("gateway returned {got} results for {expected} symbols")]
    Misaligned { expected: usize, got: usize },
}
