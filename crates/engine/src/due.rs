//! Due-user selection.

use chrono::{DateTime, Utc};
use coinwatch_core::{Subscription, UserId};
use std::collections::HashMap;

/// Subscribers whose next check time has arrived.
///
/// Users with no recorded due time are due immediately, so a new subscriber
/// gets a first check on the next tick. Read-only: the caller reschedules.
pub fn select_due(
    now: DateTime<Utc>,
    subscribers: &[Subscription],
    next_due: &HashMap<UserId, DateTime<Utc>>,
) -> Vec<Subscription> {
    subscribers
        .iter()
        .filter(|sub| {
            next_due
                .get(&sub.user_id)
                .map_or(true, |due_at| now >= *due_at)
        })
        .copied()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use pretty_assertions::assert_eq;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_unknown_users_are_due() {
        let subs = vec![Subscription::new(1, 40), Subscription::new(2, 60)];
        let due = select_due(t0(), &subs, &HashMap::new());
        assert_eq!(due, subs);
    }

    #[test]
    fn test_due_boundary_is_inclusive() {
        let subs = vec![Subscription::new(1, 40)];
        let mut next_due = HashMap::new();
        next_due.insert(1, t0() + Duration::seconds(40));

        assert!(select_due(t0() + Duration::seconds(39), &subs, &next_due).is_empty());
        assert_eq!(
            select_due(t0() + Duration::seconds(40), &subs, &next_due),
            subs
        );
    }

    #[test]
    fn test_selection_is_idempotent() {
        let subs = vec![
            Subscription::new(1, 40),
            Subscription::new(2, 40),
            Subscription::new(3, 40),
        ];
        let mut next_due = HashMap::new();
        next_due.insert(1, t0() - Duration::seconds(1));
        next_due.insert(2, t0() + Duration::seconds(30));

        let first = select_due(t0(), &subs, &next_due);
        let second = select_due(t0(), &subs, &next_due);

        assert_eq!(first, second);
        assert_eq!(
            first.iter().map(|s| s.user_id).collect::<Vec<_>>(),
            vec![1, 3]
        );
    }
}
