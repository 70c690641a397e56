//! Payment proofs awaiting an operator decision.

use std::collections::HashMap;
use std::time::Duration;

use parking_lot::Mutex;
use vipgate_core::defaults::DEFAULT_REVIEW_TTL_SECS;
use vipgate_core::{Plan, UserId};

/// A forwarded proof.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReviewEntry {
    pub plan: Plan,
    /// Unix timestamp of submission.
    pub submitted_at: i64,
}

/// Users in `PENDING_APPROVAL`, keyed by user id.
///
/// Approval does not require an entry here; an entry only records that a
/// proof reached the operators. Entries older than the TTL are removed by
/// [`ReviewQueue::purge_expired`].
#[derive(Debug)]
pub struct ReviewQueue {
    entries: Mutex<HashMap<UserId, ReviewEntry>>,
    ttl: i64,
}

impl Default for ReviewQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl ReviewQueue {
    pub fn new() -> Self {
        Self::with_ttl(Duration::from_secs(DEFAULT_REVIEW_TTL_SECS))
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl: i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX),
        }
    }

    /// Record a submitted proof, replacing an older one for the same user.
    pub fn submit(&self, user: UserId, plan: Plan, now: i64) {
        self.entries.lock().insert(
            user,
            ReviewEntry {
                plan,
                submitted_at: now,
            },
        );
    }

    /// Close the review for a user.
    pub fn resolve(&self, user: UserId) -> Option<ReviewEntry> {
        self.entries.lock().remove(&user)
    }

    pub fn get(&self, user: UserId) -> Option<ReviewEntry> {
        self.entries.lock().get(&user).copied()
    }

    /// Open reviews, oldest first.
    pub fn list(&self) -> Vec<(UserId, ReviewEntry)> {
        let mut items: Vec<_> = self.entries.lock().iter().map(|(u, e)| (*u, *e)).collect();
        items.sort_by_key(|(u, e)| (e.submitted_at, *u));
        items
    }

    /// Drop reviews submitted at least one TTL before `now` and return how
    /// many were dropped.
    pub fn purge_expired(&self, now: i64) -> usize {
        let mut map = self.entries.lock();
        let before = map.len();
        map.retain(|_, e| now.saturating_sub(e.submitted_at) < self.ttl);
        before - map.len()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn submit_and_resolve() {
        let queue = ReviewQueue::new();
        queue.submit(1, Plan::Monthly, 100);
        queue.submit(2, Plan::Weekly, 50);

        let order: Vec<_> = queue.list().iter().map(|(u, _)| *u).collect();
        assert_eq!(order, vec![2, 1]);
        assert_eq!(
            queue.resolve(1),
            Some(ReviewEntry {
                plan: Plan::Monthly,
                submitted_at: 100
            })
        );
        assert_eq!(queue.resolve(1), None);
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn purge_drops_stale_reviews() {
        let queue = ReviewQueue::with_ttl(Duration::from_secs(100));
        queue.submit(1, Plan::Weekly, 1_000);
        queue.submit(2, Plan::Monthly, 1_050);

        assert_eq!(queue.purge_expired(1_099), 0);
        assert_eq!(queue.purge_expired(1_100), 1);
        assert_eq!(queue.get(1), None);
        assert!(queue.get(2).is_some());
    }
}
