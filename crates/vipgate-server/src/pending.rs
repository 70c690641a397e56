//! Plan selections awaiting a payment proof.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use vipgate_core::{Plan, UserId};

use crate::review::ReviewQueue;

#[derive(Debug, Clone, Copy)]
struct PendingProof {
    plan: Plan,
    created_at: Instant,
}

/// Per-user record of the plan a user picked and has not yet paid for.
///
/// Entries older than the TTL read as absent and are removed by
/// [`PendingProofs::purge_expired`].
#[derive(Debug)]
pub struct PendingProofs {
    entries: Mutex<HashMap<UserId, PendingProof>>,
    ttl: Duration,
}

impl PendingProofs {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl,
        }
    }

    /// Record a selection. A newer selection replaces the previous one.
    pub fn insert(&self, user: UserId, plan: Plan) {
        self.entries.lock().insert(
            user,
            PendingProof {
                plan,
                created_at: Instant::now(),
            },
        );
    }

    /// Consume the selection. Returns `None` if absent or expired, so a
    /// duplicate proof submission is a no-op.
    pub fn take(&self, user: UserId) -> Option<Plan> {
        let entry = self.entries.lock().remove(&user)?;
        self.is_live(&entry, Instant::now()).then_some(entry.plan)
    }

    /// The selected plan, without consuming it.
    pub fn peek(&self, user: UserId) -> Option<Plan> {
        let now = Instant::now();
        self.entries
            .lock()
            .get(&user)
            .filter(|e| self.is_live(e, now))
            .map(|e| e.plan)
    }

    /// Drop the selection, if any.
    pub fn remove(&self, user: UserId) -> bool {
        self.entries.lock().remove(&user).is_some()
    }

    /// Remove expired selections and return how many were dropped.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut map = self.entries.lock();
        let before = map.len();
        map.retain(|_, e| now.saturating_duration_since(e.created_at) < self.ttl);
        before - map.len()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    #[inline]
    fn is_live(&self, entry: &PendingProof, now: Instant) -> bool {
        now.saturating_duration_since(entry.created_at) < self.ttl
    }
}

/// Periodically purge expired selections and stale reviews until shutdown.
pub async fn run_purge(
    pending: Arc<PendingProofs>,
    reviews: Arc<ReviewQueue>,
    interval: Duration,
    shutdown: CancellationToken,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            biased;

            _ = shutdown.cancelled() => {
                debug!("pending purge task shutting down");
                return;
            }

            _ = ticker.tick() => {
                let removed = pending.purge_expired();
                if removed > 0 {
                    debug!(removed, remaining = pending.len(), "expired plan selections purged");
                    vipgate_metrics::record_proofs_expired(removed);
                }
                vipgate_metrics::set_proofs_pending(pending.len());

                let stale = reviews.purge_expired(vipgate_core::unix_now());
                if stale > 0 {
                    info!(stale, remaining = reviews.len(), "unanswered reviews dropped");
                    vipgate_metrics::record_reviews_expired(stale);
                }
                vipgate_metrics::set_reviews_open(reviews.len());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TTL: Duration = Duration::from_secs(3600);

    #[tokio::test(start_paused = true)]
    async fn take_consumes_once() {
        let pending = PendingProofs::new(TTL);
        pending.insert(1, Plan::Weekly);
        assert_eq!(pending.peek(1), Some(Plan::Weekly));
        assert_eq!(pending.take(1), Some(Plan::Weekly));
        assert_eq!(pending.take(1), None);
        assert!(pending.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn reselection_replaces() {
        let pending = PendingProofs::new(TTL);
        pending.insert(1, Plan::Weekly);
        pending.insert(1, Plan::Monthly);
        assert_eq!(pending.len(), 1);
        assert_eq!(pending.take(1), Some(Plan::Monthly));
    }

    #[tokio::test(start_paused = true)]
    async fn expired_selection_reads_absent() {
        let pending = PendingProofs::new(TTL);
        pending.insert(1, Plan::Biweekly);
        tokio::time::advance(TTL).await;
        assert_eq!(pending.peek(1), None);
        assert_eq!(pending.take(1), None);
    }

    #[tokio::test(start_paused = true)]
    async fn purge_drops_only_expired() {
        let pending = PendingProofs::new(TTL);
        pending.insert(1, Plan::Weekly);
        tokio::time::advance(Duration::from_secs(1800)).await;
        pending.insert(2, Plan::Weekly);
        tokio::time::advance(Duration::from_secs(1800)).await;

        assert_eq!(pending.purge_expired(), 1);
        assert_eq!(pending.peek(2), Some(Plan::Weekly));
    }

    #[tokio::test(start_paused = true)]
    async fn purge_task_stops_on_shutdown() {
        let pending = Arc::new(PendingProofs::new(Duration::from_secs(10)));
        pending.insert(1, Plan::Weekly);
        let reviews = Arc::new(ReviewQueue::with_ttl(Duration::from_secs(3600)));
        let now = vipgate_core::unix_now();
        reviews.submit(2, Plan::Monthly, now - 7200);
        reviews.submit(3, Plan::Weekly, now);
        let shutdown = CancellationToken::new();
        let task = tokio::spawn(run_purge(
            pending.clone(),
            reviews.clone(),
            Duration::from_secs(5),
            shutdown.clone(),
        ));

        tokio::time::sleep(Duration::from_secs(16)).await;
        assert!(pending.is_empty());
        assert!(reviews.get(2).is_none());
        assert!(reviews.get(3).is_some());

        shutdown.cancel();
        task.await.unwrap();
    }
}
