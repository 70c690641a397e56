//! Daily expiry sweep.
//!
//! Revokes lapsed subscriptions, then notifies expired users to renew and
//! near-expiry users that their access ends soon.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use vipgate_store::{StoreError, SweepOutcome, UserStore};
use vipgate_transport::{Outbound, Transport};

use crate::messages;
use crate::service::Clock;

/// Runs sweep cycles against a store.
pub struct Sweeper {
    store: Arc<dyn UserStore>,
    transport: Arc<dyn Transport>,
    reminder_window: i64,
    clock: Clock,
}

impl Sweeper {
    pub fn new(
        store: Arc<dyn UserStore>,
        transport: Arc<dyn Transport>,
        reminder_window: Duration,
    ) -> Self {
        Self {
            store,
            transport,
            reminder_window: i64::try_from(reminder_window.as_secs()).unwrap_or(i64::MAX),
            clock: Arc::new(vipgate_core::unix_now),
        }
    }

    /// Builder: replace the wall clock.
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// Run one cycle at the current clock time.
    pub async fn run_once(&self) -> Result<SweepOutcome, StoreError> {
        self.sweep_at((self.clock)()).await
    }

    /// Run one cycle as of `now`.
    ///
    /// Store failures abort the cycle; notification failures are logged and
    /// the remaining users are still notified.
    pub async fn sweep_at(&self, now: i64) -> Result<SweepOutcome, StoreError> {
        let outcome = self
            .store
            .sweep_expirations(now, self.reminder_window)
            .await?;

        for &user in &outcome.expired {
            self.notify(user, messages::RENEW_NOTICE).await;
        }
        for &user in &outcome.reminders {
            self.notify(user, messages::REMINDER_NOTICE).await;
        }

        vipgate_metrics::record_sweep(outcome.expired.len(), outcome.reminders.len());
        if outcome.is_empty() {
            debug!("sweep found nothing to do");
        } else {
            info!(
                expired = outcome.expired.len(),
                reminders = outcome.reminders.len(),
                "sweep completed"
            );
        }
        Ok(outcome)
    }

    async fn notify(&self, user: vipgate_core::UserId, text: &str) {
        if let Err(e) = self.transport.send(Outbound::text(user, text)).await {
            vipgate_metrics::record_error(vipgate_core::ERROR_TRANSPORT);
            warn!(user_id = user, error = %e, "sweep notification failed");
        }
    }
}

/// Run the sweep loop until shutdown.
///
/// The first cycle runs immediately. A failed cycle is logged and the loop
/// waits for the next tick; an in-flight cycle always completes before the
/// shutdown token is observed.
pub async fn run_sweeper(sweeper: Arc<Sweeper>, interval: Duration, shutdown: CancellationToken) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            biased;

            _ = shutdown.cancelled() => {
                debug!("sweep task shutting down");
                return;
            }

            _ = ticker.tick() => {
                if let Err(e) = sweeper.run_once().await {
                    vipgate_metrics::record_sweep_failure();
                    error!(error = %e, "sweep cycle failed");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use vipgate_core::{Plan, PlanTerms, SECS_PER_DAY, UserId};
    use vipgate_store::{Approval, MemoryStore, UserRecord};
    use vipgate_transport::RecordingTransport;

    use super::*;

    const NOW: i64 = 1_700_000_000;

    async fn approve_ending_at(store: &MemoryStore, user: UserId, end: i64) {
        let terms = PlanTerms {
            duration_days: 1,
            commission: 0,
            price: 0,
        };
        store.upsert_user(user, None, 0).await.unwrap();
        // Approval at `end - 1 day` leaves exactly `end` as the end date.
        store
            .approve_subscription(user, Plan::Weekly, &terms, end - SECS_PER_DAY)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn notifies_expired_and_near_expiry_users() {
        let store = Arc::new(MemoryStore::new());
        approve_ending_at(&store, 1, NOW - 1).await;
        approve_ending_at(&store, 2, NOW + SECS_PER_DAY).await;
        approve_ending_at(&store, 3, NOW + 10 * SECS_PER_DAY).await;

        let transport = Arc::new(RecordingTransport::new());
        let sweeper = Sweeper::new(
            store.clone(),
            transport.clone(),
            Duration::from_secs(2 * SECS_PER_DAY as u64),
        );

        let outcome = sweeper.sweep_at(NOW).await.unwrap();
        assert_eq!(outcome.expired, vec![1]);
        assert_eq!(outcome.reminders, vec![2]);

        assert_eq!(transport.messages_to(1)[0].text, messages::RENEW_NOTICE);
        assert_eq!(transport.messages_to(2)[0].text, messages::REMINDER_NOTICE);
        assert!(transport.messages_to(3).is_empty());
        assert!(!store.get_user(1).await.unwrap().vip_status);

        // Expired users are not notified twice; reminders repeat.
        transport.clear();
        let outcome = sweeper.sweep_at(NOW).await.unwrap();
        assert!(outcome.expired.is_empty());
        assert_eq!(outcome.reminders, vec![2]);
    }

    #[tokio::test]
    async fn notification_failure_does_not_abort_cycle() {
        let store = Arc::new(MemoryStore::new());
        approve_ending_at(&store, 1, NOW - 1).await;
        let transport = Arc::new(RecordingTransport::new());
        transport.set_failing(true);

        let sweeper = Sweeper::new(store.clone(), transport, Duration::from_secs(0));
        let outcome = sweeper.sweep_at(NOW).await.unwrap();
        assert_eq!(outcome.expired, vec![1]);
        assert!(!store.get_user(1).await.unwrap().vip_status);
    }

    #[tokio::test]
    async fn huge_reminder_window_saturates() {
        let store = Arc::new(MemoryStore::new());
        approve_ending_at(&store, 1, NOW + 400 * SECS_PER_DAY).await;
        approve_ending_at(&store, 2, NOW - 1).await;

        let sweeper = Sweeper::new(
            store.clone(),
            Arc::new(RecordingTransport::new()),
            Duration::from_secs(u64::MAX),
        );
        let outcome = sweeper.sweep_at(NOW).await.unwrap();
        assert_eq!(outcome.expired, vec![2]);
        assert_eq!(outcome.reminders, vec![1]);
    }

    struct BrokenStore;

    #[async_trait]
    impl UserStore for BrokenStore {
        async fn upsert_user(
            &self,
            _: UserId,
            _: Option<&str>,
            _: i64,
        ) -> Result<String, StoreError> {
            Err(StoreError::unavailable("down"))
        }
        async fn get_user(&self, _: UserId) -> Result<UserRecord, StoreError> {
            Err(StoreError::unavailable("down"))
        }
        async fn find_by_referral_code(
            &self,
            _: &str,
        ) -> Result<Option<UserRecord>, StoreError> {
            Err(StoreError::unavailable("down"))
        }
        async fn approve_subscription(
            &self,
            _: UserId,
            _: Plan,
            _: &PlanTerms,
            _: i64,
        ) -> Result<Approval, StoreError> {
            Err(StoreError::unavailable("down"))
        }
        async fn sweep_expirations(&self, _: i64, _: i64) -> Result<SweepOutcome, StoreError> {
            Err(StoreError::unavailable("down"))
        }
        async fn list_users(&self) -> Result<Vec<UserRecord>, StoreError> {
            Err(StoreError::unavailable("down"))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn loop_survives_failed_cycles() {
        let transport = Arc::new(RecordingTransport::new());
        let sweeper = Arc::new(Sweeper::new(
            Arc::new(BrokenStore),
            transport,
            Duration::from_secs(0),
        ));
        let shutdown = CancellationToken::new();
        let handle = tokio::spawn(run_sweeper(
            sweeper,
            Duration::from_secs(3600),
            shutdown.clone(),
        ));

        tokio::time::sleep(Duration::from_secs(3 * 3600 + 1)).await;
        assert!(!handle.is_finished());

        shutdown.cancel();
        handle.await.unwrap();
    }
}
