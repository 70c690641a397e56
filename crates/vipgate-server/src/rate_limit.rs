//! Per-user rate limiting for inbound events.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use tokio::sync::Notify;
use tokio::time::Instant;
use tracing::debug;
use vipgate_core::UserId;

/// Fixed-window admission control keyed by sender identity.
///
/// Every call counts toward the window, including rejected ones, so a client
/// hammering the bot stays blocked until the window rolls over.
pub struct RateLimiter {
    /// Map of user -> (event count, window start time)
    entries: Arc<RwLock<HashMap<UserId, RateLimitEntry>>>,
    /// Maximum events allowed per user in the window (0 disables limiting)
    max_requests: u32,
    /// Time window for rate limiting
    window: Duration,
    /// Notify for shutdown
    shutdown: Arc<Notify>,
}

#[derive(Clone, Copy)]
struct RateLimitEntry {
    count: u32,
    window_start: Instant,
}

impl RateLimiter {
    /// Create a new rate limiter.
    pub fn new(max_requests: u32, window_secs: u64) -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
            max_requests,
            window: Duration::from_secs(window_secs),
            shutdown: Arc::new(Notify::new()),
        }
    }

    /// Start the background cleanup task.
    pub fn start_cleanup_task(&self, cleanup_interval: Duration) {
        let entries = self.entries.clone();
        let window = self.window;
        let shutdown = self.shutdown.clone();

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = shutdown.notified() => {
                        debug!("rate limiter cleanup task shutting down");
                        break;
                    }
                    _ = tokio::time::sleep(cleanup_interval) => {
                        let now = Instant::now();
                        let mut map = entries.write();
                        let before = map.len();
                        map.retain(|_, entry| {
                            now.duration_since(entry.window_start) < window
                        });
                        let removed = before - map.len();
                        if removed > 0 {
                            debug!(removed, remaining = map.len(), "rate limit entries cleaned up");
                        }
                    }
                }
            }
        });
    }

    /// Check whether an event from `user` is admitted now.
    #[inline]
    pub fn admit(&self, user: UserId) -> bool {
        self.admit_at(user, Instant::now())
    }

    /// Check whether an event from `user` is admitted at `now`.
    pub fn admit_at(&self, user: UserId, now: Instant) -> bool {
        if self.max_requests == 0 {
            return true;
        }

        let mut map = self.entries.write();
        let entry = map.entry(user).or_insert(RateLimitEntry {
            count: 0,
            window_start: now,
        });

        if now.saturating_duration_since(entry.window_start) >= self.window {
            entry.count = 0;
            entry.window_start = now;
        }
        entry.count = entry.count.saturating_add(1);
        entry.count <= self.max_requests
    }

    /// Events counted for `user` in the current window.
    pub fn count(&self, user: UserId) -> u32 {
        self.entries.read().get(&user).map_or(0, |e| e.count)
    }

    /// Number of tracked users.
    pub fn tracked(&self) -> usize {
        self.entries.read().len()
    }

    /// Signal shutdown to cleanup task.
    pub fn shutdown(&self) {
        self.shutdown.notify_waiters();
    }
}

impl Drop for RateLimiter {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_limit_allows_under_limit() {
        let limiter = RateLimiter::new(30, 60);
        let start = Instant::now();

        for _ in 0..30 {
            assert!(limiter.admit_at(1, start));
        }
        // 31st within the window is rejected
        assert!(!limiter.admit_at(1, start + Duration::from_secs(59)));
        assert_eq!(limiter.count(1), 31);
    }

    #[test]
    fn test_rate_limit_window_reset() {
        let limiter = RateLimiter::new(30, 60);
        let start = Instant::now();

        for _ in 0..31 {
            limiter.admit_at(1, start);
        }
        assert!(limiter.admit_at(1, start + Duration::from_secs(60)));
        assert_eq!(limiter.count(1), 1);
    }

    #[test]
    fn test_rejected_calls_keep_counting() {
        let limiter = RateLimiter::new(2, 60);
        let start = Instant::now();

        assert!(limiter.admit_at(1, start));
        assert!(limiter.admit_at(1, start));
        assert!(!limiter.admit_at(1, start));
        assert!(!limiter.admit_at(1, start));
        assert_eq!(limiter.count(1), 4);
    }

    #[test]
    fn test_rate_limit_different_users() {
        let limiter = RateLimiter::new(2, 60);
        let start = Instant::now();

        assert!(limiter.admit_at(1, start));
        assert!(limiter.admit_at(1, start));
        assert!(!limiter.admit_at(1, start));

        assert!(limiter.admit_at(2, start));
        assert!(limiter.admit_at(2, start));
        assert!(!limiter.admit_at(2, start));
        assert_eq!(limiter.tracked(), 2);
    }

    #[test]
    fn test_disabled_limiter() {
        let limiter = RateLimiter::new(0, 60);
        for _ in 0..1_000 {
            assert!(limiter.admit(7));
        }
        assert_eq!(limiter.tracked(), 0);
    }

    #[test]
    fn test_concurrent_admission_counts_every_call() {
        let limiter = Arc::new(RateLimiter::new(100, 60));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let limiter = limiter.clone();
                std::thread::spawn(move || (0..50).filter(|_| limiter.admit(9)).count())
            })
            .collect();
        let admitted: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
        assert_eq!(admitted, 100);
        assert_eq!(limiter.count(9), 400);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cleanup_task_drops_stale_entries() {
        let limiter = RateLimiter::new(5, 60);
        limiter.start_cleanup_task(Duration::from_secs(120));
        assert!(limiter.admit(1));
        assert_eq!(limiter.tracked(), 1);

        tokio::time::sleep(Duration::from_secs(121)).await;
        tokio::task::yield_now().await;
        assert_eq!(limiter.tracked(), 0);
        limiter.shutdown();
    }
}
