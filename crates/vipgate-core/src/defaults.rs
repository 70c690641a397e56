//! Default configuration values.
//!
//! Centralized default constants for use across all crates.

// ============================================================================
// Plan Table Defaults
// ============================================================================

/// Weekly plan duration in days.
pub const DEFAULT_WEEKLY_DAYS: u32 = 7;
/// Weekly plan referral commission (USD).
pub const DEFAULT_WEEKLY_COMMISSION: u32 = 5;
/// Weekly plan price (USD).
pub const DEFAULT_WEEKLY_PRICE: u32 = 30;
/// Bi-weekly plan duration in days.
pub const DEFAULT_BIWEEKLY_DAYS: u32 = 14;
/// Bi-weekly plan referral commission (USD).
pub const DEFAULT_BIWEEKLY_COMMISSION: u32 = 3;
/// Bi-weekly plan price (USD).
pub const DEFAULT_BIWEEKLY_PRICE: u32 = 30;
/// Monthly plan duration in days.
pub const DEFAULT_MONTHLY_DAYS: u32 = 30;
/// Monthly plan referral commission (USD).
pub const DEFAULT_MONTHLY_COMMISSION: u32 = 5;
/// Monthly plan price (USD).
pub const DEFAULT_MONTHLY_PRICE: u32 = 50;

// ============================================================================
// Rate Limit Defaults
// ============================================================================

/// Default max inbound events per identity within one window.
pub const DEFAULT_RATE_LIMIT_MAX_REQUESTS: u32 = 30;
/// Default rate limit window in seconds.
pub const DEFAULT_RATE_LIMIT_WINDOW_SECS: u64 = 60;
/// Default rate limit cleanup interval in seconds.
pub const DEFAULT_RATE_LIMIT_CLEANUP_SECS: u64 = 300;

// ============================================================================
// Pending Proof Defaults
// ============================================================================

/// Pending proofs older than this are treated as abandoned.
pub const DEFAULT_PENDING_TTL_SECS: u64 = 86_400;
/// Forwarded proofs left without a decision are dropped after a week.
pub const DEFAULT_REVIEW_TTL_SECS: u64 = 7 * 86_400;
/// Interval between purges of abandoned selections and reviews.
pub const DEFAULT_PENDING_PURGE_SECS: u64 = 900;

// ============================================================================
// Sweep Defaults
// ============================================================================

/// Default expiry sweep interval in seconds (daily).
pub const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 86_400;
/// Remaining time at or below which an active user gets a reminder.
pub const DEFAULT_REMINDER_WINDOW_SECS: u64 = 2 * 86_400;

// ============================================================================
// Feed Defaults
// ============================================================================

/// Default quote feed endpoint.
pub const DEFAULT_FEED_URL: &str = "https://www.alphavantage.co/query";
/// Default base symbol.
pub const DEFAULT_FEED_FROM_SYMBOL: &str = "XAU";
/// Default quote symbol.
pub const DEFAULT_FEED_TO_SYMBOL: &str = "USD";
/// Default intraday interval requested from the feed.
pub const DEFAULT_FEED_SERIES_INTERVAL: &str = "5min";
/// Default poll interval in seconds.
pub const DEFAULT_FEED_INTERVAL_SECS: u64 = 300;
/// Default fetch attempts per cycle.
pub const DEFAULT_FEED_MAX_RETRIES: u32 = 3;
/// Default backoff base delay in seconds.
pub const DEFAULT_FEED_BASE_DELAY_SECS: u64 = 5;
/// Default per-request timeout in seconds.
pub const DEFAULT_FEED_REQUEST_TIMEOUT_SECS: u64 = 10;

// ============================================================================
// Store Defaults
// ============================================================================

/// Default database URL.
pub const DEFAULT_DATABASE_URL: &str = "sqlite:vipgate.db?mode=rwc";
/// Default max pooled database connections.
pub const DEFAULT_STORE_MAX_CONNECTIONS: u32 = 5;
/// Default pool acquire timeout in seconds.
pub const DEFAULT_STORE_ACQUIRE_TIMEOUT_SECS: u64 = 60;
/// Default referral code prefix.
pub const DEFAULT_REFERRAL_PREFIX: &str = "GS";

// ============================================================================
// Transport Defaults
// ============================================================================

/// Default bot API base URL.
pub const DEFAULT_BOT_API_BASE: &str = "https://api.telegram.org";
/// Default long-poll timeout in seconds for update fetching.
pub const DEFAULT_POLL_TIMEOUT_SECS: u64 = 30;
/// Default delay before retrying a failed update fetch, in milliseconds.
pub const DEFAULT_POLL_RETRY_DELAY_MS: u64 = 3_000;

// ============================================================================
// Health Defaults
// ============================================================================

/// Default health endpoint listen address.
pub const DEFAULT_HEALTH_LISTEN: &str = "0.0.0.0:5000";
/// Default graceful shutdown timeout in seconds.
pub const DEFAULT_SHUTDOWN_TIMEOUT_SECS: u64 = 30;
