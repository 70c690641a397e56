//! Default value functions for serde deserialization.
//!
//! These functions forward to constants defined in `vipgate_core::defaults`.

use vipgate_core::defaults;

/// Generate default value functions that forward to vipgate_core::defaults constants.
macro_rules! default_fns {
    ($($fn_name:ident => $const_name:ident : $ty:ty),* $(,)?) => {
        $(
            pub(crate) fn $fn_name() -> $ty {
                defaults::$const_name
            }
        )*
    };
}

/// Generate default value functions that return String from &str constants.
macro_rules! default_string_fns {
    ($($fn_name:ident => $const_name:ident),* $(,)?) => {
        $(
            pub(crate) fn $fn_name() -> String {
                defaults::$const_name.to_string()
            }
        )*
    };
}

default_fns! {
    default_poll_timeout_secs         => DEFAULT_POLL_TIMEOUT_SECS: u64,
    default_poll_retry_delay_ms       => DEFAULT_POLL_RETRY_DELAY_MS: u64,
    default_store_max_connections     => DEFAULT_STORE_MAX_CONNECTIONS: u32,
    default_store_acquire_timeout_secs => DEFAULT_STORE_ACQUIRE_TIMEOUT_SECS: u64,
    default_rate_limit_max_requests   => DEFAULT_RATE_LIMIT_MAX_REQUESTS: u32,
    default_rate_limit_window_secs    => DEFAULT_RATE_LIMIT_WINDOW_SECS: u64,
    default_rate_limit_cleanup_secs   => DEFAULT_RATE_LIMIT_CLEANUP_SECS: u64,
    default_pending_ttl_secs          => DEFAULT_PENDING_TTL_SECS: u64,
    default_review_ttl_secs           => DEFAULT_REVIEW_TTL_SECS: u64,
    default_pending_purge_secs        => DEFAULT_PENDING_PURGE_SECS: u64,
    default_sweep_interval_secs       => DEFAULT_SWEEP_INTERVAL_SECS: u64,
    default_reminder_window_secs      => DEFAULT_REMINDER_WINDOW_SECS: u64,
    default_feed_interval_secs        => DEFAULT_FEED_INTERVAL_SECS: u64,
    default_feed_max_retries          => DEFAULT_FEED_MAX_RETRIES: u32,
    default_feed_base_delay_secs      => DEFAULT_FEED_BASE_DELAY_SECS: u64,
    default_feed_request_timeout_secs => DEFAULT_FEED_REQUEST_TIMEOUT_SECS: u64,
    default_shutdown_timeout_secs     => DEFAULT_SHUTDOWN_TIMEOUT_SECS: u64,
}

default_string_fns! {
    default_api_base           => DEFAULT_BOT_API_BASE,
    default_database_url       => DEFAULT_DATABASE_URL,
    default_referral_prefix    => DEFAULT_REFERRAL_PREFIX,
    default_feed_url           => DEFAULT_FEED_URL,
    default_feed_from_symbol   => DEFAULT_FEED_FROM_SYMBOL,
    default_feed_to_symbol     => DEFAULT_FEED_TO_SYMBOL,
    default_feed_series_interval => DEFAULT_FEED_SERIES_INTERVAL,
    default_health_listen      => DEFAULT_HEALTH_LISTEN,
}

pub(crate) fn default_true() -> bool {
    true
}
