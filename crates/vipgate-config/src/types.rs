//! Configuration type definitions.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use vipgate_core::{ChatId, PlanTable, UserId};

use crate::defaults::*;

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub bot: BotConfig,
    #[serde(default)]
    pub access: AccessConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub plans: PlanTable,
    #[serde(default)]
    pub payment: PaymentConfig,
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
    #[serde(default)]
    pub pending: PendingConfig,
    #[serde(default)]
    pub sweep: SweepConfig,
    #[serde(default)]
    pub feed: FeedConfig,
    #[serde(default)]
    pub help: HelpConfig,
    #[serde(default)]
    pub health: HealthConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Bot credentials and update polling.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotConfig {
    /// Token of the main (subscription) bot. Required.
    #[serde(default)]
    pub main_token: Option<String>,
    /// Token of the help desk bot. The help desk is disabled when unset.
    #[serde(default)]
    pub help_token: Option<String>,
    /// Bot API base URL.
    #[serde(default = "default_api_base")]
    pub api_base: String,
    /// Long-poll timeout for update fetching.
    #[serde(default = "default_poll_timeout_secs")]
    pub poll_timeout_secs: u64,
    /// Delay before retrying a failed update fetch.
    #[serde(default = "default_poll_retry_delay_ms")]
    pub poll_retry_delay_ms: u64,
    /// Public username of the main bot, used in referral links.
    #[serde(default)]
    pub username: Option<String>,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            main_token: None,
            help_token: None,
            api_base: default_api_base(),
            poll_timeout_secs: default_poll_timeout_secs(),
            poll_retry_delay_ms: default_poll_retry_delay_ms(),
            username: None,
        }
    }
}

/// Operator identity and the broadcast channel.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AccessConfig {
    /// Administrator allowed to approve, reject and post signals. Required.
    #[serde(default)]
    pub admin_id: Option<UserId>,
    /// VIP broadcast channel. Required.
    #[serde(default)]
    pub vip_channel_id: Option<ChatId>,
    /// Also accept administrators of the VIP channel as operators.
    #[serde(default)]
    pub admins_from_channel: bool,
    /// Chat receiving forwarded payment proofs (defaults to the admin).
    #[serde(default)]
    pub review_chat_id: Option<ChatId>,
}

/// Persistent store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Database URL (`sqlite:`, `postgres://`, `mysql://`) or `memory`.
    #[serde(default = "default_database_url")]
    pub database_url: String,
    #[serde(default = "default_store_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_store_acquire_timeout_secs")]
    pub acquire_timeout_secs: u64,
    /// Prefix of generated referral codes.
    #[serde(default = "default_referral_prefix")]
    pub referral_prefix: String,
    /// Create the users table on startup if missing.
    #[serde(default = "default_true")]
    pub auto_migrate: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            database_url: default_database_url(),
            max_connections: default_store_max_connections(),
            acquire_timeout_secs: default_store_acquire_timeout_secs(),
            referral_prefix: default_referral_prefix(),
            auto_migrate: true,
        }
    }
}

/// One payment destination shown to the user after plan selection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentAddress {
    /// Network label, e.g. `USDT (TRC20)`.
    pub network: String,
    pub address: String,
}

/// Static payment instructions.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PaymentConfig {
    #[serde(default)]
    pub addresses: Vec<PaymentAddress>,
    /// Support contact shown in instructions and terms, e.g. `@Support`.
    #[serde(default)]
    pub support_handle: Option<String>,
}

/// Per-user admission control.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Maximum inbound events per identity within the window.
    #[serde(default = "default_rate_limit_max_requests")]
    pub max_requests: u32,
    /// Window length in seconds.
    #[serde(default = "default_rate_limit_window_secs")]
    pub window_secs: u64,
    /// Cleanup interval in seconds for expired entries.
    #[serde(default = "default_rate_limit_cleanup_secs")]
    pub cleanup_interval_secs: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: default_rate_limit_max_requests(),
            window_secs: default_rate_limit_window_secs(),
            cleanup_interval_secs: default_rate_limit_cleanup_secs(),
        }
    }
}

/// Pending payment proof retention.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingConfig {
    /// A plan selection without proof expires after this many seconds.
    #[serde(default = "default_pending_ttl_secs")]
    pub ttl_secs: u64,
    /// A forwarded proof nobody approved or rejected is dropped after this
    /// many seconds.
    #[serde(default = "default_review_ttl_secs")]
    pub review_ttl_secs: u64,
    /// Purge interval for expired selections and reviews.
    #[serde(default = "default_pending_purge_secs")]
    pub purge_interval_secs: u64,
}

impl Default for PendingConfig {
    fn default() -> Self {
        Self {
            ttl_secs: default_pending_ttl_secs(),
            review_ttl_secs: default_review_ttl_secs(),
            purge_interval_secs: default_pending_purge_secs(),
        }
    }
}

/// Expiry sweep schedule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepConfig {
    #[serde(default = "default_sweep_interval_secs")]
    pub interval_secs: u64,
    /// Active users with at most this much time left get a reminder.
    #[serde(default = "default_reminder_window_secs")]
    pub reminder_window_secs: u64,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_sweep_interval_secs(),
            reminder_window_secs: default_reminder_window_secs(),
        }
    }
}

/// External quote feed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedConfig {
    /// Run the poller. It also stays off while `api_key` is unset.
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_feed_url")]
    pub url: String,
    #[serde(default = "default_feed_from_symbol")]
    pub from_symbol: String,
    #[serde(default = "default_feed_to_symbol")]
    pub to_symbol: String,
    #[serde(default = "default_feed_series_interval")]
    pub series_interval: String,
    #[serde(default = "default_feed_interval_secs")]
    pub interval_secs: u64,
    /// Fetch attempts per cycle.
    #[serde(default = "default_feed_max_retries")]
    pub max_retries: u32,
    /// Backoff after attempt `n` is `base_delay_secs * 2^n`.
    #[serde(default = "default_feed_base_delay_secs")]
    pub base_delay_secs: u64,
    #[serde(default = "default_feed_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            api_key: None,
            url: default_feed_url(),
            from_symbol: default_feed_from_symbol(),
            to_symbol: default_feed_to_symbol(),
            series_interval: default_feed_series_interval(),
            interval_secs: default_feed_interval_secs(),
            max_retries: default_feed_max_retries(),
            base_delay_secs: default_feed_base_delay_secs(),
            request_timeout_secs: default_feed_request_timeout_secs(),
        }
    }
}

impl FeedConfig {
    /// Whether the poller should be started.
    pub fn is_active(&self) -> bool {
        self.enabled && self.api_key.as_deref().is_some_and(|k| !k.trim().is_empty())
    }
}

/// A canned help desk answer matched by keyword.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FaqEntry {
    /// Lowercase phrase looked up in the incoming message.
    pub question: String,
    pub answer: String,
}

/// Help desk bot settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HelpConfig {
    #[serde(default = "default_faq")]
    pub faq: Vec<FaqEntry>,
}

impl Default for HelpConfig {
    fn default() -> Self {
        Self { faq: default_faq() }
    }
}

fn default_faq() -> Vec<FaqEntry> {
    [
        ("how to join", "Use /subscribe in the main bot to join VIP."),
        ("cost", "Plans: $30 weekly, $30 bi-weekly or $50 monthly."),
        ("support", "Ask here and an operator will get back to you."),
    ]
    .into_iter()
    .map(|(q, a)| FaqEntry {
        question: q.to_string(),
        answer: a.to_string(),
    })
    .collect()
}

/// HTTP health endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthConfig {
    /// Listen address; `None` disables the endpoint.
    #[serde(default = "default_health_listen_opt")]
    pub listen: Option<String>,
    #[serde(default = "default_shutdown_timeout_secs")]
    pub shutdown_timeout_secs: u64,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            listen: default_health_listen_opt(),
            shutdown_timeout_secs: default_shutdown_timeout_secs(),
        }
    }
}

fn default_health_listen_opt() -> Option<String> {
    Some(default_health_listen())
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct MetricsConfig {
    pub listen: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct LoggingConfig {
    /// Base level (trace, debug, info, warn, error).
    pub level: Option<String>,
    /// Output format: json, pretty, compact. Default: pretty
    #[serde(default)]
    pub format: Option<String>,
    /// Output target: stdout, stderr. Default: stderr
    #[serde(default)]
    pub output: Option<String>,
    /// Per-module level overrides.
    #[serde(default)]
    pub filters: HashMap<String, String>,
}

impl Config {
    /// Chat that receives forwarded payment proofs.
    pub fn review_chat(&self) -> Option<ChatId> {
        self.access.review_chat_id.or(self.access.admin_id)
    }
}
