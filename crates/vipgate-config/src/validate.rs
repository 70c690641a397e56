//! Configuration validation logic.

use crate::Config;
use crate::loader::ConfigError;

/// One year; longer windows would remind users on every sweep.
const MAX_REMINDER_WINDOW_SECS: u64 = 365 * 86_400;

/// Reject configurations the service cannot start with.
///
/// Runs before any background task is spawned, so a failure here exits the
/// process without side effects.
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.bot.main_token.as_deref().unwrap_or("").trim().is_empty() {
        return Err(ConfigError::Validation(
            "bot.main_token is required (MAIN_BOT_TOKEN)".into(),
        ));
    }
    if let Some(help) = &config.bot.help_token
        && help.trim().is_empty()
    {
        return Err(ConfigError::Validation("bot.help_token is empty".into()));
    }
    if config.access.admin_id.is_none() {
        return Err(ConfigError::Validation(
            "access.admin_id is required (ADMIN_ID)".into(),
        ));
    }
    if config.access.vip_channel_id.is_none() {
        return Err(ConfigError::Validation(
            "access.vip_channel_id is required (VIP_CHANNEL_ID)".into(),
        ));
    }
    if config.bot.api_base.trim().is_empty() {
        return Err(ConfigError::Validation("bot.api_base is empty".into()));
    }
    if config.store.database_url.trim().is_empty() {
        return Err(ConfigError::Validation("store.database_url is empty".into()));
    }
    if config.store.max_connections == 0 {
        return Err(ConfigError::Validation(
            "store.max_connections must be > 0".into(),
        ));
    }
    if config.store.referral_prefix.is_empty()
        || !config
            .store
            .referral_prefix
            .chars()
            .all(|c| c.is_ascii_alphabetic())
    {
        return Err(ConfigError::Validation(
            "store.referral_prefix must be non-empty ASCII letters".into(),
        ));
    }
    for (plan, terms) in config.plans.iter() {
        if terms.duration_days == 0 {
            return Err(ConfigError::Validation(format!(
                "plans.{plan}.duration_days must be > 0"
            )));
        }
    }
    if config.rate_limit.max_requests > 0 && config.rate_limit.window_secs == 0 {
        return Err(ConfigError::Validation(
            "rate_limit.window_secs must be > 0".into(),
        ));
    }
    if config.rate_limit.cleanup_interval_secs == 0 {
        return Err(ConfigError::Validation(
            "rate_limit.cleanup_interval_secs must be > 0".into(),
        ));
    }
    if config.pending.ttl_secs == 0 {
        return Err(ConfigError::Validation("pending.ttl_secs must be > 0".into()));
    }
    if config.pending.review_ttl_secs == 0 {
        return Err(ConfigError::Validation(
            "pending.review_ttl_secs must be > 0".into(),
        ));
    }
    if config.pending.purge_interval_secs == 0 {
        return Err(ConfigError::Validation(
            "pending.purge_interval_secs must be > 0".into(),
        ));
    }
    if config.sweep.interval_secs == 0 {
        return Err(ConfigError::Validation(
            "sweep.interval_secs must be > 0".into(),
        ));
    }
    if config.sweep.reminder_window_secs > MAX_REMINDER_WINDOW_SECS {
        return Err(ConfigError::Validation(format!(
            "sweep.reminder_window_secs must be <= {MAX_REMINDER_WINDOW_SECS}"
        )));
    }
    if config.health.shutdown_timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "health.shutdown_timeout_secs must be > 0".into(),
        ));
    }
    if config.feed.is_active() {
        if config.feed.interval_secs == 0 {
            return Err(ConfigError::Validation(
                "feed.interval_secs must be > 0".into(),
            ));
        }
        if config.feed.max_retries == 0 {
            return Err(ConfigError::Validation(
                "feed.max_retries must be > 0".into(),
            ));
        }
        if config.feed.request_timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "feed.request_timeout_secs must be > 0".into(),
            ));
        }
    }
    Ok(())
}
