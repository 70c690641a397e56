//! CLI override definitions and application logic.
//!
//! Every override also reads an environment variable, so a deployment can
//! run without a config file at all.

use clap::Parser;
use vipgate_core::{ChatId, UserId};

use crate::Config;

#[derive(Debug, Clone, Parser, Default)]
pub struct CliOverrides {
    /// Main bot token
    #[arg(long, env = "MAIN_BOT_TOKEN", hide_env_values = true)]
    pub main_token: Option<String>,
    /// Help desk bot token (help desk disabled when unset)
    #[arg(long, env = "HELP_BOT_TOKEN", hide_env_values = true)]
    pub help_token: Option<String>,
    /// Administrator user id
    #[arg(long, env = "ADMIN_ID", allow_negative_numbers = true)]
    pub admin_id: Option<UserId>,
    /// VIP broadcast channel id
    #[arg(long, env = "VIP_CHANNEL_ID", allow_negative_numbers = true)]
    pub vip_channel_id: Option<ChatId>,
    /// Quote feed API key
    #[arg(long, env = "ALPHA_VANTAGE_KEY", hide_env_values = true)]
    pub feed_api_key: Option<String>,
    /// Database URL (sqlite:, postgres://, mysql:// or "memory")
    #[arg(long, env = "DATABASE_URL")]
    pub database_url: Option<String>,
    /// Health endpoint port (binds 0.0.0.0)
    #[arg(long, env = "PORT")]
    pub port: Option<u16>,
    /// Max inbound events per user per window (0 = disabled)
    #[arg(long, env = "RATE_LIMIT_MAX")]
    pub rate_limit_max: Option<u32>,
    /// Rate limit window in seconds
    #[arg(long, env = "RATE_LIMIT_WINDOW_SECS")]
    pub rate_limit_window_secs: Option<u64>,
    /// Override metrics listen address
    #[arg(long, env = "METRICS_LISTEN")]
    pub metrics_listen: Option<String>,
    /// Override log level (trace/debug/info/warn/error)
    #[arg(long, env = "LOG_LEVEL")]
    pub log_level: Option<String>,
}

pub fn apply_overrides(config: &mut Config, overrides: &CliOverrides) {
    if let Some(v) = &overrides.main_token {
        config.bot.main_token = Some(v.clone());
    }
    if let Some(v) = &overrides.help_token {
        config.bot.help_token = Some(v.clone());
    }
    if let Some(v) = overrides.admin_id {
        config.access.admin_id = Some(v);
    }
    if let Some(v) = overrides.vip_channel_id {
        config.access.vip_channel_id = Some(v);
    }
    if let Some(v) = &overrides.feed_api_key {
        config.feed.api_key = Some(v.clone());
    }
    if let Some(v) = &overrides.database_url {
        config.store.database_url = v.clone();
    }
    if let Some(port) = overrides.port {
        config.health.listen = Some(format!("0.0.0.0:{port}"));
    }
    if let Some(v) = overrides.rate_limit_max {
        config.rate_limit.max_requests = v;
    }
    if let Some(v) = overrides.rate_limit_window_secs {
        config.rate_limit.window_secs = v;
    }
    if let Some(v) = &overrides.metrics_listen {
        config.metrics.listen = Some(v.clone());
    }
    if let Some(v) = &overrides.log_level {
        config.logging.level = Some(v.clone());
    }
}
