use std::io::Write;

use vipgate_core::Plan;

use crate::*;

fn minimal() -> Config {
    let mut config = Config::default();
    config.bot.main_token = Some("123:abc".into());
    config.access.admin_id = Some(42);
    config.access.vip_channel_id = Some(-100_123);
    config
}

#[test]
fn defaults_are_env_friendly() {
    let config = Config::default();
    assert_eq!(config.rate_limit.max_requests, 30);
    assert_eq!(config.rate_limit.window_secs, 60);
    assert_eq!(config.sweep.interval_secs, 86_400);
    assert_eq!(config.feed.max_retries, 3);
    assert_eq!(config.feed.base_delay_secs, 5);
    assert_eq!(config.feed.request_timeout_secs, 10);
    assert_eq!(config.store.referral_prefix, "GS");
    assert!(!config.feed.is_active());
}

#[test]
fn missing_required_values_fail_validation() {
    let config = Config::default();
    let err = validate_config(&config).unwrap_err();
    assert!(err.to_string().contains("main_token"));

    let mut config = minimal();
    config.access.admin_id = None;
    assert!(validate_config(&config).unwrap_err().to_string().contains("admin_id"));

    let mut config = minimal();
    config.access.vip_channel_id = None;
    assert!(
        validate_config(&config)
            .unwrap_err()
            .to_string()
            .contains("vip_channel_id")
    );

    assert!(validate_config(&minimal()).is_ok());
}

#[test]
fn zero_duration_plan_is_rejected() {
    let mut config = minimal();
    config.plans.weekly.duration_days = 0;
    let err = validate_config(&config).unwrap_err();
    assert!(err.to_string().contains("plans.weekly"));
}

#[test]
fn zero_intervals_are_rejected() {
    let cases: [(&str, fn(&mut Config)); 5] = [
        ("pending.purge_interval_secs", |c| c.pending.purge_interval_secs = 0),
        ("pending.review_ttl_secs", |c| c.pending.review_ttl_secs = 0),
        ("rate_limit.cleanup_interval_secs", |c| {
            c.rate_limit.cleanup_interval_secs = 0
        }),
        ("health.shutdown_timeout_secs", |c| {
            c.health.shutdown_timeout_secs = 0
        }),
        ("sweep.interval_secs", |c| c.sweep.interval_secs = 0),
    ];
    for (field, apply) in cases {
        let mut config = minimal();
        apply(&mut config);
        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains(field), "{field}: {err}");
    }
}

#[test]
fn oversized_reminder_window_is_rejected() {
    let mut config = minimal();
    config.sweep.reminder_window_secs = u64::MAX;
    let err = validate_config(&config).unwrap_err();
    assert!(err.to_string().contains("reminder_window_secs"));

    config.sweep.reminder_window_secs = 7 * 86_400;
    assert!(validate_config(&config).is_ok());
}

#[test]
fn overrides_take_precedence() {
    let mut config = minimal();
    let overrides = CliOverrides {
        admin_id: Some(7),
        port: Some(8080),
        rate_limit_max: Some(5),
        feed_api_key: Some("demo".into()),
        ..Default::default()
    };
    apply_overrides(&mut config, &overrides);
    assert_eq!(config.access.admin_id, Some(7));
    assert_eq!(config.health.listen.as_deref(), Some("0.0.0.0:8080"));
    assert_eq!(config.rate_limit.max_requests, 5);
    assert!(config.feed.is_active());
}

#[test]
fn review_chat_defaults_to_admin() {
    let mut config = minimal();
    assert_eq!(config.review_chat(), Some(42));
    config.access.review_chat_id = Some(-555);
    assert_eq!(config.review_chat(), Some(-555));
}

#[test]
fn load_toml_file() {
    let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
    write!(
        file,
        r#"
[bot]
main_token = "t"

[access]
admin_id = 1
vip_channel_id = -100

[plans.biweekly]
duration_days = 15
commission = 4

[[payment.addresses]]
network = "USDT (TRC20)"
address = "TXYZ"
"#
    )
    .unwrap();

    let config = load_config(file.path()).unwrap();
    assert_eq!(config.plans.terms(Plan::Biweekly).duration_days, 15);
    assert_eq!(config.plans.commission(Plan::Biweekly), 4);
    assert_eq!(config.plans.terms(Plan::Monthly).duration_days, 30);
    assert_eq!(config.payment.addresses.len(), 1);
    assert!(validate_config(&config).is_ok());
}

#[test]
fn load_jsonc_strips_comments() {
    let mut file = tempfile::Builder::new().suffix(".jsonc").tempfile().unwrap();
    write!(
        file,
        r#"{{
  // operator
  "access": {{ "admin_id": 9, "vip_channel_id": -1 }}
}}"#
    )
    .unwrap();

    let config = load_config(file.path()).unwrap();
    assert_eq!(config.access.admin_id, Some(9));
}

#[test]
fn unknown_extension_is_unsupported() {
    let file = tempfile::Builder::new().suffix(".ini").tempfile().unwrap();
    assert!(matches!(
        load_config(file.path()),
        Err(ConfigError::UnsupportedFormat)
    ));
}

#[test]
fn no_file_means_defaults() {
    let config = load_config_or_default(None).unwrap();
    assert!(config.bot.main_token.is_none());
}
