//! Runtime wiring tests: every task started against recording transports.

use std::sync::Arc;
use std::time::Duration;

use vipgate_config::Config;
use vipgate_core::{ChatId, Plan, PlanTerms, SECS_PER_DAY, UserId, unix_now};
use vipgate_server::{CancellationToken, MEMORY_STORE_URL, ServiceError, messages, open_store, run_services};
use vipgate_store::{MemoryStore, UserStore};
use vipgate_transport::{Inbound, RecordingTransport};

const ADMIN: UserId = 1000;
const CHANNEL: ChatId = -100;

fn config() -> Config {
    let mut config = Config::default();
    config.bot.main_token = Some("123:test".into());
    config.access.admin_id = Some(ADMIN);
    config.access.vip_channel_id = Some(CHANNEL);
    config.health.listen = None;
    config.health.shutdown_timeout_secs = 5;
    config.store.database_url = MEMORY_STORE_URL.into();
    config
}

async fn wait_for(mut done: impl FnMut() -> bool) {
    for _ in 0..500 {
        if done() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not reached in time");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn services_run_until_shutdown() {
    let store = Arc::new(MemoryStore::new());
    // Lapsed subscription for the startup sweep to revoke.
    store.upsert_user(9, None, 0).await.unwrap();
    let day = PlanTerms {
        duration_days: 1,
        commission: 0,
        price: 0,
    };
    store
        .approve_subscription(9, Plan::Weekly, &day, unix_now() - 2 * SECS_PER_DAY)
        .await
        .unwrap();

    let main = Arc::new(RecordingTransport::new());
    main.push_batch(vec![Inbound::command(1, "start", "")]);
    let help = Arc::new(RecordingTransport::new());
    help.push_batch(vec![Inbound::text(2, "where is my invoice")]);

    let shutdown = CancellationToken::new();
    let handle = tokio::spawn(run_services(
        config(),
        store.clone(),
        main.clone(),
        Some(help.clone()),
        shutdown.clone(),
    ));

    wait_for(|| {
        !main.messages_to(1).is_empty()
            && !main.messages_to(9).is_empty()
            && !help.messages_to(ADMIN).is_empty()
    })
    .await;

    assert!(main.messages_to(1)[0].text.contains("GS1"));
    assert_eq!(main.messages_to(9)[0].text, messages::RENEW_NOTICE);
    assert_eq!(
        help.messages_to(ADMIN)[0].text,
        "Live support from 2: where is my invoice"
    );
    assert!(!store.get_user(9).await.unwrap().vip_status);

    shutdown.cancel();
    tokio::time::timeout(Duration::from_secs(10), handle)
        .await
        .expect("shutdown timed out")
        .unwrap()
        .unwrap();
}

#[tokio::test]
async fn missing_operator_aborts_before_start() {
    let mut config = config();
    config.access.admin_id = None;
    let main = Arc::new(RecordingTransport::new());
    main.push_batch(vec![Inbound::command(1, "start", "")]);

    let result = run_services(
        config,
        Arc::new(MemoryStore::new()),
        main.clone(),
        None,
        CancellationToken::new(),
    )
    .await;

    assert!(matches!(result, Err(ServiceError::Config(_))));
    assert!(main.sent().is_empty());
}

#[tokio::test]
async fn open_store_selects_backend() {
    let mut config = config().store;
    config.referral_prefix = "VIP".into();
    let store = open_store(&config).await.unwrap();
    assert_eq!(store.upsert_user(5, None, 0).await.unwrap(), "VIP5");

    config.database_url = "sqlite::memory:".into();
    config.max_connections = 1;
    let store = open_store(&config).await.unwrap();
    assert_eq!(store.upsert_user(6, None, 0).await.unwrap(), "VIP6");
    assert_eq!(store.list_users().await.unwrap().len(), 1);

    config.database_url = "redis://localhost".into();
    assert!(matches!(open_store(&config).await, Err(ServiceError::Store(_))));
}
