//! Runtime wiring: store, transports, background tasks and adapters.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use vipgate_config::{Config, StoreConfig};
use vipgate_store::{MemoryStore, SqlStore, SqlStoreConfig, UserStore};
use vipgate_transport::{InboundSource, TelegramTransport, Transport};

use crate::adapter::run_adapter;
use crate::error::ServiceError;
use crate::feed::{AlphaVantageSource, FeedPoller, FeedSettings, run_feed};
use crate::health;
use crate::help::HelpDesk;
use crate::pending::{PendingProofs, run_purge};
use crate::rate_limit::RateLimiter;
use crate::review::ReviewQueue;
use crate::service::{ServiceSettings, SubscriptionService};
use crate::sweep::{Sweeper, run_sweeper};

/// Database URL selecting the in-process store.
pub const MEMORY_STORE_URL: &str = "memory";

/// Open the configured user store.
pub async fn open_store(config: &StoreConfig) -> Result<Arc<dyn UserStore>, ServiceError> {
    if config.database_url == MEMORY_STORE_URL {
        warn!("using in-memory store, data is lost on restart");
        return Ok(Arc::new(MemoryStore::with_prefix(&config.referral_prefix)));
    }

    let store = SqlStore::connect(
        SqlStoreConfig::new(&config.database_url)
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
            .referral_prefix(&config.referral_prefix),
    )
    .await?;
    if config.auto_migrate {
        store.init_schema().await?;
    }
    info!(db_type = ?store.db_type(), "user store connected");
    Ok(Arc::new(store))
}

/// Run the bots with a cancellation token for graceful shutdown.
pub async fn run_with_shutdown(
    config: Config,
    shutdown: CancellationToken,
) -> Result<(), ServiceError> {
    let main_token = config
        .bot
        .main_token
        .as_deref()
        .ok_or_else(|| ServiceError::Config("bot.main_token is required".into()))?;
    let poll_timeout = Duration::from_secs(config.bot.poll_timeout_secs);

    let main = Arc::new(TelegramTransport::new(
        main_token,
        &config.bot.api_base,
        poll_timeout,
    )?);
    let help = match config.bot.help_token.as_deref() {
        Some(token) => Some(Arc::new(TelegramTransport::new(
            token,
            &config.bot.api_base,
            poll_timeout,
        )?)),
        None => None,
    };

    let store = open_store(&config.store).await?;
    run_services(config, store, main, help, shutdown).await
}

/// Start every task against the given store and transports, then wait for
/// shutdown.
///
/// Returns an error only for startup failures; once running, failures are
/// logged by the tasks themselves.
pub async fn run_services<T>(
    config: Config,
    store: Arc<dyn UserStore>,
    main: Arc<T>,
    help: Option<Arc<T>>,
    shutdown: CancellationToken,
) -> Result<(), ServiceError>
where
    T: Transport + InboundSource + 'static,
{
    let settings = ServiceSettings::from_config(&config)?;

    let health_listener = match &config.health.listen {
        Some(listen) => Some(
            health::bind(listen)
                .await
                .map_err(|e| ServiceError::Config(format!("health listen {listen}: {e}")))?,
        ),
        None => None,
    };
    let feed_source = if config.feed.is_active() {
        Some(
            AlphaVantageSource::new(&config.feed)
                .map_err(|e| ServiceError::Config(format!("feed: {e}")))?,
        )
    } else {
        info!("quote feed disabled");
        None
    };

    let limiter = Arc::new(RateLimiter::new(
        config.rate_limit.max_requests,
        config.rate_limit.window_secs,
    ));
    limiter.start_cleanup_task(Duration::from_secs(config.rate_limit.cleanup_interval_secs));

    let pending = Arc::new(PendingProofs::new(Duration::from_secs(
        config.pending.ttl_secs,
    )));
    let reviews = Arc::new(ReviewQueue::with_ttl(Duration::from_secs(
        config.pending.review_ttl_secs,
    )));
    let retry_delay = Duration::from_millis(config.bot.poll_retry_delay_ms);

    let mut tasks = JoinSet::new();

    tasks.spawn(run_purge(
        pending.clone(),
        reviews.clone(),
        Duration::from_secs(config.pending.purge_interval_secs),
        shutdown.clone(),
    ));

    let sweeper = Arc::new(Sweeper::new(
        store.clone(),
        main.clone(),
        Duration::from_secs(config.sweep.reminder_window_secs),
    ));
    tasks.spawn(run_sweeper(
        sweeper,
        Duration::from_secs(config.sweep.interval_secs),
        shutdown.clone(),
    ));

    if let Some(source) = feed_source {
        let poller = Arc::new(FeedPoller::new(
            Arc::new(source),
            main.clone(),
            FeedSettings::from_config(&config.feed, settings.vip_channel_id, settings.admin_id),
        ));
        tasks.spawn(run_feed(
            poller,
            Duration::from_secs(config.feed.interval_secs),
            shutdown.clone(),
        ));
    }

    if let Some(listener) = health_listener {
        let shutdown = shutdown.clone();
        tasks.spawn(async move {
            if let Err(e) = health::serve(listener, shutdown).await {
                warn!(error = %e, "health endpoint stopped");
            }
        });
    }

    if let Some(help) = help {
        let desk = Arc::new(HelpDesk::new(
            help.clone(),
            limiter.clone(),
            config.help.faq.clone(),
            settings.admin_id,
        ));
        tasks.spawn(run_adapter("help", help, desk, retry_delay, shutdown.clone()));
    } else {
        info!("help desk disabled");
    }

    let service = Arc::new(SubscriptionService::new(
        store,
        main.clone(),
        limiter.clone(),
        pending,
        reviews,
        settings,
    ));
    tasks.spawn(run_adapter("main", main, service, retry_delay, shutdown.clone()));

    info!(tasks = tasks.len(), version = vipgate_core::VERSION, "vipgate started");

    shutdown.cancelled().await;
    info!("shutdown signal received, waiting for tasks to finish");
    limiter.shutdown();

    let timeout = Duration::from_secs(config.health.shutdown_timeout_secs);
    let drained = tokio::time::timeout(timeout, async {
        while let Some(result) = tasks.join_next().await {
            if let Err(e) = result {
                warn!(error = %e, "task ended abnormally");
            }
        }
    })
    .await;

    if drained.is_err() {
        warn!(remaining = tasks.len(), "shutdown timeout, aborting remaining tasks");
        tasks.abort_all();
    }

    info!("vipgate stopped");
    Ok(())
}
