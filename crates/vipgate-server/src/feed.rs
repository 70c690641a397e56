//! Resilient quote feed poller.
//!
//! Each cycle fetches the latest quote with bounded retries and exponential
//! backoff. Successful quotes are published to the VIP channel and cached.
//! When every attempt fails, the cached quote is republished labeled as a
//! fallback and the operator gets a single alert.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use vipgate_config::FeedConfig;
use vipgate_core::ChatId;
use vipgate_transport::{Outbound, Transport};

use crate::error::FeedError;
use crate::messages;

/// A price observation.
#[derive(Debug, Clone, PartialEq)]
pub struct Quote {
    pub symbol: String,
    pub price: f64,
    /// Timestamp of the observation as reported by the feed.
    pub observed_at: String,
}

/// Source of quotes.
#[async_trait]
pub trait QuoteSource: Send + Sync {
    /// Fetch the most recent quote.
    async fn fetch(&self) -> Result<Quote, FeedError>;
}

/// Alpha Vantage `FX_INTRADAY` source.
pub struct AlphaVantageSource {
    client: reqwest::Client,
    url: String,
    api_key: String,
    from_symbol: String,
    to_symbol: String,
    series_interval: String,
}

impl AlphaVantageSource {
    pub fn new(config: &FeedConfig) -> Result<Self, FeedError> {
        let api_key = config
            .api_key
            .clone()
            .ok_or_else(|| FeedError::MissingField("feed.api_key".into()))?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| FeedError::Network(e.to_string()))?;
        Ok(Self {
            client,
            url: config.url.clone(),
            api_key,
            from_symbol: config.from_symbol.clone(),
            to_symbol: config.to_symbol.clone(),
            series_interval: config.series_interval.clone(),
        })
    }

    fn symbol(&self) -> String {
        format!("{}{}", self.from_symbol, self.to_symbol)
    }
}

impl std::fmt::Debug for AlphaVantageSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AlphaVantageSource")
            .field("url", &self.url)
            .field("symbol", &self.symbol())
            .field("series_interval", &self.series_interval)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl QuoteSource for AlphaVantageSource {
    async fn fetch(&self) -> Result<Quote, FeedError> {
        let response = self
            .client
            .get(&self.url)
            .query(&[
                ("function", "FX_INTRADAY"),
                ("from_symbol", self.from_symbol.as_str()),
                ("to_symbol", self.to_symbol.as_str()),
                ("interval", self.series_interval.as_str()),
                ("apikey", self.api_key.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FeedError::Status(status.as_u16()));
        }

        let body: Value = response.json().await?;
        parse_intraday(&body, &self.series_interval, self.symbol())
    }
}

/// Extract the latest close from an `FX_INTRADAY` response body.
///
/// Error payloads (bad key, throttling notes) lack the series object and
/// fail with [`FeedError::MissingField`].
pub fn parse_intraday(body: &Value, interval: &str, symbol: String) -> Result<Quote, FeedError> {
    let key = format!("Time Series FX ({interval})");
    let series = body
        .get(&key)
        .and_then(Value::as_object)
        .ok_or_else(|| FeedError::MissingField(key.clone()))?;

    // Timestamps are "YYYY-MM-DD HH:MM:SS", so the lexical max is the latest.
    let (observed_at, point) = series
        .iter()
        .max_by(|a, b| a.0.cmp(b.0))
        .ok_or_else(|| FeedError::MissingField(format!("{key} entries")))?;

    let close = point
        .get("4. close")
        .and_then(Value::as_str)
        .ok_or_else(|| FeedError::MissingField("4. close".into()))?;
    let price = close
        .trim()
        .parse::<f64>()
        .map_err(|_| FeedError::Parse(format!("invalid close price '{close}'")))?;

    Ok(Quote {
        symbol,
        price,
        observed_at: observed_at.clone(),
    })
}

/// Poller settings.
#[derive(Debug, Clone)]
pub struct FeedSettings {
    /// Channel receiving quotes.
    pub channel: ChatId,
    /// Chat receiving failure alerts.
    pub admin: ChatId,
    /// Fetch attempts per cycle.
    pub max_retries: u32,
    pub base_delay: Duration,
    pub request_timeout: Duration,
}

impl FeedSettings {
    pub fn from_config(config: &FeedConfig, channel: ChatId, admin: ChatId) -> Self {
        Self {
            channel,
            admin,
            max_retries: config.max_retries,
            base_delay: Duration::from_secs(config.base_delay_secs),
            request_timeout: Duration::from_secs(config.request_timeout_secs),
        }
    }
}

/// How a cycle ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// A fresh quote was published.
    Published,
    /// All attempts failed; the cached quote was republished.
    Fallback,
    /// All attempts failed and nothing was cached.
    Exhausted,
    /// A non-retryable failure ended the cycle early.
    Rejected,
}

impl CycleOutcome {
    pub fn as_str(self) -> &'static str {
        match self {
            CycleOutcome::Published => "success",
            CycleOutcome::Fallback => "fallback",
            CycleOutcome::Exhausted => "exhausted",
            CycleOutcome::Rejected => "rejected",
        }
    }
}

/// Result of one cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleReport {
    pub outcome: CycleOutcome,
    /// Fetch attempts made.
    pub attempts: u32,
    /// Backoff sleeps taken, in order.
    pub delays: Vec<Duration>,
}

/// Runs feed cycles and owns the cached last good quote.
pub struct FeedPoller {
    source: Arc<dyn QuoteSource>,
    transport: Arc<dyn Transport>,
    settings: FeedSettings,
    cache: Mutex<Option<Quote>>,
}

impl FeedPoller {
    pub fn new(
        source: Arc<dyn QuoteSource>,
        transport: Arc<dyn Transport>,
        settings: FeedSettings,
    ) -> Self {
        Self {
            source,
            transport,
            settings,
            cache: Mutex::new(None),
        }
    }

    /// Last successfully published quote.
    pub fn cached(&self) -> Option<Quote> {
        self.cache.lock().clone()
    }

    /// Backoff after failed attempt `attempt` (0-based).
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.settings
            .base_delay
            .saturating_mul(1u32 << attempt.min(16))
    }

    /// Run one fetch cycle.
    pub async fn run_cycle(&self) -> CycleReport {
        let max_attempts = self.settings.max_retries.max(1);
        let mut delays = Vec::new();
        let mut last_error = None;

        for attempt in 0..max_attempts {
            match self.fetch_once().await {
                Ok(quote) => {
                    info!(symbol = %quote.symbol, price = quote.price, "quote published");
                    self.publish(messages::quote(
                        &quote.symbol,
                        quote.price,
                        &quote.observed_at,
                    ))
                    .await;
                    *self.cache.lock() = Some(quote);
                    return CycleReport {
                        outcome: CycleOutcome::Published,
                        attempts: attempt + 1,
                        delays,
                    };
                }
                Err(e) if e.is_retryable() => {
                    vipgate_metrics::record_feed_attempt_failure();
                    let delay = self.backoff(attempt);
                    warn!(
                        attempt = attempt + 1,
                        max_attempts,
                        delay_secs = delay.as_secs(),
                        error = %e,
                        "feed fetch failed, backing off"
                    );
                    tokio::time::sleep(delay).await;
                    delays.push(delay);
                    last_error = Some(e);
                }
                Err(e) => {
                    vipgate_metrics::record_error(vipgate_core::ERROR_FEED);
                    error!(error = %e, "feed response rejected");
                    self.alert(messages::feed_malformed(&e.to_string())).await;
                    return CycleReport {
                        outcome: CycleOutcome::Rejected,
                        attempts: attempt + 1,
                        delays,
                    };
                }
            }
        }

        vipgate_metrics::record_error(vipgate_core::ERROR_FEED);
        let cached = self.cached();
        if let Some(quote) = &cached {
            self.publish(messages::quote_fallback(
                &quote.symbol,
                quote.price,
                &quote.observed_at,
            ))
            .await;
        }
        let error = last_error.map(|e| e.to_string()).unwrap_or_default();
        error!(attempts = max_attempts, error = %error, fallback = cached.is_some(), "feed cycle exhausted");
        self.alert(messages::feed_exhausted(max_attempts, &error, cached.is_some()))
            .await;

        CycleReport {
            outcome: if cached.is_some() {
                CycleOutcome::Fallback
            } else {
                CycleOutcome::Exhausted
            },
            attempts: max_attempts,
            delays,
        }
    }

    async fn fetch_once(&self) -> Result<Quote, FeedError> {
        let timeout = self.settings.request_timeout;
        match tokio::time::timeout(timeout, self.source.fetch()).await {
            Ok(Err(FeedError::Timeout(_))) | Err(_) => Err(FeedError::Timeout(timeout)),
            Ok(result) => result,
        }
    }

    async fn publish(&self, text: String) {
        if let Err(e) = self
            .transport
            .send(Outbound::text(self.settings.channel, text))
            .await
        {
            vipgate_metrics::record_error(vipgate_core::ERROR_TRANSPORT);
            warn!(error = %e, "failed to publish quote");
        }
    }

    async fn alert(&self, text: String) {
        if let Err(e) = self
            .transport
            .send(Outbound::text(self.settings.admin, text))
            .await
        {
            vipgate_metrics::record_error(vipgate_core::ERROR_TRANSPORT);
            warn!(error = %e, "failed to alert operator");
        }
    }
}

/// Run feed cycles at `interval` until shutdown. The first cycle starts
/// immediately; a cycle in progress finishes before shutdown is observed.
pub async fn run_feed(poller: Arc<FeedPoller>, interval: Duration, shutdown: CancellationToken) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            biased;

            _ = shutdown.cancelled() => {
                debug!("feed poller shutting down");
                return;
            }

            _ = ticker.tick() => {
                let report = poller.run_cycle().await;
                vipgate_metrics::record_feed_cycle(report.outcome.as_str());
                debug!(outcome = report.outcome.as_str(), attempts = report.attempts, "feed cycle finished");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicU32, Ordering};

    use serde_json::json;
    use tokio::time::Instant;
    use vipgate_transport::RecordingTransport;

    use super::*;

    const CHANNEL: ChatId = -100;
    const ADMIN: ChatId = 7;

    /// Replays scripted results; `None` hangs past any timeout.
    struct ScriptedSource {
        script: Mutex<VecDeque<Option<Result<Quote, FeedError>>>>,
        calls: AtomicU32,
    }

    impl ScriptedSource {
        fn new(script: Vec<Option<Result<Quote, FeedError>>>) -> Arc<Self> {
            Arc::new(Self {
                script: Mutex::new(script.into()),
                calls: AtomicU32::new(0),
            })
        }
    }

    #[async_trait]
    impl QuoteSource for ScriptedSource {
        async fn fetch(&self) -> Result<Quote, FeedError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let next = self.script.lock().pop_front();
            match next {
                Some(Some(result)) => result,
                Some(None) => {
                    tokio::time::sleep(Duration::from_secs(3600)).await;
                    Err(FeedError::Network("hung".into()))
                }
                None => Err(FeedError::Network("script exhausted".into())),
            }
        }
    }

    fn quote(price: f64) -> Quote {
        Quote {
            symbol: "XAUUSD".into(),
            price,
            observed_at: "2024-05-01 12:00:00".into(),
        }
    }

    fn network() -> Option<Result<Quote, FeedError>> {
        Some(Err(FeedError::Network("connection reset".into())))
    }

    fn poller(source: Arc<ScriptedSource>, transport: Arc<RecordingTransport>) -> FeedPoller {
        FeedPoller::new(
            source,
            transport,
            FeedSettings {
                channel: CHANNEL,
                admin: ADMIN,
                max_retries: 3,
                base_delay: Duration::from_secs(5),
                request_timeout: Duration::from_secs(10),
            },
        )
    }

    #[test]
    fn parses_latest_close() {
        let body = json!({
            "Meta Data": {"1. Information": "FX Intraday (5min) Time Series"},
            "Time Series FX (5min)": {
                "2024-05-01 11:55:00": {"4. close": "2301.10"},
                "2024-05-01 12:00:00": {"4. close": "2302.45"},
                "2024-05-01 11:50:00": {"4. close": "2299.00"}
            }
        });
        let quote = parse_intraday(&body, "5min", "XAUUSD".into()).unwrap();
        assert_eq!(quote.price, 2302.45);
        assert_eq!(quote.observed_at, "2024-05-01 12:00:00");
    }

    #[test]
    fn error_payload_is_missing_field() {
        let body = json!({"Note": "API call frequency exceeded"});
        assert_eq!(
            parse_intraday(&body, "5min", "XAUUSD".into()),
            Err(FeedError::MissingField("Time Series FX (5min)".into()))
        );

        let body = json!({"Time Series FX (5min)": {"2024-05-01 12:00:00": {"1. open": "1"}}});
        assert!(matches!(
            parse_intraday(&body, "5min", "XAUUSD".into()),
            Err(FeedError::MissingField(_))
        ));

        let body = json!({"Time Series FX (5min)": {"2024-05-01 12:00:00": {"4. close": "n/a"}}});
        assert!(matches!(
            parse_intraday(&body, "5min", "XAUUSD".into()),
            Err(FeedError::Parse(_))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn success_publishes_and_caches() {
        let source = ScriptedSource::new(vec![Some(Ok(quote(2300.0)))]);
        let transport = Arc::new(RecordingTransport::new());
        let poller = poller(source, transport.clone());

        let report = poller.run_cycle().await;
        assert_eq!(report.outcome, CycleOutcome::Published);
        assert_eq!(report.attempts, 1);
        assert!(report.delays.is_empty());
        assert_eq!(poller.cached(), Some(quote(2300.0)));

        let posts = transport.messages_to(CHANNEL);
        assert_eq!(posts.len(), 1);
        assert!(posts[0].text.contains("2300.00"));
        assert!(transport.messages_to(ADMIN).is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn exhausted_cycle_backs_off_then_falls_back() {
        let source = ScriptedSource::new(vec![
            Some(Ok(quote(2300.0))),
            network(),
            network(),
            network(),
        ]);
        let transport = Arc::new(RecordingTransport::new());
        let poller = poller(source.clone(), transport.clone());
        poller.run_cycle().await;
        transport.clear();

        let started = Instant::now();
        let report = poller.run_cycle().await;
        assert_eq!(report.outcome, CycleOutcome::Fallback);
        assert_eq!(report.attempts, 3);
        assert_eq!(
            report.delays,
            vec![
                Duration::from_secs(5),
                Duration::from_secs(10),
                Duration::from_secs(20)
            ]
        );
        assert_eq!(started.elapsed(), Duration::from_secs(35));
        assert_eq!(source.calls.load(Ordering::SeqCst), 4);

        let posts = transport.messages_to(CHANNEL);
        assert_eq!(posts.len(), 1);
        assert!(posts[0].text.contains("cached"));
        assert_eq!(transport.messages_to(ADMIN).len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn exhausted_without_cache_only_alerts() {
        let source = ScriptedSource::new(vec![network(), network(), network()]);
        let transport = Arc::new(RecordingTransport::new());
        let poller = poller(source, transport.clone());

        let report = poller.run_cycle().await;
        assert_eq!(report.outcome, CycleOutcome::Exhausted);
        assert!(transport.messages_to(CHANNEL).is_empty());
        let alerts = transport.messages_to(ADMIN);
        assert_eq!(alerts.len(), 1);
        assert!(alerts[0].text.contains("nothing cached"));
    }

    #[tokio::test(start_paused = true)]
    async fn missing_field_is_not_retried() {
        let source = ScriptedSource::new(vec![Some(Err(FeedError::MissingField(
            "Time Series FX (5min)".into(),
        )))]);
        let transport = Arc::new(RecordingTransport::new());
        let poller = poller(source.clone(), transport.clone());

        let report = poller.run_cycle().await;
        assert_eq!(report.outcome, CycleOutcome::Rejected);
        assert_eq!(report.attempts, 1);
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
        assert_eq!(transport.messages_to(ADMIN).len(), 1);
        assert!(transport.messages_to(CHANNEL).is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn hung_request_times_out_and_retries() {
        let source = ScriptedSource::new(vec![None, Some(Ok(quote(2310.5)))]);
        let transport = Arc::new(RecordingTransport::new());
        let poller = poller(source, transport.clone());

        let started = Instant::now();
        let report = poller.run_cycle().await;
        assert_eq!(report.outcome, CycleOutcome::Published);
        assert_eq!(report.attempts, 2);
        // 10s request timeout, then the first 5s backoff.
        assert_eq!(started.elapsed(), Duration::from_secs(15));
    }

    #[tokio::test(start_paused = true)]
    async fn loop_runs_first_cycle_immediately() {
        let source = ScriptedSource::new(vec![Some(Ok(quote(1.0))), Some(Ok(quote(2.0)))]);
        let transport = Arc::new(RecordingTransport::new());
        let poller = Arc::new(poller(source, transport.clone()));
        let shutdown = CancellationToken::new();
        let handle = tokio::spawn(run_feed(
            poller.clone(),
            Duration::from_secs(300),
            shutdown.clone(),
        ));

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(transport.messages_to(CHANNEL).len(), 1);
        tokio::time::sleep(Duration::from_secs(300)).await;
        assert_eq!(transport.messages_to(CHANNEL).len(), 2);

        shutdown.cancel();
        handle.await.unwrap();
    }
}
