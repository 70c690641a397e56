//! Transport adapters: poll a bot for events and drive a handler.
//!
//! Events from one user are handled in arrival order; different users are
//! handled concurrently.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};
use vipgate_core::UserId;
use vipgate_transport::{Inbound, InboundSource};

/// Consumer of inbound events.
#[async_trait]
pub trait EventHandler: Send + Sync {
    /// Handle one event. Failures are reported by the handler itself.
    async fn handle(&self, event: Inbound);
}

#[async_trait]
impl<H: EventHandler + ?Sized> EventHandler for Arc<H> {
    #[inline]
    async fn handle(&self, event: Inbound) {
        (**self).handle(event).await
    }
}

/// Handle one batch: one task per user, events of a user in order.
/// Returns once every event has been handled.
pub async fn dispatch_batch(handler: &Arc<dyn EventHandler>, events: Vec<Inbound>) {
    let mut per_user: HashMap<UserId, Vec<Inbound>> = HashMap::new();
    for event in events {
        per_user.entry(event.from).or_default().push(event);
    }

    let mut tasks = JoinSet::new();
    for (_, events) in per_user {
        let handler = handler.clone();
        tasks.spawn(async move {
            for event in events {
                handler.handle(event).await;
            }
        });
    }
    while let Some(result) = tasks.join_next().await {
        if let Err(e) = result {
            error!(error = %e, "event task failed");
        }
    }
}

/// Poll `source` until shutdown, dispatching each batch to `handler`.
///
/// A batch in progress completes before shutdown is observed. Poll
/// failures are logged and retried after `retry_delay`.
pub async fn run_adapter(
    name: &'static str,
    source: Arc<dyn InboundSource>,
    handler: Arc<dyn EventHandler>,
    retry_delay: Duration,
    shutdown: CancellationToken,
) {
    loop {
        let batch = tokio::select! {
            biased;

            _ = shutdown.cancelled() => {
                debug!(adapter = name, "adapter shutting down");
                return;
            }

            batch = source.next_batch() => batch,
        };

        match batch {
            Ok(events) if events.is_empty() => tokio::task::yield_now().await,
            Ok(events) => {
                debug!(adapter = name, count = events.len(), "dispatching batch");
                dispatch_batch(&handler, events).await;
            }
            Err(e) => {
                vipgate_metrics::record_error(vipgate_core::ERROR_TRANSPORT);
                warn!(adapter = name, error = %e, retry_ms = retry_delay.as_millis() as u64, "poll failed");
                tokio::select! {
                    biased;
                    _ = shutdown.cancelled() => return,
                    _ = tokio::time::sleep(retry_delay) => {}
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use parking_lot::Mutex;
    use vipgate_transport::RecordingTransport;

    use super::*;

    #[derive(Default)]
    struct Collect {
        seen: Mutex<Vec<(UserId, String)>>,
    }

    #[async_trait]
    impl EventHandler for Collect {
        async fn handle(&self, event: Inbound) {
            if let vipgate_transport::InboundKind::Text { text } = &event.kind {
                tokio::task::yield_now().await;
                self.seen.lock().push((event.from, text.clone()));
            }
        }
    }

    #[tokio::test]
    async fn per_user_order_is_preserved() {
        let collect = Arc::new(Collect::default());
        let handler: Arc<dyn EventHandler> = collect.clone();

        let events = (0..5)
            .flat_map(|i| {
                [
                    Inbound::text(1, &format!("a{i}")),
                    Inbound::text(2, &format!("b{i}")),
                ]
            })
            .collect();
        dispatch_batch(&handler, events).await;

        let seen = collect.seen.lock().clone();
        assert_eq!(seen.len(), 10);
        let user1: Vec<_> = seen.iter().filter(|(u, _)| *u == 1).map(|(_, t)| t.as_str()).collect();
        assert_eq!(user1, vec!["a0", "a1", "a2", "a3", "a4"]);
    }

    #[tokio::test]
    async fn adapter_drains_batches_until_shutdown() {
        let transport = Arc::new(RecordingTransport::new());
        transport.push_batch(vec![Inbound::text(1, "first")]);
        transport.push_batch(vec![Inbound::text(1, "second")]);

        let collect = Arc::new(Collect::default());
        let shutdown = CancellationToken::new();
        let handle = tokio::spawn(run_adapter(
            "test",
            transport,
            collect.clone(),
            Duration::from_millis(10),
            shutdown.clone(),
        ));

        for _ in 0..1000 {
            if collect.seen.lock().len() == 2 {
                break;
            }
            tokio::task::yield_now().await;
        }
        shutdown.cancel();
        handle.await.unwrap();

        let texts: Vec<_> = collect.seen.lock().iter().map(|(_, t)| t.clone()).collect();
        assert_eq!(texts, vec!["first", "second"]);
    }
}
