//! Help desk: the second bot answering questions and relaying live support.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, warn};
use vipgate_config::FaqEntry;
use vipgate_core::UserId;
use vipgate_transport::{Inbound, InboundKind, Outbound, Transport, TransportError};

use crate::adapter::EventHandler;
use crate::messages;
use crate::rate_limit::RateLimiter;

/// Help desk bot handler.
pub struct HelpDesk {
    transport: Arc<dyn Transport>,
    limiter: Arc<RateLimiter>,
    faq: Vec<FaqEntry>,
    admin_id: UserId,
}

impl HelpDesk {
    pub fn new(
        transport: Arc<dyn Transport>,
        limiter: Arc<RateLimiter>,
        faq: Vec<FaqEntry>,
        admin_id: UserId,
    ) -> Self {
        let faq = faq
            .into_iter()
            .map(|entry| FaqEntry {
                question: entry.question.to_lowercase(),
                answer: entry.answer,
            })
            .collect();
        Self {
            transport,
            limiter,
            faq,
            admin_id,
        }
    }

    /// First FAQ entry whose phrase appears in `text`.
    pub fn lookup(&self, text: &str) -> Option<&FaqEntry> {
        let text = text.to_lowercase();
        self.faq.iter().find(|e| text.contains(&e.question))
    }

    async fn dispatch(&self, event: &Inbound) -> Result<(), TransportError> {
        if !event.is_private() {
            return Ok(());
        }
        match &event.kind {
            InboundKind::Command { name, .. } if name == "start" => {
                self.reply(event, messages::help_welcome(&self.faq)).await
            }
            InboundKind::Command { name, .. } if name == "faq" => {
                self.reply(event, messages::help_faq(&self.faq)).await
            }
            InboundKind::Text { text } => self.answer(event, text).await,
            _ => Ok(()),
        }
    }

    async fn answer(&self, event: &Inbound, text: &str) -> Result<(), TransportError> {
        if let Some(entry) = self.lookup(text) {
            debug!(user_id = event.from, question = %entry.question, "faq answered");
            return self.reply(event, entry.answer.clone()).await;
        }

        self.reply(event, messages::HELP_FORWARDED).await?;
        self.transport
            .send(Outbound::text(
                self.admin_id,
                messages::help_forward(event.from, text),
            ))
            .await?;
        vipgate_metrics::record_help_forward();
        info!(user_id = event.from, "support request forwarded");
        Ok(())
    }

    async fn reply(&self, event: &Inbound, text: impl Into<String>) -> Result<(), TransportError> {
        self.transport.send(Outbound::text(event.chat, text)).await
    }
}

#[async_trait]
impl EventHandler for HelpDesk {
    async fn handle(&self, event: Inbound) {
        if !self.limiter.admit(event.from) {
            vipgate_metrics::record_event_rejected();
            if event.is_private()
                && let Err(e) = self.reply(&event, messages::RATE_LIMITED).await
            {
                debug!(error = %e, "failed to send rate limit notice");
            }
            return;
        }
        vipgate_metrics::record_event_admitted();

        if let Err(e) = self.dispatch(&event).await {
            vipgate_metrics::record_error(vipgate_core::ERROR_TRANSPORT);
            warn!(user_id = event.from, error = %e, "help desk reply failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use vipgate_transport::RecordingTransport;

    use super::*;

    const ADMIN: UserId = 1000;

    fn desk(transport: Arc<RecordingTransport>) -> HelpDesk {
        HelpDesk::new(
            transport,
            Arc::new(RateLimiter::new(30, 60)),
            vipgate_config::HelpConfig::default().faq,
            ADMIN,
        )
    }

    #[tokio::test]
    async fn faq_keyword_matches_case_insensitively() {
        let transport = Arc::new(RecordingTransport::new());
        let desk = desk(transport.clone());

        desk.handle(Inbound::text(5, "What does it COST per month?"))
            .await;

        let sent = transport.messages_to(5);
        assert_eq!(sent.len(), 1);
        assert!(sent[0].text.contains("$50 monthly"));
        assert!(transport.messages_to(ADMIN).is_empty());
    }

    #[tokio::test]
    async fn unmatched_text_is_forwarded_to_admin() {
        let transport = Arc::new(RecordingTransport::new());
        let desk = desk(transport.clone());

        desk.handle(Inbound::text(5, "my payment is stuck")).await;

        assert_eq!(
            transport.messages_to(5)[0].text,
            messages::HELP_FORWARDED
        );
        assert_eq!(
            transport.messages_to(ADMIN)[0].text,
            "Live support from 5: my payment is stuck"
        );
    }

    #[tokio::test]
    async fn start_and_faq_commands() {
        let transport = Arc::new(RecordingTransport::new());
        let desk = desk(transport.clone());

        desk.handle(Inbound::command(5, "start", "")).await;
        desk.handle(Inbound::command(5, "faq", "")).await;

        let sent = transport.messages_to(5);
        assert!(sent[0].text.starts_with("Welcome to the help desk"));
        assert!(sent[1].text.contains("how to join"));
    }

    #[tokio::test]
    async fn rate_limited_sender_gets_notice_only() {
        let transport = Arc::new(RecordingTransport::new());
        let desk = HelpDesk::new(
            transport.clone(),
            Arc::new(RateLimiter::new(1, 60)),
            Vec::new(),
            ADMIN,
        );

        desk.handle(Inbound::text(5, "hello")).await;
        desk.handle(Inbound::text(5, "hello again")).await;

        assert_eq!(transport.messages_to(ADMIN).len(), 1);
        assert_eq!(
            transport.messages_to(5).last().unwrap().text,
            messages::RATE_LIMITED
        );
    }
}
