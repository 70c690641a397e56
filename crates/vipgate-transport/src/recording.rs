//! In-memory transport that records everything sent through it.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use vipgate_core::{ChatId, UserId};

use crate::error::TransportError;
use crate::message::{Inbound, Outbound};
use crate::traits::{InboundSource, Transport};

/// One recorded outbound action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sent {
    Message(Outbound),
    Copy {
        to: ChatId,
        from_chat: ChatId,
        message_id: i64,
        caption: Option<String>,
    },
    CallbackAnswer {
        callback_id: String,
        text: Option<String>,
    },
    Delete {
        chat: ChatId,
        message_id: i64,
    },
}

/// Transport for tests: records outbound actions and replays queued events.
#[derive(Debug, Default)]
pub struct RecordingTransport {
    sent: Mutex<Vec<Sent>>,
    admins: Mutex<HashMap<ChatId, Vec<UserId>>>,
    inbound: Mutex<VecDeque<Vec<Inbound>>>,
    fail_sends: AtomicBool,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the administrators reported for a chat.
    pub fn set_administrators(&self, chat: ChatId, admins: Vec<UserId>) {
        self.admins.lock().insert(chat, admins);
    }

    /// Queue a batch for [`InboundSource::next_batch`].
    pub fn push_batch(&self, batch: Vec<Inbound>) {
        self.inbound.lock().push_back(batch);
    }

    /// Make every subsequent outbound call fail.
    pub fn set_failing(&self, failing: bool) {
        self.fail_sends.store(failing, Ordering::Relaxed);
    }

    /// Everything recorded so far.
    pub fn sent(&self) -> Vec<Sent> {
        self.sent.lock().clone()
    }

    /// Text messages recorded so far.
    pub fn messages(&self) -> Vec<Outbound> {
        self.sent
            .lock()
            .iter()
            .filter_map(|s| match s {
                Sent::Message(m) => Some(m.clone()),
                _ => None,
            })
            .collect()
    }

    /// Text messages addressed to one chat.
    pub fn messages_to(&self, chat: ChatId) -> Vec<Outbound> {
        self.messages().into_iter().filter(|m| m.chat == chat).collect()
    }

    /// Drain and return everything recorded.
    pub fn take(&self) -> Vec<Sent> {
        std::mem::take(&mut *self.sent.lock())
    }

    /// Forget everything recorded.
    pub fn clear(&self) {
        self.sent.lock().clear();
    }

    fn record(&self, sent: Sent) -> Result<(), TransportError> {
        if self.fail_sends.load(Ordering::Relaxed) {
            return Err(TransportError::http("recording transport set to fail"));
        }
        self.sent.lock().push(sent);
        Ok(())
    }
}

#[async_trait]
impl Transport for RecordingTransport {
    async fn send(&self, message: Outbound) -> Result<(), TransportError> {
        self.record(Sent::Message(message))
    }

    async fn copy_message(
        &self,
        to: ChatId,
        from_chat: ChatId,
        message_id: i64,
        caption: Option<String>,
    ) -> Result<(), TransportError> {
        self.record(Sent::Copy {
            to,
            from_chat,
            message_id,
            caption,
        })
    }

    async fn answer_callback(
        &self,
        callback_id: &str,
        text: Option<&str>,
    ) -> Result<(), TransportError> {
        self.record(Sent::CallbackAnswer {
            callback_id: callback_id.to_string(),
            text: text.map(str::to_string),
        })
    }

    async fn delete_message(&self, chat: ChatId, message_id: i64) -> Result<(), TransportError> {
        self.record(Sent::Delete { chat, message_id })
    }

    async fn chat_administrators(&self, chat: ChatId) -> Result<Vec<UserId>, TransportError> {
        Ok(self.admins.lock().get(&chat).cloned().unwrap_or_default())
    }
}

#[async_trait]
impl InboundSource for RecordingTransport {
    async fn next_batch(&self) -> Result<Vec<Inbound>, TransportError> {
        Ok(self.inbound.lock().pop_front().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn records_in_order() {
        let t = RecordingTransport::new();
        t.send(Outbound::text(1, "a")).await.unwrap();
        t.delete_message(2, 9).await.unwrap();
        t.send(Outbound::text(2, "b")).await.unwrap();

        assert_eq!(t.sent().len(), 3);
        assert_eq!(t.messages_to(2), vec![Outbound::text(2, "b")]);
        assert_eq!(t.take().len(), 3);
        assert!(t.sent().is_empty());
    }

    #[tokio::test]
    async fn failing_mode() {
        let t = RecordingTransport::new();
        t.set_failing(true);
        assert!(t.send(Outbound::text(1, "a")).await.is_err());
        assert!(t.sent().is_empty());
    }

    #[tokio::test]
    async fn replays_batches() {
        let t = RecordingTransport::new();
        t.push_batch(vec![Inbound::command(1, "start", "")]);
        assert_eq!(t.next_batch().await.unwrap().len(), 1);
        assert!(t.next_batch().await.unwrap().is_empty());
    }
}
