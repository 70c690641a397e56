//! Transport traits.

use std::sync::Arc;

use async_trait::async_trait;
use vipgate_core::{ChatId, UserId};

use crate::error::TransportError;
use crate::message::{Inbound, Outbound};

/// Outbound side of a chat transport.
///
/// Implementations must be thread-safe (`Send + Sync`); handlers and
/// background tasks share one instance.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send a text message.
    async fn send(&self, message: Outbound) -> Result<(), TransportError>;

    /// Copy an existing message (any media) into another chat.
    async fn copy_message(
        &self,
        to: ChatId,
        from_chat: ChatId,
        message_id: i64,
        caption: Option<String>,
    ) -> Result<(), TransportError>;

    /// Acknowledge a callback press, optionally with a toast.
    async fn answer_callback(
        &self,
        callback_id: &str,
        text: Option<&str>,
    ) -> Result<(), TransportError>;

    /// Delete a message.
    async fn delete_message(&self, chat: ChatId, message_id: i64) -> Result<(), TransportError>;

    /// Current administrators of a chat.
    async fn chat_administrators(&self, chat: ChatId) -> Result<Vec<UserId>, TransportError>;
}

/// Inbound side of a chat transport.
#[async_trait]
pub trait InboundSource: Send + Sync {
    /// Wait for the next batch of events. An empty batch is a normal timeout.
    async fn next_batch(&self) -> Result<Vec<Inbound>, TransportError>;
}

/// Blanket implementation for `Arc<T>` where `T: Transport`.
#[async_trait]
impl<T: Transport + ?Sized> Transport for Arc<T> {
    #[inline]
    async fn send(&self, message: Outbound) -> Result<(), TransportError> {
        (**self).send(message).await
    }

    #[inline]
    async fn copy_message(
        &self,
        to: ChatId,
        from_chat: ChatId,
        message_id: i64,
        caption: Option<String>,
    ) -> Result<(), TransportError> {
        (**self)
            .copy_message(to, from_chat, message_id, caption)
            .await
    }

    #[inline]
    async fn answer_callback(
        &self,
        callback_id: &str,
        text: Option<&str>,
    ) -> Result<(), TransportError> {
        (**self).answer_callback(callback_id, text).await
    }

    #[inline]
    async fn delete_message(&self, chat: ChatId, message_id: i64) -> Result<(), TransportError> {
        (**self).delete_message(chat, message_id).await
    }

    #[inline]
    async fn chat_administrators(&self, chat: ChatId) -> Result<Vec<UserId>, TransportError> {
        (**self).chat_administrators(chat).await
    }
}
