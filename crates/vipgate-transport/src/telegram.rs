//! Telegram Bot API transport.
//!
//! Calls `https://api.telegram.org/bot<token>/<method>` with JSON bodies and
//! receives updates by long polling `getUpdates`.
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//! use vipgate_transport::TelegramTransport;
//!
//! let bot = TelegramTransport::new("123:abc", "https://api.telegram.org", Duration::from_secs(30))
//!     .expect("client");
//! ```

use std::fmt;
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, trace};
use vipgate_core::{ChatId, UserId};

use crate::error::TransportError;
use crate::message::{Inbound, InboundKind, Outbound, parse_command};
use crate::traits::{InboundSource, Transport};

/// Slack added to the HTTP timeout on top of the long-poll timeout.
const POLL_SLACK: Duration = Duration::from_secs(10);

/// Telegram Bot API client.
pub struct TelegramTransport {
    client: Client,
    base: String,
    poll_timeout: Duration,
    /// Next `getUpdates` offset.
    offset: AtomicI64,
}

impl fmt::Debug for TelegramTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // The base URL embeds the token.
        f.debug_struct("TelegramTransport")
            .field("poll_timeout", &self.poll_timeout)
            .field("offset", &self.offset.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

impl TelegramTransport {
    /// Create a client for one bot token.
    pub fn new(
        token: &str,
        api_base: &str,
        poll_timeout: Duration,
    ) -> Result<Self, TransportError> {
        let client = Client::builder()
            .timeout(poll_timeout + POLL_SLACK)
            .build()
            .map_err(TransportError::http)?;
        Ok(Self::with_client(client, token, api_base, poll_timeout))
    }

    /// Create with a custom reqwest [`Client`] (for proxies, etc.).
    pub fn with_client(
        client: Client,
        token: &str,
        api_base: &str,
        poll_timeout: Duration,
    ) -> Self {
        Self {
            client,
            base: format!("{}/bot{}", api_base.trim_end_matches('/'), token),
            poll_timeout,
            offset: AtomicI64::new(0),
        }
    }

    /// Call a Bot API method and decode its `result`.
    async fn call<Req: Serialize, Resp: DeserializeOwned>(
        &self,
        method: &str,
        body: &Req,
    ) -> Result<Resp, TransportError> {
        let resp = self
            .client
            .post(format!("{}/{}", self.base, method))
            .json(body)
            .send()
            .await?;

        let status = resp.status();
        let envelope: wire::Response<Resp> = resp.json().await.map_err(|e| {
            if status.is_success() {
                TransportError::Decode(e.to_string())
            } else {
                TransportError::Api {
                    code: Some(i64::from(status.as_u16())),
                    description: format!("HTTP {}", status.as_u16()),
                }
            }
        })?;

        match envelope {
            wire::Response {
                ok: true,
                result: Some(result),
                ..
            } => Ok(result),
            wire::Response {
                error_code,
                description,
                ..
            } => Err(TransportError::Api {
                code: error_code,
                description: description.unwrap_or_else(|| format!("{method} failed")),
            }),
        }
    }
}

#[async_trait]
impl Transport for TelegramTransport {
    async fn send(&self, message: Outbound) -> Result<(), TransportError> {
        let req = wire::SendMessage {
            chat_id: message.chat,
            text: &message.text,
            reply_markup: wire::InlineKeyboard::from_keyboard(&message.keyboard),
        };
        let _: serde_json::Value = self.call("sendMessage", &req).await?;
        Ok(())
    }

    async fn copy_message(
        &self,
        to: ChatId,
        from_chat: ChatId,
        message_id: i64,
        caption: Option<String>,
    ) -> Result<(), TransportError> {
        let req = wire::CopyMessage {
            chat_id: to,
            from_chat_id: from_chat,
            message_id,
            caption,
        };
        let _: serde_json::Value = self.call("copyMessage", &req).await?;
        Ok(())
    }

    async fn answer_callback(
        &self,
        callback_id: &str,
        text: Option<&str>,
    ) -> Result<(), TransportError> {
        let req = wire::AnswerCallback {
            callback_query_id: callback_id,
            text,
        };
        let _: bool = self.call("answerCallbackQuery", &req).await?;
        Ok(())
    }

    async fn delete_message(&self, chat: ChatId, message_id: i64) -> Result<(), TransportError> {
        let req = wire::DeleteMessage {
            chat_id: chat,
            message_id,
        };
        let _: bool = self.call("deleteMessage", &req).await?;
        Ok(())
    }

    async fn chat_administrators(&self, chat: ChatId) -> Result<Vec<UserId>, TransportError> {
        let req = wire::ChatRef { chat_id: chat };
        let members: Vec<wire::ChatMember> = self.call("getChatAdministrators", &req).await?;
        Ok(members.into_iter().map(|m| m.user.id).collect())
    }
}

#[async_trait]
impl InboundSource for TelegramTransport {
    async fn next_batch(&self) -> Result<Vec<Inbound>, TransportError> {
        let req = wire::GetUpdates {
            offset: self.offset.load(Ordering::Acquire),
            timeout: self.poll_timeout.as_secs(),
            allowed_updates: &["message", "callback_query"],
        };
        let updates: Vec<wire::Update> = self.call("getUpdates", &req).await?;

        if let Some(last) = updates.iter().map(|u| u.update_id).max() {
            self.offset.store(last + 1, Ordering::Release);
        }

        let events: Vec<Inbound> = updates.into_iter().filter_map(into_inbound).collect();
        if !events.is_empty() {
            debug!(count = events.len(), "received updates");
        }
        Ok(events)
    }
}

/// Map a raw update to an event; updates without a sender are dropped.
fn into_inbound(update: wire::Update) -> Option<Inbound> {
    if let Some(cb) = update.callback_query {
        let (chat, message_id) = cb
            .message
            .as_ref()
            .map_or((cb.from.id, 0), |m| (m.chat.id, m.message_id));
        return Some(Inbound {
            from: cb.from.id,
            chat,
            message_id,
            kind: InboundKind::Callback {
                id: cb.id,
                data: cb.data.unwrap_or_default(),
            },
        });
    }

    let msg = update.message?;
    let Some(from) = msg.from else {
        trace!(update_id = update.update_id, "update without sender");
        return None;
    };

    let kind = match msg.text {
        Some(text) => match parse_command(&text) {
            Some((name, args)) => InboundKind::Command {
                name: name.to_string(),
                args: args.to_string(),
            },
            None => InboundKind::Text { text },
        },
        None => InboundKind::Attachment {
            caption: msg.caption,
        },
    };

    Some(Inbound {
        from: from.id,
        chat: msg.chat.id,
        message_id: msg.message_id,
        kind,
    })
}

// ── Wire types (Bot API JSON) ─────────────────────────────────────

#[allow(missing_debug_implementations)]
mod wire {
    use serde::{Deserialize, Serialize};

    use crate::message::Button;

    #[derive(Deserialize)]
    pub struct Response<T> {
        pub ok: bool,
        pub result: Option<T>,
        pub error_code: Option<i64>,
        pub description: Option<String>,
    }

    #[derive(Serialize)]
    pub struct GetUpdates<'a> {
        pub offset: i64,
        pub timeout: u64,
        pub allowed_updates: &'a [&'a str],
    }

    #[derive(Deserialize)]
    pub struct Update {
        pub update_id: i64,
        pub message: Option<Message>,
        pub callback_query: Option<CallbackQuery>,
    }

    #[derive(Deserialize)]
    pub struct Message {
        pub message_id: i64,
        pub from: Option<User>,
        pub chat: Chat,
        pub text: Option<String>,
        pub caption: Option<String>,
    }

    #[derive(Deserialize)]
    pub struct CallbackQuery {
        pub id: String,
        pub from: User,
        pub message: Option<Message>,
        pub data: Option<String>,
    }

    #[derive(Deserialize)]
    pub struct User {
        pub id: i64,
    }

    #[derive(Deserialize)]
    pub struct Chat {
        pub id: i64,
    }

    #[derive(Deserialize)]
    pub struct ChatMember {
        pub user: User,
    }

    #[derive(Serialize)]
    pub struct SendMessage<'a> {
        pub chat_id: i64,
        pub text: &'a str,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub reply_markup: Option<InlineKeyboard<'a>>,
    }

    #[derive(Serialize)]
    pub struct InlineKeyboard<'a> {
        pub inline_keyboard: Vec<Vec<InlineButton<'a>>>,
    }

    impl<'a> InlineKeyboard<'a> {
        pub fn from_keyboard(rows: &'a [Vec<Button>]) -> Option<Self> {
            if rows.is_empty() {
                return None;
            }
            let inline_keyboard = rows
                .iter()
                .map(|row| row.iter().map(InlineButton::from).collect())
                .collect();
            Some(Self { inline_keyboard })
        }
    }

    #[derive(Serialize)]
    pub struct InlineButton<'a> {
        pub text: &'a str,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub callback_data: Option<&'a str>,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub url: Option<&'a str>,
    }

    impl<'a> From<&'a Button> for InlineButton<'a> {
        fn from(b: &'a Button) -> Self {
            match b {
                Button::Callback { text, data } => Self {
                    text,
                    callback_data: Some(data),
                    url: None,
                },
                Button::Url { text, url } => Self {
                    text,
                    callback_data: None,
                    url: Some(url),
                },
            }
        }
    }

    #[derive(Serialize)]
    pub struct CopyMessage {
        pub chat_id: i64,
        pub from_chat_id: i64,
        pub message_id: i64,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub caption: Option<String>,
    }

    #[derive(Serialize)]
    pub struct AnswerCallback<'a> {
        pub callback_query_id: &'a str,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub text: Option<&'a str>,
    }

    #[derive(Serialize)]
    pub struct DeleteMessage {
        pub chat_id: i64,
        pub message_id: i64,
    }

    #[derive(Serialize)]
    pub struct ChatRef {
        pub chat_id: i64,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Button;

    fn decode(json: &str) -> Option<Inbound> {
        into_inbound(serde_json::from_str(json).unwrap())
    }

    #[test]
    fn decode_command_message() {
        let ev = decode(
            r#"{"update_id":1,"message":{"message_id":7,"from":{"id":42},
                "chat":{"id":42},"text":"/start@GoldBot GS1"}}"#,
        )
        .unwrap();
        assert_eq!(ev.from, 42);
        assert_eq!(ev.message_id, 7);
        assert_eq!(
            ev.kind,
            InboundKind::Command {
                name: "start".into(),
                args: "GS1".into()
            }
        );
    }

    #[test]
    fn decode_photo_message() {
        let ev = decode(
            r#"{"update_id":2,"message":{"message_id":8,"from":{"id":42},
                "chat":{"id":42},"photo":[{"file_id":"x"}],"caption":"paid"}}"#,
        )
        .unwrap();
        assert_eq!(
            ev.kind,
            InboundKind::Attachment {
                caption: Some("paid".into())
            }
        );
    }

    #[test]
    fn decode_callback() {
        let ev = decode(
            r#"{"update_id":3,"callback_query":{"id":"cb1","from":{"id":42},
                "message":{"message_id":9,"chat":{"id":42}},"data":"plan_weekly"}}"#,
        )
        .unwrap();
        assert_eq!(ev.chat, 42);
        assert_eq!(ev.message_id, 9);
        assert_eq!(
            ev.kind,
            InboundKind::Callback {
                id: "cb1".into(),
                data: "plan_weekly".into()
            }
        );
    }

    #[test]
    fn drop_anonymous_message() {
        assert!(
            decode(r#"{"update_id":4,"message":{"message_id":1,"chat":{"id":-100},"text":"hi"}}"#)
                .is_none()
        );
        assert!(decode(r#"{"update_id":5}"#).is_none());
    }

    #[test]
    fn keyboard_serialization() {
        let rows = vec![vec![
            Button::callback("Weekly", "plan_weekly"),
            Button::url("Share", "https://t.me/x"),
        ]];
        let json = serde_json::to_value(wire::InlineKeyboard::from_keyboard(&rows)).unwrap();
        assert_eq!(
            json["inline_keyboard"][0][0]["callback_data"],
            "plan_weekly"
        );
        assert_eq!(json["inline_keyboard"][0][1]["url"], "https://t.me/x");
        assert!(json["inline_keyboard"][0][1].get("callback_data").is_none());
        assert!(wire::InlineKeyboard::from_keyboard(&[]).is_none());
    }

    #[test]
    fn debug_hides_token() {
        let t = TelegramTransport::with_client(
            Client::new(),
            "123:secret",
            "https://api.telegram.org/",
            Duration::from_secs(30),
        );
        assert!(!format!("{t:?}").contains("secret"));
        assert_eq!(t.base, "https://api.telegram.org/bot123:secret");
    }
}
