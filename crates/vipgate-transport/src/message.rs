//! Inbound events and outbound messages.

use serde::Serialize;
use vipgate_core::{ChatId, UserId};

/// An inline keyboard button.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Button {
    /// Sends `data` back as a callback when pressed.
    Callback { text: String, data: String },
    /// Opens a URL.
    Url { text: String, url: String },
}

impl Button {
    pub fn callback(text: impl Into<String>, data: impl Into<String>) -> Self {
        Self::Callback {
            text: text.into(),
            data: data.into(),
        }
    }

    pub fn url(text: impl Into<String>, url: impl Into<String>) -> Self {
        Self::Url {
            text: text.into(),
            url: url.into(),
        }
    }

    pub fn text(&self) -> &str {
        match self {
            Self::Callback { text, .. } | Self::Url { text, .. } => text,
        }
    }
}

/// Rows of buttons attached to a message.
pub type Keyboard = Vec<Vec<Button>>;

/// A text message to a user, group or channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outbound {
    pub chat: ChatId,
    pub text: String,
    pub keyboard: Keyboard,
}

impl Outbound {
    /// Plain text message.
    pub fn text(chat: ChatId, text: impl Into<String>) -> Self {
        Self {
            chat,
            text: text.into(),
            keyboard: Vec::new(),
        }
    }

    /// Builder: attach a keyboard.
    pub fn with_keyboard(mut self, keyboard: Keyboard) -> Self {
        self.keyboard = keyboard;
        self
    }

    /// Callback payloads of all buttons, in display order.
    pub fn callback_data(&self) -> impl Iterator<Item = &str> {
        self.keyboard.iter().flatten().filter_map(|b| match b {
            Button::Callback { data, .. } => Some(data.as_str()),
            Button::Url { .. } => None,
        })
    }
}

/// What an inbound event carries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum InboundKind {
    /// `/name args`, with any `@botname` suffix stripped.
    Command { name: String, args: String },
    /// Inline keyboard press.
    Callback { id: String, data: String },
    /// Free-form text.
    Text { text: String },
    /// Photo, document or other media, with an optional caption.
    Attachment { caption: Option<String> },
}

/// One event from the messaging network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Inbound {
    /// Sender identity (rate limiting and authorization key).
    pub from: UserId,
    /// Chat the event happened in.
    pub chat: ChatId,
    /// Message the event refers to (the keyboard message for callbacks).
    pub message_id: i64,
    pub kind: InboundKind,
}

impl Inbound {
    /// Build an event from raw message text, recognizing commands.
    pub fn from_text(from: UserId, chat: ChatId, message_id: i64, text: &str) -> Self {
        let kind = match parse_command(text) {
            Some((name, args)) => InboundKind::Command {
                name: name.to_string(),
                args: args.to_string(),
            },
            None => InboundKind::Text {
                text: text.to_string(),
            },
        };
        Self {
            from,
            chat,
            message_id,
            kind,
        }
    }

    /// A command sent in the user's private chat.
    pub fn command(from: UserId, name: &str, args: &str) -> Self {
        Self {
            from,
            chat: from,
            message_id: 0,
            kind: InboundKind::Command {
                name: name.to_string(),
                args: args.to_string(),
            },
        }
    }

    /// A callback press in the user's private chat.
    pub fn callback(from: UserId, data: &str) -> Self {
        Self {
            from,
            chat: from,
            message_id: 0,
            kind: InboundKind::Callback {
                id: format!("cb-{from}"),
                data: data.to_string(),
            },
        }
    }

    /// Free-form text in the user's private chat.
    pub fn text(from: UserId, text: &str) -> Self {
        Self {
            from,
            chat: from,
            message_id: 0,
            kind: InboundKind::Text {
                text: text.to_string(),
            },
        }
    }

    /// An attachment in the user's private chat.
    pub fn attachment(from: UserId, message_id: i64, caption: Option<&str>) -> Self {
        Self {
            from,
            chat: from,
            message_id,
            kind: InboundKind::Attachment {
                caption: caption.map(str::to_string),
            },
        }
    }

    /// Builder: move the event to another chat.
    pub fn in_chat(mut self, chat: ChatId) -> Self {
        self.chat = chat;
        self
    }

    /// Whether the event happened in the sender's private chat.
    #[inline]
    pub fn is_private(&self) -> bool {
        self.chat == self.from
    }
}

/// Split `/name@bot rest` into `("name", "rest")`.
///
/// Returns `None` for text that is not a command.
pub fn parse_command(text: &str) -> Option<(&str, &str)> {
    let rest = text.trim_start().strip_prefix('/')?;
    let (head, args) = match rest.split_once(char::is_whitespace) {
        Some((head, args)) => (head, args.trim()),
        None => (rest, ""),
    };
    let name = head.split('@').next().unwrap_or(head);
    if name.is_empty() {
        return None;
    }
    Some((name, args))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_plain_command() {
        assert_eq!(parse_command("/start"), Some(("start", "")));
        assert_eq!(parse_command("/start GS42"), Some(("start", "GS42")));
        assert_eq!(
            parse_command("/approve  123   monthly "),
            Some(("approve", "123   monthly"))
        );
    }

    #[test]
    fn parse_command_with_bot_suffix() {
        assert_eq!(parse_command("/subscribe@GoldBot"), Some(("subscribe", "")));
        assert_eq!(parse_command("/signal@GoldBot buy"), Some(("signal", "buy")));
    }

    #[test]
    fn non_commands() {
        assert_eq!(parse_command("hello"), None);
        assert_eq!(parse_command("/"), None);
        assert_eq!(parse_command(""), None);
    }

    #[test]
    fn from_text_classifies() {
        let ev = Inbound::from_text(1, 1, 5, "/terms");
        assert!(matches!(ev.kind, InboundKind::Command { ref name, .. } if name == "terms"));
        let ev = Inbound::from_text(1, 1, 6, "tx hash 0xabc");
        assert!(matches!(ev.kind, InboundKind::Text { .. }));
        assert!(ev.is_private());
    }

    #[test]
    fn outbound_callback_data() {
        let msg = Outbound::text(1, "pick").with_keyboard(vec![
            vec![Button::callback("Weekly", "plan_weekly")],
            vec![Button::url("Docs", "https://example.com")],
        ]);
        assert_eq!(msg.callback_data().collect::<Vec<_>>(), vec!["plan_weekly"]);
    }
}
