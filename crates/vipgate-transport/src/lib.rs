//! Chat transport for vipgate.
//!
//! The core service never talks to the messaging network directly. It
//! receives [`Inbound`] events from an [`InboundSource`] and emits
//! [`Outbound`] messages through a [`Transport`]. Two implementations ship
//! with the crate:
//!
//! - [`TelegramTransport`]: Telegram Bot API over HTTPS (long polling)
//! - [`RecordingTransport`]: in-memory sink used by tests

mod error;
mod message;
mod recording;
pub mod telegram;
mod traits;

pub use error::TransportError;
pub use message::{Button, Inbound, InboundKind, Keyboard, Outbound, parse_command};
pub use recording::{RecordingTransport, Sent};
pub use telegram::TelegramTransport;
pub use traits::{InboundSource, Transport};
