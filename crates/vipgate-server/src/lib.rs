//! vipgate server library.
//!
//! The subscription service, the help desk, the background schedulers and
//! the runtime that wires them to the bot transports. Exposed for
//! integration tests and the unified `vipgate` CLI.

pub mod adapter;
pub mod cli;
mod error;
pub mod feed;
pub mod health;
pub mod help;
pub mod messages;
pub mod pending;
pub mod rate_limit;
pub mod review;
mod server;
pub mod service;
pub mod sweep;

pub use cli::ServerArgs;
pub use error::{FeedError, ServiceError};
pub use server::{MEMORY_STORE_URL, open_store, run_services, run_with_shutdown};
pub use service::{ServiceSettings, SubscriptionService, SubscriptionState};
pub use tokio_util::sync::CancellationToken;
