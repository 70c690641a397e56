//! Core types and constants shared across vipgate crates.
//!
//! This crate provides:
//! - Default configuration values
//! - Error kind constants for metrics/logging
//! - The subscription [`Plan`] enum and the [`PlanTable`] of terms
//! - Identity aliases and wall-clock helpers

pub mod defaults;
pub mod errors;
pub mod plan;
pub mod time;

pub use defaults::*;
pub use errors::*;
pub use plan::{Plan, PlanParseError, PlanTable, PlanTerms};
pub use time::{SECS_PER_DAY, days_until, unix_now};

/// Project name.
pub const PROJECT_NAME: &str = "vipgate";
/// Project version (from Cargo.toml).
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Opaque numeric identity of a user on the messaging network.
pub type UserId = i64;

/// Identity of a chat (a user's private chat, a group or a broadcast channel).
pub type ChatId = i64;
