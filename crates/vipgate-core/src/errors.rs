//! Error kind constants for metrics and logging.
//!
//! These constants keep error classification consistent across crates.

/// Persistence layer unreachable or failing.
pub const ERROR_STORE: &str = "store";
/// Malformed command arguments.
pub const ERROR_VALIDATION: &str = "validation";
/// Non-admin invoking an admin operation.
pub const ERROR_UNAUTHORIZED: &str = "unauthorized";
/// Outbound message delivery failed.
pub const ERROR_TRANSPORT: &str = "transport";
/// External quote feed failed.
pub const ERROR_FEED: &str = "feed";
/// Configuration error.
pub const ERROR_CONFIG: &str = "config";
