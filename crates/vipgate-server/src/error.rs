//! Service error types.

use std::time::Duration;

use vipgate_core::{ERROR_CONFIG, ERROR_STORE, ERROR_TRANSPORT, ERROR_UNAUTHORIZED, ERROR_VALIDATION};
use vipgate_store::StoreError;
use vipgate_transport::TransportError;

/// Error produced while handling an inbound event or starting the service.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// Malformed input; the message is shown to the invoker.
    #[error("{0}")]
    Validation(String),
    /// Operator command from a non-operator. Dropped without a reply.
    #[error("unauthorized")]
    Unauthorized,
    #[error("store: {0}")]
    Store(#[from] StoreError),
    #[error("transport: {0}")]
    Transport(#[from] TransportError),
    #[error("config: {0}")]
    Config(String),
}

impl ServiceError {
    /// Get the error type string for metrics.
    pub fn error_type(&self) -> &'static str {
        match self {
            ServiceError::Validation(_) => ERROR_VALIDATION,
            ServiceError::Unauthorized => ERROR_UNAUTHORIZED,
            ServiceError::Store(_) => ERROR_STORE,
            ServiceError::Transport(_) => ERROR_TRANSPORT,
            ServiceError::Config(_) => ERROR_CONFIG,
        }
    }

    pub(crate) fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }
}

/// Failure of one quote fetch attempt.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FeedError {
    #[error("network error: {0}")]
    Network(String),
    #[error("request timed out after {0:?}")]
    Timeout(Duration),
    #[error("unexpected HTTP status {0}")]
    Status(u16),
    #[error("response missing field '{0}'")]
    MissingField(String),
    #[error("parse error: {0}")]
    Parse(String),
}

impl FeedError {
    /// Whether another attempt in the same cycle may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            FeedError::Network(_) | FeedError::Timeout(_) => true,
            FeedError::Status(code) => *code == 429 || *code >= 500,
            FeedError::MissingField(_) | FeedError::Parse(_) => false,
        }
    }
}

impl From<reqwest::Error> for FeedError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            FeedError::Timeout(Duration::ZERO)
        } else if err.is_decode() {
            FeedError::Parse(err.to_string())
        } else if let Some(status) = err.status() {
            FeedError::Status(status.as_u16())
        } else {
            FeedError::Network(err.to_string())
        }
    }
}
