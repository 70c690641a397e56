//! Transport error types.

/// Transport error.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Request never produced a response (DNS, TLS, timeout, reset).
    #[error("transport request failed: {0}")]
    Http(String),

    /// The remote API rejected the call.
    #[error("api error: {description}")]
    Api {
        code: Option<i64>,
        description: String,
    },

    /// The response body did not match the expected shape.
    #[error("malformed response: {0}")]
    Decode(String),
}

impl TransportError {
    /// Create an HTTP error from any error type.
    #[inline]
    pub fn http<E: std::fmt::Display>(err: E) -> Self {
        Self::Http(err.to_string())
    }

    /// Whether retrying the same call may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Http(_) => true,
            Self::Api { code, .. } => matches!(code, Some(429) | Some(500..=599)),
            Self::Decode(_) => false,
        }
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::Decode(err.to_string())
        } else {
            Self::Http(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_classification() {
        assert!(TransportError::http("reset").is_retryable());
        assert!(
            TransportError::Api {
                code: Some(429),
                description: "Too Many Requests".into()
            }
            .is_retryable()
        );
        assert!(
            !TransportError::Api {
                code: Some(403),
                description: "bot was blocked by the user".into()
            }
            .is_retryable()
        );
        assert!(!TransportError::Decode("eof".into()).is_retryable());
    }
}
