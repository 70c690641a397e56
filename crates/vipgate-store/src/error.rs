//! Store error types.

/// Store error.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Persistence layer unreachable or failing (I/O, pool, driver).
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// No record for the requested user.
    #[error("user not found")]
    NotFound,

    /// A uniqueness constraint would be violated.
    #[error("conflict: {0}")]
    Conflict(String),
}

impl StoreError {
    /// Create an unavailable error from any error type.
    #[inline]
    pub fn unavailable<E: std::fmt::Display>(err: E) -> Self {
        Self::Unavailable(err.to_string())
    }

    /// Whether this is the "not yet a user" case.
    #[inline]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound)
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => Self::NotFound,
            sqlx::Error::Database(ref db) if db.is_unique_violation() => {
                Self::Conflict(db.message().to_string())
            }
            other => Self::Unavailable(other.to_string()),
        }
    }
}
