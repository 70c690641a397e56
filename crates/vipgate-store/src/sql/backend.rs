//! SQL user store backend.

use async_trait::async_trait;
use sqlx::any::{AnyPoolOptions, AnyRow};
use sqlx::{AnyPool, Row};
use tracing::{debug, warn};
use vipgate_core::{Plan, PlanTerms, UserId};

use crate::error::StoreError;
use crate::record::{Approval, SweepOutcome, UserRecord};
use crate::referral::referral_code;
use crate::traits::UserStore;

use super::config::SqlStoreConfig;
use super::queries;

/// Database type enum for query selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatabaseType {
    /// PostgreSQL database.
    PostgreSQL,
    /// MySQL/MariaDB database.
    MySQL,
    /// SQLite database.
    SQLite,
}

impl DatabaseType {
    /// Detect database type from URL.
    pub fn from_url(url: &str) -> Option<Self> {
        if url.starts_with("postgres://") || url.starts_with("postgresql://") {
            Some(Self::PostgreSQL)
        } else if url.starts_with("mysql://") || url.starts_with("mariadb://") {
            Some(Self::MySQL)
        } else if url.starts_with("sqlite:") {
            Some(Self::SQLite)
        } else {
            None
        }
    }

    fn schema(self) -> &'static str {
        match self {
            Self::PostgreSQL => queries::SCHEMA_PG,
            Self::MySQL => queries::SCHEMA_MYSQL,
            Self::SQLite => queries::SCHEMA_SQLITE,
        }
    }

    /// Pick the PostgreSQL or `?`-placeholder variant of a query.
    #[inline]
    fn pick(self, pg: &'static str, other: &'static str) -> &'static str {
        match self {
            Self::PostgreSQL => pg,
            Self::MySQL | Self::SQLite => other,
        }
    }
}

/// SQL-backed user store.
///
/// Supports PostgreSQL, MySQL, and SQLite through SQLx.
pub struct SqlStore {
    pool: AnyPool,
    db_type: DatabaseType,
    config: SqlStoreConfig,
}

impl SqlStore {
    /// Connect to the database.
    pub async fn connect(config: SqlStoreConfig) -> Result<Self, StoreError> {
        // Install database drivers for the "any" pool
        sqlx::any::install_default_drivers();

        let db_type = DatabaseType::from_url(&config.database_url)
            .ok_or_else(|| StoreError::unavailable("unsupported database URL scheme"))?;

        let pool = AnyPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(config.acquire_timeout)
            .max_lifetime(config.max_lifetime)
            .idle_timeout(config.idle_timeout)
            .connect(&config.database_url)
            .await?;

        debug!(?db_type, max_connections = config.max_connections, "store connected");

        Ok(Self {
            pool,
            db_type,
            config,
        })
    }

    /// Create the table and indexes if they do not exist.
    pub async fn init_schema(&self) -> Result<(), StoreError> {
        // Execute each statement separately
        for stmt in self
            .db_type
            .schema()
            .split(';')
            .filter(|s| !s.trim().is_empty())
        {
            sqlx::query(stmt).execute(&self.pool).await?;
        }
        Ok(())
    }

    /// Get the underlying pool.
    pub fn pool(&self) -> &AnyPool {
        &self.pool
    }

    /// Get the detected database type.
    pub fn db_type(&self) -> DatabaseType {
        self.db_type
    }

    /// Get the configuration.
    pub fn config(&self) -> &SqlStoreConfig {
        &self.config
    }

    /// Close the pool, waiting for connections to be released.
    pub async fn close(&self) {
        self.pool.close().await;
    }

    /// Parse a user row from AnyRow.
    fn parse_user_row(row: &AnyRow) -> Result<UserRecord, StoreError> {
        Ok(UserRecord {
            user_id: row.try_get("user_id")?,
            subscription_end: row.try_get("subscription_end")?,
            referral_code: row.try_get("referral_code")?,
            referred_by: row.try_get("referred_by")?,
            vip_status: flag(row, "vip_status")?,
            join_date: row.try_get("join_date")?,
        })
    }

    async fn find_one(
        &self,
        query: &'static str,
        key: Key<'_>,
    ) -> Result<Option<UserRecord>, StoreError> {
        let q = sqlx::query(query);
        let q = match key {
            Key::Id(id) => q.bind(id),
            Key::Code(code) => q.bind(code.to_string()),
        };
        q.fetch_optional(&self.pool)
            .await?
            .as_ref()
            .map(Self::parse_user_row)
            .transpose()
    }
}

enum Key<'a> {
    Id(UserId),
    Code(&'a str),
}

/// Decode an integer flag column.
///
/// Drivers disagree on the width they report for `INTEGER`, so try both.
fn flag(row: &AnyRow, column: &str) -> Result<bool, StoreError> {
    row.try_get::<i32, _>(column)
        .map(|v| v != 0)
        .or_else(|_| row.try_get::<i64, _>(column).map(|v| v != 0))
        .or_else(|_| row.try_get::<bool, _>(column))
        .map_err(StoreError::from)
}

#[async_trait]
impl UserStore for SqlStore {
    async fn upsert_user(
        &self,
        user_id: UserId,
        referred_by: Option<&str>,
        now: i64,
    ) -> Result<String, StoreError> {
        let code = referral_code(&self.config.referral_prefix, user_id);
        let referred_by = referred_by
            .filter(|r| !r.is_empty() && *r != code)
            .map(str::to_string);

        let insert = match self.db_type {
            DatabaseType::PostgreSQL => queries::INSERT_USER_PG,
            DatabaseType::SQLite => queries::INSERT_USER_SQLITE,
            DatabaseType::MySQL => queries::INSERT_USER_MYSQL,
        };
        sqlx::query(insert)
            .bind(user_id)
            .bind(code.clone())
            .bind(referred_by)
            .bind(now)
            .execute(&self.pool)
            .await?;

        // The stored code wins over the computed one: the prefix may have
        // changed since the row was created.
        let query = self
            .db_type
            .pick(queries::FIND_BY_ID_PG, queries::FIND_BY_ID_MYSQL);
        match self.find_one(query, Key::Id(user_id)).await? {
            Some(user) => Ok(user.referral_code),
            // MySQL's INSERT IGNORE swallows a code collision
            None => Err(StoreError::Conflict(format!("referral code {code} taken"))),
        }
    }

    async fn get_user(&self, user_id: UserId) -> Result<UserRecord, StoreError> {
        let query = self
            .db_type
            .pick(queries::FIND_BY_ID_PG, queries::FIND_BY_ID_MYSQL);
        self.find_one(query, Key::Id(user_id))
            .await?
            .ok_or(StoreError::NotFound)
    }

    async fn find_by_referral_code(&self, code: &str) -> Result<Option<UserRecord>, StoreError> {
        let query = self
            .db_type
            .pick(queries::FIND_BY_CODE_PG, queries::FIND_BY_CODE_MYSQL);
        self.find_one(query, Key::Code(code)).await
    }

    async fn approve_subscription(
        &self,
        user_id: UserId,
        plan: Plan,
        terms: &PlanTerms,
        now: i64,
    ) -> Result<Approval, StoreError> {
        let subscription_end = now + terms.duration_secs();

        // Update first so the write lock is taken before any read.
        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query(self.db_type.pick(queries::APPROVE_PG, queries::APPROVE_MYSQL))
            .bind(subscription_end)
            .bind(user_id)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        if updated == 0 {
            tx.rollback().await?;
            return Err(StoreError::NotFound);
        }

        let referred_by: Option<String> = sqlx::query(
            self.db_type
                .pick(queries::REFERRED_BY_PG, queries::REFERRED_BY_MYSQL),
        )
        .bind(user_id)
        .fetch_one(&mut *tx)
        .await?
        .try_get("referred_by")?;

        let referrer = match referred_by.as_deref() {
            Some(code) => sqlx::query(
                self.db_type
                    .pick(queries::OWNER_OF_CODE_PG, queries::OWNER_OF_CODE_MYSQL),
            )
            .bind(code.to_string())
            .fetch_optional(&mut *tx)
            .await?
            .map(|row| row.try_get::<i64, _>("user_id"))
            .transpose()?,
            None => None,
        };

        tx.commit().await?;

        Ok(Approval {
            user_id,
            plan,
            subscription_end,
            referred_by,
            referrer,
            commission: terms.commission,
        })
    }

    async fn sweep_expirations(
        &self,
        now: i64,
        reminder_window: i64,
    ) -> Result<SweepOutcome, StoreError> {
        let horizon = now.saturating_add(reminder_window);

        // One transaction: a failed revocation rolls back the earlier ones so
        // the next sweep reports every lapsed user again.
        let mut tx = self.pool.begin().await?;

        let rows = sqlx::query(
            self.db_type
                .pick(queries::SWEEP_CANDIDATES_PG, queries::SWEEP_CANDIDATES_MYSQL),
        )
        .bind(horizon)
        .fetch_all(&mut *tx)
        .await?;

        let expire = self.db_type.pick(queries::EXPIRE_PG, queries::EXPIRE_MYSQL);
        let mut outcome = SweepOutcome::default();

        for row in rows {
            let user_id: i64 = row.try_get("user_id")?;
            let end: Option<i64> = row.try_get("subscription_end")?;

            match end {
                Some(end) if end >= now => outcome.reminders.push(user_id),
                _ => {
                    let affected = sqlx::query(expire)
                        .bind(user_id)
                        .bind(now)
                        .execute(&mut *tx)
                        .await?
                        .rows_affected();
                    if affected == 1 {
                        outcome.expired.push(user_id);
                    } else {
                        warn!(user_id, "expiry skipped, row changed during sweep");
                    }
                }
            }
        }

        tx.commit().await?;
        Ok(outcome)
    }

    async fn list_users(&self) -> Result<Vec<UserRecord>, StoreError> {
        sqlx::query(queries::LIST_ALL)
            .fetch_all(&self.pool)
            .await?
            .iter()
            .map(Self::parse_user_row)
            .collect()
    }
}
