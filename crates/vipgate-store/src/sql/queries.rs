//! SQL queries for different databases.
//!
//! PostgreSQL uses numbered placeholders; MySQL and SQLite share the `?`
//! variants. Booleans are stored as integers so every backend decodes the
//! same way through the `Any` driver.

/// Schema (PostgreSQL).
pub const SCHEMA_PG: &str = r#"
CREATE TABLE IF NOT EXISTS vip_users (
    user_id BIGINT PRIMARY KEY,
    subscription_end BIGINT,
    referral_code VARCHAR(64) NOT NULL UNIQUE,
    referred_by VARCHAR(64),
    vip_status INTEGER NOT NULL DEFAULT 0,
    join_date BIGINT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_vip_users_subscription_end ON vip_users(subscription_end);
"#;

/// Schema (MySQL).
pub const SCHEMA_MYSQL: &str = r#"
CREATE TABLE IF NOT EXISTS vip_users (
    user_id BIGINT PRIMARY KEY,
    subscription_end BIGINT NULL,
    referral_code VARCHAR(64) NOT NULL UNIQUE,
    referred_by VARCHAR(64) NULL,
    vip_status INTEGER NOT NULL DEFAULT 0,
    join_date BIGINT NOT NULL,
    INDEX idx_vip_users_subscription_end (subscription_end)
);
"#;

/// Schema (SQLite).
pub const SCHEMA_SQLITE: &str = r#"
CREATE TABLE IF NOT EXISTS vip_users (
    user_id INTEGER PRIMARY KEY,
    subscription_end INTEGER,
    referral_code TEXT NOT NULL UNIQUE,
    referred_by TEXT,
    vip_status INTEGER NOT NULL DEFAULT 0,
    join_date INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_vip_users_subscription_end ON vip_users(subscription_end);
"#;

/// Insert a new user, leaving an existing row untouched (PostgreSQL).
pub const INSERT_USER_PG: &str = r#"
INSERT INTO vip_users (user_id, referral_code, referred_by, vip_status, join_date)
VALUES ($1, $2, $3, 0, $4)
ON CONFLICT (user_id) DO NOTHING
"#;

/// Insert a new user, leaving an existing row untouched (SQLite).
pub const INSERT_USER_SQLITE: &str = r#"
INSERT INTO vip_users (user_id, referral_code, referred_by, vip_status, join_date)
VALUES (?, ?, ?, 0, ?)
ON CONFLICT (user_id) DO NOTHING
"#;

/// Insert a new user, leaving an existing row untouched (MySQL).
pub const INSERT_USER_MYSQL: &str = r#"
INSERT IGNORE INTO vip_users (user_id, referral_code, referred_by, vip_status, join_date)
VALUES (?, ?, ?, 0, ?)
"#;

/// Find a user by id (PostgreSQL).
pub const FIND_BY_ID_PG: &str = r#"
SELECT user_id, subscription_end, referral_code, referred_by, vip_status, join_date
FROM vip_users
WHERE user_id = $1
"#;

/// Find a user by id (MySQL/SQLite).
pub const FIND_BY_ID_MYSQL: &str = r#"
SELECT user_id, subscription_end, referral_code, referred_by, vip_status, join_date
FROM vip_users
WHERE user_id = ?
"#;

/// Find a user by referral code (PostgreSQL).
pub const FIND_BY_CODE_PG: &str = r#"
SELECT user_id, subscription_end, referral_code, referred_by, vip_status, join_date
FROM vip_users
WHERE referral_code = $1
"#;

/// Find a user by referral code (MySQL/SQLite).
pub const FIND_BY_CODE_MYSQL: &str = r#"
SELECT user_id, subscription_end, referral_code, referred_by, vip_status, join_date
FROM vip_users
WHERE referral_code = ?
"#;

/// All users (any database).
pub const LIST_ALL: &str = r#"
SELECT user_id, subscription_end, referral_code, referred_by, vip_status, join_date
FROM vip_users
ORDER BY user_id
"#;

/// Grant access until the given end (PostgreSQL).
pub const APPROVE_PG: &str = r#"
UPDATE vip_users
SET subscription_end = $1, vip_status = 1
WHERE user_id = $2
"#;

/// Grant access until the given end (MySQL/SQLite).
pub const APPROVE_MYSQL: &str = r#"
UPDATE vip_users
SET subscription_end = ?, vip_status = 1
WHERE user_id = ?
"#;

/// Referral code recorded for a user (PostgreSQL).
pub const REFERRED_BY_PG: &str = "SELECT referred_by FROM vip_users WHERE user_id = $1";

/// Referral code recorded for a user (MySQL/SQLite).
pub const REFERRED_BY_MYSQL: &str = "SELECT referred_by FROM vip_users WHERE user_id = ?";

/// Owner of a referral code (PostgreSQL).
pub const OWNER_OF_CODE_PG: &str = "SELECT user_id FROM vip_users WHERE referral_code = $1";

/// Owner of a referral code (MySQL/SQLite).
pub const OWNER_OF_CODE_MYSQL: &str = "SELECT user_id FROM vip_users WHERE referral_code = ?";

/// Active users ending at or before the horizon (PostgreSQL).
pub const SWEEP_CANDIDATES_PG: &str = r#"
SELECT user_id, subscription_end
FROM vip_users
WHERE vip_status = 1 AND (subscription_end IS NULL OR subscription_end <= $1)
ORDER BY user_id
"#;

/// Active users ending at or before the horizon (MySQL/SQLite).
pub const SWEEP_CANDIDATES_MYSQL: &str = r#"
SELECT user_id, subscription_end
FROM vip_users
WHERE vip_status = 1 AND (subscription_end IS NULL OR subscription_end <= ?)
ORDER BY user_id
"#;

/// Revoke access if still lapsed (PostgreSQL).
///
/// The end-date guard keeps a concurrent re-approval from being undone.
pub const EXPIRE_PG: &str = r#"
UPDATE vip_users
SET vip_status = 0
WHERE user_id = $1 AND vip_status = 1 AND (subscription_end IS NULL OR subscription_end < $2)
"#;

/// Revoke access if still lapsed (MySQL/SQLite).
pub const EXPIRE_MYSQL: &str = r#"
UPDATE vip_users
SET vip_status = 0
WHERE user_id = ? AND vip_status = 1 AND (subscription_end IS NULL OR subscription_end < ?)
"#;
