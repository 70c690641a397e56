//! SQL user store.
//!
//! Persists users in PostgreSQL, MySQL or SQLite through the SQLx `Any`
//! driver. The backend is chosen from the URL scheme.
//!
//! # Example
//!
//! ```ignore
//! use vipgate_store::sql::{SqlStore, SqlStoreConfig};
//!
//! let store = SqlStore::connect(SqlStoreConfig::new("sqlite:vipgate.db?mode=rwc")).await?;
//! store.init_schema().await?;
//! ```
//!
//! # Database Schema
//!
//! ```sql
//! CREATE TABLE vip_users (
//!     user_id BIGINT PRIMARY KEY,
//!     subscription_end BIGINT,              -- Unix timestamp, NULL = never subscribed
//!     referral_code VARCHAR(64) NOT NULL UNIQUE,
//!     referred_by VARCHAR(64),              -- may reference a missing code
//!     vip_status INTEGER NOT NULL DEFAULT 0,
//!     join_date BIGINT NOT NULL
//! );
//!
//! CREATE INDEX idx_vip_users_subscription_end ON vip_users(subscription_end);
//! ```

mod backend;
mod config;
mod queries;


pub use backend::{DatabaseType, SqlStore};
pub use config::SqlStoreConfig;
