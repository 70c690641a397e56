//! Persistent user store for vipgate.
//!
//! The store is the single source of truth for subscription state. It holds
//! one [`UserRecord`] per user and exposes the four operations the rest of
//! the system builds on: idempotent registration, lookup, atomic approval
//! and the expiry sweep.
//!
//! # Example
//!
//! ```
//! use vipgate_core::{Plan, PlanTable};
//! use vipgate_store::{MemoryStore, UserStore};
//!
//! # async fn example() -> Result<(), vipgate_store::StoreError> {
//! let store = MemoryStore::new();
//! let now = 1_700_000_000;
//!
//! let code = store.upsert_user(42, None, now).await?;
//! assert_eq!(code, "GS42");
//!
//! let plans = PlanTable::default();
//! let approval = store
//!     .approve_subscription(42, Plan::Monthly, plans.terms(Plan::Monthly), now)
//!     .await?;
//! assert!(approval.referrer.is_none());
//! # Ok(())
//! # }
//! ```

pub mod cli;
mod error;
mod memory;
mod record;
mod referral;
pub mod sql;
mod traits;

pub use cli::UsersArgs;
pub use error::StoreError;
pub use memory::MemoryStore;
pub use record::{Approval, SweepOutcome, UserRecord};
pub use referral::referral_code;
pub use sql::{DatabaseType, SqlStore, SqlStoreConfig};
pub use traits::UserStore;
