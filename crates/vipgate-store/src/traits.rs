//! Data-access trait for user stores.

use std::sync::Arc;

use async_trait::async_trait;
use vipgate_core::{Plan, PlanTerms, UserId};

use crate::error::StoreError;
use crate::record::{Approval, SweepOutcome, UserRecord};

/// Persistent user store.
///
/// Implementations must be thread-safe (`Send + Sync`) as they are called
/// concurrently from inbound event handlers and the background sweep.
/// Each mutating operation is atomic with respect to a single user row.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Register a user on first contact and return their referral code.
    ///
    /// Idempotent: when the user already exists nothing is changed (the
    /// stored `referred_by` is kept) and the existing code is returned.
    async fn upsert_user(
        &self,
        user_id: UserId,
        referred_by: Option<&str>,
        now: i64,
    ) -> Result<String, StoreError>;

    /// Fetch a user, or [`StoreError::NotFound`].
    async fn get_user(&self, user_id: UserId) -> Result<UserRecord, StoreError>;

    /// Look up the owner of a referral code.
    async fn find_by_referral_code(&self, code: &str) -> Result<Option<UserRecord>, StoreError>;

    /// Grant VIP access for `terms.duration_days` from `now`.
    ///
    /// Sets the end date and the VIP flag and resolves the referrer in one
    /// atomic unit. Fails with [`StoreError::NotFound`] for unknown users.
    async fn approve_subscription(
        &self,
        user_id: UserId,
        plan: Plan,
        terms: &PlanTerms,
        now: i64,
    ) -> Result<Approval, StoreError>;

    /// Revoke lapsed subscriptions and collect near-expiry users.
    ///
    /// Rows with `subscription_end < now` are flipped to inactive and
    /// reported as expired; rows with at most `reminder_window` seconds left
    /// are reported as reminders without mutation.
    async fn sweep_expirations(
        &self,
        now: i64,
        reminder_window: i64,
    ) -> Result<SweepOutcome, StoreError>;

    /// All users ordered by id.
    async fn list_users(&self) -> Result<Vec<UserRecord>, StoreError>;
}

/// Blanket implementation for `Arc<S>` where `S: UserStore`.
#[async_trait]
impl<S: UserStore + ?Sized> UserStore for Arc<S> {
    #[inline]
    async fn upsert_user(
        &self,
        user_id: UserId,
        referred_by: Option<&str>,
        now: i64,
    ) -> Result<String, StoreError> {
        (**self).upsert_user(user_id, referred_by, now).await
    }

    #[inline]
    async fn get_user(&self, user_id: UserId) -> Result<UserRecord, StoreError> {
        (**self).get_user(user_id).await
    }

    #[inline]
    async fn find_by_referral_code(&self, code: &str) -> Result<Option<UserRecord>, StoreError> {
        (**self).find_by_referral_code(code).await
    }

    #[inline]
    async fn approve_subscription(
        &self,
        user_id: UserId,
        plan: Plan,
        terms: &PlanTerms,
        now: i64,
    ) -> Result<Approval, StoreError> {
        (**self).approve_subscription(user_id, plan, terms, now).await
    }

    #[inline]
    async fn sweep_expirations(
        &self,
        now: i64,
        reminder_window: i64,
    ) -> Result<SweepOutcome, StoreError> {
        (**self).sweep_expirations(now, reminder_window).await
    }

    #[inline]
    async fn list_users(&self) -> Result<Vec<UserRecord>, StoreError> {
        (**self).list_users().await
    }
}
