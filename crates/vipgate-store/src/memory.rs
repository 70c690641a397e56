//! In-memory user store.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;
use vipgate_core::defaults::DEFAULT_REFERRAL_PREFIX;
use vipgate_core::{Plan, PlanTerms, UserId};

use crate::error::StoreError;
use crate::record::{Approval, SweepOutcome, UserRecord};
use crate::referral::referral_code;
use crate::traits::UserStore;

#[derive(Debug, Default)]
struct Inner {
    users: HashMap<UserId, UserRecord>,
    /// referral code -> owner
    codes: HashMap<String, UserId>,
}

/// Volatile store backed by a hash map.
///
/// Every operation runs under a single write lock, which gives the same
/// per-row atomicity as a database transaction. Useful for tests and
/// single-process deployments that accept losing state on restart.
#[derive(Debug)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
    prefix: String,
}

impl MemoryStore {
    /// Create an empty store with the default referral prefix.
    #[inline]
    pub fn new() -> Self {
        Self::with_prefix(DEFAULT_REFERRAL_PREFIX)
    }

    /// Create an empty store with a custom referral prefix.
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            inner: RwLock::new(Inner::default()),
            prefix: prefix.into(),
        }
    }

    /// Number of stored users.
    pub fn len(&self) -> usize {
        self.inner.read().users.len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.inner.read().users.is_empty()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn upsert_user(
        &self,
        user_id: UserId,
        referred_by: Option<&str>,
        now: i64,
    ) -> Result<String, StoreError> {
        let mut inner = self.inner.write();
        if let Some(existing) = inner.users.get(&user_id) {
            return Ok(existing.referral_code.clone());
        }

        let code = referral_code(&self.prefix, user_id);
        if inner.codes.contains_key(&code) {
            return Err(StoreError::Conflict(format!("referral code {code} taken")));
        }

        let referred_by = referred_by
            .filter(|r| !r.is_empty() && *r != code)
            .map(str::to_string);

        inner.codes.insert(code.clone(), user_id);
        inner.users.insert(
            user_id,
            UserRecord {
                user_id,
                subscription_end: None,
                referral_code: code.clone(),
                referred_by,
                vip_status: false,
                join_date: now,
            },
        );
        Ok(code)
    }

    async fn get_user(&self, user_id: UserId) -> Result<UserRecord, StoreError> {
        self.inner
            .read()
            .users
            .get(&user_id)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn find_by_referral_code(&self, code: &str) -> Result<Option<UserRecord>, StoreError> {
        let inner = self.inner.read();
        Ok(inner
            .codes
            .get(code)
            .and_then(|id| inner.users.get(id))
            .cloned())
    }

    async fn approve_subscription(
        &self,
        user_id: UserId,
        plan: Plan,
        terms: &PlanTerms,
        now: i64,
    ) -> Result<Approval, StoreError> {
        let mut inner = self.inner.write();
        let Inner { users, codes } = &mut *inner;

        let user = users.get_mut(&user_id).ok_or(StoreError::NotFound)?;
        let subscription_end = now + terms.duration_secs();
        user.subscription_end = Some(subscription_end);
        user.vip_status = true;

        let referred_by = user.referred_by.clone();
        let referrer = referred_by.as_deref().and_then(|c| codes.get(c)).copied();

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
        let mut inner = self.inner.write();
        let mut outcome = SweepOutcome::default();

        for user in inner.users.values_mut().filter(|u| u.vip_status) {
            match user.subscription_end {
                Some(end) if end < now => {
                    user.vip_status = false;
                    outcome.expired.push(user.user_id);
                }
                Some(end) if end - now <= reminder_window => {
                    outcome.reminders.push(user.user_id);
                }
                Some(_) => {}
                // VIP without an end date cannot be produced by approval;
                // treat it as lapsed rather than granting indefinitely.
                None => {
                    user.vip_status = false;
                    outcome.expired.push(user.user_id);
                }
            }
        }

        outcome.expired.sort_unstable();
        outcome.reminders.sort_unstable();
        Ok(outcome)
    }

    async fn list_users(&self) -> Result<Vec<UserRecord>, StoreError> {
        let mut users: Vec<_> = self.inner.read().users.values().cloned().collect();
        users.sort_by_key(|u| u.user_id);
        Ok(users)
    }
}
