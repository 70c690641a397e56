//! User record and operation results.

use serde::Serialize;
use vipgate_core::{Plan, UserId};

/// One row of the users table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserRecord {
    /// Primary key, immutable.
    pub user_id: UserId,
    /// Unix timestamp at which VIP access ends (None = never subscribed).
    pub subscription_end: Option<i64>,
    /// Unique code derived from the id at creation; never reassigned.
    pub referral_code: String,
    /// Referral code of the user who referred this one. May dangle.
    pub referred_by: Option<String>,
    /// Whether VIP access is currently granted.
    pub vip_status: bool,
    /// Unix timestamp of first contact.
    pub join_date: i64,
}

impl UserRecord {
    /// Whether the user holds VIP access at `now`.
    ///
    /// A user the sweep has not reached yet still reads as active until the
    /// sweep runs; this helper checks both the flag and the end date.
    #[inline]
    pub fn is_active_at(&self, now: i64) -> bool {
        self.vip_status && self.subscription_end.is_some_and(|end| end >= now)
    }
}

/// Result of an approval.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Approval {
    pub user_id: UserId,
    pub plan: Plan,
    /// New end of the subscription.
    pub subscription_end: i64,
    /// Referral code recorded at first contact, if any.
    pub referred_by: Option<String>,
    /// Id of the user owning `referred_by`, when that code exists.
    pub referrer: Option<UserId>,
    /// Commission for the plan; only paid out when `referrer` is set.
    pub commission: u32,
}

/// Result of one expiry sweep.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepOutcome {
    /// Users whose access was revoked by this sweep.
    pub expired: Vec<UserId>,
    /// Active users within the reminder window. Not deduplicated across runs.
    pub reminders: Vec<UserId>,
}

impl SweepOutcome {
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.expired.is_empty() && self.reminders.is_empty()
    }
}
