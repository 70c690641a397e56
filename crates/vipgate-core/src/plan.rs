//! Subscription plans and their terms.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::defaults::*;
use crate::time::SECS_PER_DAY;

/// An enumerated subscription tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Plan {
    Weekly,
    Biweekly,
    Monthly,
}

impl Plan {
    /// All plans in display order.
    pub const ALL: [Plan; 3] = [Plan::Weekly, Plan::Biweekly, Plan::Monthly];

    /// Prefix of the callback payload that selects a plan.
    pub const CALLBACK_PREFIX: &'static str = "plan_";

    /// Lowercase name used in commands and logs.
    pub fn as_str(self) -> &'static str {
        match self {
            Plan::Weekly => "weekly",
            Plan::Biweekly => "biweekly",
            Plan::Monthly => "monthly",
        }
    }

    /// Human readable label.
    pub fn label(self) -> &'static str {
        match self {
            Plan::Weekly => "Weekly",
            Plan::Biweekly => "Bi-Weekly",
            Plan::Monthly => "Monthly",
        }
    }

    /// Callback payload for the plan button (`plan_weekly`, ...).
    pub fn callback_data(self) -> String {
        format!("{}{}", Self::CALLBACK_PREFIX, self.as_str())
    }

    /// Parse a callback payload produced by [`Plan::callback_data`].
    pub fn from_callback(data: &str) -> Option<Self> {
        data.strip_prefix(Self::CALLBACK_PREFIX)?.parse().ok()
    }
}

impl fmt::Display for Plan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a plan name is not recognized.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown plan '{0}' (expected weekly, biweekly or monthly)")]
pub struct PlanParseError(pub String);

impl FromStr for Plan {
    type Err = PlanParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "weekly" => Ok(Plan::Weekly),
            "biweekly" | "bi-weekly" => Ok(Plan::Biweekly),
            "monthly" => Ok(Plan::Monthly),
            other => Err(PlanParseError(other.to_string())),
        }
    }
}

/// Duration, commission and price of one plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanTerms {
    /// Subscription length in days.
    pub duration_days: u32,
    /// Referral commission paid per approval (USD).
    pub commission: u32,
    /// Display price (USD).
    #[serde(default)]
    pub price: u32,
}

impl PlanTerms {
    /// Subscription length in seconds.
    #[inline]
    pub fn duration_secs(&self) -> i64 {
        i64::from(self.duration_days) * SECS_PER_DAY
    }
}

/// The static plan table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanTable {
    #[serde(default = "default_weekly")]
    pub weekly: PlanTerms,
    #[serde(default = "default_biweekly")]
    pub biweekly: PlanTerms,
    #[serde(default = "default_monthly")]
    pub monthly: PlanTerms,
}

impl PlanTable {
    /// Terms for the given plan.
    #[inline]
    pub fn terms(&self, plan: Plan) -> &PlanTerms {
        match plan {
            Plan::Weekly => &self.weekly,
            Plan::Biweekly => &self.biweekly,
            Plan::Monthly => &self.monthly,
        }
    }

    /// Referral commission for the given plan.
    #[inline]
    pub fn commission(&self, plan: Plan) -> u32 {
        self.terms(plan).commission
    }

    /// Iterate over `(plan, terms)` in display order.
    pub fn iter(&self) -> impl Iterator<Item = (Plan, &PlanTerms)> {
        Plan::ALL.into_iter().map(move |p| (p, self.terms(p)))
    }
}

impl Default for PlanTable {
    fn default() -> Self {
        Self {
            weekly: default_weekly(),
            biweekly: default_biweekly(),
            monthly: default_monthly(),
        }
    }
}

fn default_weekly() -> PlanTerms {
    PlanTerms {
        duration_days: DEFAULT_WEEKLY_DAYS,
        commission: DEFAULT_WEEKLY_COMMISSION,
        price: DEFAULT_WEEKLY_PRICE,
    }
}

fn default_biweekly() -> PlanTerms {
    PlanTerms {
        duration_days: DEFAULT_BIWEEKLY_DAYS,
        commission: DEFAULT_BIWEEKLY_COMMISSION,
        price: DEFAULT_BIWEEKLY_PRICE,
    }
}

fn default_monthly() -> PlanTerms {
    PlanTerms {
        duration_days: DEFAULT_MONTHLY_DAYS,
        commission: DEFAULT_MONTHLY_COMMISSION,
        price: DEFAULT_MONTHLY_PRICE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_plan_names() {
        assert_eq!("weekly".parse::<Plan>(), Ok(Plan::Weekly));
        assert_eq!("BiWeekly".parse::<Plan>(), Ok(Plan::Biweekly));
        assert_eq!("bi-weekly".parse::<Plan>(), Ok(Plan::Biweekly));
        assert_eq!(" monthly ".parse::<Plan>(), Ok(Plan::Monthly));
        assert!("yearly".parse::<Plan>().is_err());
    }

    #[test]
    fn callback_payloads() {
        for plan in Plan::ALL {
            assert_eq!(Plan::from_callback(&plan.callback_data()), Some(plan));
        }
        assert_eq!(Plan::from_callback("plan_yearly"), None);
        assert_eq!(Plan::from_callback("sub_weekly"), None);
    }

    #[test]
    fn default_table_matches_published_terms() {
        let table = PlanTable::default();
        assert_eq!(table.terms(Plan::Weekly).duration_days, 7);
        assert_eq!(table.commission(Plan::Weekly), 5);
        assert_eq!(table.terms(Plan::Biweekly).duration_days, 14);
        assert_eq!(table.commission(Plan::Biweekly), 3);
        assert_eq!(table.terms(Plan::Monthly).duration_days, 30);
        assert_eq!(table.commission(Plan::Monthly), 5);
        assert_eq!(table.terms(Plan::Biweekly).duration_secs(), 14 * SECS_PER_DAY);
    }

    #[test]
    fn partial_table_keeps_defaults() {
        let table: PlanTable =
            serde_json::from_str(r#"{"monthly": {"duration_days": 31, "commission": 7}}"#).unwrap();
        assert_eq!(table.terms(Plan::Monthly).duration_days, 31);
        assert_eq!(table.terms(Plan::Monthly).price, 0);
        assert_eq!(table.weekly, PlanTable::default().weekly);
    }
}
