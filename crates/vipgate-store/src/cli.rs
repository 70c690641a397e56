//! CLI module for vipgate-store.
//!
//! Operator commands for inspecting and repairing the user table. Used both
//! as a standalone binary and as the `users` subcommand of the main vipgate
//! CLI.
//!
//! # Usage
//!
//! ```bash
//! # Initialize database schema
//! vipgate-users init -d sqlite:vipgate.db?mode=rwc
//!
//! # List all users
//! vipgate-users list -d sqlite:vipgate.db
//!
//! # Show one user
//! vipgate-users show -d sqlite:vipgate.db 123456
//!
//! # Grant a plan by hand (no notifications are sent)
//! vipgate-users approve -d sqlite:vipgate.db 123456 monthly
//!
//! # Run one expiry sweep (no notifications are sent)
//! vipgate-users sweep -d sqlite:vipgate.db
//! ```

use clap::{Parser, Subcommand};
use tabled::{Table, Tabled};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use vipgate_core::defaults::{DEFAULT_REFERRAL_PREFIX, DEFAULT_REMINDER_WINDOW_SECS};
use vipgate_core::{Plan, PlanTable, UserId, days_until, unix_now};

use crate::record::UserRecord;
use crate::sql::{SqlStore, SqlStoreConfig};
use crate::traits::UserStore;

/// vipgate user management CLI arguments.
#[derive(Parser, Debug, Clone)]
#[command(name = "vipgate-users", version, about = "Manage vipgate subscribers")]
pub struct UsersArgs {
    #[command(subcommand)]
    pub command: UsersCommands,
}

/// Users CLI subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum UsersCommands {
    /// Initialize database schema.
    Init {
        /// Database connection URL.
        #[arg(short, long, env = "DATABASE_URL")]
        database: String,
    },

    /// List all users.
    List {
        /// Database connection URL.
        #[arg(short, long, env = "DATABASE_URL")]
        database: String,

        /// Output format (table, json).
        #[arg(short, long, default_value = "table")]
        format: String,

        /// Only show users with VIP access.
        #[arg(long)]
        vip: bool,
    },

    /// Show a single user.
    Show {
        /// Database connection URL.
        #[arg(short, long, env = "DATABASE_URL")]
        database: String,

        /// User id.
        #[arg(allow_negative_numbers = true)]
        user_id: UserId,
    },

    /// Grant a plan to an existing user without notifying anyone.
    Approve {
        /// Database connection URL.
        #[arg(short, long, env = "DATABASE_URL")]
        database: String,

        /// User id.
        #[arg(allow_negative_numbers = true)]
        user_id: UserId,

        /// Plan name (weekly, biweekly, monthly).
        plan: Plan,

        /// Override the plan duration in days.
        #[arg(long)]
        days: Option<u32>,
    },

    /// Revoke lapsed subscriptions without notifying anyone.
    Sweep {
        /// Database connection URL.
        #[arg(short, long, env = "DATABASE_URL")]
        database: String,

        /// Reminder window in seconds.
        #[arg(long, default_value_t = DEFAULT_REMINDER_WINDOW_SECS)]
        reminder_window: u64,
    },
}

/// User row for display.
#[derive(Tabled)]
struct UserDisplay {
    #[tabled(rename = "User ID")]
    user_id: i64,
    #[tabled(rename = "Referral")]
    referral_code: String,
    #[tabled(rename = "Referred By")]
    referred_by: String,
    #[tabled(rename = "VIP")]
    vip: String,
    #[tabled(rename = "Ends")]
    subscription_end: String,
    #[tabled(rename = "Days Left")]
    days_left: String,
    #[tabled(rename = "Joined")]
    join_date: String,
}

impl UserDisplay {
    fn new(user: &UserRecord, now: i64) -> Self {
        Self {
            user_id: user.user_id,
            referral_code: user.referral_code.clone(),
            referred_by: user.referred_by.clone().unwrap_or_else(|| "-".into()),
            vip: if user.vip_status { "Yes" } else { "No" }.to_string(),
            subscription_end: user
                .subscription_end
                .map_or_else(|| "Never".to_string(), format_timestamp),
            days_left: match user.subscription_end {
                Some(end) if user.vip_status => days_until(end, now).to_string(),
                _ => "-".to_string(),
            },
            join_date: format_timestamp(user.join_date),
        }
    }
}

/// Run the users CLI with the given arguments.
///
/// This is the main entry point for the users CLI, used by both the
/// standalone binary and the unified vipgate CLI.
pub async fn run(args: UsersArgs) -> Result<(), Box<dyn std::error::Error>> {
    match args.command {
        UsersCommands::Init { database } => {
            let store = connect(&database).await?;
            store.init_schema().await?;
            println!("Database schema initialized successfully.");
            Ok(())
        }
        UsersCommands::List {
            database,
            format,
            vip,
        } => list_users(&database, &format, vip).await,
        UsersCommands::Show { database, user_id } => show_user(&database, user_id).await,
        UsersCommands::Approve {
            database,
            user_id,
            plan,
            days,
        } => approve_user(&database, user_id, plan, days).await,
        UsersCommands::Sweep {
            database,
            reminder_window,
        } => {
            let store = connect(&database).await?;
            let window = i64::try_from(reminder_window).unwrap_or(i64::MAX);
            let outcome = store.sweep_expirations(unix_now(), window).await?;
            println!("Expired: {:?}", outcome.expired);
            println!("Expiring soon: {:?}", outcome.reminders);
            Ok(())
        }
    }
}

/// Connect to database.
async fn connect(url: &str) -> Result<SqlStore, Box<dyn std::error::Error>> {
    let config = SqlStoreConfig::new(url)
        .max_connections(1)
        .referral_prefix(DEFAULT_REFERRAL_PREFIX);
    Ok(SqlStore::connect(config).await?)
}

async fn list_users(
    url: &str,
    format: &str,
    vip_only: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let store = connect(url).await?;
    let users: Vec<UserRecord> = store
        .list_users()
        .await?
        .into_iter()
        .filter(|u| !vip_only || u.vip_status)
        .collect();

    if users.is_empty() {
        println!("No users found.");
        return Ok(());
    }

    match format {
        "json" => println!("{}", serde_json::to_string_pretty(&users)?),
        _ => {
            let now = unix_now();
            let rows: Vec<UserDisplay> = users.iter().map(|u| UserDisplay::new(u, now)).collect();
            println!("{}", Table::new(rows));
        }
    }
    Ok(())
}

async fn show_user(url: &str, user_id: UserId) -> Result<(), Box<dyn std::error::Error>> {
    let store = connect(url).await?;
    let user = store.get_user(user_id).await?;
    println!("{}", Table::new([UserDisplay::new(&user, unix_now())]));
    Ok(())
}

async fn approve_user(
    url: &str,
    user_id: UserId,
    plan: Plan,
    days: Option<u32>,
) -> Result<(), Box<dyn std::error::Error>> {
    let store = connect(url).await?;
    let mut terms = *PlanTable::default().terms(plan);
    if let Some(days) = days {
        if days == 0 {
            return Err("--days must be greater than 0".into());
        }
        terms.duration_days = days;
    }

    let approval = store
        .approve_subscription(user_id, plan, &terms, unix_now())
        .await?;
    println!(
        "User {} approved for {} until {}.",
        user_id,
        plan,
        format_timestamp(approval.subscription_end)
    );
    if let Some(referrer) = approval.referrer {
        println!(
            "Referrer {} is owed ${} (not notified).",
            referrer, approval.commission
        );
    }
    Ok(())
}

/// Format unix timestamp as RFC 3339 (UTC).
fn format_timestamp(ts: i64) -> String {
    OffsetDateTime::from_unix_timestamp(ts)
        .ok()
        .and_then(|dt| dt.format(&Rfc3339).ok())
        .unwrap_or_else(|| ts.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_approve_command() {
        let args = UsersArgs::try_parse_from([
            "vipgate-users",
            "approve",
            "-d",
            "sqlite::memory:",
            "42",
            "bi-weekly",
            "--days",
            "10",
        ])
        .unwrap();
        match args.command {
            UsersCommands::Approve {
                user_id, plan, days, ..
            } => {
                assert_eq!(user_id, 42);
                assert_eq!(plan, Plan::Biweekly);
                assert_eq!(days, Some(10));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn parse_sweep_default_window() {
        let args =
            UsersArgs::try_parse_from(["vipgate-users", "sweep", "-d", "sqlite::memory:"]).unwrap();
        match args.command {
            UsersCommands::Sweep {
                reminder_window, ..
            } => assert_eq!(reminder_window, DEFAULT_REMINDER_WINDOW_SECS),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn format_timestamp_utc() {
        assert_eq!(format_timestamp(0), "1970-01-01T00:00:00Z");
    }

    #[test]
    fn display_row() {
        let user = UserRecord {
            user_id: 1,
            subscription_end: Some(10 * 86_400),
            referral_code: "GS1".into(),
            referred_by: None,
            vip_status: true,
            join_date: 0,
        };
        let row = UserDisplay::new(&user, 7 * 86_400);
        assert_eq!(row.days_left, "3");
        assert_eq!(row.referred_by, "-");
        assert_eq!(row.vip, "Yes");
    }
}
