//! Outbound message text.

use std::fmt::Write;

use vipgate_config::PaymentConfig;
use vipgate_core::{Plan, PlanTable, PlanTerms, UserId};
use vipgate_transport::{Button, Keyboard};

pub const RATE_LIMITED: &str = "Too many requests. Please try again later.";
pub const GENERIC_FAILURE: &str = "Something went wrong. Please try again in a moment.";
pub const NOT_REGISTERED: &str = "You are not registered yet. Send /start first.";
pub const PROOF_RECEIVED: &str =
    "Payment proof received! An operator will verify it shortly and you'll be notified here.";
pub const UNKNOWN_PLAN: &str = "Unknown plan. Use /subscribe to pick one again.";
pub const GUARD_NOTICE: &str =
    "Only active VIP members can post in the VIP channel. Use /subscribe to renew your access.";
pub const RENEW_NOTICE: &str =
    "Your VIP subscription has expired. Use /subscribe to renew and keep receiving signals.";
pub const REMINDER_NOTICE: &str =
    "Your VIP subscription expires in 2 days or less. Use /subscribe to renew in time.";

pub fn welcome(code: &str) -> String {
    format!(
        "Welcome!\n\n\
         We publish premium gold and forex trading signals:\n\
         - Accurate trading signals\n\
         - Priority support\n\
         - Early alerts for VIP members\n\n\
         Your referral code: {code}\n\
         Use /subscribe to see the plans, /referral to invite friends and /terms for the rules."
    )
}

pub fn active_member(days_left: i64) -> String {
    format!("You're a VIP member!\nSubscription ends in {days_left} days.")
}

pub fn plan_menu(plans: &PlanTable) -> (String, Keyboard) {
    let mut text = String::from("VIP plans:\n\n");
    let mut keyboard = Keyboard::new();
    for (plan, terms) in plans.iter() {
        let _ = writeln!(
            text,
            "- {}: ${} for {} days",
            plan.label(),
            terms.price,
            terms.duration_days
        );
        keyboard.push(vec![Button::callback(
            format!("{} (${})", plan.label(), terms.price),
            plan.callback_data(),
        )]);
    }
    text.push_str("\nSelect your plan:");
    (text, keyboard)
}

pub fn payment_instructions(plan: Plan, terms: &PlanTerms, payment: &PaymentConfig) -> String {
    let mut text = format!(
        "You selected the {} plan (${}, {} days).\n\n",
        plan.label(),
        terms.price,
        terms.duration_days
    );
    if payment.addresses.is_empty() {
        text.push_str("Contact support for payment details.\n");
    } else {
        text.push_str("Payment addresses:\n\n");
        for addr in &payment.addresses {
            let _ = writeln!(text, "{}: {}", addr.network, addr.address);
        }
    }
    text.push_str("\nSend your proof of payment (screenshot or transaction hash) in this chat.");
    if let Some(handle) = &payment.support_handle {
        let _ = write!(text, "\nQuestions: {handle}");
    }
    text
}

pub fn review_request(user: UserId, plan: Plan, text: Option<&str>) -> String {
    let mut msg = format!(
        "New payment proof\nUser: {user}\nPlan: {}\n\nApprove: /approve {user} {}\nReject: /reject {user}",
        plan.label(),
        plan.as_str()
    );
    if let Some(text) = text {
        let _ = write!(msg, "\n\nMessage:\n{text}");
    }
    msg
}

pub fn review_caption(user: UserId, plan: Plan) -> String {
    format!("Payment proof from {user} ({})", plan.label())
}

pub fn approved(plan: Plan, days: u32) -> String {
    format!(
        "Your payment has been approved! Welcome to VIP.\nPlan: {}\nAccess for {days} days.",
        plan.label()
    )
}

pub fn approved_ack(user: UserId, plan: Plan, days: u32) -> String {
    format!("User {user} approved for {} ({days} days).", plan.label())
}

pub fn commission(amount: u32, referred: UserId) -> String {
    format!("You earned a ${amount} commission! User {referred} joined VIP with your referral code.")
}

pub fn rejected(reason: Option<&str>) -> String {
    match reason {
        Some(reason) => format!(
            "Your payment could not be verified: {reason}\nUse /subscribe to try again."
        ),
        None => "Your payment could not be verified. Use /subscribe to try again.".to_string(),
    }
}

pub fn rejected_ack(user: UserId) -> String {
    format!("User {user} rejected.")
}

pub fn referral(code: &str, bot_username: Option<&str>, plans: &PlanTable) -> String {
    let mut text = format!("Your referral code: {code}\n");
    if let Some(bot) = bot_username {
        let _ = writeln!(text, "Share link: https://t.me/{bot}?start={code}");
    }
    text.push_str("\nEarn a commission each time someone you invite joins VIP:\n");
    for (plan, terms) in plans.iter() {
        let _ = writeln!(text, "- {}: ${}", plan.label(), terms.commission);
    }
    text
}

pub fn terms(support: Option<&str>) -> String {
    let contact = support.unwrap_or("the support team");
    format!(
        "Terms & Conditions:\n\n\
         1. No refunds: payments for VIP access are non-refundable.\n\
         2. Educational purpose: signals are for education only; we are not responsible for financial losses.\n\
         3. Trade responsibly and within your financial capacity.\n\
         4. Payment issues: contact {contact}.\n\
         5. Renewal: subscriptions are renewed manually. Renew in time to avoid interruptions.\n\
         6. Follow the pinned messages in the VIP channel.\n\
         7. Sharing your VIP access or signals is prohibited and may end your membership.\n\
         8. Privacy: we do not share your personal information with third parties.\n\
         9. Services may change or stop at any time without prior notice.\n\
         10. Disputes are resolved through direct contact with support.\n\n\
         By using this service you agree to these terms."
    )
}

pub fn signal_post(text: &str) -> String {
    format!("VIP SIGNAL\n\n{text}")
}

pub const SIGNAL_POSTED: &str = "Signal posted to the VIP channel.";
pub const APPROVE_USAGE: &str = "Usage: /approve <user_id> <weekly|biweekly|monthly>";
pub const REJECT_USAGE: &str = "Usage: /reject <user_id> [reason]";
pub const SIGNAL_USAGE: &str = "Usage: /signal <text>";

pub fn user_not_found(user: UserId) -> String {
    format!("User {user} has not started the bot.")
}

pub fn no_review(user: UserId) -> String {
    format!("No payment proof is waiting for review from user {user}.")
}

// ── Feed ──────────────────────────────────────────────────────────

pub fn quote(symbol: &str, price: f64, at: &str) -> String {
    format!("{symbol} update\nPrice: {price:.2}\nAs of: {at}")
}

pub fn quote_fallback(symbol: &str, price: f64, at: &str) -> String {
    format!("{symbol} update (cached, live feed unavailable)\nPrice: {price:.2}\nAs of: {at}")
}

pub fn feed_exhausted(attempts: u32, error: &str, had_cache: bool) -> String {
    let published = if had_cache {
        "published the cached quote"
    } else {
        "nothing cached to publish"
    };
    format!("Feed failed after {attempts} attempts ({error}); {published}.")
}

pub fn feed_malformed(error: &str) -> String {
    format!("Feed response rejected without retry: {error}")
}

// ── Help desk ─────────────────────────────────────────────────────

pub fn help_welcome(faq: &[vipgate_config::FaqEntry]) -> String {
    let mut text = String::from(
        "Welcome to the help desk!\n\n\
         - Use /subscribe in the main bot to join VIP\n\
         - Type /faq for common questions\n\
         - Or just ask here and an operator will answer\n",
    );
    if !faq.is_empty() {
        text.push_str("\nTopics: ");
        let topics: Vec<&str> = faq.iter().map(|e| e.question.as_str()).collect();
        text.push_str(&topics.join(", "));
    }
    text
}

pub fn help_faq(faq: &[vipgate_config::FaqEntry]) -> String {
    let mut text = String::from("FAQ:\n");
    for entry in faq {
        let _ = write!(text, "\n- {}: {}", entry.question, entry.answer);
    }
    text
}

pub const HELP_FORWARDED: &str = "Not sure about that one. Try /faq, or wait for an operator to reply.";

pub fn help_forward(user: UserId, text: &str) -> String {
    format!("Live support from {user}: {text}")
}

#[cfg(test)]
mod tests {
    use vipgate_config::PaymentAddress;

    use super::*;

    #[test]
    fn plan_menu_has_one_button_per_plan() {
        let (text, keyboard) = plan_menu(&PlanTable::default());
        assert!(text.contains("Bi-Weekly"));
        let data: Vec<_> = keyboard
            .iter()
            .flatten()
            .filter_map(|b| match b {
                Button::Callback { data, .. } => Some(data.as_str()),
                Button::Url { .. } => None,
            })
            .collect();
        assert_eq!(data, vec!["plan_weekly", "plan_biweekly", "plan_monthly"]);
    }

    #[test]
    fn payment_instructions_list_addresses() {
        let payment = PaymentConfig {
            addresses: vec![PaymentAddress {
                network: "USDT (TRC20)".into(),
                address: "TH6W".into(),
            }],
            support_handle: Some("@Support".into()),
        };
        let plans = PlanTable::default();
        let text = payment_instructions(Plan::Monthly, plans.terms(Plan::Monthly), &payment);
        assert!(text.contains("USDT (TRC20): TH6W"));
        assert!(text.contains("@Support"));
        assert!(text.contains("30 days"));
    }

    #[test]
    fn referral_link_needs_username() {
        let plans = PlanTable::default();
        assert!(referral("GS1", Some("GoldBot"), &plans).contains("https://t.me/GoldBot?start=GS1"));
        assert!(!referral("GS1", None, &plans).contains("t.me"));
    }
}
