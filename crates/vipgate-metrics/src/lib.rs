//! Metrics collection and Prometheus exporter for vipgate.
//!
//! Counters for inbound traffic, subscription transitions, the expiry sweep
//! and the market feed. Recording is a no-op until an exporter is installed.

use std::net::SocketAddr;

use metrics::{counter, gauge};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Initialize Prometheus metrics exporter.
///
/// Starts an HTTP server on the given address to expose metrics.
/// Returns an error message if binding fails.
pub fn init_prometheus(listen: &str) -> Result<(), String> {
    let addr: SocketAddr = listen
        .parse()
        .map_err(|e| format!("invalid metrics listen address: {}", e))?;

    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| format!("failed to install prometheus exporter: {}", e))?;

    Ok(())
}

// ============================================================================
// Metric Names
// ============================================================================

/// Inbound events admitted by the rate limiter.
pub const EVENTS_ADMITTED_TOTAL: &str = "vipgate_events_admitted_total";
/// Inbound events rejected by the rate limiter.
pub const EVENTS_REJECTED_TOTAL: &str = "vipgate_events_rejected_total";
/// Users registered on first contact.
pub const REGISTRATIONS_TOTAL: &str = "vipgate_registrations_total";
/// Plan selections by plan.
pub const PLAN_SELECTIONS_TOTAL: &str = "vipgate_plan_selections_total";
/// Payment proofs forwarded for review.
pub const PROOFS_SUBMITTED_TOTAL: &str = "vipgate_proofs_submitted_total";
/// Pending proofs dropped after their TTL.
pub const PROOFS_EXPIRED_TOTAL: &str = "vipgate_proofs_expired_total";
/// Current number of pending proofs.
pub const PROOFS_PENDING: &str = "vipgate_proofs_pending";
/// Forwarded proofs dropped without an operator decision.
pub const REVIEWS_EXPIRED_TOTAL: &str = "vipgate_reviews_expired_total";
/// Current number of proofs awaiting review.
pub const REVIEWS_OPEN: &str = "vipgate_reviews_open";
/// Approvals by plan.
pub const APPROVALS_TOTAL: &str = "vipgate_approvals_total";
/// Rejections issued by operators.
pub const REJECTIONS_TOTAL: &str = "vipgate_rejections_total";
/// Commission notices sent to referrers.
pub const COMMISSIONS_TOTAL: &str = "vipgate_commissions_total";
/// Sum of commissions announced (USD).
pub const COMMISSION_AMOUNT_TOTAL: &str = "vipgate_commission_amount_total";
/// Subscriptions revoked by the sweep.
pub const SWEEP_EXPIRED_TOTAL: &str = "vipgate_sweep_expired_total";
/// Expiry reminders sent by the sweep.
pub const SWEEP_REMINDERS_TOTAL: &str = "vipgate_sweep_reminders_total";
/// Sweep runs that failed.
pub const SWEEP_FAILURES_TOTAL: &str = "vipgate_sweep_failures_total";
/// Feed cycles by outcome (success, fallback, missing_field).
pub const FEED_CYCLES_TOTAL: &str = "vipgate_feed_cycles_total";
/// Individual failed feed fetch attempts.
pub const FEED_ATTEMPT_FAILURES_TOTAL: &str = "vipgate_feed_attempt_failures_total";
/// Messages deleted from the VIP channel by the guard.
pub const GUARD_DELETIONS_TOTAL: &str = "vipgate_guard_deletions_total";
/// Help desk questions forwarded to the admin.
pub const HELP_FORWARDS_TOTAL: &str = "vipgate_help_forwards_total";
/// Errors by type.
pub const ERRORS_TOTAL: &str = "vipgate_errors_total";

// ============================================================================
// Metric Recording Functions
// ============================================================================

/// Record an event admitted by the rate limiter.
#[inline]
pub fn record_event_admitted() {
    counter!(EVENTS_ADMITTED_TOTAL).increment(1);
}

/// Record an event rejected by the rate limiter.
#[inline]
pub fn record_event_rejected() {
    counter!(EVENTS_REJECTED_TOTAL).increment(1);
}

/// Record a new user.
#[inline]
pub fn record_registration() {
    counter!(REGISTRATIONS_TOTAL).increment(1);
}

/// Record a plan selection.
#[inline]
pub fn record_plan_selected(plan: &'static str) {
    counter!(PLAN_SELECTIONS_TOTAL, "plan" => plan).increment(1);
}

/// Record a forwarded payment proof.
#[inline]
pub fn record_proof_submitted() {
    counter!(PROOFS_SUBMITTED_TOTAL).increment(1);
}

/// Record pending proofs evicted after their TTL.
#[inline]
pub fn record_proofs_expired(count: usize) {
    counter!(PROOFS_EXPIRED_TOTAL).increment(count as u64);
}

/// Set the number of pending proofs.
#[inline]
pub fn set_proofs_pending(count: usize) {
    gauge!(PROOFS_PENDING).set(count as f64);
}

/// Record reviews dropped after their TTL.
#[inline]
pub fn record_reviews_expired(count: usize) {
    counter!(REVIEWS_EXPIRED_TOTAL).increment(count as u64);
}

/// Set the number of open reviews.
#[inline]
pub fn set_reviews_open(count: usize) {
    gauge!(REVIEWS_OPEN).set(count as f64);
}

/// Record an approval.
#[inline]
pub fn record_approval(plan: &'static str) {
    counter!(APPROVALS_TOTAL, "plan" => plan).increment(1);
}

/// Record a rejection.
#[inline]
pub fn record_rejection() {
    counter!(REJECTIONS_TOTAL).increment(1);
}

/// Record a commission notice.
#[inline]
pub fn record_commission(amount: u32) {
    counter!(COMMISSIONS_TOTAL).increment(1);
    counter!(COMMISSION_AMOUNT_TOTAL).increment(u64::from(amount));
}

/// Record one sweep run.
#[inline]
pub fn record_sweep(expired: usize, reminders: usize) {
    counter!(SWEEP_EXPIRED_TOTAL).increment(expired as u64);
    counter!(SWEEP_REMINDERS_TOTAL).increment(reminders as u64);
}

/// Record a failed sweep run.
#[inline]
pub fn record_sweep_failure() {
    counter!(SWEEP_FAILURES_TOTAL).increment(1);
}

/// Record a completed feed cycle ("success", "fallback", "missing_field").
#[inline]
pub fn record_feed_cycle(outcome: &'static str) {
    counter!(FEED_CYCLES_TOTAL, "outcome" => outcome).increment(1);
}

/// Record a failed fetch attempt.
#[inline]
pub fn record_feed_attempt_failure() {
    counter!(FEED_ATTEMPT_FAILURES_TOTAL).increment(1);
}

/// Record a message removed by the VIP channel guard.
#[inline]
pub fn record_guard_deletion() {
    counter!(GUARD_DELETIONS_TOTAL).increment(1);
}

/// Record a help desk question forwarded to the admin.
#[inline]
pub fn record_help_forward() {
    counter!(HELP_FORWARDS_TOTAL).increment(1);
}

/// Record an error by type.
#[inline]
pub fn record_error(error_type: &'static str) {
    counter!(ERRORS_TOTAL, "type" => error_type).increment(1);
}
