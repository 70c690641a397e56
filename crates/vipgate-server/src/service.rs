//! Subscription service: the state machine behind the main bot.
//!
//! ```text
//! NEW ─start─▶ BROWSING ─plan─▶ AWAITING_PROOF ─proof─▶ PENDING_APPROVAL
//!                  ▲                                       │        │
//!                  └────────────────reject─────────────────┘     approve
//!                                                                   ▼
//!                               EXPIRED ◀────────sweep───────── ACTIVE
//! ```
//!
//! Plan selection moves straight to `AWAITING_PROOF`; the selected plan is
//! kept in [`PendingProofs`] and consumed by the first message that follows.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, error, info, warn};
use vipgate_config::{Config, PaymentConfig};
use vipgate_core::{ChatId, Plan, PlanTable, UserId, days_until, unix_now};
use vipgate_store::{StoreError, UserStore};
use vipgate_transport::{Inbound, InboundKind, Outbound, Transport};

use crate::adapter::EventHandler;
use crate::error::ServiceError;
use crate::messages;
use crate::pending::PendingProofs;
use crate::rate_limit::RateLimiter;
use crate::review::ReviewQueue;

/// Wall clock in unix seconds. Injectable for tests.
pub type Clock = Arc<dyn Fn() -> i64 + Send + Sync>;

/// Static settings the service needs from the configuration.
#[derive(Debug, Clone)]
pub struct ServiceSettings {
    pub plans: PlanTable,
    pub payment: PaymentConfig,
    pub admin_id: UserId,
    pub vip_channel_id: ChatId,
    pub review_chat_id: ChatId,
    /// Also accept administrators of the VIP channel as operators.
    pub admins_from_channel: bool,
    /// Public bot username for referral links.
    pub bot_username: Option<String>,
}

impl ServiceSettings {
    pub fn from_config(config: &Config) -> Result<Self, ServiceError> {
        let admin_id = config
            .access
            .admin_id
            .ok_or_else(|| ServiceError::Config("access.admin_id is required".into()))?;
        let vip_channel_id = config
            .access
            .vip_channel_id
            .ok_or_else(|| ServiceError::Config("access.vip_channel_id is required".into()))?;
        Ok(Self {
            plans: config.plans.clone(),
            payment: config.payment.clone(),
            admin_id,
            vip_channel_id,
            review_chat_id: config.review_chat().unwrap_or(admin_id),
            admins_from_channel: config.access.admins_from_channel,
            bot_username: config.bot.username.clone(),
        })
    }
}

/// Where a user currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionState {
    /// Never contacted the bot.
    New,
    /// Registered, no selection in flight and no subscription history.
    Browsing,
    /// Picked a plan; the next message is taken as payment proof.
    AwaitingProof { plan: Plan },
    /// Proof forwarded to the operators.
    PendingApproval { plan: Plan },
    Active { subscription_end: i64 },
    Expired { subscription_end: i64 },
}

/// Handles main bot events.
pub struct SubscriptionService {
    store: Arc<dyn UserStore>,
    transport: Arc<dyn Transport>,
    limiter: Arc<RateLimiter>,
    pending: Arc<PendingProofs>,
    reviews: Arc<ReviewQueue>,
    settings: ServiceSettings,
    clock: Clock,
}

impl SubscriptionService {
    pub fn new(
        store: Arc<dyn UserStore>,
        transport: Arc<dyn Transport>,
        limiter: Arc<RateLimiter>,
        pending: Arc<PendingProofs>,
        reviews: Arc<ReviewQueue>,
        settings: ServiceSettings,
    ) -> Self {
        Self {
            store,
            transport,
            limiter,
            pending,
            reviews,
            settings,
            clock: Arc::new(unix_now),
        }
    }

    /// Builder: replace the wall clock.
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    pub fn settings(&self) -> &ServiceSettings {
        &self.settings
    }

    pub fn pending(&self) -> &PendingProofs {
        &self.pending
    }

    pub fn reviews(&self) -> &ReviewQueue {
        &self.reviews
    }

    #[inline]
    fn now(&self) -> i64 {
        (self.clock)()
    }

    /// Compute the current state of a user.
    pub async fn state_of(&self, user: UserId) -> Result<SubscriptionState, ServiceError> {
        let record = match self.store.get_user(user).await {
            Ok(record) => record,
            Err(StoreError::NotFound) => return Ok(SubscriptionState::New),
            Err(e) => return Err(e.into()),
        };

        if let Some(review) = self.reviews.get(user) {
            return Ok(SubscriptionState::PendingApproval { plan: review.plan });
        }
        if let Some(plan) = self.pending.peek(user) {
            return Ok(SubscriptionState::AwaitingProof { plan });
        }

        let now = self.now();
        Ok(match record.subscription_end {
            Some(end) if record.is_active_at(now) => SubscriptionState::Active {
                subscription_end: end,
            },
            Some(end) => SubscriptionState::Expired {
                subscription_end: end,
            },
            None => SubscriptionState::Browsing,
        })
    }

    /// Route one admitted event.
    pub async fn dispatch(&self, event: &Inbound) -> Result<(), ServiceError> {
        if event.chat == self.settings.vip_channel_id {
            return self.guard_channel(event).await;
        }

        match &event.kind {
            InboundKind::Command { name, args } => match name.as_str() {
                "start" => self.start(event, args).await,
                "subscribe" => self.subscribe(event).await,
                "referral" => self.referral(event).await,
                "terms" => self.reply(event.chat, messages::terms(self.support())).await,
                "approve" => self.approve(event, args).await,
                "reject" => self.reject(event, args).await,
                "signal" => self.signal(event, args).await,
                other => {
                    debug!(user_id = event.from, command = other, "unknown command ignored");
                    Ok(())
                }
            },
            InboundKind::Callback { id, data } => self.select_plan(event, id, data).await,
            InboundKind::Text { text } if event.is_private() => {
                self.submit_proof(event, Some(text.as_str())).await
            }
            InboundKind::Attachment { .. } if event.is_private() => {
                self.submit_proof(event, None).await
            }
            _ => Ok(()),
        }
    }

    // ── user flows ────────────────────────────────────────────────

    async fn start(&self, event: &Inbound, args: &str) -> Result<(), ServiceError> {
        let user = event.from;
        let referred_by = args.split_whitespace().next();
        let existed = self.exists(user).await?;

        let code = self.store.upsert_user(user, referred_by, self.now()).await?;
        if !existed {
            vipgate_metrics::record_registration();
            info!(user_id = user, referred_by = ?referred_by, "user registered");
        }
        self.reply(event.chat, messages::welcome(&code)).await
    }

    async fn subscribe(&self, event: &Inbound) -> Result<(), ServiceError> {
        let user = event.from;
        let now = self.now();
        match self.store.get_user(user).await {
            Ok(record) if record.is_active_at(now) => {
                let end = record.subscription_end.unwrap_or(now);
                return self
                    .reply(event.chat, messages::active_member(days_until(end, now)))
                    .await;
            }
            Ok(_) => {}
            Err(StoreError::NotFound) => {
                self.store.upsert_user(user, None, now).await?;
            }
            Err(e) => return Err(e.into()),
        }

        let (text, keyboard) = messages::plan_menu(&self.settings.plans);
        self.transport
            .send(Outbound::text(event.chat, text).with_keyboard(keyboard))
            .await?;
        Ok(())
    }

    async fn select_plan(
        &self,
        event: &Inbound,
        callback_id: &str,
        data: &str,
    ) -> Result<(), ServiceError> {
        let Some(plan) = Plan::from_callback(data) else {
            self.answer(callback_id, Some(messages::UNKNOWN_PLAN)).await;
            return Ok(());
        };

        let user = event.from;
        if !self.exists(user).await? {
            self.store.upsert_user(user, None, self.now()).await?;
        }

        self.pending.insert(user, plan);
        vipgate_metrics::record_plan_selected(plan.as_str());
        info!(user_id = user, plan = %plan, "plan selected");

        let terms = self.settings.plans.terms(plan);
        let text = messages::payment_instructions(plan, terms, &self.settings.payment);
        self.answer(callback_id, None).await;
        self.reply(event.chat, text).await
    }

    async fn submit_proof(&self, event: &Inbound, text: Option<&str>) -> Result<(), ServiceError> {
        let user = event.from;
        let Some(plan) = self.pending.take(user) else {
            return Ok(());
        };

        let review_chat = self.settings.review_chat_id;
        let forwarded = async {
            self.transport
                .send(Outbound::text(
                    review_chat,
                    messages::review_request(user, plan, text),
                ))
                .await?;
            if text.is_none() {
                self.transport
                    .copy_message(
                        review_chat,
                        event.chat,
                        event.message_id,
                        Some(messages::review_caption(user, plan)),
                    )
                    .await?;
            }
            Ok::<_, ServiceError>(())
        }
        .await;

        if let Err(e) = forwarded {
            // Keep the selection so the user can resend the proof.
            self.pending.insert(user, plan);
            return Err(e);
        }

        self.reviews.submit(user, plan, self.now());
        vipgate_metrics::record_proof_submitted();
        info!(user_id = user, plan = %plan, "payment proof forwarded for review");
        self.reply(event.chat, messages::PROOF_RECEIVED).await
    }

    async fn referral(&self, event: &Inbound) -> Result<(), ServiceError> {
        match self.store.get_user(event.from).await {
            Ok(record) => {
                let text = messages::referral(
                    &record.referral_code,
                    self.settings.bot_username.as_deref(),
                    &self.settings.plans,
                );
                self.reply(event.chat, text).await
            }
            Err(StoreError::NotFound) => self.reply(event.chat, messages::NOT_REGISTERED).await,
            Err(e) => Err(e.into()),
        }
    }

    // ── operator commands ─────────────────────────────────────────

    async fn approve(&self, event: &Inbound, args: &str) -> Result<(), ServiceError> {
        self.authorize(event.from).await?;
        let (user, plan) = parse_approve_args(args)?;
        let terms = *self.settings.plans.terms(plan);
        let now = self.now();

        if let Ok(previous) = self.store.get_user(user).await
            && previous.is_active_at(now)
        {
            warn!(user_id = user, "approving an active subscription, end date reset");
        }

        let review = self.reviews.resolve(user);
        if review.is_none() {
            warn!(user_id = user, plan = %plan, "approval without a submitted proof");
        }

        let approval = match self.store.approve_subscription(user, plan, &terms, now).await {
            Ok(approval) => approval,
            Err(e) => {
                if let Some(review) = review {
                    self.reviews.submit(user, review.plan, review.submitted_at);
                }
                return Err(match e {
                    StoreError::NotFound => {
                        ServiceError::validation(messages::user_not_found(user))
                    }
                    other => other.into(),
                });
            }
        };
        self.pending.remove(user);

        vipgate_metrics::record_approval(plan.as_str());
        info!(
            operator = event.from,
            user_id = user,
            plan = %plan,
            subscription_end = approval.subscription_end,
            "subscription approved"
        );

        self.notify(user, messages::approved(plan, terms.duration_days))
            .await;

        if let Some(referrer) = approval.referrer {
            self.notify(referrer, messages::commission(approval.commission, user))
                .await;
            vipgate_metrics::record_commission(approval.commission);
            info!(
                referrer,
                user_id = user,
                commission = approval.commission,
                "referral commission announced"
            );
        } else if let Some(code) = &approval.referred_by {
            debug!(user_id = user, code = %code, "referral code has no owner");
        }

        self.reply(
            event.chat,
            messages::approved_ack(user, plan, terms.duration_days),
        )
        .await
    }

    async fn reject(&self, event: &Inbound, args: &str) -> Result<(), ServiceError> {
        self.authorize(event.from).await?;
        let (user, reason) = parse_reject_args(args)?;

        if self.reviews.resolve(user).is_none() {
            return Err(ServiceError::validation(messages::no_review(user)));
        }
        self.pending.remove(user);

        vipgate_metrics::record_rejection();
        info!(operator = event.from, user_id = user, reason = ?reason, "payment rejected");

        self.notify(user, messages::rejected(reason)).await;
        self.reply(event.chat, messages::rejected_ack(user)).await
    }

    async fn signal(&self, event: &Inbound, args: &str) -> Result<(), ServiceError> {
        self.authorize(event.from).await?;
        let text = args.trim();
        if text.is_empty() {
            return Err(ServiceError::validation(messages::SIGNAL_USAGE));
        }

        self.transport
            .send(Outbound::text(
                self.settings.vip_channel_id,
                messages::signal_post(text),
            ))
            .await?;
        info!(operator = event.from, "manual signal posted");
        self.reply(event.chat, messages::SIGNAL_POSTED).await
    }

    // ── VIP channel guard ─────────────────────────────────────────

    async fn guard_channel(&self, event: &Inbound) -> Result<(), ServiceError> {
        if matches!(event.kind, InboundKind::Callback { .. }) || self.is_operator(event.from).await
        {
            return Ok(());
        }

        let member = match self.store.get_user(event.from).await {
            Ok(record) => record.is_active_at(self.now()),
            Err(StoreError::NotFound) => false,
            Err(e) => {
                warn!(user_id = event.from, error = %e, "store unavailable, channel message left alone");
                return Ok(());
            }
        };
        if member {
            return Ok(());
        }

        self.transport
            .delete_message(event.chat, event.message_id)
            .await?;
        vipgate_metrics::record_guard_deletion();
        info!(user_id = event.from, "removed channel message from non-member");
        self.notify(event.from, messages::GUARD_NOTICE).await;
        Ok(())
    }

    // ── helpers ───────────────────────────────────────────────────

    /// Whether `user` may run operator commands.
    pub async fn is_operator(&self, user: UserId) -> bool {
        if user == self.settings.admin_id {
            return true;
        }
        if !self.settings.admins_from_channel {
            return false;
        }
        match self
            .transport
            .chat_administrators(self.settings.vip_channel_id)
            .await
        {
            Ok(admins) => admins.contains(&user),
            Err(e) => {
                warn!(error = %e, "failed to fetch channel administrators");
                false
            }
        }
    }

    async fn authorize(&self, user: UserId) -> Result<(), ServiceError> {
        if self.is_operator(user).await {
            Ok(())
        } else {
            Err(ServiceError::Unauthorized)
        }
    }

    async fn exists(&self, user: UserId) -> Result<bool, ServiceError> {
        match self.store.get_user(user).await {
            Ok(_) => Ok(true),
            Err(StoreError::NotFound) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    fn support(&self) -> Option<&str> {
        self.settings.payment.support_handle.as_deref()
    }

    async fn reply(&self, chat: ChatId, text: impl Into<String>) -> Result<(), ServiceError> {
        self.transport.send(Outbound::text(chat, text)).await?;
        Ok(())
    }

    /// Best-effort notification; failures are logged, never propagated.
    async fn notify(&self, chat: ChatId, text: impl Into<String>) {
        if let Err(e) = self.transport.send(Outbound::text(chat, text)).await {
            vipgate_metrics::record_error(vipgate_core::ERROR_TRANSPORT);
            warn!(chat_id = chat, error = %e, "notification failed");
        }
    }

    async fn answer(&self, callback_id: &str, text: Option<&str>) {
        if let Err(e) = self.transport.answer_callback(callback_id, text).await {
            debug!(error = %e, "failed to answer callback");
        }
    }

    async fn report(&self, event: &Inbound, err: ServiceError) {
        vipgate_metrics::record_error(err.error_type());
        match err {
            ServiceError::Validation(msg) => {
                debug!(user_id = event.from, reason = %msg, "invalid input");
                self.notify(event.chat, msg).await;
            }
            ServiceError::Unauthorized => {
                info!(user_id = event.from, "operator command from non-operator ignored");
            }
            ServiceError::Store(e) => {
                error!(user_id = event.from, error = %e, "store failure while handling event");
                if event.is_private() {
                    self.notify(event.chat, messages::GENERIC_FAILURE).await;
                }
            }
            ServiceError::Transport(e) => {
                warn!(user_id = event.from, error = %e, "transport failure while handling event");
                if event.is_private() {
                    self.notify(event.chat, messages::GENERIC_FAILURE).await;
                }
            }
            ServiceError::Config(msg) => {
                error!(user_id = event.from, error = %msg, "configuration error while handling event");
            }
        }
    }
}

#[async_trait]
impl EventHandler for SubscriptionService {
    async fn handle(&self, event: Inbound) {
        if !self.limiter.admit(event.from) {
            vipgate_metrics::record_event_rejected();
            debug!(user_id = event.from, "event rate limited");
            if event.is_private() {
                self.notify(event.chat, messages::RATE_LIMITED).await;
            }
            return;
        }
        vipgate_metrics::record_event_admitted();

        if let Err(err) = self.dispatch(&event).await {
            self.report(&event, err).await;
        }
    }
}

fn parse_approve_args(args: &str) -> Result<(UserId, Plan), ServiceError> {
    let mut parts = args.split_whitespace();
    let (Some(user), Some(plan), None) = (parts.next(), parts.next(), parts.next()) else {
        return Err(ServiceError::validation(messages::APPROVE_USAGE));
    };
    let user: UserId = user
        .parse()
        .map_err(|_| ServiceError::validation(messages::APPROVE_USAGE))?;
    let plan = plan
        .parse::<Plan>()
        .map_err(|e| ServiceError::validation(e.to_string()))?;
    Ok((user, plan))
}

fn parse_reject_args(args: &str) -> Result<(UserId, Option<&str>), ServiceError> {
    let args = args.trim();
    let (user, reason) = match args.split_once(char::is_whitespace) {
        Some((user, reason)) => (user, Some(reason.trim()).filter(|r| !r.is_empty())),
        None => (args, None),
    };
    let user: UserId = user
        .parse()
        .map_err(|_| ServiceError::validation(messages::REJECT_USAGE))?;
    Ok((user, reason))
}
