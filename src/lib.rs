//! # vipgate
//!
//! Subscription gate for a paid VIP broadcast channel: plan selection,
//! manual payment review, referral commissions, expiry sweeps and a
//! resilient quote feed, driven through chat bots.
//!
//! ## Crates
//!
//! - [`vipgate_core`] - Plans, identities and default configuration
//! - [`vipgate_config`] - Configuration loading and validation
//! - [`vipgate_store`] - User store backends (memory, SQL)
//! - [`vipgate_transport`] - Bot transport and event types
//! - [`vipgate_metrics`] - Prometheus-compatible metrics
//! - [`vipgate_server`] - Subscription service and runtime

pub use vipgate_config as config;
pub use vipgate_core as core;
pub use vipgate_metrics as metrics;
pub use vipgate_server as server;
pub use vipgate_store as store;
pub use vipgate_transport as transport;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use vipgate_config::{Config, load_config, validate_config};
    pub use vipgate_core::{Plan, PlanTable};
    pub use vipgate_server::{
        CancellationToken, ServiceError, SubscriptionService, run_services, run_with_shutdown,
    };
    pub use vipgate_store::{MemoryStore, UserStore};
}
