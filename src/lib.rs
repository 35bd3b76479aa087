//! Subscription lifecycle and entitlement engine for multi-tenant SaaS platforms.
//!
//! Tenants (organizations or standalone hotels) subscribe to plans from a
//! [`PlanCatalog`]. The [`LifecycleEngine`] creates subscriptions, changes plans,
//! cancels and reactivates, and sweeps expired trials; every change is committed
//! atomically through a [`SubscriptionStore`] and recorded in an append-only
//! event log. The [`EntitlementChecker`] answers whether a tenant may use a
//! feature or consume more of a capped resource.
//!
//! # Features
//!
//! - **Catalog**: plan definitions with limits, features and pricing, loadable from JSON
//! - **Lifecycle**: an explicit status state machine with trial handling
//! - **Entitlements**: limit reports with warnings and consume checks
//! - **Usage**: counters recomputed from the host's tenant directory
//! - **Events**: bounded-retry, never-failing event logging
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use subscription_engine::{
//!     CreateSubscriptionInput, InMemoryEventStore, InMemorySubscriptionStore, LifecycleEngine,
//!     PlanCatalog, PlanDataset, TenantRef, TrialSweeper,
//! };
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> subscription_engine::Result<()> {
//!     subscription_engine::init_tracing();
//!
//!     let engine = Arc::new(LifecycleEngine::new(
//!         PlanCatalog::from_dataset(PlanDataset::bundled()?),
//!         InMemorySubscriptionStore::new(),
//!         InMemoryEventStore::new(),
//!     ));
//!
//!     let sweeper = TrialSweeper::spawn(Arc::clone(&engine));
//!
//!     let input = CreateSubscriptionInput::new(TenantRef::organization("org_1"), "professional");
//!     let sub = engine.create_subscription(input, "owner@example.com").await?;
//!     println!("{} is {}", sub.id, sub.status);
//!
//!     sweeper.shutdown().await;
//!     Ok(())
//! }
//! ```

pub mod catalog;
mod config;
pub mod entitlements;
mod error;
pub mod events;
pub mod lifecycle;
pub mod store;
pub mod subscription;
pub mod tenants;
pub mod usage;
pub mod utils;

// Re-exports for public API
pub use catalog::{
    BillingInterval, CatalogBuilder, Limit, LimitCheckResult, LimitName, Plan, PlanCatalog,
    PlanDataset, PlanLimits, Pricing,
};
pub use config::{
    ConfigBuilder, EngineConfig, EntitlementConfig, EqualPriceChange, EventConfig,
    LifecycleConfig, LoggingConfig, SweepConfig,
};
pub use entitlements::{EntitlementChecker, LimitReport, LimitStatus};
pub use error::{EngineError, Result};
pub use events::{
    EventLog, EventStore, EventType, InMemoryEventStore, SubscriptionEvent, TracingEventStore,
};
pub use lifecycle::{
    CreateSubscriptionInput, LifecycleEngine, SubscriptionPatch, SweepReport, TrialSweeper,
};
pub use store::{InMemorySubscriptionStore, SubscriptionQuery, SubscriptionStore, UnitOfWork};
pub use subscription::{
    BillingInfo, LifecycleAction, Subscription, SubscriptionStatus, TenantRef, Usage,
    UsageUpdate,
};
pub use tenants::{InMemoryTenantDirectory, TenantDirectory};
pub use usage::{RecalculationReport, UsageRecalculator};

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize tracing with sensible defaults.
///
/// Call once early in `main()`. Later calls are ignored.
///
/// # Environment Variables
///
/// - `RUST_LOG`: log filter (e.g. "info", "subscription_engine=debug")
/// - `SUBSCRIPTION_ENGINE_LOG_JSON`: set to "true" for JSON formatted logs
pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let json_logs = utils::get_env_with_prefix("LOG_JSON")
        .map(|v| v.parse::<bool>().unwrap_or(false))
        .unwrap_or(false);

    install_subscriber(env_filter, json_logs);
}

/// Initialize tracing from an [`EngineConfig`].
pub fn init_tracing_with_config(config: &EngineConfig) {
    install_subscriber(EnvFilter::new(&config.logging.level), config.logging.json);
}

fn install_subscriber(env_filter: EnvFilter, json: bool) {
    let result = if json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .try_init()
    };

    if result.is_err() {
        tracing::debug!("Tracing subscriber already installed");
    }
}
