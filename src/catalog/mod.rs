//! Plan catalog: pricing, limits and feature flags.
//!
//! Plans are seeded from an immutable [`PlanDataset`] (the bundled defaults, a JSON
//! string or a JSON file) or assembled with [`PlanCatalog::builder`].

mod builder;
mod dataset;
mod limits;
mod plan;
mod registry;
pub mod validation;

pub use builder::{CatalogBuilder, PlanBuilder};
pub use dataset::PlanDataset;
pub use limits::{
    InvalidLimit, Limit, LimitCheckResult, LimitName, PlanLimits, MAX_LIMIT_CAP,
    UNLIMITED_SENTINEL,
};
pub use plan::{BillingInterval, Plan, Pricing, MONTHLY_PERIOD_DAYS, YEARLY_PERIOD_DAYS};
pub use registry::PlanCatalog;
pub use validation::{validate_plan, validate_plan_id, validate_trial_days, MAX_TRIAL_DAYS};
