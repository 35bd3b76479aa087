//! Builder for code-configured catalogs.

use super::dataset::PlanDataset;
use super::limits::{Limit, LimitName, PlanLimits};
use super::plan::{BillingInterval, Plan};
use super::registry::PlanCatalog;
use crate::error::Result;

/// Builder for constructing a [`PlanCatalog`].
///
/// # Example
///
/// ```rust
/// use subscription_engine::catalog::{BillingInterval, PlanCatalog};
///
/// let catalog = PlanCatalog::builder()
///     .plan("team")
///         .name("Team")
///         .price(4900, "usd")
///         .interval(BillingInterval::Monthly)
///         .trial_days(14)
///         .max_users(25)
///         .features(["reports", "api_access"])
///         .done()
///     .build()?;
///
/// assert!(catalog.get_plan("team")?.has_feature("reports"));
/// # Ok::<(), subscription_engine::EngineError>(())
/// ```
#[derive(Debug, Default)]
pub struct CatalogBuilder {
    plans: Vec<Plan>,
}

impl CatalogBuilder {
    /// Create a new catalog builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start defining a new plan.
    #[must_use]
    pub fn plan(self, id: &str) -> PlanBuilder {
        let mut plan = Plan::new(id, id, 0, "usd", BillingInterval::Monthly);
        plan.sort_order = i32::try_from(self.plans.len()).unwrap_or(i32::MAX);
        PlanBuilder { parent: self, plan }
    }

    /// Add a fully formed plan.
    #[must_use]
    pub fn with_plan(mut self, plan: Plan) -> Self {
        self.plans.push(plan);
        self
    }

    /// Validate every plan and build the catalog.
    pub fn build(self) -> Result<PlanCatalog> {
        Ok(PlanCatalog::from_dataset(PlanDataset::from_plans(self.plans)?))
    }
}

/// Builder for a single plan.
#[derive(Debug)]
pub struct PlanBuilder {
    parent: CatalogBuilder,
    plan: Plan,
}

impl PlanBuilder {
    /// Set the display name. Defaults to the plan id.
    #[must_use]
    pub fn name(mut self, name: &str) -> Self {
        self.plan.name = name.to_string();
        self
    }

    /// Set the description.
    #[must_use]
    pub fn description(mut self, desc: &str) -> Self {
        self.plan.description = Some(desc.to_string());
        self
    }

    /// Set the price in minor units and the currency code.
    #[must_use]
    pub fn price(mut self, amount: i64, currency: &str) -> Self {
        self.plan.pricing.amount = amount;
        self.plan.pricing.currency = currency.to_lowercase();
        self
    }

    /// Set the billing interval.
    #[must_use]
    pub fn interval(mut self, interval: BillingInterval) -> Self {
        self.plan.pricing.interval = interval;
        self
    }

    /// Set the trial period in days.
    #[must_use]
    pub fn trial_days(mut self, days: u32) -> Self {
        self.plan.pricing.trial_days = days;
        self
    }

    /// Set the maximum number of users.
    #[must_use]
    pub fn max_users(self, max: u64) -> Self {
        self.limit(LimitName::Users, Limit::Capped(max))
    }

    /// Set the maximum number of hotels.
    #[must_use]
    pub fn max_hotels(self, max: u64) -> Self {
        self.limit(LimitName::Hotels, Limit::Capped(max))
    }

    /// Set the maximum number of documents.
    #[must_use]
    pub fn max_documents(self, max: u64) -> Self {
        self.limit(LimitName::Documents, Limit::Capped(max))
    }

    /// Set the maximum storage in MB.
    #[must_use]
    pub fn max_storage(self, max: u64) -> Self {
        self.limit(LimitName::Storage, Limit::Capped(max))
    }

    /// Set the maximum API requests per period.
    #[must_use]
    pub fn max_api_requests(self, max: u64) -> Self {
        self.limit(LimitName::ApiRequests, Limit::Capped(max))
    }

    /// Set a single limit.
    #[must_use]
    pub fn limit(mut self, name: LimitName, limit: Limit) -> Self {
        self.plan.limits.set(name, limit);
        self
    }

    /// Set the full limits configuration.
    #[must_use]
    pub fn limits(mut self, limits: PlanLimits) -> Self {
        self.plan.limits = limits;
        self
    }

    /// Enable features on this plan.
    #[must_use]
    pub fn features<I, S>(mut self, features: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.plan
            .features
            .extend(features.into_iter().map(|f| (f.into(), true)));
        self
    }

    /// Enable a single feature.
    #[must_use]
    pub fn feature(mut self, feature: &str) -> Self {
        self.plan.features.insert(feature.to_string(), true);
        self
    }

    /// Mark the plan as unlisted.
    #[must_use]
    pub fn private(mut self) -> Self {
        self.plan.is_public = false;
        self
    }

    /// Mark the plan as retired.
    #[must_use]
    pub fn inactive(mut self) -> Self {
        self.plan.is_active = false;
        self
    }

    /// Set the display sort order. Defaults to definition order.
    #[must_use]
    pub fn sort_order(mut self, order: i32) -> Self {
        self.plan.sort_order = order;
        self
    }

    /// Finish defining this plan and return to the parent builder.
    #[must_use]
    pub fn done(self) -> CatalogBuilder {
        self.parent.with_plan(self.plan)
    }
}
