//! The plan catalog.

use super::builder::CatalogBuilder;
use super::dataset::PlanDataset;
use super::plan::Plan;
use super::validation::validate_plan;
use crate::error::{EngineError, Result};
use chrono::Utc;
use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, info, instrument};

/// Registry of plan definitions.
///
/// Cloning is cheap and clones share state. Each plan id maps to its latest
/// version; subscriptions carry their own snapshot, so replacing a version never
/// affects existing records.
///
/// # Example
///
/// ```rust
/// use subscription_engine::catalog::{PlanCatalog, PlanDataset};
///
/// let catalog = PlanCatalog::from_dataset(PlanDataset::bundled()?);
/// let starter = catalog.get_plan("starter")?;
/// assert_eq!(starter.pricing.trial_days, 14);
/// # Ok::<(), subscription_engine::EngineError>(())
/// ```
#[derive(Clone, Debug, Default)]
pub struct PlanCatalog {
    inner: Arc<RwLock<HashMap<String, Plan>>>,
}

impl PlanCatalog {
    /// Create an empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a catalog builder.
    #[must_use]
    pub fn builder() -> CatalogBuilder {
        CatalogBuilder::new()
    }

    /// Seed a catalog from a validated dataset.
    #[must_use]
    pub fn from_dataset(dataset: PlanDataset) -> Self {
        let plans = dataset
            .into_plans()
            .into_iter()
            .map(|plan| (plan.id.clone(), plan))
            .collect();
        Self {
            inner: Arc::new(RwLock::new(plans)),
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, HashMap<String, Plan>>> {
        self.inner
            .read()
            .map_err(|_| EngineError::store("plan catalog lock poisoned"))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, HashMap<String, Plan>>> {
        self.inner
            .write()
            .map_err(|_| EngineError::store("plan catalog lock poisoned"))
    }

    /// Get the current version of a plan.
    pub fn get_plan(&self, plan_id: &str) -> Result<Plan> {
        self.read()?
            .get(plan_id)
            .cloned()
            .ok_or_else(|| EngineError::plan_not_found(plan_id))
    }

    /// Check if a plan exists.
    pub fn contains(&self, plan_id: &str) -> Result<bool> {
        Ok(self.read()?.contains_key(plan_id))
    }

    /// List plans sorted by `sort_order`, then id.
    ///
    /// Inactive plans are included only when `include_inactive` is set.
    pub fn list_plans(&self, include_inactive: bool) -> Result<Vec<Plan>> {
        let mut plans: Vec<Plan> = self
            .read()?
            .values()
            .filter(|p| include_inactive || p.is_active)
            .cloned()
            .collect();
        plans.sort_by(|a, b| a.sort_order.cmp(&b.sort_order).then_with(|| a.id.cmp(&b.id)));
        Ok(plans)
    }

    /// List plans that are both active and public.
    pub fn list_public_plans(&self) -> Result<Vec<Plan>> {
        Ok(self
            .list_plans(false)?
            .into_iter()
            .filter(|p| p.is_public)
            .collect())
    }

    /// Add a new plan at version 1.
    #[instrument(skip(self, plan), fields(plan_id = %plan.id))]
    pub fn create_plan(&self, mut plan: Plan) -> Result<Plan> {
        validate_plan(&plan)?;

        let mut plans = self.write()?;
        if plans.contains_key(&plan.id) {
            debug!("Rejected duplicate plan");
            return Err(EngineError::validation(format!(
                "plan '{}' already exists",
                plan.id
            )));
        }

        let now = Utc::now();
        plan.version = 1;
        plan.created_at = now;
        plan.updated_at = now;
        plans.insert(plan.id.clone(), plan.clone());

        info!("Plan created");
        Ok(plan)
    }

    /// Store a new version of an existing plan.
    ///
    /// The stored version becomes `previous + 1` and `created_at` is preserved.
    #[instrument(skip(self, plan), fields(plan_id = %plan.id))]
    pub fn update_plan(&self, mut plan: Plan) -> Result<Plan> {
        validate_plan(&plan)?;

        let mut plans = self.write()?;
        let previous = plans
            .get(&plan.id)
            .ok_or_else(|| EngineError::plan_not_found(&plan.id))?;

        plan.version = previous.version + 1;
        plan.created_at = previous.created_at;
        plan.updated_at = Utc::now();
        plans.insert(plan.id.clone(), plan.clone());

        info!(version = plan.version, "Plan updated");
        Ok(plan)
    }

    /// Retire or re-enable a plan. Produces a new version.
    pub fn set_plan_active(&self, plan_id: &str, active: bool) -> Result<Plan> {
        let mut plan = self.get_plan(plan_id)?;
        plan.is_active = active;
        self.update_plan(plan)
    }

    /// Number of plans.
    pub fn len(&self) -> Result<usize> {
        Ok(self.read()?.len())
    }

    /// Whether the catalog has no plans.
    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.read()?.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::plan::BillingInterval;

    fn catalog() -> PlanCatalog {
        PlanCatalog::from_dataset(PlanDataset::bundled().unwrap())
    }

    #[test]
    fn test_get_plan() {
        let catalog = catalog();
        assert_eq!(catalog.get_plan("starter").unwrap().name, "Starter");

        let err = catalog.get_plan("missing").unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_list_plans_sorted_and_filtered() {
        let catalog = catalog();
        catalog.set_plan_active("free", false).unwrap();

        let active: Vec<_> = catalog
            .list_plans(false)
            .unwrap()
            .into_iter()
            .map(|p| p.id)
            .collect();
        assert_eq!(active, vec!["starter", "professional", "enterprise"]);

        assert_eq!(catalog.list_plans(true).unwrap().len(), 4);

        // enterprise is not public
        let public: Vec<_> = catalog
            .list_public_plans()
            .unwrap()
            .into_iter()
            .map(|p| p.id)
            .collect();
        assert_eq!(public, vec!["starter", "professional"]);
    }

    #[test]
    fn test_create_plan() {
        let catalog = PlanCatalog::new();
        let plan = Plan::new("basic", "Basic", 500, "usd", BillingInterval::Monthly);

        let created = catalog.create_plan(plan.clone()).unwrap();
        assert_eq!(created.version, 1);

        let err = catalog.create_plan(plan).unwrap_err();
        assert!(err.is_validation());
        assert_eq!(catalog.len().unwrap(), 1);
    }

    #[test]
    fn test_create_plan_validates() {
        let catalog = PlanCatalog::new();
        let plan = Plan::new("bad id", "Bad", 500, "usd", BillingInterval::Monthly);
        assert!(catalog.create_plan(plan).is_err());
        assert!(catalog.is_empty().unwrap());
    }

    #[test]
    fn test_update_plan_bumps_version() {
        let catalog = catalog();
        let original = catalog.get_plan("starter").unwrap();

        let mut changed = original.clone();
        changed.pricing.amount = 3900;
        let updated = catalog.update_plan(changed).unwrap();

        assert_eq!(updated.version, original.version + 1);
        assert_eq!(updated.created_at, original.created_at);
        assert_eq!(catalog.get_plan("starter").unwrap().pricing.amount, 3900);
    }

    #[test]
    fn test_update_missing_plan() {
        let catalog = PlanCatalog::new();
        let plan = Plan::new("ghost", "Ghost", 0, "usd", BillingInterval::Monthly);
        assert!(catalog.update_plan(plan).unwrap_err().is_not_found());
    }

    #[test]
    fn test_clones_share_state() {
        let catalog = PlanCatalog::new();
        let clone = catalog.clone();
        clone
            .create_plan(Plan::new("x", "X", 0, "usd", BillingInterval::Yearly))
            .unwrap();
        assert!(catalog.contains("x").unwrap());
    }
}
