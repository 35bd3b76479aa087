use super::input::{CreateSubscriptionInput, SubscriptionPatch};
use super::sweep::SweepReport;
use crate::catalog::{validate_trial_days, Plan, PlanCatalog};
use crate::config::{EngineConfig, EqualPriceChange};
use crate::entitlements::{EntitlementChecker, LimitReport};
use crate::error::{EngineError, Result};
use crate::events::{EventLog, EventStore, EventType, SubscriptionEvent};
use crate::store::{QueryOrder, SubscriptionQuery, SubscriptionStore, UnitOfWork};
use crate::subscription::{
    LifecycleAction, PlanSnapshot, Subscription, SubscriptionStatus, TenantRef, Usage,
};
use crate::tenants::TenantDirectory;
use crate::usage::UsageRecalculator;
use crate::utils::time::days;
use chrono::{DateTime, Utc};
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

/// Attempts made to end a single trial when its record keeps changing underneath.
const SWEEP_COMMIT_ATTEMPTS: u32 = 3;

/// Orchestrates subscription creation, changes, cancellation, reactivation and the
/// trial-expiry sweep.
///
/// Every mutation is staged in a [`UnitOfWork`] and committed in one call. The
/// matching event is appended after the commit succeeds; a failed commit changes
/// nothing and emits nothing.
///
/// # Example
///
/// ```rust
/// use subscription_engine::catalog::{PlanCatalog, PlanDataset};
/// use subscription_engine::events::InMemoryEventStore;
/// use subscription_engine::lifecycle::{CreateSubscriptionInput, LifecycleEngine};
/// use subscription_engine::store::InMemorySubscriptionStore;
/// use subscription_engine::subscription::{SubscriptionStatus, TenantRef};
///
/// # async fn run() -> subscription_engine::Result<()> {
/// let engine = LifecycleEngine::new(
///     PlanCatalog::from_dataset(PlanDataset::bundled()?),
///     InMemorySubscriptionStore::new(),
///     InMemoryEventStore::new(),
/// );
///
/// let input = CreateSubscriptionInput::new(TenantRef::hotel("hotel_1"), "starter");
/// let sub = engine.create_subscription(input, "admin@example.com").await?;
/// assert_eq!(sub.status, SubscriptionStatus::Trialing);
/// # Ok(())
/// # }
/// ```
pub struct LifecycleEngine<S: SubscriptionStore, E: EventStore> {
    catalog: PlanCatalog,
    store: Arc<S>,
    events: EventLog<E>,
    tenants: Option<Arc<dyn TenantDirectory>>,
    config: EngineConfig,
}

impl<S: SubscriptionStore, E: EventStore> LifecycleEngine<S, E> {
    /// Create an engine with default configuration.
    pub fn new(catalog: PlanCatalog, store: S, events: E) -> Self {
        Self::with_config(catalog, store, events, EngineConfig::default())
    }

    /// Create an engine with explicit configuration.
    pub fn with_config(catalog: PlanCatalog, store: S, events: E, config: EngineConfig) -> Self {
        let events = EventLog::with_config(events, &config.events);
        Self {
            catalog,
            store: Arc::new(store),
            events,
            tenants: None,
            config,
        }
    }

    /// Validate tenants and enable usage recalculation through a directory.
    #[must_use]
    pub fn with_tenant_directory(mut self, tenants: Arc<dyn TenantDirectory>) -> Self {
        self.tenants = Some(tenants);
        self
    }

    /// The plan catalog.
    pub fn catalog(&self) -> &PlanCatalog {
        &self.catalog
    }

    /// The subscription store.
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// The event log.
    pub fn events(&self) -> &EventLog<E> {
        &self.events
    }

    /// Active configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// An entitlement checker over the same store and event log.
    pub fn entitlements(&self) -> EntitlementChecker<S, E> {
        EntitlementChecker::new(Arc::clone(&self.store), self.events.clone())
            .with_warning_threshold(self.config.entitlements.warning_threshold_percent)
    }

    /// A usage recalculator over the same store, event log and tenant directory.
    pub fn usage(&self) -> UsageRecalculator<S, E> {
        UsageRecalculator::new(
            Arc::clone(&self.store),
            self.events.clone(),
            self.tenants.clone(),
        )
    }

    async fn load(&self, id: &str) -> Result<Subscription> {
        self.store
            .get(id)
            .await?
            .ok_or_else(|| EngineError::subscription_not_found(id))
    }

    async fn commit_one(&self, unit: UnitOfWork) -> Result<Subscription> {
        self.store
            .commit(unit)
            .await?
            .pop()
            .ok_or_else(|| EngineError::store("commit returned no records"))
    }

    fn resolve_active_plan(&self, plan_id: &str) -> Result<Plan> {
        let plan = self.catalog.get_plan(plan_id)?;
        if !plan.is_active {
            return Err(EngineError::validation(format!(
                "plan '{}' is not available for new subscriptions",
                plan_id
            )));
        }
        Ok(plan)
    }

    async fn ensure_no_live_subscription(&self, tenant: &TenantRef) -> Result<()> {
        let live = self
            .store
            .count(&tenant_query(tenant).status_in(SubscriptionStatus::LIVE))
            .await?;
        if live > 0 {
            debug!(%tenant, "Rejected: tenant already subscribed");
            return Err(EngineError::validation(format!(
                "{} already has an active or trialing subscription",
                tenant
            )));
        }
        Ok(())
    }

    // =========================================================================
    // Create
    // =========================================================================

    /// Start a subscription for a tenant.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the plan, or the tenant when a directory is configured, is missing
    /// - `Validation` if the plan is inactive, the requested trial exceeds
    ///   [`MAX_TRIAL_DAYS`](crate::catalog::MAX_TRIAL_DAYS), or the tenant already has a
    ///   live subscription
    /// - `Store` / `ConcurrentModification` if the commit fails
    pub async fn create_subscription(
        &self,
        input: CreateSubscriptionInput,
        actor: &str,
    ) -> Result<Subscription> {
        self.create_subscription_at(input, actor, Utc::now()).await
    }

    /// [`create_subscription`](Self::create_subscription) with an explicit clock.
    #[instrument(skip(self, input, now), fields(tenant = %input.tenant, plan_id = %input.plan_id))]
    pub async fn create_subscription_at(
        &self,
        input: CreateSubscriptionInput,
        actor: &str,
        now: DateTime<Utc>,
    ) -> Result<Subscription> {
        input.tenant.validate()?;
        if let Some(requested) = input.trial_days {
            validate_trial_days(requested)?;
        }

        if let Some(ref tenants) = self.tenants {
            if !tenants.tenant_exists(&input.tenant).await? {
                return Err(EngineError::not_found(
                    input.tenant.kind(),
                    input.tenant.id(),
                ));
            }
        }

        self.ensure_no_live_subscription(&input.tenant).await?;

        let plan = self.resolve_active_plan(&input.plan_id)?;
        let trial_days = input.trial_days.unwrap_or(plan.pricing.trial_days);

        let (status, period_ends_at, trial_end) = if trial_days > 0 {
            let end = period_end(now, trial_days)?;
            (SubscriptionStatus::Trialing, end, Some(end))
        } else {
            let end = period_end(now, plan.pricing.interval.period_days())?;
            (SubscriptionStatus::Active, end, None)
        };

        let sub = Subscription {
            id: Uuid::new_v4().to_string(),
            tenant: input.tenant,
            limits: plan.limits,
            plan: PlanSnapshot::capture(plan, now),
            status,
            start_date: now,
            current_period_start: now,
            current_period_end: period_ends_at,
            trial_end,
            usage: Usage::default(),
            billing: input.billing,
            cancel_reason: None,
            canceled_at: None,
            created_at: now,
            updated_at: now,
            created_by: actor.to_string(),
            version: 0,
        };

        let sub = self.commit_one(UnitOfWork::new().insert(sub)).await?;

        self.events
            .log_event(
                &sub.id,
                EventType::SubscriptionCreated,
                json!({
                    "plan_id": sub.plan_id(),
                    "status": sub.status,
                    "trial_days": trial_days,
                    "created_by": sub.created_by,
                }),
            )
            .await;

        info!(subscription_id = %sub.id, status = %sub.status, "Subscription created");
        Ok(sub)
    }

    // =========================================================================
    // Read
    // =========================================================================

    /// Fetch a subscription.
    pub async fn get_subscription(&self, id: &str) -> Result<Subscription> {
        self.load(id).await
    }

    /// Every subscription of an organization, newest first.
    pub async fn list_by_organization(&self, organization_id: &str) -> Result<Vec<Subscription>> {
        self.store
            .find(&SubscriptionQuery::new().organization(organization_id))
            .await
    }

    /// The hotel's active or trialing subscription, if any.
    pub async fn list_by_hotel(&self, hotel_id: &str) -> Result<Option<Subscription>> {
        let query = SubscriptionQuery::new()
            .hotel(hotel_id)
            .status_in(SubscriptionStatus::LIVE)
            .limit(1);
        Ok(self.store.find(&query).await?.into_iter().next())
    }

    /// Up to `limit` active or trialing subscriptions, newest first.
    pub async fn list_active(&self, limit: usize) -> Result<Vec<Subscription>> {
        let query = SubscriptionQuery::new()
            .status_in(SubscriptionStatus::LIVE)
            .limit(limit);
        self.store.find(&query).await
    }

    /// Recorded events for a subscription, newest first.
    pub async fn events_for(&self, id: &str, limit: usize) -> Result<Vec<SubscriptionEvent>> {
        self.events.events_for(id, limit).await
    }

    // =========================================================================
    // Update
    // =========================================================================

    /// Apply a patch.
    ///
    /// A plan change emits `plan_upgraded` or `plan_downgraded` (or `plan_changed`
    /// at equal price when so configured); other changes emit
    /// `subscription_updated` listing the changed fields. A patch that changes
    /// nothing returns the record untouched and emits nothing.
    ///
    /// # Errors
    ///
    /// - `Validation` for an empty patch, an inactive plan or an illegal status move
    /// - `NotFound` if the subscription or new plan is missing
    pub async fn update_subscription(
        &self,
        id: &str,
        patch: SubscriptionPatch,
    ) -> Result<Subscription> {
        self.update_subscription_at(id, patch, Utc::now()).await
    }

    /// [`update_subscription`](Self::update_subscription) with an explicit clock.
    #[instrument(skip(self, patch, now))]
    pub async fn update_subscription_at(
        &self,
        id: &str,
        patch: SubscriptionPatch,
        now: DateTime<Utc>,
    ) -> Result<Subscription> {
        if patch.is_empty() {
            return Err(EngineError::validation("update must change at least one field"));
        }

        let current = self.load(id).await?;
        let mut next = current.clone();
        let mut changed: Vec<&'static str> = Vec::new();
        let mut plan_event = None;

        if let Some(ref plan_id) = patch.plan_id {
            if plan_id != current.plan_id() {
                let plan = self.resolve_active_plan(plan_id)?;
                plan_event = Some(self.plan_change_event(current.plan.amount(), plan.pricing.amount));
                next.limits = plan.limits;
                next.plan = PlanSnapshot::capture(plan, now);
                changed.push("plan_id");
            }
        }

        if let Some(billing) = patch.billing {
            if billing != current.billing {
                next.billing = billing;
                changed.push("billing");
            }
        }

        if let Some(target) = patch.status {
            if target != current.status {
                let action = LifecycleAction::for_target(current.status, target).ok_or_else(|| {
                    EngineError::validation(format!(
                        "illegal status transition from '{}' to '{}'",
                        current.status, target
                    ))
                })?;
                next.apply(action)?;
                match action {
                    LifecycleAction::PaymentSucceeded => open_period(&mut next, now)?,
                    LifecycleAction::Cancel => next.canceled_at = Some(now),
                    _ => {}
                }
                changed.push("status");
            }
        }

        if changed.is_empty() {
            debug!("Patch matches current state, nothing to commit");
            return Ok(current);
        }

        next.updated_at = now;
        let sub = self.commit_one(UnitOfWork::new().update(next)).await?;

        match plan_event {
            Some(event_type) => {
                self.events
                    .log_event(
                        &sub.id,
                        event_type,
                        json!({
                            "old_plan_id": current.plan_id(),
                            "new_plan_id": sub.plan_id(),
                            "old_amount": current.plan.amount(),
                            "new_amount": sub.plan.amount(),
                            "changed_fields": changed,
                        }),
                    )
                    .await;
            }
            None => {
                self.events
                    .log_event(
                        &sub.id,
                        EventType::SubscriptionUpdated,
                        json!({
                            "changed_fields": changed,
                            "previous_status": current.status,
                            "status": sub.status,
                        }),
                    )
                    .await;
            }
        }

        info!(subscription_id = %sub.id, fields = ?changed, "Subscription updated");
        Ok(sub)
    }

    fn plan_change_event(&self, old_amount: i64, new_amount: i64) -> EventType {
        use std::cmp::Ordering;

        match new_amount.cmp(&old_amount) {
            Ordering::Greater => EventType::PlanUpgraded,
            Ordering::Less => EventType::PlanDowngraded,
            Ordering::Equal => match self.config.lifecycle.equal_price_change {
                EqualPriceChange::Downgrade => EventType::PlanDowngraded,
                EqualPriceChange::Changed => EventType::PlanChanged,
            },
        }
    }

    // =========================================================================
    // Cancel / reactivate
    // =========================================================================

    /// Cancel immediately.
    ///
    /// # Errors
    ///
    /// Returns a validation error if the subscription is already canceled or expired.
    #[instrument(skip(self))]
    pub async fn cancel_subscription(&self, id: &str, reason: Option<&str>) -> Result<Subscription> {
        let now = Utc::now();
        let current = self.load(id).await?;
        let mut next = current.clone();

        if let Err(rejected) = next.apply(LifecycleAction::Cancel) {
            debug!(status = %current.status, "Rejected cancel");
            return Err(rejected.into());
        }
        next.cancel_reason = reason.map(str::to_string);
        next.canceled_at = Some(now);
        next.updated_at = now;

        let sub = self.commit_one(UnitOfWork::new().update(next)).await?;

        self.events
            .log_event(
                &sub.id,
                EventType::SubscriptionCanceled,
                json!({
                    "reason": reason,
                    "previous_status": current.status,
                }),
            )
            .await;

        info!(subscription_id = %sub.id, "Subscription canceled");
        Ok(sub)
    }

    /// Bring a canceled subscription back with a fresh billing period.
    ///
    /// # Errors
    ///
    /// Returns a validation error unless the subscription is canceled and its tenant
    /// has no other active or trialing subscription.
    pub async fn reactivate_subscription(&self, id: &str) -> Result<Subscription> {
        self.reactivate_subscription_at(id, Utc::now()).await
    }

    /// [`reactivate_subscription`](Self::reactivate_subscription) with an explicit clock.
    #[instrument(skip(self, now))]
    pub async fn reactivate_subscription_at(
        &self,
        id: &str,
        now: DateTime<Utc>,
    ) -> Result<Subscription> {
        let current = self.load(id).await?;
        let mut next = current.clone();

        if let Err(rejected) = next.apply(LifecycleAction::Reactivate) {
            debug!(status = %current.status, "Rejected reactivation");
            return Err(rejected.into());
        }
        self.ensure_no_live_subscription(&current.tenant).await?;
        next.cancel_reason = None;
        next.canceled_at = None;
        open_period(&mut next, now)?;
        next.updated_at = now;

        let sub = self.commit_one(UnitOfWork::new().update(next)).await?;

        self.events
            .log_event(
                &sub.id,
                EventType::SubscriptionCreated,
                json!({
                    "reactivated": true,
                    "plan_id": sub.plan_id(),
                    "status": sub.status,
                    "previous_canceled_at": current.canceled_at,
                    "current_period_end": sub.current_period_end,
                }),
            )
            .await;

        info!(subscription_id = %sub.id, "Subscription reactivated");
        Ok(sub)
    }

    // =========================================================================
    // Sweep
    // =========================================================================

    /// Move expired trials to `past_due` and report those expiring soon.
    pub async fn sweep_expiring_trials(&self) -> Result<SweepReport> {
        self.sweep_expiring_trials_at(Utc::now()).await
    }

    /// [`sweep_expiring_trials`](Self::sweep_expiring_trials) with an explicit clock.
    ///
    /// Only the initial query can fail the sweep; per-record failures are logged
    /// and listed in the report.
    #[instrument(skip(self, now))]
    pub async fn sweep_expiring_trials_at(&self, now: DateTime<Utc>) -> Result<SweepReport> {
        let query = SubscriptionQuery::new()
            .status(SubscriptionStatus::Trialing)
            .period_end_at_or_before(now + self.config.sweep.lookahead())
            .order(QueryOrder::PeriodEndAscending)
            .limit(self.config.sweep.batch_limit);
        let candidates = self.store.find(&query).await?;

        let mut report = SweepReport {
            examined: candidates.len(),
            ..SweepReport::default()
        };

        for sub in candidates {
            if sub.current_period_end > now {
                report.upcoming.push(sub.id);
                continue;
            }

            let id = sub.id.clone();
            match self.end_trial(sub, now).await {
                Ok(true) => report.transitioned.push(id),
                Ok(false) => report.skipped += 1,
                Err(e) => {
                    warn!(subscription_id = %id, error = %e, "Failed to end trial");
                    report.failed.push(id);
                }
            }
        }

        info!(
            examined = report.examined,
            transitioned = report.transitioned.len(),
            upcoming = report.upcoming.len(),
            skipped = report.skipped,
            failed = report.failed.len(),
            "Trial sweep finished"
        );
        Ok(report)
    }

    /// Returns `Ok(false)` when the record no longer needs ending.
    async fn end_trial(&self, mut sub: Subscription, now: DateTime<Utc>) -> Result<bool> {
        let mut attempt = 1;
        loop {
            if sub.status != SubscriptionStatus::Trialing || sub.current_period_end > now {
                return Ok(false);
            }

            let trial_end = sub.trial_end.unwrap_or(sub.current_period_end);
            let mut next = sub.clone();
            next.apply(LifecycleAction::TrialEnded)?;
            next.updated_at = now;

            match self.commit_one(UnitOfWork::new().update(next)).await {
                Ok(committed) => {
                    self.events
                        .log_event(
                            &committed.id,
                            EventType::TrialEnded,
                            json!({
                                "plan_id": committed.plan_id(),
                                "trial_end": trial_end,
                                "status": committed.status,
                            }),
                        )
                        .await;
                    debug!(subscription_id = %committed.id, "Trial ended");
                    return Ok(true);
                }
                Err(e) if e.is_retryable() && attempt < SWEEP_COMMIT_ATTEMPTS => {
                    attempt += 1;
                    match self.store.get(&sub.id).await? {
                        Some(fresh) => sub = fresh,
                        None => return Ok(false),
                    }
                }
                Err(e) => return Err(e),
            }
        }
    }

    // =========================================================================
    // Entitlements and usage
    // =========================================================================

    /// Evaluate every limit of a subscription.
    pub async fn check_limits(&self, id: &str) -> Result<LimitReport> {
        self.entitlements().check_limits(id).await
    }

    /// Recompute user and hotel counters from the tenant directory.
    pub async fn calculate_usage(&self, id: &str) -> Result<Subscription> {
        self.usage().calculate_usage_for_subscription(id).await
    }
}

fn tenant_query(tenant: &TenantRef) -> SubscriptionQuery {
    match tenant {
        TenantRef::Organization(id) => SubscriptionQuery::new().organization(id.as_str()),
        TenantRef::Hotel(id) => SubscriptionQuery::new().hotel(id.as_str()),
    }
}

/// Start a new billing period at `now` using the snapshot plan's interval.
fn open_period(sub: &mut Subscription, now: DateTime<Utc>) -> Result<()> {
    sub.current_period_end = period_end(now, sub.plan.plan.pricing.interval.period_days())?;
    sub.current_period_start = now;
    sub.trial_end = None;
    Ok(())
}

/// `start` plus `length` days, or a validation error when the date is out of range.
fn period_end(start: DateTime<Utc>, length: u32) -> Result<DateTime<Utc>> {
    start.checked_add_signed(days(length)).ok_or_else(|| {
        EngineError::validation(format!("a {} day period from {} is out of range", length, start))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::PlanDataset;
    use crate::events::InMemoryEventStore;
    use crate::store::InMemorySubscriptionStore;

    fn engine() -> LifecycleEngine<InMemorySubscriptionStore, InMemoryEventStore> {
        LifecycleEngine::new(
            PlanCatalog::from_dataset(PlanDataset::bundled().unwrap()),
            InMemorySubscriptionStore::new(),
            InMemoryEventStore::new(),
        )
    }

    #[test]
    fn test_plan_change_event_classification() {
        let engine = engine();
        assert_eq!(engine.plan_change_event(100, 200), EventType::PlanUpgraded);
        assert_eq!(engine.plan_change_event(200, 100), EventType::PlanDowngraded);
        assert_eq!(engine.plan_change_event(100, 100), EventType::PlanDowngraded);

        let config = crate::config::ConfigBuilder::new()
            .with_equal_price_change(EqualPriceChange::Changed)
            .build()
            .unwrap();
        let engine = LifecycleEngine::with_config(
            PlanCatalog::new(),
            InMemorySubscriptionStore::new(),
            InMemoryEventStore::new(),
            config,
        );
        assert_eq!(engine.plan_change_event(100, 100), EventType::PlanChanged);
    }

    #[test]
    fn test_period_end_out_of_range() {
        let start = chrono::TimeZone::with_ymd_and_hms(&Utc, 2025, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(period_end(start, 30).unwrap(), start + chrono::Duration::days(30));

        let err = period_end(DateTime::<Utc>::MAX_UTC, 1).unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn test_tenant_query() {
        let q = tenant_query(&TenantRef::hotel("h_1"));
        assert_eq!(q.hotel_id.as_deref(), Some("h_1"));
        assert!(q.organization_id.is_none());
    }

    #[tokio::test]
    async fn test_update_noop_patch_emits_nothing() {
        let engine = engine();
        let sub = engine
            .create_subscription(
                CreateSubscriptionInput::new(TenantRef::hotel("h_1"), "free"),
                "tester",
            )
            .await
            .unwrap();

        let same = engine
            .update_subscription(&sub.id, SubscriptionPatch::new().status(SubscriptionStatus::Active))
            .await
            .unwrap();

        assert_eq!(same.version, sub.version);
        assert_eq!(engine.events_for(&sub.id, 10).await.unwrap().len(), 1);
    }
}
