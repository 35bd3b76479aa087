//! Subscription records.

use super::status::{transition, LifecycleAction, SubscriptionStatus, TransitionRejected};
use super::usage::Usage;
use crate::catalog::{Plan, PlanLimits};
use crate::error::{EngineError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The tenant a subscription belongs to.
///
/// A subscription belongs to exactly one organization or one standalone hotel.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum TenantRef {
    /// An organization, which may own several hotels.
    Organization(String),
    /// A standalone hotel.
    Hotel(String),
}

impl TenantRef {
    /// Reference an organization.
    pub fn organization(id: impl Into<String>) -> Self {
        Self::Organization(id.into())
    }

    /// Reference a hotel.
    pub fn hotel(id: impl Into<String>) -> Self {
        Self::Hotel(id.into())
    }

    /// The tenant id.
    #[must_use]
    pub fn id(&self) -> &str {
        match self {
            Self::Organization(id) | Self::Hotel(id) => id,
        }
    }

    /// "organization" or "hotel".
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Organization(_) => "organization",
            Self::Hotel(_) => "hotel",
        }
    }

    /// The organization id, if this is an organization.
    #[must_use]
    pub fn organization_id(&self) -> Option<&str> {
        match self {
            Self::Organization(id) => Some(id),
            Self::Hotel(_) => None,
        }
    }

    /// The hotel id, if this is a hotel.
    #[must_use]
    pub fn hotel_id(&self) -> Option<&str> {
        match self {
            Self::Hotel(id) => Some(id),
            Self::Organization(_) => None,
        }
    }

    /// Reject empty or whitespace ids.
    pub fn validate(&self) -> Result<()> {
        if self.id().trim().is_empty() {
            return Err(EngineError::validation(format!(
                "{} id cannot be empty",
                self.kind()
            )));
        }
        Ok(())
    }
}

impl fmt::Display for TenantRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind(), self.id())
    }
}

/// The plan exactly as it was when the subscription was created or last changed plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanSnapshot {
    /// Frozen plan definition.
    pub plan: Plan,
    /// When the snapshot was taken.
    pub captured_at: DateTime<Utc>,
}

impl PlanSnapshot {
    /// Snapshot a plan.
    #[must_use]
    pub fn capture(plan: Plan, at: DateTime<Utc>) -> Self {
        Self {
            plan,
            captured_at: at,
        }
    }

    /// Plan id.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.plan.id
    }

    /// Plan price in minor units.
    #[must_use]
    pub fn amount(&self) -> i64 {
        self.plan.pricing.amount
    }
}

/// Billing contact details.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BillingInfo {
    pub billing_email: Option<String>,
    pub payment_method: Option<String>,
    /// Customer id at the payment provider.
    pub external_customer_id: Option<String>,
}

/// A tenant's subscription.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscription {
    /// UUID v4.
    pub id: String,
    /// Owning tenant.
    pub tenant: TenantRef,
    /// Plan snapshot.
    pub plan: PlanSnapshot,
    /// Limits copied from the plan snapshot.
    pub limits: PlanLimits,
    pub status: SubscriptionStatus,
    pub start_date: DateTime<Utc>,
    pub current_period_start: DateTime<Utc>,
    pub current_period_end: DateTime<Utc>,
    /// End of the trial window, while one applies.
    #[serde(default)]
    pub trial_end: Option<DateTime<Utc>>,
    #[serde(default)]
    pub usage: Usage,
    #[serde(default)]
    pub billing: BillingInfo,
    #[serde(default)]
    pub cancel_reason: Option<String>,
    #[serde(default)]
    pub canceled_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Actor that created the subscription.
    pub created_by: String,
    /// Optimistic concurrency token, bumped on every commit.
    #[serde(default)]
    pub version: u64,
}

impl Subscription {
    /// Current plan id.
    #[must_use]
    pub fn plan_id(&self) -> &str {
        self.plan.id()
    }

    /// Owning organization, if any.
    #[must_use]
    pub fn organization_id(&self) -> Option<&str> {
        self.tenant.organization_id()
    }

    /// Owning hotel, if any.
    #[must_use]
    pub fn hotel_id(&self) -> Option<&str> {
        self.tenant.hotel_id()
    }

    /// Active or trialing.
    #[must_use]
    pub fn is_live(&self) -> bool {
        self.status.is_live()
    }

    /// Whether the trial window is still open at `now`.
    #[must_use]
    pub fn is_trial_open(&self, now: DateTime<Utc>) -> bool {
        self.status == SubscriptionStatus::Trialing
            && self.trial_end.map_or(self.current_period_end > now, |end| end > now)
    }

    /// Apply a lifecycle action to the status.
    ///
    /// # Errors
    ///
    /// Returns [`TransitionRejected`] and leaves the record untouched when the action
    /// is not legal from the current status.
    pub fn apply(
        &mut self,
        action: LifecycleAction,
    ) -> std::result::Result<SubscriptionStatus, TransitionRejected> {
        let next = transition(self.status, action)?;
        self.status = next;
        if next != SubscriptionStatus::Trialing {
            self.trial_end = None;
        }
        Ok(next)
    }

    /// Whether `feature` is enabled on the plan snapshot.
    #[must_use]
    pub fn has_feature(&self, feature: &str) -> bool {
        self.plan.plan.has_feature(feature)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::BillingInterval;
    use chrono::Duration;

    fn subscription(status: SubscriptionStatus) -> Subscription {
        let now = Utc::now();
        let plan = Plan::new("starter", "Starter", 2900, "usd", BillingInterval::Monthly);
        Subscription {
            id: "sub_1".to_string(),
            tenant: TenantRef::hotel("hotel_1"),
            limits: plan.limits,
            plan: PlanSnapshot::capture(plan, now),
            status,
            start_date: now,
            current_period_start: now,
            current_period_end: now + Duration::days(14),
            trial_end: Some(now + Duration::days(14)),
            usage: Usage::default(),
            billing: BillingInfo::default(),
            cancel_reason: None,
            canceled_at: None,
            created_at: now,
            updated_at: now,
            created_by: "tester".to_string(),
            version: 1,
        }
    }

    #[test]
    fn test_tenant_ref() {
        let org = TenantRef::organization("org_1");
        assert_eq!(org.organization_id(), Some("org_1"));
        assert_eq!(org.hotel_id(), None);
        assert_eq!(org.to_string(), "organization:org_1");

        let hotel = TenantRef::hotel("h_9");
        assert_eq!(hotel.hotel_id(), Some("h_9"));
        assert_eq!(hotel.organization_id(), None);

        assert!(TenantRef::hotel(" ").validate().is_err());
        assert!(org.validate().is_ok());
    }

    #[test]
    fn test_tenant_ref_serde() {
        let json = serde_json::to_value(TenantRef::organization("org_1")).unwrap();
        assert_eq!(json, serde_json::json!({"kind": "organization", "id": "org_1"}));
    }

    #[test]
    fn test_apply_clears_trial_end() {
        let mut sub = subscription(SubscriptionStatus::Trialing);
        assert!(sub.is_trial_open(Utc::now()));

        let status = sub.apply(LifecycleAction::TrialEnded).unwrap();
        assert_eq!(status, SubscriptionStatus::PastDue);
        assert!(sub.trial_end.is_none());
        assert!(!sub.is_trial_open(Utc::now()));
    }

    #[test]
    fn test_apply_rejected_leaves_record() {
        let mut sub = subscription(SubscriptionStatus::Active);
        let before = sub.clone();
        assert!(sub.apply(LifecycleAction::Reactivate).is_err());
        assert_eq!(sub, before);
    }
}
