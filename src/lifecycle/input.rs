//! Requests accepted by the lifecycle engine.

use crate::subscription::{BillingInfo, SubscriptionStatus, TenantRef};
use serde::{Deserialize, Serialize};

/// Request to start a subscription.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateSubscriptionInput {
    pub tenant: TenantRef,
    pub plan_id: String,
    /// Overrides the plan's trial length when set. `Some(0)` skips the trial.
    #[serde(default)]
    pub trial_days: Option<u32>,
    #[serde(default)]
    pub billing: BillingInfo,
}

impl CreateSubscriptionInput {
    /// Create a request using the plan's default trial.
    pub fn new(tenant: TenantRef, plan_id: impl Into<String>) -> Self {
        Self {
            tenant,
            plan_id: plan_id.into(),
            trial_days: None,
            billing: BillingInfo::default(),
        }
    }

    /// Override the trial length.
    #[must_use]
    pub fn with_trial_days(mut self, days: u32) -> Self {
        self.trial_days = Some(days);
        self
    }

    /// Attach billing details.
    #[must_use]
    pub fn with_billing(mut self, billing: BillingInfo) -> Self {
        self.billing = billing;
        self
    }
}

/// Partial update of a subscription. All present fields commit together.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SubscriptionPatch {
    /// Switch to another plan, replacing the plan and limit snapshots.
    pub plan_id: Option<String>,
    /// Replace billing details.
    pub billing: Option<BillingInfo>,
    /// Move to a status reachable through the transition table.
    pub status: Option<SubscriptionStatus>,
}

impl SubscriptionPatch {
    /// Create an empty patch.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn plan(mut self, plan_id: impl Into<String>) -> Self {
        self.plan_id = Some(plan_id.into());
        self
    }

    #[must_use]
    pub fn billing(mut self, billing: BillingInfo) -> Self {
        self.billing = Some(billing);
        self
    }

    #[must_use]
    pub fn status(mut self, status: SubscriptionStatus) -> Self {
        self.status = Some(status);
        self
    }

    /// Whether no field is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.plan_id.is_none() && self.billing.is_none() && self.status.is_none()
    }
}
