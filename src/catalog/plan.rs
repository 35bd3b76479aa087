//! Plan definitions.

use super::limits::{LimitCheckResult, LimitName, PlanLimits};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Length of a monthly billing period.
///
/// Periods use fixed-day arithmetic, not calendar months.
pub const MONTHLY_PERIOD_DAYS: u32 = 30;

/// Length of a yearly billing period.
pub const YEARLY_PERIOD_DAYS: u32 = 365;

/// Billing interval for a plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BillingInterval {
    /// Billed monthly.
    #[default]
    Monthly,
    /// Billed yearly.
    Yearly,
}

impl BillingInterval {
    /// Parse from string.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "monthly" | "month" => Some(Self::Monthly),
            "yearly" | "year" | "annual" => Some(Self::Yearly),
            _ => None,
        }
    }

    /// Convert to string.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Monthly => "monthly",
            Self::Yearly => "yearly",
        }
    }

    /// Number of days in one billing period.
    #[must_use]
    pub fn period_days(&self) -> u32 {
        match self {
            Self::Monthly => MONTHLY_PERIOD_DAYS,
            Self::Yearly => YEARLY_PERIOD_DAYS,
        }
    }
}

impl std::fmt::Display for BillingInterval {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Price of a plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pricing {
    /// Price in minor currency units (e.g. cents).
    pub amount: i64,
    /// Lowercase ISO 4217 currency code.
    pub currency: String,
    /// Billing interval.
    #[serde(default)]
    pub interval: BillingInterval,
    /// Trial length in days (0 = no trial).
    #[serde(default)]
    pub trial_days: u32,
}

/// A subscription plan.
///
/// Plans are versioned: [`PlanCatalog::update_plan`](super::PlanCatalog::update_plan)
/// stores a new version, and subscriptions keep the version they snapshotted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plan {
    /// Plan identifier (e.g., "starter", "professional").
    pub id: String,
    /// Display name shown to users.
    pub name: String,
    /// Description of the plan.
    #[serde(default)]
    pub description: Option<String>,
    /// Pricing.
    pub pricing: Pricing,
    /// Resource limits. Required, with every key present.
    pub limits: PlanLimits,
    /// Feature flags.
    #[serde(default)]
    pub features: BTreeMap<String, bool>,
    /// Whether the plan can be subscribed to.
    #[serde(default = "default_true")]
    pub is_active: bool,
    /// Whether the plan is listed publicly.
    #[serde(default = "default_true")]
    pub is_public: bool,
    /// Sort order for display.
    #[serde(default)]
    pub sort_order: i32,
    /// Catalog version of this definition.
    #[serde(default)]
    pub version: u32,
    /// Created timestamp.
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    /// Updated timestamp.
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

fn default_true() -> bool {
    true
}

impl Plan {
    /// Create a new active, public plan with unlimited limits and no features.
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        amount: i64,
        currency: impl Into<String>,
        interval: BillingInterval,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            name: name.into(),
            description: None,
            pricing: Pricing {
                amount,
                currency: currency.into().to_lowercase(),
                interval,
                trial_days: 0,
            },
            limits: PlanLimits::unlimited(),
            features: BTreeMap::new(),
            is_active: true,
            is_public: true,
            sort_order: 0,
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Check if this plan has a specific feature enabled.
    #[must_use]
    pub fn has_feature(&self, feature: &str) -> bool {
        self.features.get(feature).copied().unwrap_or(false)
    }

    /// Check a resource usage against this plan's limits.
    #[must_use]
    pub fn check_limit(&self, name: LimitName, current: u64) -> LimitCheckResult {
        self.limits.check(name, current)
    }

    /// Get the price formatted for display (e.g., "$9.99").
    #[must_use]
    pub fn formatted_price(&self) -> String {
        let symbol = match self.pricing.currency.as_str() {
            "usd" => "$",
            "gbp" => "£",
            "eur" => "€",
            other => other,
        };
        format!(
            "{}{}.{:02}",
            symbol,
            self.pricing.amount / 100,
            (self.pricing.amount % 100).abs()
        )
    }
}
