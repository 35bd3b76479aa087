//! Event records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Kind of lifecycle event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    SubscriptionCreated,
    SubscriptionUpdated,
    PlanUpgraded,
    PlanDowngraded,
    /// Plan changed at equal price, when configured to report it separately.
    PlanChanged,
    SubscriptionCanceled,
    TrialEnded,
    UsageLimitExceeded,
    UsageUpdated,
}

impl EventType {
    /// Convert to string.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SubscriptionCreated => "subscription_created",
            Self::SubscriptionUpdated => "subscription_updated",
            Self::PlanUpgraded => "plan_upgraded",
            Self::PlanDowngraded => "plan_downgraded",
            Self::PlanChanged => "plan_changed",
            Self::SubscriptionCanceled => "subscription_canceled",
            Self::TrialEnded => "trial_ended",
            Self::UsageLimitExceeded => "usage_limit_exceeded",
            Self::UsageUpdated => "usage_updated",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An entry in the append-only event ledger.
///
/// The id is assigned once; consumers deduplicate by it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubscriptionEvent {
    pub id: Uuid,
    pub subscription_id: String,
    pub event_type: EventType,
    pub data: serde_json::Value,
    pub created_at: DateTime<Utc>,
    /// Set by downstream consumers, never by the engine.
    #[serde(default)]
    pub processed_at: Option<DateTime<Utc>>,
}

impl SubscriptionEvent {
    /// Build a new unprocessed event with a fresh id.
    #[must_use]
    pub fn new(
        subscription_id: impl Into<String>,
        event_type: EventType,
        data: serde_json::Value,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            subscription_id: subscription_id.into(),
            event_type,
            data,
            created_at: Utc::now(),
            processed_at: None,
        }
    }
}

impl fmt::Display for SubscriptionEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: sub={}, event={}",
            self.event_type, self.subscription_id, self.id
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_type_wire_names() {
        assert_eq!(
            serde_json::to_string(&EventType::UsageLimitExceeded).unwrap(),
            "\"usage_limit_exceeded\""
        );
        assert_eq!(EventType::PlanDowngraded.to_string(), "plan_downgraded");
    }

    #[test]
    fn test_new_event() {
        let a = SubscriptionEvent::new("sub_1", EventType::TrialEnded, serde_json::json!({}));
        let b = SubscriptionEvent::new("sub_1", EventType::TrialEnded, serde_json::json!({}));
        assert_ne!(a.id, b.id);
        assert!(a.processed_at.is_none());
        assert!(a.to_string().starts_with("trial_ended: sub=sub_1"));
    }
}
