use super::report::{evaluate_limits, LimitReport};
use crate::catalog::{LimitCheckResult, LimitName};
use crate::error::{EngineError, Result};
use crate::events::{EventLog, EventStore, EventType};
use crate::store::SubscriptionStore;
use crate::subscription::Subscription;
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, instrument};

/// Default usage percentage at which a limit warns.
pub const DEFAULT_WARNING_THRESHOLD_PERCENT: u8 = 80;

/// Read-only evaluator of usage against a subscription's limit snapshot.
///
/// Results are advisory: the host consults them before quota-consuming actions.
pub struct EntitlementChecker<S: SubscriptionStore, E: EventStore> {
    store: Arc<S>,
    events: EventLog<E>,
    warning_threshold_percent: u8,
}

impl<S: SubscriptionStore, E: EventStore> Clone for EntitlementChecker<S, E> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            events: self.events.clone(),
            warning_threshold_percent: self.warning_threshold_percent,
        }
    }
}

impl<S: SubscriptionStore, E: EventStore> EntitlementChecker<S, E> {
    /// Create a new checker.
    pub fn new(store: Arc<S>, events: EventLog<E>) -> Self {
        Self {
            store,
            events,
            warning_threshold_percent: DEFAULT_WARNING_THRESHOLD_PERCENT,
        }
    }

    /// Set the warning threshold (1..=100).
    #[must_use]
    pub fn with_warning_threshold(mut self, percent: u8) -> Self {
        self.warning_threshold_percent = percent.clamp(1, 100);
        self
    }

    async fn load(&self, subscription_id: &str) -> Result<Subscription> {
        self.store
            .get(subscription_id)
            .await?
            .ok_or_else(|| EngineError::subscription_not_found(subscription_id))
    }

    /// Check every limit.
    ///
    /// When any limit is reached a `usage_limit_exceeded` event carrying the
    /// warnings is recorded.
    #[instrument(skip(self))]
    pub async fn check_limits(&self, subscription_id: &str) -> Result<LimitReport> {
        let sub = self.load(subscription_id).await?;
        let report = evaluate_limits(
            &sub.id,
            &sub.limits,
            &sub.usage,
            self.warning_threshold_percent,
        );

        if report.exceeded {
            debug!(exceeded = ?report.exceeded_limits(), "Usage limit exceeded");
            self.events
                .log_event(
                    &sub.id,
                    EventType::UsageLimitExceeded,
                    json!({
                        "exceeded": report.exceeded_limits(),
                        "warnings": report.warnings,
                    }),
                )
                .await;
        }

        Ok(report)
    }

    /// Check a single limit.
    pub async fn check_limit(
        &self,
        subscription_id: &str,
        name: LimitName,
    ) -> Result<LimitCheckResult> {
        let sub = self.load(subscription_id).await?;
        Ok(sub.limits.check(name, sub.usage.counter(name)))
    }

    /// Whether `amount` more units fit under the limit.
    pub async fn can_consume(
        &self,
        subscription_id: &str,
        name: LimitName,
        amount: u64,
    ) -> Result<bool> {
        let sub = self.load(subscription_id).await?;
        Ok(match sub.limits.get(name).cap() {
            None => true,
            Some(max) => sub
                .usage
                .counter(name)
                .checked_add(amount)
                .is_some_and(|total| total <= max),
        })
    }

    /// Whether the plan snapshot enables a feature.
    pub async fn has_feature(&self, subscription_id: &str, feature: &str) -> Result<bool> {
        Ok(self.load(subscription_id).await?.has_feature(feature))
    }

    /// Whether the subscription's status grants access at all.
    pub async fn is_entitled(&self, subscription_id: &str) -> Result<bool> {
        Ok(self.load(subscription_id).await?.status.grants_access())
    }
}
