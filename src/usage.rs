//! Usage recalculation.
//!
//! Counters that the engine can derive (users and hotels) are recomputed from the
//! host's [`TenantDirectory`]; the rest are pushed by the host through
//! [`UsageRecalculator::update_usage`].

use crate::catalog::LimitName;
use crate::error::{EngineError, Result};
use crate::events::{EventLog, EventStore, EventType};
use crate::store::{SubscriptionQuery, SubscriptionStore, UnitOfWork};
use crate::subscription::{Subscription, SubscriptionStatus, UsageUpdate};
use crate::tenants::TenantDirectory;
use chrono::{DateTime, Utc};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Commit attempts for one usage write before giving up on a contended record.
const UPDATE_ATTEMPTS: u32 = 3;

/// Outcome of [`UsageRecalculator::recalculate_all`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecalculationReport {
    pub updated: Vec<String>,
    pub failed: Vec<String>,
}

/// Writes usage counters onto subscriptions.
pub struct UsageRecalculator<S: SubscriptionStore, E: EventStore> {
    store: Arc<S>,
    events: EventLog<E>,
    tenants: Option<Arc<dyn TenantDirectory>>,
}

impl<S: SubscriptionStore, E: EventStore> Clone for UsageRecalculator<S, E> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            events: self.events.clone(),
            tenants: self.tenants.clone(),
        }
    }
}

impl<S: SubscriptionStore, E: EventStore> UsageRecalculator<S, E> {
    /// Create a recalculator. Without a directory only pushed updates are possible.
    pub fn new(
        store: Arc<S>,
        events: EventLog<E>,
        tenants: Option<Arc<dyn TenantDirectory>>,
    ) -> Self {
        Self {
            store,
            events,
            tenants,
        }
    }

    /// Recount users and hotels for a subscription's tenant.
    ///
    /// # Errors
    ///
    /// - `Config` if no tenant directory is configured
    /// - `NotFound` if the subscription is missing
    #[instrument(skip(self))]
    pub async fn calculate_usage_for_subscription(&self, id: &str) -> Result<Subscription> {
        let tenants = self
            .tenants
            .as_ref()
            .ok_or_else(|| EngineError::config("usage calculation requires a tenant directory"))?;

        let sub = self
            .store
            .get(id)
            .await?
            .ok_or_else(|| EngineError::subscription_not_found(id))?;

        let hotels = tenants.count_hotels(&sub.tenant).await?;
        let users = tenants.count_users(&sub.tenant).await?;
        debug!(tenant = %sub.tenant, hotels, users, "Counted tenant usage");

        self.update_usage(id, UsageUpdate::new().hotels(hotels).users(users))
            .await
    }

    /// Write counters onto a subscription.
    pub async fn update_usage(&self, id: &str, update: UsageUpdate) -> Result<Subscription> {
        self.update_usage_at(id, update, Utc::now()).await
    }

    /// [`update_usage`](Self::update_usage) with an explicit clock.
    ///
    /// Crossing into a new calendar month moves the previous counters into
    /// `last_month` before the update is applied. Version conflicts are retried
    /// against a fresh read.
    pub async fn update_usage_at(
        &self,
        id: &str,
        update: UsageUpdate,
        now: DateTime<Utc>,
    ) -> Result<Subscription> {
        if update.is_empty() {
            return Err(EngineError::validation("usage update must set at least one counter"));
        }

        let mut attempt = 1;
        loop {
            let mut sub = self
                .store
                .get(id)
                .await?
                .ok_or_else(|| EngineError::subscription_not_found(id))?;

            let changed: Vec<LimitName> = update.apply_to(&mut sub.usage, now);
            sub.updated_at = now;

            match self.store.commit(UnitOfWork::new().update(sub)).await {
                Ok(mut committed) => {
                    let sub = committed
                        .pop()
                        .ok_or_else(|| EngineError::store("commit returned no records"))?;

                    self.events
                        .log_event(
                            &sub.id,
                            EventType::UsageUpdated,
                            json!({
                                "changed": changed,
                                "usage": sub.usage,
                            }),
                        )
                        .await;
                    return Ok(sub);
                }
                Err(e) if e.is_retryable() && attempt < UPDATE_ATTEMPTS => {
                    debug!(subscription_id = %id, attempt, "Usage write conflicted, retrying");
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Recalculate usage for up to `limit` live subscriptions concurrently.
    ///
    /// Individual failures are logged and reported; they do not stop the batch.
    pub async fn recalculate_all(&self, limit: usize) -> Result<RecalculationReport> {
        let query = SubscriptionQuery::new()
            .status_in(SubscriptionStatus::LIVE)
            .limit(limit);
        let subs = self.store.find(&query).await?;

        let results = join_all(subs.iter().map(|sub| async move {
            (
                sub.id.clone(),
                self.calculate_usage_for_subscription(&sub.id).await,
            )
        }))
        .await;

        let mut report = RecalculationReport::default();
        for (id, result) in results {
            match result {
                Ok(_) => report.updated.push(id),
                Err(e) => {
                    warn!(subscription_id = %id, error = %e, "Usage recalculation failed");
                    report.failed.push(id);
                }
            }
        }

        info!(
            updated = report.updated.len(),
            failed = report.failed.len(),
            "Usage recalculation finished"
        );
        Ok(report)
    }
}
