//! In-memory subscription store.

use super::{StagedWrite, SubscriptionQuery, SubscriptionStore, UnitOfWork};
use crate::error::{EngineError, Result};
use crate::subscription::Subscription;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// In-memory subscription store for single-node use and tests.
///
/// Wraps data in Arc for cheap cloning. A unit of work is validated and applied
/// while holding one write lock, with no await point in between.
#[derive(Default, Clone)]
pub struct InMemorySubscriptionStore {
    subscriptions: Arc<RwLock<HashMap<String, Subscription>>>,
}

impl InMemorySubscriptionStore {
    /// Create a new in-memory store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records.
    pub async fn len(&self) -> usize {
        self.subscriptions.read().await.len()
    }

    /// Whether the store is empty.
    pub async fn is_empty(&self) -> bool {
        self.subscriptions.read().await.is_empty()
    }

    /// All stored records (for testing).
    pub async fn all(&self) -> Vec<Subscription> {
        self.subscriptions.read().await.values().cloned().collect()
    }
}

#[async_trait]
impl SubscriptionStore for InMemorySubscriptionStore {
    async fn get(&self, id: &str) -> Result<Option<Subscription>> {
        Ok(self.subscriptions.read().await.get(id).cloned())
    }

    async fn find(&self, query: &SubscriptionQuery) -> Result<Vec<Subscription>> {
        let subs = self.subscriptions.read().await;
        let matched = subs.values().filter(|s| query.matches(s)).cloned().collect();
        Ok(query.finish(matched))
    }

    async fn commit(&self, unit: UnitOfWork) -> Result<Vec<Subscription>> {
        let mut subs = self.subscriptions.write().await;

        // Validate everything before touching the map
        for write in unit.writes() {
            match write {
                StagedWrite::Insert(sub) => {
                    if subs.contains_key(&sub.id) {
                        return Err(EngineError::store(format!(
                            "subscription '{}' already exists",
                            sub.id
                        )));
                    }
                }
                StagedWrite::Update {
                    expected_version,
                    subscription,
                } => match subs.get(&subscription.id) {
                    Some(current) if current.version == *expected_version => {}
                    Some(_) => {
                        return Err(EngineError::ConcurrentModification {
                            id: subscription.id.clone(),
                        })
                    }
                    None => return Err(EngineError::subscription_not_found(&subscription.id)),
                },
            }
        }

        let mut committed = Vec::with_capacity(unit.len());
        for write in unit.into_writes() {
            let sub = match write {
                StagedWrite::Insert(mut sub) => {
                    sub.version = 1;
                    sub
                }
                StagedWrite::Update {
                    expected_version,
                    mut subscription,
                } => {
                    subscription.version = expected_version + 1;
                    subscription
                }
            };
            subs.insert(sub.id.clone(), sub.clone());
            committed.push(sub);
        }

        Ok(committed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{BillingInterval, Plan};
    use crate::store::QueryOrder;
    use crate::subscription::{
        BillingInfo, PlanSnapshot, SubscriptionStatus, TenantRef, Usage,
    };
    use chrono::{Duration, Utc};

    fn record(id: &str, tenant: TenantRef, status: SubscriptionStatus, end_days: i64) -> Subscription {
        let now = Utc::now();
        let plan = Plan::new("starter", "Starter", 2900, "usd", BillingInterval::Monthly);
        Subscription {
            id: id.to_string(),
            tenant,
            limits: plan.limits,
            plan: PlanSnapshot::capture(plan, now),
            status,
            start_date: now,
            current_period_start: now,
            current_period_end: now + Duration::days(end_days),
            trial_end: None,
            usage: Usage::default(),
            billing: BillingInfo::default(),
            cancel_reason: None,
            canceled_at: None,
            created_at: now + Duration::seconds(end_days),
            updated_at: now,
            created_by: "test".to_string(),
            version: 0,
        }
    }

    #[tokio::test]
    async fn test_insert_and_get() {
        let store = InMemorySubscriptionStore::new();
        let sub = record("a", TenantRef::hotel("h1"), SubscriptionStatus::Active, 30);

        let committed = store.commit(UnitOfWork::new().insert(sub)).await.unwrap();
        assert_eq!(committed[0].version, 1);

        let fetched = store.get("a").await.unwrap().unwrap();
        assert_eq!(fetched.version, 1);
        assert!(store.get("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_insert_rejected() {
        let store = InMemorySubscriptionStore::new();
        let sub = record("a", TenantRef::hotel("h1"), SubscriptionStatus::Active, 30);
        store.commit(UnitOfWork::new().insert(sub.clone())).await.unwrap();

        let err = store.commit(UnitOfWork::new().insert(sub)).await.unwrap_err();
        assert!(matches!(err, EngineError::Store(_)));
    }

    #[tokio::test]
    async fn test_update_checks_version() {
        let store = InMemorySubscriptionStore::new();
        let sub = record("a", TenantRef::hotel("h1"), SubscriptionStatus::Active, 30);
        store.commit(UnitOfWork::new().insert(sub)).await.unwrap();

        let mut first = store.get("a").await.unwrap().unwrap();
        let mut second = first.clone();

        first.status = SubscriptionStatus::Paused;
        let committed = store.commit(UnitOfWork::new().update(first)).await.unwrap();
        assert_eq!(committed[0].version, 2);

        second.status = SubscriptionStatus::Canceled;
        let err = store.commit(UnitOfWork::new().update(second)).await.unwrap_err();
        assert!(err.is_retryable());
        assert_eq!(
            store.get("a").await.unwrap().unwrap().status,
            SubscriptionStatus::Paused
        );
    }

    #[tokio::test]
    async fn test_unit_is_all_or_nothing() {
        let store = InMemorySubscriptionStore::new();
        let existing = record("a", TenantRef::hotel("h1"), SubscriptionStatus::Active, 30);
        store.commit(UnitOfWork::new().insert(existing.clone())).await.unwrap();

        // A fresh insert plus a stale update: neither may land
        let fresh = record("b", TenantRef::hotel("h2"), SubscriptionStatus::Active, 30);
        let mut stale = existing;
        stale.version = 7;
        let unit = UnitOfWork::new().insert(fresh).update(stale);

        assert!(store.commit(unit).await.is_err());
        assert!(store.get("b").await.unwrap().is_none());
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_find_filters_and_orders() {
        let store = InMemorySubscriptionStore::new();
        let unit = UnitOfWork::new()
            .insert(record("t1", TenantRef::organization("o1"), SubscriptionStatus::Trialing, 2))
            .insert(record("t2", TenantRef::organization("o1"), SubscriptionStatus::Trialing, 1))
            .insert(record("a1", TenantRef::organization("o2"), SubscriptionStatus::Active, 30))
            .insert(record("c1", TenantRef::hotel("h1"), SubscriptionStatus::Canceled, 5));
        store.commit(unit).await.unwrap();

        let org = store
            .find(&SubscriptionQuery::new().organization("o1"))
            .await
            .unwrap();
        // newest first
        assert_eq!(org.iter().map(|s| s.id.as_str()).collect::<Vec<_>>(), vec!["t1", "t2"]);

        let live = store
            .find(&SubscriptionQuery::new().status_in(SubscriptionStatus::LIVE))
            .await
            .unwrap();
        assert_eq!(live.len(), 3);

        let expiring = store
            .find(
                &SubscriptionQuery::new()
                    .status(SubscriptionStatus::Trialing)
                    .period_end_at_or_before(Utc::now() + Duration::days(3))
                    .order(QueryOrder::PeriodEndAscending),
            )
            .await
            .unwrap();
        assert_eq!(
            expiring.iter().map(|s| s.id.as_str()).collect::<Vec<_>>(),
            vec!["t2", "t1"]
        );

        let hotel = SubscriptionQuery::new().hotel("h1");
        assert_eq!(store.count(&hotel).await.unwrap(), 1);
        assert_eq!(
            store.find(&SubscriptionQuery::new().limit(2)).await.unwrap().len(),
            2
        );
    }
}
