//! Shared fixtures for integration tests.
#![allow(dead_code)]

use async_trait::async_trait;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use subscription_engine::store::{SubscriptionQuery, SubscriptionStore, UnitOfWork};
use subscription_engine::{
    ConfigBuilder, EngineConfig, EngineError, EventStore, InMemoryEventStore,
    InMemorySubscriptionStore, LifecycleEngine, PlanCatalog, PlanDataset, Result, Subscription,
    SubscriptionEvent,
};

/// Subscription store whose next `n` commits fail with a store error.
#[derive(Clone, Default)]
pub struct FlakyStore {
    pub inner: InMemorySubscriptionStore,
    failures: Arc<AtomicU32>,
}

impl FlakyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_next_commits(&self, n: u32) {
        self.failures.store(n, Ordering::SeqCst);
    }
}

#[async_trait]
impl SubscriptionStore for FlakyStore {
    async fn get(&self, id: &str) -> Result<Option<Subscription>> {
        self.inner.get(id).await
    }

    async fn find(&self, query: &SubscriptionQuery) -> Result<Vec<Subscription>> {
        self.inner.find(query).await
    }

    async fn commit(&self, unit: UnitOfWork) -> Result<Vec<Subscription>> {
        let remaining = self.failures.load(Ordering::SeqCst);
        if remaining > 0 {
            self.failures.store(remaining - 1, Ordering::SeqCst);
            return Err(EngineError::store("connection reset"));
        }
        self.inner.commit(unit).await
    }
}

/// Event store whose next `n` appends fail.
#[derive(Clone, Default)]
pub struct FlakyEventStore {
    pub inner: InMemoryEventStore,
    failures: Arc<AtomicU32>,
}

impl FlakyEventStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_next_appends(&self, n: u32) {
        self.failures.store(n, Ordering::SeqCst);
    }
}

#[async_trait]
impl EventStore for FlakyEventStore {
    async fn append(&self, event: &SubscriptionEvent) -> Result<()> {
        let remaining = self.failures.load(Ordering::SeqCst);
        if remaining > 0 {
            self.failures.store(remaining - 1, Ordering::SeqCst);
            return Err(EngineError::store("ledger unavailable"));
        }
        self.inner.append(event).await
    }

    async fn list_for_subscription(
        &self,
        subscription_id: &str,
        limit: usize,
    ) -> Result<Vec<SubscriptionEvent>> {
        self.inner.list_for_subscription(subscription_id, limit).await
    }
}

pub fn catalog() -> PlanCatalog {
    PlanCatalog::from_dataset(PlanDataset::bundled().unwrap())
}

/// Config with millisecond event retries so failure tests stay fast.
pub fn fast_config() -> EngineConfig {
    ConfigBuilder::new()
        .with_event_retries(3, Duration::from_millis(1))
        .build()
        .unwrap()
}

pub fn engine() -> LifecycleEngine<InMemorySubscriptionStore, InMemoryEventStore> {
    LifecycleEngine::with_config(
        catalog(),
        InMemorySubscriptionStore::new(),
        InMemoryEventStore::new(),
        fast_config(),
    )
}
