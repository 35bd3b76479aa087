//! Event storage backends.

use super::types::SubscriptionEvent;
use crate::error::Result;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Append-only storage for lifecycle events.
///
/// Appending an event whose id is already stored must succeed without storing it
/// twice, so retried writes stay idempotent.
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Append an event.
    async fn append(&self, event: &SubscriptionEvent) -> Result<()>;

    /// Events for a subscription, newest first.
    async fn list_for_subscription(
        &self,
        subscription_id: &str,
        limit: usize,
    ) -> Result<Vec<SubscriptionEvent>>;
}

#[async_trait]
impl<E: EventStore + ?Sized> EventStore for Arc<E> {
    async fn append(&self, event: &SubscriptionEvent) -> Result<()> {
        (**self).append(event).await
    }

    async fn list_for_subscription(
        &self,
        subscription_id: &str,
        limit: usize,
    ) -> Result<Vec<SubscriptionEvent>> {
        (**self).list_for_subscription(subscription_id, limit).await
    }
}

/// In-memory event store.
///
/// Wraps data in Arc for cheap cloning.
#[derive(Default, Clone)]
pub struct InMemoryEventStore {
    events: Arc<RwLock<Vec<SubscriptionEvent>>>,
}

impl InMemoryEventStore {
    /// Create a new in-memory store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// All events in append order (for testing).
    pub async fn all(&self) -> Vec<SubscriptionEvent> {
        self.events.read().await.clone()
    }

    /// Number of stored events.
    pub async fn len(&self) -> usize {
        self.events.read().await.len()
    }

    /// Whether no event is stored.
    pub async fn is_empty(&self) -> bool {
        self.events.read().await.is_empty()
    }
}

#[async_trait]
impl EventStore for InMemoryEventStore {
    async fn append(&self, event: &SubscriptionEvent) -> Result<()> {
        let mut events = self.events.write().await;
        if !events.iter().any(|e| e.id == event.id) {
            events.push(event.clone());
        }
        Ok(())
    }

    async fn list_for_subscription(
        &self,
        subscription_id: &str,
        limit: usize,
    ) -> Result<Vec<SubscriptionEvent>> {
        let events = self.events.read().await;
        Ok(events
            .iter()
            .rev()
            .filter(|e| e.subscription_id == subscription_id)
            .take(limit)
            .cloned()
            .collect())
    }
}

/// Tracing-based event sink.
///
/// Emits each event at INFO level under the `subscription_engine::events` target.
/// Nothing is retained, so listing always returns an empty ledger.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingEventStore;

#[async_trait]
impl EventStore for TracingEventStore {
    async fn append(&self, event: &SubscriptionEvent) -> Result<()> {
        tracing::info!(
            target: "subscription_engine::events",
            event_id = %event.id,
            event_type = %event.event_type,
            subscription_id = %event.subscription_id,
            data = %event.data,
            "{}", event
        );
        Ok(())
    }

    async fn list_for_subscription(
        &self,
        _subscription_id: &str,
        _limit: usize,
    ) -> Result<Vec<SubscriptionEvent>> {
        Ok(Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventType;
    use serde_json::json;

    #[tokio::test]
    async fn test_in_memory_append_is_idempotent() {
        let store = InMemoryEventStore::new();
        let event = SubscriptionEvent::new("sub_1", EventType::SubscriptionCreated, json!({}));

        store.append(&event).await.unwrap();
        store.append(&event).await.unwrap();

        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_list_newest_first() {
        let store = InMemoryEventStore::new();
        let first = SubscriptionEvent::new("sub_1", EventType::SubscriptionCreated, json!({}));
        let other = SubscriptionEvent::new("sub_2", EventType::SubscriptionCreated, json!({}));
        let second = SubscriptionEvent::new("sub_1", EventType::TrialEnded, json!({}));
        for e in [&first, &other, &second] {
            store.append(e).await.unwrap();
        }

        let listed = store.list_for_subscription("sub_1", 10).await.unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].id, second.id);
        assert_eq!(listed[1].id, first.id);

        assert_eq!(store.list_for_subscription("sub_1", 1).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_tracing_sink_accepts_events() {
        let sink = TracingEventStore;
        let event = SubscriptionEvent::new("sub_1", EventType::UsageUpdated, json!({"users": 3}));
        assert!(sink.append(&event).await.is_ok());
        assert!(sink.list_for_subscription("sub_1", 5).await.unwrap().is_empty());
    }
}
