//! The event log: fire-and-forget writes with bounded retries.

use super::store::EventStore;
use super::types::{EventType, SubscriptionEvent};
use crate::config::EventConfig;
use crate::error::Result;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Append-only ledger of lifecycle events.
///
/// Writes never fail the caller: each event is built once, so every retry carries
/// the same id, and a write that still fails after `max_attempts` is logged and
/// dropped.
pub struct EventLog<E: EventStore> {
    store: Arc<E>,
    max_attempts: u32,
    retry_backoff: Duration,
}

impl<E: EventStore> Clone for EventLog<E> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            max_attempts: self.max_attempts,
            retry_backoff: self.retry_backoff,
        }
    }
}

impl<E: EventStore> EventLog<E> {
    /// Create an event log with default retry settings.
    pub fn new(store: E) -> Self {
        Self::with_config(store, &EventConfig::default())
    }

    /// Create an event log with explicit retry settings.
    pub fn with_config(store: E, config: &EventConfig) -> Self {
        Self::from_arc(Arc::new(store), config)
    }

    /// Create an event log over a shared store.
    pub fn from_arc(store: Arc<E>, config: &EventConfig) -> Self {
        Self {
            store,
            max_attempts: config.max_attempts.max(1),
            retry_backoff: config.retry_backoff(),
        }
    }

    /// The underlying store.
    pub fn store(&self) -> &E {
        &self.store
    }

    /// Record an event.
    ///
    /// Returns whether the event was stored. The result is for diagnostics only;
    /// callers must not treat `false` as a failure of the operation that emitted it.
    pub async fn log_event(
        &self,
        subscription_id: &str,
        event_type: EventType,
        data: serde_json::Value,
    ) -> bool {
        let event = SubscriptionEvent::new(subscription_id, event_type, data);
        self.append_with_retry(&event).await
    }

    async fn append_with_retry(&self, event: &SubscriptionEvent) -> bool {
        let mut delay = self.retry_backoff;

        for attempt in 1..=self.max_attempts {
            match self.store.append(event).await {
                Ok(()) => {
                    debug!(
                        event_id = %event.id,
                        event_type = %event.event_type,
                        subscription_id = %event.subscription_id,
                        attempt,
                        "Event recorded"
                    );
                    return true;
                }
                Err(e) if attempt < self.max_attempts => {
                    debug!(event_id = %event.id, attempt, error = %e, "Event write failed, retrying");
                    tokio::time::sleep(delay).await;
                    delay = delay.saturating_mul(2);
                }
                Err(e) => {
                    warn!(
                        event_id = %event.id,
                        event_type = %event.event_type,
                        subscription_id = %event.subscription_id,
                        attempts = self.max_attempts,
                        error = %e,
                        "Failed to record event"
                    );
                }
            }
        }

        false
    }

    /// Events for a subscription, newest first.
    pub async fn events_for(
        &self,
        subscription_id: &str,
        limit: usize,
    ) -> Result<Vec<SubscriptionEvent>> {
        self.store.list_for_subscription(subscription_id, limit).await
    }
}
