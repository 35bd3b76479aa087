//! Append-only lifecycle event ledger.
//!
//! Every successful mutation emits one [`SubscriptionEvent`] through an [`EventLog`].
//! Delivery is at-least-once; consumers deduplicate by event id.

mod log;
mod store;
mod types;

pub use log::EventLog;
pub use store::{EventStore, InMemoryEventStore, TracingEventStore};
pub use types::{EventType, SubscriptionEvent};
