//! Subscription persistence.
//!
//! The engine is written against [`SubscriptionStore`]. Every mutation is staged in a
//! [`UnitOfWork`] and committed in one call; a store must apply all staged writes or
//! none of them.

mod memory;

pub use memory::InMemorySubscriptionStore;

use crate::error::Result;
use crate::subscription::{Subscription, SubscriptionStatus};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Result ordering for [`SubscriptionQuery`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QueryOrder {
    /// Most recently created first.
    #[default]
    NewestFirst,
    /// Earliest `current_period_end` first.
    PeriodEndAscending,
}

/// Filter over stored subscriptions. Unset fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubscriptionQuery {
    pub organization_id: Option<String>,
    pub hotel_id: Option<String>,
    /// Status IN-list. Empty matches every status.
    pub statuses: Vec<SubscriptionStatus>,
    pub period_end_at_or_before: Option<DateTime<Utc>>,
    pub period_end_after: Option<DateTime<Utc>>,
    pub limit: Option<usize>,
    pub order: QueryOrder,
}

impl SubscriptionQuery {
    /// Match everything.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Restrict to an organization.
    #[must_use]
    pub fn organization(mut self, id: impl Into<String>) -> Self {
        self.organization_id = Some(id.into());
        self
    }

    /// Restrict to a hotel.
    #[must_use]
    pub fn hotel(mut self, id: impl Into<String>) -> Self {
        self.hotel_id = Some(id.into());
        self
    }

    /// Restrict to a single status.
    #[must_use]
    pub fn status(mut self, status: SubscriptionStatus) -> Self {
        self.statuses = vec![status];
        self
    }

    /// Restrict to any of the given statuses.
    #[must_use]
    pub fn status_in(mut self, statuses: impl IntoIterator<Item = SubscriptionStatus>) -> Self {
        self.statuses = statuses.into_iter().collect();
        self
    }

    /// Only records whose period ends at or before `at`.
    #[must_use]
    pub fn period_end_at_or_before(mut self, at: DateTime<Utc>) -> Self {
        self.period_end_at_or_before = Some(at);
        self
    }

    /// Only records whose period ends after `at`.
    #[must_use]
    pub fn period_end_after(mut self, at: DateTime<Utc>) -> Self {
        self.period_end_after = Some(at);
        self
    }

    /// Cap the number of results.
    #[must_use]
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Set result ordering.
    #[must_use]
    pub fn order(mut self, order: QueryOrder) -> Self {
        self.order = order;
        self
    }

    /// Whether a record satisfies every filter. Ordering and limit are not considered.
    #[must_use]
    pub fn matches(&self, sub: &Subscription) -> bool {
        if let Some(ref org) = self.organization_id {
            if sub.organization_id() != Some(org.as_str()) {
                return false;
            }
        }
        if let Some(ref hotel) = self.hotel_id {
            if sub.hotel_id() != Some(hotel.as_str()) {
                return false;
            }
        }
        if !self.statuses.is_empty() && !self.statuses.contains(&sub.status) {
            return false;
        }
        if let Some(at) = self.period_end_at_or_before {
            if sub.current_period_end > at {
                return false;
            }
        }
        if let Some(at) = self.period_end_after {
            if sub.current_period_end <= at {
                return false;
            }
        }
        true
    }

    /// Sort and truncate matched records according to this query.
    pub fn finish(&self, mut subs: Vec<Subscription>) -> Vec<Subscription> {
        match self.order {
            QueryOrder::NewestFirst => subs.sort_by(|a, b| {
                b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id))
            }),
            QueryOrder::PeriodEndAscending => subs.sort_by(|a, b| {
                a.current_period_end
                    .cmp(&b.current_period_end)
                    .then_with(|| a.id.cmp(&b.id))
            }),
        }
        if let Some(limit) = self.limit {
            subs.truncate(limit);
        }
        subs
    }
}

/// A single staged write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StagedWrite {
    /// Create a new record. Fails if the id exists.
    Insert(Subscription),
    /// Replace a record whose stored version equals `expected_version`.
    Update {
        expected_version: u64,
        subscription: Subscription,
    },
}

impl StagedWrite {
    /// The record being written.
    #[must_use]
    pub fn subscription(&self) -> &Subscription {
        match self {
            Self::Insert(sub) => sub,
            Self::Update { subscription, .. } => subscription,
        }
    }
}

/// Writes that commit together or not at all.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[must_use = "a unit of work does nothing until committed"]
pub struct UnitOfWork {
    writes: Vec<StagedWrite>,
}

impl UnitOfWork {
    /// Create an empty unit.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stage a new record.
    pub fn insert(mut self, subscription: Subscription) -> Self {
        self.writes.push(StagedWrite::Insert(subscription));
        self
    }

    /// Stage a modified record.
    ///
    /// `subscription.version` must still be the version that was read; the store
    /// compares it and bumps it on commit.
    pub fn update(mut self, subscription: Subscription) -> Self {
        self.writes.push(StagedWrite::Update {
            expected_version: subscription.version,
            subscription,
        });
        self
    }

    /// Staged writes.
    #[must_use]
    pub fn writes(&self) -> &[StagedWrite] {
        &self.writes
    }

    /// Number of staged writes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.writes.len()
    }

    /// Whether nothing is staged.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.writes.is_empty()
    }

    pub(crate) fn into_writes(self) -> Vec<StagedWrite> {
        self.writes
    }
}

/// Storage backend for subscriptions.
///
/// Implementations must make [`commit`](SubscriptionStore::commit) atomic: on any
/// version mismatch return [`EngineError::ConcurrentModification`] and on any other
/// failure [`EngineError::Store`], applying nothing in either case.
///
/// [`EngineError::ConcurrentModification`]: crate::EngineError::ConcurrentModification
/// [`EngineError::Store`]: crate::EngineError::Store
#[async_trait]
pub trait SubscriptionStore: Send + Sync {
    /// Fetch a record by id.
    async fn get(&self, id: &str) -> Result<Option<Subscription>>;

    /// Fetch records matching a query.
    async fn find(&self, query: &SubscriptionQuery) -> Result<Vec<Subscription>>;

    /// Apply staged writes atomically and return the committed records.
    ///
    /// Inserted records are stored at version 1; updated records at
    /// `expected_version + 1`.
    async fn commit(&self, unit: UnitOfWork) -> Result<Vec<Subscription>>;

    /// Count records matching a query.
    async fn count(&self, query: &SubscriptionQuery) -> Result<usize> {
        Ok(self.find(query).await?.len())
    }
}

#[async_trait]
impl<S: SubscriptionStore + ?Sized> SubscriptionStore for Arc<S> {
    async fn get(&self, id: &str) -> Result<Option<Subscription>> {
        (**self).get(id).await
    }

    async fn find(&self, query: &SubscriptionQuery) -> Result<Vec<Subscription>> {
        (**self).find(query).await
    }

    async fn commit(&self, unit: UnitOfWork) -> Result<Vec<Subscription>> {
        (**self).commit(unit).await
    }

    async fn count(&self, query: &SubscriptionQuery) -> Result<usize> {
        (**self).count(query).await
    }
}
