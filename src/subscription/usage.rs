//! Usage counters carried on each subscription.

use crate::catalog::LimitName;
use crate::utils::time::same_month;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Current usage of a tenant against its plan limits.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Usage {
    /// Users belonging to the tenant.
    pub current_users: u64,
    /// Hotels owned by the tenant.
    pub current_hotels: u64,
    /// Stored documents.
    pub current_documents: u64,
    /// Storage used in megabytes.
    pub current_storage: u64,
    /// API requests in the current period.
    pub current_api_requests: u64,
    /// Counters as they stood when the calendar month last rolled over.
    pub last_month: Option<UsageSnapshot>,
    /// When usage was last written.
    pub last_calculated: Option<DateTime<Utc>>,
}

impl Usage {
    /// Counter for a limit.
    #[must_use]
    pub fn counter(&self, name: LimitName) -> u64 {
        match name {
            LimitName::Users => self.current_users,
            LimitName::Hotels => self.current_hotels,
            LimitName::Documents => self.current_documents,
            LimitName::Storage => self.current_storage,
            LimitName::ApiRequests => self.current_api_requests,
        }
    }

    fn counter_mut(&mut self, name: LimitName) -> &mut u64 {
        match name {
            LimitName::Users => &mut self.current_users,
            LimitName::Hotels => &mut self.current_hotels,
            LimitName::Documents => &mut self.current_documents,
            LimitName::Storage => &mut self.current_storage,
            LimitName::ApiRequests => &mut self.current_api_requests,
        }
    }

    /// Copy the current counters into a snapshot.
    #[must_use]
    pub fn snapshot(&self, at: DateTime<Utc>) -> UsageSnapshot {
        UsageSnapshot {
            users: self.current_users,
            hotels: self.current_hotels,
            documents: self.current_documents,
            storage: self.current_storage,
            api_requests: self.current_api_requests,
            captured_at: at,
        }
    }
}

/// Frozen copy of usage counters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageSnapshot {
    pub users: u64,
    pub hotels: u64,
    pub documents: u64,
    pub storage: u64,
    pub api_requests: u64,
    pub captured_at: DateTime<Utc>,
}

/// A partial usage write. Counters left as `None` keep their value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UsageUpdate {
    pub users: Option<u64>,
    pub hotels: Option<u64>,
    pub documents: Option<u64>,
    pub storage: Option<u64>,
    pub api_requests: Option<u64>,
}

impl UsageUpdate {
    /// Create an empty update.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a counter.
    #[must_use]
    pub fn set(mut self, name: LimitName, value: u64) -> Self {
        *self.slot_mut(name) = Some(value);
        self
    }

    /// Set the user count.
    #[must_use]
    pub fn users(self, value: u64) -> Self {
        self.set(LimitName::Users, value)
    }

    /// Set the hotel count.
    #[must_use]
    pub fn hotels(self, value: u64) -> Self {
        self.set(LimitName::Hotels, value)
    }

    /// Set the document count.
    #[must_use]
    pub fn documents(self, value: u64) -> Self {
        self.set(LimitName::Documents, value)
    }

    /// Set storage in megabytes.
    #[must_use]
    pub fn storage(self, value: u64) -> Self {
        self.set(LimitName::Storage, value)
    }

    /// Set the API request count.
    #[must_use]
    pub fn api_requests(self, value: u64) -> Self {
        self.set(LimitName::ApiRequests, value)
    }

    fn slot(&self, name: LimitName) -> Option<u64> {
        match name {
            LimitName::Users => self.users,
            LimitName::Hotels => self.hotels,
            LimitName::Documents => self.documents,
            LimitName::Storage => self.storage,
            LimitName::ApiRequests => self.api_requests,
        }
    }

    fn slot_mut(&mut self, name: LimitName) -> &mut Option<u64> {
        match name {
            LimitName::Users => &mut self.users,
            LimitName::Hotels => &mut self.hotels,
            LimitName::Documents => &mut self.documents,
            LimitName::Storage => &mut self.storage,
            LimitName::ApiRequests => &mut self.api_requests,
        }
    }

    /// Whether no counter is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        LimitName::ALL.iter().all(|name| self.slot(*name).is_none())
    }

    /// Apply the update, rolling the previous counters into `last_month` first when
    /// `now` falls in a different calendar month than the last write.
    ///
    /// Returns the counters whose value changed.
    pub fn apply_to(&self, usage: &mut Usage, now: DateTime<Utc>) -> Vec<LimitName> {
        if let Some(last) = usage.last_calculated {
            if !same_month(last, now) {
                usage.last_month = Some(usage.snapshot(now));
            }
        }

        let mut changed = Vec::new();
        for name in LimitName::ALL {
            if let Some(value) = self.slot(name) {
                let counter = usage.counter_mut(name);
                if *counter != value {
                    *counter = value;
                    changed.push(name);
                }
            }
        }

        usage.last_calculated = Some(now);
        changed
    }
}
