//! Plan limits and the unlimited sentinel.
//!
//! Limits are stored as signed integers where `-1` means "unlimited". Inside the
//! crate that convention is confined to the serialization boundary: a [`Limit`] is
//! either [`Limit::Unlimited`] or [`Limit::Capped`], and no other negative value can
//! be represented.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Raw value that encodes an unlimited cap.
pub const UNLIMITED_SENTINEL: i64 = -1;

/// Largest cap that survives the signed storage encoding.
pub const MAX_LIMIT_CAP: u64 = i64::MAX as u64;

/// A single resource cap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub enum Limit {
    /// No cap on this resource.
    #[default]
    Unlimited,
    /// Usage may not reach this value.
    Capped(u64),
}

/// A raw limit value that is neither the sentinel nor non-negative.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidLimit(pub i64);

impl fmt::Display for InvalidLimit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "invalid limit {}: must be {} (unlimited) or a non-negative integer",
            self.0, UNLIMITED_SENTINEL
        )
    }
}

impl std::error::Error for InvalidLimit {}

impl From<InvalidLimit> for crate::error::EngineError {
    fn from(err: InvalidLimit) -> Self {
        crate::error::EngineError::Validation(err.to_string())
    }
}

impl TryFrom<i64> for Limit {
    type Error = InvalidLimit;

    fn try_from(raw: i64) -> Result<Self, Self::Error> {
        match raw {
            UNLIMITED_SENTINEL => Ok(Self::Unlimited),
            n if n >= 0 => Ok(Self::Capped(n as u64)),
            n => Err(InvalidLimit(n)),
        }
    }
}

/// Caps above [`MAX_LIMIT_CAP`] saturate. Catalog validation rejects them, so
/// every plan the catalog accepts round-trips exactly.
impl From<Limit> for i64 {
    fn from(limit: Limit) -> Self {
        match limit {
            Limit::Unlimited => UNLIMITED_SENTINEL,
            Limit::Capped(max) => i64::try_from(max).unwrap_or(i64::MAX),
        }
    }
}

impl fmt::Display for Limit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unlimited => write!(f, "unlimited"),
            Self::Capped(max) => write!(f, "{}", max),
        }
    }
}

impl Limit {
    /// Parse a raw stored value.
    pub fn from_raw(raw: i64) -> Result<Self, InvalidLimit> {
        Self::try_from(raw)
    }

    /// Check if this limit is unlimited.
    #[must_use]
    pub fn is_unlimited(&self) -> bool {
        matches!(self, Self::Unlimited)
    }

    /// Whether the limit can be stored as a raw `i64` without loss.
    #[must_use]
    pub fn is_storable(&self) -> bool {
        match self {
            Self::Unlimited => true,
            Self::Capped(max) => *max <= MAX_LIMIT_CAP,
        }
    }

    /// The cap, if any.
    #[must_use]
    pub fn cap(&self) -> Option<u64> {
        match self {
            Self::Unlimited => None,
            Self::Capped(max) => Some(*max),
        }
    }

    /// Check current usage against this limit.
    #[must_use]
    pub fn check(&self, current: u64) -> LimitCheckResult {
        match self {
            Self::Unlimited => LimitCheckResult::Unlimited,
            Self::Capped(max) if current < *max => LimitCheckResult::WithinLimit {
                current,
                max: *max,
            },
            Self::Capped(max) => LimitCheckResult::AtLimit {
                current,
                max: *max,
            },
        }
    }

    /// Whether `current` has reached `percent` of a finite cap.
    ///
    /// Always false for unlimited caps.
    #[must_use]
    pub fn reached_percent(&self, current: u64, percent: u8) -> bool {
        match self {
            Self::Unlimited => false,
            Self::Capped(max) => {
                u128::from(current) * 100 >= u128::from(*max) * u128::from(percent)
            }
        }
    }
}

/// The named resources a plan can cap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LimitName {
    /// Users belonging to the tenant.
    Users,
    /// Hotels owned by the tenant.
    Hotels,
    /// Stored documents.
    Documents,
    /// Storage in megabytes.
    Storage,
    /// API requests in the current period.
    ApiRequests,
}

impl LimitName {
    /// Every limit, in reporting order.
    pub const ALL: [LimitName; 5] = [
        Self::Users,
        Self::Hotels,
        Self::Documents,
        Self::Storage,
        Self::ApiRequests,
    ];

    /// Convert to string.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Users => "users",
            Self::Hotels => "hotels",
            Self::Documents => "documents",
            Self::Storage => "storage",
            Self::ApiRequests => "api_requests",
        }
    }

    /// Parse from a resource name or its `max_*` field name.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.strip_prefix("max_").unwrap_or(s) {
            "users" => Some(Self::Users),
            "hotels" => Some(Self::Hotels),
            "documents" => Some(Self::Documents),
            "storage" => Some(Self::Storage),
            "api_requests" => Some(Self::ApiRequests),
            _ => None,
        }
    }
}

impl fmt::Display for LimitName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Resource limits for a plan.
///
/// Every field is required when deserializing: a missing or misspelled key is an
/// error, never an implicit unlimited cap. Write `-1` for unlimited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PlanLimits {
    /// Maximum users.
    pub max_users: Limit,
    /// Maximum hotels.
    pub max_hotels: Limit,
    /// Maximum documents.
    pub max_documents: Limit,
    /// Maximum storage in megabytes.
    pub max_storage: Limit,
    /// Maximum API requests per period.
    pub max_api_requests: Limit,
}

impl PlanLimits {
    /// Create unlimited limits.
    #[must_use]
    pub fn unlimited() -> Self {
        Self::default()
    }

    /// Get a specific limit.
    #[must_use]
    pub fn get(&self, name: LimitName) -> Limit {
        match name {
            LimitName::Users => self.max_users,
            LimitName::Hotels => self.max_hotels,
            LimitName::Documents => self.max_documents,
            LimitName::Storage => self.max_storage,
            LimitName::ApiRequests => self.max_api_requests,
        }
    }

    /// Set a specific limit.
    pub fn set(&mut self, name: LimitName, limit: Limit) {
        match name {
            LimitName::Users => self.max_users = limit,
            LimitName::Hotels => self.max_hotels = limit,
            LimitName::Documents => self.max_documents = limit,
            LimitName::Storage => self.max_storage = limit,
            LimitName::ApiRequests => self.max_api_requests = limit,
        }
    }

    /// Set a specific limit from its raw stored value.
    pub fn set_raw(&mut self, name: LimitName, raw: i64) -> Result<(), InvalidLimit> {
        self.set(name, Limit::from_raw(raw)?);
        Ok(())
    }

    /// Iterate over every limit in reporting order.
    pub fn iter(&self) -> impl Iterator<Item = (LimitName, Limit)> + '_ {
        LimitName::ALL.into_iter().map(|name| (name, self.get(name)))
    }

    /// Check a resource usage against its limit.
    #[must_use]
    pub fn check(&self, name: LimitName, current: u64) -> LimitCheckResult {
        self.get(name).check(current)
    }
}

/// Result of checking a resource limit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum LimitCheckResult {
    /// No limit on this resource.
    Unlimited,
    /// Usage is within the limit.
    WithinLimit { current: u64, max: u64 },
    /// Usage has reached or exceeded the limit.
    AtLimit { current: u64, max: u64 },
}

impl LimitCheckResult {
    /// Check if usage is allowed.
    #[must_use]
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Unlimited | Self::WithinLimit { .. })
    }

    /// Check if at or over limit.
    #[must_use]
    pub fn is_at_limit(&self) -> bool {
        matches!(self, Self::AtLimit { .. })
    }
}
