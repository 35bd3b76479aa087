//! Engine error types.
//!
//! Every fallible operation in the crate returns [`Result`], whose error side is
//! [`EngineError`]. The variants map onto the three outcomes callers care about:
//! something was missing, the request was invalid, or persistence failed.

use crate::subscription::{LifecycleAction, SubscriptionStatus};

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, EngineError>;

/// Errors produced by the subscription engine.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// A plan, subscription or tenant does not exist.
    #[error("{kind} not found: {id}")]
    NotFound {
        /// What was looked up ("plan", "subscription", "organization", "hotel").
        kind: &'static str,
        /// The identifier that was not found.
        id: String,
    },

    /// The request was malformed or violates a catalog rule.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// The requested action is not legal from the subscription's current status.
    #[error("Illegal status transition: cannot apply '{action}' to a '{from}' subscription")]
    InvalidTransition {
        /// Status the subscription was in.
        from: SubscriptionStatus,
        /// Action that was rejected.
        action: LifecycleAction,
    },

    /// The record changed between read and commit.
    #[error("Concurrent modification detected for subscription '{id}', please retry")]
    ConcurrentModification {
        /// Subscription whose version did not match.
        id: String,
    },

    /// The underlying store failed; nothing was committed.
    #[error("Store error: {0}")]
    Store(String),

    /// Configuration or plan dataset could not be loaded.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Failure raised by a host-supplied collaborator.
    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

impl EngineError {
    /// Create a not found error.
    pub fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound { kind, id: id.into() }
    }

    /// Create a not found error for a plan.
    pub fn plan_not_found(plan_id: impl Into<String>) -> Self {
        Self::not_found("plan", plan_id)
    }

    /// Create a not found error for a subscription.
    pub fn subscription_not_found(id: impl Into<String>) -> Self {
        Self::not_found("subscription", id)
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create a store error.
    pub fn store(message: impl Into<String>) -> Self {
        Self::Store(message.into())
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Check if this is a not found error.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Check if this is a validation error (malformed input or illegal transition).
    #[must_use]
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_) | Self::InvalidTransition { .. })
    }

    /// Check if this error was raised by persistence.
    #[must_use]
    pub fn is_store_error(&self) -> bool {
        matches!(self, Self::Store(_) | Self::ConcurrentModification { .. })
    }

    /// Check if retrying the same call may succeed.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::ConcurrentModification { .. })
    }

    /// Check if the caller supplied something wrong.
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        self.is_not_found() || self.is_validation()
    }
}

impl From<serde_json::Error> for EngineError {
    fn from(err: serde_json::Error) -> Self {
        Self::Config(format!("invalid JSON: {}", err))
    }
}
