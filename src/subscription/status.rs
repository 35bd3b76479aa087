//! Subscription status and the lifecycle transition table.
//!
//! # Transition Rules
//!
//! | Action              | Legal from                                    | To                   |
//! |---------------------|-----------------------------------------------|----------------------|
//! | `PaymentSucceeded`  | trialing, past_due, unpaid, incomplete        | active               |
//! | `PaymentFailed`     | active                                        | past_due             |
//! | `TrialEnded`        | trialing                                      | past_due             |
//! | `MarkUnpaid`        | past_due                                      | unpaid               |
//! | `IncompleteExpired` | incomplete                                    | incomplete_expired   |
//! | `Pause`             | active, trialing                              | paused               |
//! | `Resume`            | paused                                        | active               |
//! | `Cancel`            | any except canceled, incomplete_expired       | canceled             |
//! | `Reactivate`        | canceled                                      | active               |

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Subscription status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    /// In the trial window.
    Trialing,
    /// Subscription is active and paid.
    Active,
    /// Payment failed or the trial ended without payment.
    PastDue,
    /// Subscription has been canceled.
    Canceled,
    /// Past due long enough to be considered unpaid.
    Unpaid,
    /// Awaiting the first payment.
    Incomplete,
    /// The first payment never arrived.
    IncompleteExpired,
    /// Subscription is paused.
    Paused,
}

impl SubscriptionStatus {
    /// Every status.
    pub const ALL: [SubscriptionStatus; 8] = [
        Self::Trialing,
        Self::Active,
        Self::PastDue,
        Self::Canceled,
        Self::Unpaid,
        Self::Incomplete,
        Self::IncompleteExpired,
        Self::Paused,
    ];

    /// Statuses that grant access and count as the tenant's live subscription.
    pub const LIVE: [SubscriptionStatus; 2] = [Self::Active, Self::Trialing];

    /// Parse from its wire name.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "trialing" => Some(Self::Trialing),
            "active" => Some(Self::Active),
            "past_due" => Some(Self::PastDue),
            "canceled" => Some(Self::Canceled),
            "unpaid" => Some(Self::Unpaid),
            "incomplete" => Some(Self::Incomplete),
            "incomplete_expired" => Some(Self::IncompleteExpired),
            "paused" => Some(Self::Paused),
            _ => None,
        }
    }

    /// Convert to string.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Trialing => "trialing",
            Self::Active => "active",
            Self::PastDue => "past_due",
            Self::Canceled => "canceled",
            Self::Unpaid => "unpaid",
            Self::Incomplete => "incomplete",
            Self::IncompleteExpired => "incomplete_expired",
            Self::Paused => "paused",
        }
    }

    /// Active or trialing.
    #[must_use]
    pub fn is_live(&self) -> bool {
        matches!(self, Self::Active | Self::Trialing)
    }

    /// Whether the tenant should have access to plan entitlements.
    ///
    /// Past-due and incomplete subscriptions keep access while collection is pending.
    #[must_use]
    pub fn grants_access(&self) -> bool {
        !matches!(
            self,
            Self::Canceled | Self::Unpaid | Self::IncompleteExpired | Self::Paused
        )
    }

    /// No action other than reactivation can leave this status.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Canceled | Self::IncompleteExpired)
    }
}

impl fmt::Display for SubscriptionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for SubscriptionStatus {
    type Err = crate::error::EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| {
            crate::error::EngineError::validation(format!("unknown subscription status '{}'", s))
        })
    }
}

/// An event that drives a status change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleAction {
    /// A payment cleared.
    PaymentSucceeded,
    /// A renewal payment failed.
    PaymentFailed,
    /// The trial window closed.
    TrialEnded,
    /// Collection gave up on a past-due invoice.
    MarkUnpaid,
    /// The first payment window closed.
    IncompleteExpired,
    /// Access suspended on request.
    Pause,
    /// A paused subscription resumes.
    Resume,
    /// Terminate immediately.
    Cancel,
    /// Bring a canceled subscription back.
    Reactivate,
}

impl LifecycleAction {
    /// Every action.
    pub const ALL: [LifecycleAction; 9] = [
        Self::PaymentSucceeded,
        Self::PaymentFailed,
        Self::TrialEnded,
        Self::MarkUnpaid,
        Self::IncompleteExpired,
        Self::Pause,
        Self::Resume,
        Self::Cancel,
        Self::Reactivate,
    ];

    /// Convert to string.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PaymentSucceeded => "payment_succeeded",
            Self::PaymentFailed => "payment_failed",
            Self::TrialEnded => "trial_ended",
            Self::MarkUnpaid => "mark_unpaid",
            Self::IncompleteExpired => "incomplete_expired",
            Self::Pause => "pause",
            Self::Resume => "resume",
            Self::Cancel => "cancel",
            Self::Reactivate => "reactivate",
        }
    }

    /// Resolve the action a status patch stands for.
    ///
    /// Returns the action that moves `from` to `to` through the table. Reactivation
    /// is never returned: it is only reachable through its own operation.
    #[must_use]
    pub fn for_target(from: SubscriptionStatus, to: SubscriptionStatus) -> Option<Self> {
        Self::ALL
            .into_iter()
            .filter(|action| *action != Self::Reactivate)
            .find(|action| transition(from, *action) == Ok(to))
    }
}

impl fmt::Display for LifecycleAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An action that is not legal from the current status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransitionRejected {
    /// Status the action was applied to.
    pub from: SubscriptionStatus,
    /// The rejected action.
    pub action: LifecycleAction,
}

impl fmt::Display for TransitionRejected {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cannot apply '{}' to a '{}' subscription", self.action, self.from)
    }
}

impl std::error::Error for TransitionRejected {}

impl From<TransitionRejected> for crate::error::EngineError {
    fn from(rejected: TransitionRejected) -> Self {
        crate::error::EngineError::InvalidTransition {
            from: rejected.from,
            action: rejected.action,
        }
    }
}

/// Apply an action to a status.
///
/// # Errors
///
/// Returns [`TransitionRejected`] if the action is not legal from `from`.
pub fn transition(
    from: SubscriptionStatus,
    action: LifecycleAction,
) -> Result<SubscriptionStatus, TransitionRejected> {
    use LifecycleAction as A;
    use SubscriptionStatus as S;

    let to = match (action, from) {
        (A::PaymentSucceeded, S::Trialing | S::PastDue | S::Unpaid | S::Incomplete) => S::Active,
        (A::PaymentFailed, S::Active) => S::PastDue,
        (A::TrialEnded, S::Trialing) => S::PastDue,
        (A::MarkUnpaid, S::PastDue) => S::Unpaid,
        (A::IncompleteExpired, S::Incomplete) => S::IncompleteExpired,
        (A::Pause, S::Active | S::Trialing) => S::Paused,
        (A::Resume, S::Paused) => S::Active,
        (A::Cancel, current) if !current.is_terminal() => S::Canceled,
        (A::Reactivate, S::Canceled) => S::Active,
        _ => return Err(TransitionRejected { from, action }),
    };

    Ok(to)
}

/// Actions legal from a status.
#[must_use]
pub fn allowed_actions(from: SubscriptionStatus) -> Vec<LifecycleAction> {
    LifecycleAction::ALL
        .into_iter()
        .filter(|action| transition(from, *action).is_ok())
        .collect()
}

/// Check whether an action is legal without building an error.
#[must_use]
pub fn can_apply(from: SubscriptionStatus, action: LifecycleAction) -> bool {
    transition(from, action).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use LifecycleAction as A;
    use SubscriptionStatus as S;

    #[test]
    fn test_status_roundtrip_names() {
        for status in S::ALL {
            assert_eq!(S::parse(status.as_str()), Some(status));
            assert_eq!(status.as_str().parse::<S>().unwrap(), status);
        }
        assert!("expired".parse::<S>().is_err());
        assert_eq!(
            serde_json::to_string(&S::IncompleteExpired).unwrap(),
            "\"incomplete_expired\""
        );
    }

    #[test]
    fn test_legal_transitions() {
        assert_eq!(transition(S::Trialing, A::PaymentSucceeded), Ok(S::Active));
        assert_eq!(transition(S::Unpaid, A::PaymentSucceeded), Ok(S::Active));
        assert_eq!(transition(S::Active, A::PaymentFailed), Ok(S::PastDue));
        assert_eq!(transition(S::Trialing, A::TrialEnded), Ok(S::PastDue));
        assert_eq!(transition(S::PastDue, A::MarkUnpaid), Ok(S::Unpaid));
        assert_eq!(transition(S::Incomplete, A::IncompleteExpired), Ok(S::IncompleteExpired));
        assert_eq!(transition(S::Trialing, A::Pause), Ok(S::Paused));
        assert_eq!(transition(S::Paused, A::Resume), Ok(S::Active));
        assert_eq!(transition(S::Unpaid, A::Cancel), Ok(S::Canceled));
        assert_eq!(transition(S::Canceled, A::Reactivate), Ok(S::Active));
    }

    #[test]
    fn test_illegal_transitions() {
        assert!(transition(S::Active, A::Reactivate).is_err());
        assert!(transition(S::PastDue, A::TrialEnded).is_err());
        assert!(transition(S::Canceled, A::Cancel).is_err());
        assert!(transition(S::IncompleteExpired, A::Cancel).is_err());
        assert!(transition(S::IncompleteExpired, A::PaymentSucceeded).is_err());
        assert!(transition(S::Canceled, A::PaymentSucceeded).is_err());
        assert!(transition(S::Paused, A::PaymentFailed).is_err());

        let rejected = transition(S::Active, A::Reactivate).unwrap_err();
        assert_eq!(rejected.from, S::Active);
        assert_eq!(rejected.action, A::Reactivate);
    }

    #[test]
    fn test_canceled_to_active_only_via_reactivate() {
        let actions: Vec<_> = A::ALL
            .into_iter()
            .filter(|a| transition(S::Canceled, *a) == Ok(S::Active))
            .collect();
        assert_eq!(actions, vec![A::Reactivate]);
    }

    #[test]
    fn test_for_target() {
        assert_eq!(A::for_target(S::Trialing, S::Active), Some(A::PaymentSucceeded));
        assert_eq!(A::for_target(S::Paused, S::Active), Some(A::Resume));
        assert_eq!(A::for_target(S::Trialing, S::PastDue), Some(A::TrialEnded));
        assert_eq!(A::for_target(S::Active, S::PastDue), Some(A::PaymentFailed));
        assert_eq!(A::for_target(S::Active, S::Canceled), Some(A::Cancel));
        assert_eq!(A::for_target(S::Canceled, S::Active), None);
        assert_eq!(A::for_target(S::Active, S::Trialing), None);
    }

    #[test]
    fn test_allowed_actions() {
        assert_eq!(allowed_actions(S::Canceled), vec![A::Reactivate]);
        assert!(allowed_actions(S::IncompleteExpired).is_empty());
        assert_eq!(
            allowed_actions(S::Active),
            vec![A::PaymentFailed, A::Pause, A::Cancel]
        );
        assert!(can_apply(S::PastDue, A::MarkUnpaid));
    }

    #[test]
    fn test_status_predicates() {
        assert!(S::Trialing.is_live());
        assert!(!S::PastDue.is_live());
        assert!(S::PastDue.grants_access());
        assert!(S::Incomplete.grants_access());
        assert!(!S::Paused.grants_access());
        assert!(!S::Unpaid.grants_access());
        assert!(S::Canceled.is_terminal());
    }
}
