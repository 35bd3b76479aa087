//! Subscription records, usage counters and the status state machine.

mod model;
mod status;
mod usage;

pub use model::{BillingInfo, PlanSnapshot, Subscription, TenantRef};
pub use status::{
    allowed_actions, can_apply, transition, LifecycleAction, SubscriptionStatus,
    TransitionRejected,
};
pub use usage::{Usage, UsageSnapshot, UsageUpdate};
