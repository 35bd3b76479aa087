//! Subscription lifecycle: create, change, cancel, reactivate and the trial sweep.

mod engine;
mod input;
mod sweep;

pub use engine::LifecycleEngine;
pub use input::{CreateSubscriptionInput, SubscriptionPatch};
pub use sweep::{SweepReport, TrialSweeper};
