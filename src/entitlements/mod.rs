//! Usage and feature entitlement checks.

mod checker;
mod report;

pub use checker::{EntitlementChecker, DEFAULT_WARNING_THRESHOLD_PERCENT};
pub use report::{evaluate_limits, LimitReport, LimitStatus};
