//! Pure limit evaluation.

use crate::catalog::{Limit, LimitName, PlanLimits};
use crate::subscription::Usage;
use serde::{Deserialize, Serialize};

/// State of one limit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LimitStatus {
    pub name: LimitName,
    pub limit: Limit,
    pub current: u64,
    /// Usage has reached the cap.
    pub exceeded: bool,
    /// Usage has reached the warning threshold.
    pub warning: bool,
}

/// Outcome of checking every limit of a subscription.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LimitReport {
    pub subscription_id: String,
    /// At least one finite limit is reached.
    pub exceeded: bool,
    /// One message per limit at or above the warning threshold.
    pub warnings: Vec<String>,
    /// Every limit in reporting order, unlimited ones included.
    pub limits: Vec<LimitStatus>,
}

impl LimitReport {
    /// Names of the limits that are reached.
    #[must_use]
    pub fn exceeded_limits(&self) -> Vec<LimitName> {
        self.limits
            .iter()
            .filter(|l| l.exceeded)
            .map(|l| l.name)
            .collect()
    }

    /// Status of one limit.
    #[must_use]
    pub fn get(&self, name: LimitName) -> Option<&LimitStatus> {
        self.limits.iter().find(|l| l.name == name)
    }
}

/// Evaluate usage against limits.
///
/// Unlimited caps are never exceeded and never warn. A finite cap is exceeded when
/// usage is at or above it, and warns when usage reaches `threshold_percent` of it.
#[must_use]
pub fn evaluate_limits(
    subscription_id: &str,
    limits: &PlanLimits,
    usage: &Usage,
    threshold_percent: u8,
) -> LimitReport {
    let mut warnings = Vec::new();
    let mut statuses = Vec::with_capacity(LimitName::ALL.len());

    for (name, limit) in limits.iter() {
        let current = usage.counter(name);
        let exceeded = limit.check(current).is_at_limit();
        let warning = limit.reached_percent(current, threshold_percent);

        if let Limit::Capped(max) = limit {
            if exceeded {
                warnings.push(format!("{} limit reached: {} of {} used", name, current, max));
            } else if warning {
                let percent = u128::from(current) * 100 / u128::from(max);
                warnings.push(format!(
                    "{} usage at {}% of limit: {} of {} used",
                    name, percent, current, max
                ));
            }
        }

        statuses.push(LimitStatus {
            name,
            limit,
            current,
            exceeded,
            warning,
        });
    }

    LimitReport {
        subscription_id: subscription_id.to_string(),
        exceeded: statuses.iter().any(|s| s.exceeded),
        warnings,
        limits: statuses,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limits(max_users: Limit) -> PlanLimits {
        PlanLimits {
            max_users,
            ..PlanLimits::unlimited()
        }
    }

    fn usage(users: u64) -> Usage {
        Usage {
            current_users: users,
            ..Usage::default()
        }
    }

    #[test]
    fn test_at_limit_is_exceeded() {
        let report = evaluate_limits("sub_1", &limits(Limit::Capped(10)), &usage(10), 80);
        assert!(report.exceeded);
        assert_eq!(report.warnings, vec!["users limit reached: 10 of 10 used"]);
        assert_eq!(report.exceeded_limits(), vec![LimitName::Users]);
    }

    #[test]
    fn test_warning_below_limit() {
        let report = evaluate_limits("sub_1", &limits(Limit::Capped(10)), &usage(8), 80);
        assert!(!report.exceeded);
        assert_eq!(report.warnings, vec!["users usage at 80% of limit: 8 of 10 used"]);
        assert!(report.get(LimitName::Users).unwrap().warning);
    }

    #[test]
    fn test_below_threshold() {
        let report = evaluate_limits("sub_1", &limits(Limit::Capped(10)), &usage(7), 80);
        assert!(!report.exceeded);
        assert!(report.warnings.is_empty());
    }

    #[test]
    fn test_unlimited_never_exceeded() {
        let report = evaluate_limits("sub_1", &limits(Limit::Unlimited), &usage(1_000_000), 80);
        assert!(!report.exceeded);
        assert!(report.warnings.is_empty());
        assert_eq!(report.limits.len(), 5);
    }

    #[test]
    fn test_zero_cap() {
        let report = evaluate_limits("sub_1", &limits(Limit::Capped(0)), &usage(0), 80);
        assert!(report.exceeded);
        assert_eq!(report.warnings, vec!["users limit reached: 0 of 0 used"]);
    }

    #[test]
    fn test_custom_threshold() {
        let report = evaluate_limits("sub_1", &limits(Limit::Capped(10)), &usage(5), 50);
        assert_eq!(report.warnings.len(), 1);
        let report = evaluate_limits("sub_1", &limits(Limit::Capped(10)), &usage(8), 90);
        assert!(report.warnings.is_empty());
    }
}
