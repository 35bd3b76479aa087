//! Input validation for catalog operations.
//!
//! Plan ids end up in event payloads and log lines, so they are restricted to a
//! safe character set and error messages never echo raw input.

use super::limits::MAX_LIMIT_CAP;
use super::plan::Plan;
use crate::error::{EngineError, Result};

/// Maximum length for plan IDs.
const MAX_PLAN_ID_LENGTH: usize = 64;

/// Maximum length for plan name.
const MAX_PLAN_NAME_LENGTH: usize = 128;

/// Maximum length for plan description.
const MAX_PLAN_DESCRIPTION_LENGTH: usize = 1024;

/// Longest trial a plan or a subscription request may grant.
pub const MAX_TRIAL_DAYS: u32 = 365;

/// Valid ISO 4217 currency codes (lowercase).
const VALID_CURRENCIES: &[&str] = &[
    "usd", "eur", "gbp", "cad", "aud", "jpy", "chf", "sek", "nok", "dkk",
    "nzd", "sgd", "hkd", "inr", "brl", "mxn", "pln", "czk", "huf", "ron",
];

/// Validate a plan ID.
///
/// Plan IDs must:
/// - Not be empty
/// - Not exceed 64 characters
/// - Contain only alphanumeric characters, underscores, and hyphens
///
/// # Errors
///
/// Returns `EngineError::Validation` if validation fails.
pub fn validate_plan_id(id: &str) -> Result<()> {
    if id.is_empty() {
        return Err(EngineError::validation("plan_id cannot be empty"));
    }

    if id.len() > MAX_PLAN_ID_LENGTH {
        return Err(EngineError::validation(format!(
            "plan_id '{}' exceeds maximum length of {}",
            truncate_for_error(id),
            MAX_PLAN_ID_LENGTH
        )));
    }

    if !id.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-') {
        return Err(EngineError::validation(format!(
            "plan_id '{}' contains invalid characters",
            sanitize_for_error(id)
        )));
    }

    Ok(())
}

/// Check that a currency code is on the supported list.
#[must_use]
pub fn is_supported_currency(currency: &str) -> bool {
    VALID_CURRENCIES.contains(&currency)
}

/// Validate a complete plan definition.
///
/// Negative limits cannot be represented by [`Limit`](super::Limit); caps above
/// [`MAX_LIMIT_CAP`](super::MAX_LIMIT_CAP) are rejected here so stored plans
/// round-trip.
///
/// # Errors
///
/// Returns `EngineError::Validation` naming the first offending field.
pub fn validate_plan(plan: &Plan) -> Result<()> {
    validate_plan_id(&plan.id)?;

    if plan.name.trim().is_empty() {
        return Err(invalid(plan, "plan name cannot be empty"));
    }

    if plan.name.len() > MAX_PLAN_NAME_LENGTH {
        return Err(invalid(
            plan,
            format!("plan name exceeds maximum length of {}", MAX_PLAN_NAME_LENGTH),
        ));
    }

    if let Some(ref desc) = plan.description {
        if desc.len() > MAX_PLAN_DESCRIPTION_LENGTH {
            return Err(invalid(
                plan,
                format!(
                    "plan description exceeds maximum length of {}",
                    MAX_PLAN_DESCRIPTION_LENGTH
                ),
            ));
        }
    }

    if plan.pricing.amount < 0 {
        return Err(invalid(plan, "pricing amount cannot be negative"));
    }

    if !is_supported_currency(&plan.pricing.currency) {
        return Err(invalid(
            plan,
            format!(
                "invalid currency '{}', must be a lowercase ISO 4217 code",
                sanitize_for_error(&plan.pricing.currency)
            ),
        ));
    }

    if plan.pricing.trial_days > MAX_TRIAL_DAYS {
        return Err(invalid(
            plan,
            format!(
                "trial_days {} exceeds maximum of {}",
                plan.pricing.trial_days, MAX_TRIAL_DAYS
            ),
        ));
    }

    if let Some((name, _)) = plan.limits.iter().find(|(_, limit)| !limit.is_storable()) {
        return Err(invalid(
            plan,
            format!("{} limit exceeds maximum of {}", name, MAX_LIMIT_CAP),
        ));
    }

    Ok(())
}

/// Check a trial length against [`MAX_TRIAL_DAYS`].
///
/// # Errors
///
/// Returns `EngineError::Validation` when the trial is too long.
pub fn validate_trial_days(days: u32) -> Result<()> {
    if days > MAX_TRIAL_DAYS {
        return Err(EngineError::validation(format!(
            "trial_days {} exceeds maximum of {}",
            days, MAX_TRIAL_DAYS
        )));
    }
    Ok(())
}

fn invalid(plan: &Plan, reason: impl std::fmt::Display) -> EngineError {
    EngineError::validation(format!("plan '{}': {}", plan.id, reason))
}

/// Truncate a string for error messages to prevent log flooding.
fn truncate_for_error(s: &str) -> String {
    if s.chars().count() <= 50 {
        s.to_string()
    } else {
        let head: String = s.chars().take(47).collect();
        format!("{}...", head)
    }
}

/// Sanitize a string for error messages to prevent log injection.
fn sanitize_for_error(s: &str) -> String {
    let sanitized: String = s
        .chars()
        .take(50)
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' || c == '-' { c } else { '?' })
        .collect();

    if s.chars().count() > 50 {
        format!("{}...", sanitized)
    } else {
        sanitized
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::plan::BillingInterval;

    fn plan() -> Plan {
        Plan::new("starter", "Starter", 2900, "usd", BillingInterval::Monthly)
    }

    #[test]
    fn test_validate_plan_id() {
        assert!(validate_plan_id("starter").is_ok());
        assert!(validate_plan_id("pro_2024-v2").is_ok());
        assert!(validate_plan_id("").is_err());
        assert!(validate_plan_id(&"a".repeat(65)).is_err());
        assert!(validate_plan_id("plan with spaces").is_err());
        assert!(validate_plan_id("plan<script>").is_err());
    }

    #[test]
    fn test_invalid_id_is_sanitized() {
        let err = validate_plan_id("bad\nid").unwrap_err();
        assert!(err.to_string().contains("bad?id"));
        assert!(err.is_validation());
    }

    #[test]
    fn test_validate_plan_ok() {
        assert!(validate_plan(&plan()).is_ok());
    }

    #[test]
    fn test_validate_plan_name() {
        let mut p = plan();
        p.name = "  ".to_string();
        assert!(validate_plan(&p).is_err());

        p.name = "x".repeat(129);
        assert!(validate_plan(&p).is_err());
    }

    #[test]
    fn test_validate_plan_description() {
        let mut p = plan();
        p.description = Some("d".repeat(1024));
        assert!(validate_plan(&p).is_ok());
        p.description = Some("d".repeat(1025));
        assert!(validate_plan(&p).is_err());
    }

    #[test]
    fn test_validate_plan_trial_days() {
        let mut p = plan();
        p.pricing.trial_days = MAX_TRIAL_DAYS;
        assert!(validate_plan(&p).is_ok());

        p.pricing.trial_days = u32::MAX;
        let err = validate_plan(&p).unwrap_err();
        assert!(err.is_validation());
        assert!(err.to_string().contains("trial_days"));
    }

    #[test]
    fn test_validate_plan_rejects_unstorable_cap() {
        let mut p = plan();
        p.limits.max_storage = crate::catalog::Limit::Capped(MAX_LIMIT_CAP);
        assert!(validate_plan(&p).is_ok());

        p.limits.max_storage = crate::catalog::Limit::Capped(u64::MAX);
        let err = validate_plan(&p).unwrap_err();
        assert!(err.to_string().contains("storage limit exceeds maximum"));
    }

    #[test]
    fn test_validate_plan_pricing() {
        let mut p = plan();
        p.pricing.amount = -1;
        let err = validate_plan(&p).unwrap_err();
        assert!(err.to_string().contains("cannot be negative"));

        let mut p = plan();
        p.pricing.currency = "xyz".to_string();
        assert!(validate_plan(&p).is_err());

        let mut p = plan();
        p.pricing.currency = "USD".to_string();
        assert!(validate_plan(&p).is_err());
    }
}
