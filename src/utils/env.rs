/// Get environment variable with SUBSCRIPTION_ENGINE_ prefix, falling back to unprefixed version
///
/// This helper function checks for `SUBSCRIPTION_ENGINE_{key}` first, then falls back to `{key}`
/// for compatibility with standard environment variable naming.
///
/// # Examples
///
/// ```rust
/// use subscription_engine::utils::get_env_with_prefix;
///
/// // Checks SUBSCRIPTION_ENGINE_LOG_LEVEL first, then LOG_LEVEL
/// let level = get_env_with_prefix("LOG_LEVEL");
/// ```
pub fn get_env_with_prefix(key: &str) -> Option<String> {
    std::env::var(format!("SUBSCRIPTION_ENGINE_{}", key))
        .or_else(|_| std::env::var(key))
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_env_with_prefix() {
        std::env::set_var("SUBSCRIPTION_ENGINE_ENV_TEST_VAR", "prefixed_value");
        assert_eq!(
            get_env_with_prefix("ENV_TEST_VAR"),
            Some("prefixed_value".to_string())
        );
        std::env::remove_var("SUBSCRIPTION_ENGINE_ENV_TEST_VAR");

        std::env::set_var("ENV_FALLBACK_VAR", "unprefixed_value");
        assert_eq!(
            get_env_with_prefix("ENV_FALLBACK_VAR"),
            Some("unprefixed_value".to_string())
        );
        std::env::remove_var("ENV_FALLBACK_VAR");

        assert_eq!(get_env_with_prefix("ENV_NON_EXISTENT_VAR"), None);
    }
}
