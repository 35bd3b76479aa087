use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{EngineError, Result};
use crate::utils::get_env_with_prefix;

/// Main configuration for the subscription engine
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub sweep: SweepConfig,
    #[serde(default)]
    pub events: EventConfig,
    #[serde(default)]
    pub entitlements: EntitlementConfig,
    #[serde(default)]
    pub lifecycle: LifecycleConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_json")]
    pub json: bool,
}

/// Trial-expiry sweep settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SweepConfig {
    /// Seconds between background sweeps (default: daily)
    #[serde(default = "default_sweep_interval_seconds")]
    pub interval_seconds: u64,
    /// How far ahead of expiry a trial is reported as upcoming
    #[serde(default = "default_sweep_lookahead_hours")]
    pub lookahead_hours: u32,
    /// Maximum records examined per sweep
    #[serde(default = "default_sweep_batch_limit")]
    pub batch_limit: usize,
}

/// Event log write settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EventConfig {
    /// Attempts per event before giving up (including the first)
    #[serde(default = "default_event_max_attempts")]
    pub max_attempts: u32,
    /// Delay before the first retry, doubled for each further retry
    #[serde(default = "default_event_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EntitlementConfig {
    /// Usage percentage of a finite limit at which a warning is reported
    #[serde(default = "default_warning_threshold_percent")]
    pub warning_threshold_percent: u8,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct LifecycleConfig {
    #[serde(default)]
    pub equal_price_change: EqualPriceChange,
}

/// Event emitted when a plan change keeps the same price
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EqualPriceChange {
    /// Report as `plan_downgraded`
    #[default]
    Downgrade,
    /// Report as `plan_changed`
    Changed,
}

impl EqualPriceChange {
    /// Parse from string.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "downgrade" | "downgraded" => Some(Self::Downgrade),
            "changed" | "change" => Some(Self::Changed),
            _ => None,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: default_json(),
        }
    }
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            interval_seconds: default_sweep_interval_seconds(),
            lookahead_hours: default_sweep_lookahead_hours(),
            batch_limit: default_sweep_batch_limit(),
        }
    }
}

impl Default for EventConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_event_max_attempts(),
            retry_backoff_ms: default_event_retry_backoff_ms(),
        }
    }
}

impl Default for EntitlementConfig {
    fn default() -> Self {
        Self {
            warning_threshold_percent: default_warning_threshold_percent(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_json() -> bool {
    false
}

fn default_sweep_interval_seconds() -> u64 {
    86_400
}

fn default_sweep_lookahead_hours() -> u32 {
    72
}

fn default_sweep_batch_limit() -> usize {
    500
}

fn default_event_max_attempts() -> u32 {
    3
}

fn default_event_retry_backoff_ms() -> u64 {
    50
}

fn default_warning_threshold_percent() -> u8 {
    80
}

impl SweepConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_seconds)
    }

    pub fn lookahead(&self) -> chrono::Duration {
        chrono::Duration::hours(i64::from(self.lookahead_hours))
    }
}

impl EventConfig {
    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }
}

impl EngineConfig {
    /// Load from environment variables with SUBSCRIPTION_ENGINE_ prefix
    pub fn from_env() -> Result<Self> {
        ConfigBuilder::new().from_env().build()
    }
}

/// Builder for EngineConfig with environment variable support
#[must_use = "builder does nothing until you call build()"]
pub struct ConfigBuilder {
    config: EngineConfig,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: EngineConfig::default(),
        }
    }

    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.config.logging.level = level.into();
        self
    }

    pub fn with_json_logging(mut self, enabled: bool) -> Self {
        self.config.logging.json = enabled;
        self
    }

    pub fn with_sweep(mut self, sweep: SweepConfig) -> Self {
        self.config.sweep = sweep;
        self
    }

    pub fn with_sweep_interval(mut self, interval: Duration) -> Self {
        self.config.sweep.interval_seconds = interval.as_secs();
        self
    }

    pub fn with_sweep_lookahead_hours(mut self, hours: u32) -> Self {
        self.config.sweep.lookahead_hours = hours;
        self
    }

    pub fn with_sweep_batch_limit(mut self, limit: usize) -> Self {
        self.config.sweep.batch_limit = limit;
        self
    }

    pub fn with_events(mut self, events: EventConfig) -> Self {
        self.config.events = events;
        self
    }

    /// Set event write retries
    ///
    /// # Example
    ///
    /// ```rust
    /// use std::time::Duration;
    /// use subscription_engine::ConfigBuilder;
    ///
    /// let config = ConfigBuilder::new()
    ///     .with_event_retries(5, Duration::from_millis(20))
    ///     .build()?;
    /// assert_eq!(config.events.max_attempts, 5);
    /// # Ok::<(), subscription_engine::EngineError>(())
    /// ```
    pub fn with_event_retries(mut self, max_attempts: u32, backoff: Duration) -> Self {
        self.config.events.max_attempts = max_attempts;
        self.config.events.retry_backoff_ms = u64::try_from(backoff.as_millis()).unwrap_or(u64::MAX);
        self
    }

    pub fn with_warning_threshold(mut self, percent: u8) -> Self {
        self.config.entitlements.warning_threshold_percent = percent;
        self
    }

    pub fn with_equal_price_change(mut self, mode: EqualPriceChange) -> Self {
        self.config.lifecycle.equal_price_change = mode;
        self
    }

    /// Load configuration from environment variables with SUBSCRIPTION_ENGINE_ prefix
    ///
    /// Unparseable values keep the current setting.
    pub fn from_env(mut self) -> Self {
        if let Some(level) = get_env_with_prefix("LOG_LEVEL") {
            self.config.logging.level = level;
        }
        if let Some(json) = get_env_with_prefix("LOG_JSON") {
            self.config.logging.json = json.parse().unwrap_or(false);
        }
        if let Some(v) = get_env_with_prefix("SWEEP_INTERVAL_SECONDS") {
            if let Ok(secs) = v.parse() {
                self.config.sweep.interval_seconds = secs;
            }
        }
        if let Some(v) = get_env_with_prefix("SWEEP_LOOKAHEAD_HOURS") {
            if let Ok(hours) = v.parse() {
                self.config.sweep.lookahead_hours = hours;
            }
        }
        if let Some(v) = get_env_with_prefix("SWEEP_BATCH_LIMIT") {
            if let Ok(limit) = v.parse() {
                self.config.sweep.batch_limit = limit;
            }
        }
        if let Some(v) = get_env_with_prefix("EVENT_MAX_ATTEMPTS") {
            if let Ok(attempts) = v.parse() {
                self.config.events.max_attempts = attempts;
            }
        }
        if let Some(v) = get_env_with_prefix("EVENT_RETRY_BACKOFF_MS") {
            if let Ok(ms) = v.parse() {
                self.config.events.retry_backoff_ms = ms;
            }
        }
        if let Some(v) = get_env_with_prefix("WARNING_THRESHOLD_PERCENT") {
            if let Ok(percent) = v.parse() {
                self.config.entitlements.warning_threshold_percent = percent;
            }
        }
        if let Some(v) = get_env_with_prefix("EQUAL_PRICE_CHANGE") {
            if let Some(mode) = EqualPriceChange::parse(&v) {
                self.config.lifecycle.equal_price_change = mode;
            }
        }

        self
    }

    /// Build the configuration, validating all settings
    ///
    /// # Errors
    ///
    /// Returns `EngineError::Config` if:
    /// - The log level is unknown
    /// - The sweep interval or batch limit is 0
    /// - Event max attempts is 0
    /// - The warning threshold is outside 1..=100
    pub fn build(self) -> Result<EngineConfig> {
        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&self.config.logging.level.to_lowercase().as_str()) {
            return Err(EngineError::config(format!(
                "Invalid log level: {}. Must be one of: {}",
                self.config.logging.level,
                valid_log_levels.join(", ")
            )));
        }

        if self.config.sweep.interval_seconds == 0 {
            return Err(EngineError::config("Sweep interval must be greater than 0"));
        }

        if self.config.sweep.batch_limit == 0 {
            return Err(EngineError::config("Sweep batch limit must be greater than 0"));
        }

        if self.config.events.max_attempts == 0 {
            return Err(EngineError::config("Event max_attempts must be at least 1"));
        }

        let threshold = self.config.entitlements.warning_threshold_percent;
        if threshold == 0 || threshold > 100 {
            return Err(EngineError::config(format!(
                "Warning threshold must be between 1 and 100, got: {}",
                threshold
            )));
        }

        Ok(self.config)
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
