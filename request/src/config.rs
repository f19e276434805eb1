//! Configuration for request lifecycles and the demo binary.
//!
//! Loaded from environment variables with sensible defaults. A variable that
//! is set but unusable is an error rather than silently replaced by the
//! default.

use crate::error::ConfigError;
use crate::reducer::DEFAULT_LABEL;
use lifecycle_runtime::StoreConfig;
use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Configuration of one [`RequestLifecycle`](crate::RequestLifecycle).
#[derive(Debug, Clone)]
pub struct LifecycleConfig {
    /// Name attached to every log event of the lifecycle
    pub label: String,
    /// Store runtime settings
    pub store: StoreConfig,
}

impl LifecycleConfig {
    /// Set the log label.
    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Set the store runtime settings.
    #[must_use]
    pub fn with_store(mut self, store: StoreConfig) -> Self {
        self.store = store;
        self
    }

    /// Load from the process environment.
    ///
    /// | Variable | Default |
    /// |---|---|
    /// | `REQUEST_LABEL` | `request` |
    /// | `REQUEST_BROADCAST_CAPACITY` | 16 |
    /// | `REQUEST_SHUTDOWN_TIMEOUT_SECS` | 30 |
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] if a variable is set to a value
    /// that does not parse or is out of range.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Load from an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// See [`LifecycleConfig::from_env`].
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let label = lookup("REQUEST_LABEL").unwrap_or(defaults.label);

        let broadcast_capacity: usize = parse_var(&lookup, "REQUEST_BROADCAST_CAPACITY")?
            .unwrap_or(defaults.store.broadcast_capacity);
        if broadcast_capacity == 0 {
            return Err(ConfigError::invalid(
                "REQUEST_BROADCAST_CAPACITY",
                "0",
                "must be at least 1",
            ));
        }

        let shutdown_timeout = parse_var(&lookup, "REQUEST_SHUTDOWN_TIMEOUT_SECS")?
            .map_or(defaults.store.default_shutdown_timeout, Duration::from_secs);

        Ok(Self {
            label,
            store: StoreConfig::new(broadcast_capacity, shutdown_timeout),
        })
    }
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            label: DEFAULT_LABEL.to_string(),
            store: StoreConfig::default(),
        }
    }
}

/// Settings of the `request-demo` binary.
#[derive(Debug, Clone, PartialEq)]
pub struct DemoConfig {
    /// Probability that the fake API succeeds, in `0.0..=1.0`
    pub success_rate: f64,
    /// Simulated latency of the fake API in milliseconds
    pub latency_ms: u64,
    /// Maximum number of fetches, retrying from Error
    pub attempts: u32,
    /// Print Prometheus metrics on exit
    pub metrics: bool,
}

impl DemoConfig {
    /// Load from the process environment.
    ///
    /// | Variable | Default |
    /// |---|---|
    /// | `REQUEST_DEMO_SUCCESS_RATE` | 0.7 |
    /// | `REQUEST_DEMO_LATENCY_MS` | 300 |
    /// | `REQUEST_DEMO_ATTEMPTS` | 3 |
    /// | `REQUEST_DEMO_METRICS` | false |
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] if a variable does not parse,
    /// the success rate is outside `0.0..=1.0`, or attempts is zero.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Load from an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// See [`DemoConfig::from_env`].
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let success_rate: f64 =
            parse_var(&lookup, "REQUEST_DEMO_SUCCESS_RATE")?.unwrap_or(defaults.success_rate);
        if !(0.0..=1.0).contains(&success_rate) {
            return Err(ConfigError::invalid(
                "REQUEST_DEMO_SUCCESS_RATE",
                success_rate.to_string(),
                "must be between 0.0 and 1.0",
            ));
        }

        let attempts: u32 =
            parse_var(&lookup, "REQUEST_DEMO_ATTEMPTS")?.unwrap_or(defaults.attempts);
        if attempts == 0 {
            return Err(ConfigError::invalid(
                "REQUEST_DEMO_ATTEMPTS",
                "0",
                "must be at least 1",
            ));
        }

        Ok(Self {
            success_rate,
            latency_ms: parse_var(&lookup, "REQUEST_DEMO_LATENCY_MS")?
                .unwrap_or(defaults.latency_ms),
            attempts,
            metrics: parse_var(&lookup, "REQUEST_DEMO_METRICS")?.unwrap_or(defaults.metrics),
        })
    }

    /// Simulated latency as a duration.
    #[must_use]
    pub const fn latency(&self) -> Duration {
        Duration::from_millis(self.latency_ms)
    }
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            success_rate: 0.7,
            latency_ms: 300,
            attempts: 3,
            metrics: false,
        }
    }
}

/// Parse `variable` if it is set.
fn parse_var<V>(
    lookup: impl Fn(&str) -> Option<String>,
    variable: &'static str,
) -> Result<Option<V>, ConfigError>
where
    V: FromStr,
    V::Err: std::fmt::Display,
{
    lookup(variable)
        .map(|raw| {
            raw.trim()
                .parse()
                .map_err(|e| ConfigError::invalid(variable, raw.as_str(), e))
        })
        .transpose()
}
