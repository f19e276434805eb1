//! Tunables for a [`Store`](crate::Store).

use std::time::Duration;

/// Buffer size of the feedback broadcast when none is configured
pub const DEFAULT_BROADCAST_CAPACITY: usize = 16;

/// Timeout used by [`Store::shutdown_default`](crate::Store::shutdown_default)
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);

/// Store settings.
///
/// ```ignore
/// let config = StoreConfig::default()
///     .with_broadcast_capacity(64)
///     .with_shutdown_timeout(Duration::from_secs(5));
/// let store = Store::with_config(state, reducer, env, config);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    /// Fed-back actions each observer can fall behind by before it lags
    pub broadcast_capacity: usize,
    /// Deadline for a shutdown that does not name its own
    pub default_shutdown_timeout: Duration,
}

impl StoreConfig {
    /// Settings with both values given explicitly
    #[must_use]
    pub const fn new(broadcast_capacity: usize, default_shutdown_timeout: Duration) -> Self {
        Self {
            broadcast_capacity,
            default_shutdown_timeout,
        }
    }

    /// Replace the broadcast capacity; zero becomes one since tokio
    /// refuses empty channels
    #[must_use]
    pub const fn with_broadcast_capacity(mut self, capacity: usize) -> Self {
        self.broadcast_capacity = if capacity == 0 { 1 } else { capacity };
        self
    }

    /// Replace the default shutdown deadline
    #[must_use]
    pub const fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.default_shutdown_timeout = timeout;
        self
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self::new(DEFAULT_BROADCAST_CAPACITY, DEFAULT_SHUTDOWN_TIMEOUT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = StoreConfig::default();
        assert_eq!(config.broadcast_capacity, 16);
        assert_eq!(config.default_shutdown_timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_builder_raises_zero_capacity() {
        let config = StoreConfig::default()
            .with_broadcast_capacity(0)
            .with_shutdown_timeout(Duration::from_secs(2));

        assert_eq!(config, StoreConfig::new(1, Duration::from_secs(2)));
    }
}
