//! Rate limiter construction and configuration.

use super::RateLimiter;
use std::fmt;
use std::time::Duration;

/// Invalid rate limiter configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum ConfigError {
    /// `max_requests` is zero, so no request could ever be admitted.
    ZeroCapacity,
    /// The window is zero, so every request would open a fresh window.
    ZeroWindow,
    /// The shard count is not a power of two greater than one.
    InvalidShards {
        /// The rejected shard count.
        shards: usize,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ZeroCapacity => {
                write!(f, "Rate limiter max_requests must be at least 1")
            },
            Self::ZeroWindow => write!(f, "Rate limiter window must be longer than zero"),
            Self::InvalidShards { shards } => write!(
                f,
                "Rate limiter shard count must be a power of two above 1, got {shards}"
            ),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Builder for [`RateLimiter`].
///
/// # Example
///
/// ```
/// use lunar_security::RateLimiter;
/// use std::time::Duration;
///
/// let limiter = RateLimiter::builder(10, Duration::from_secs(1))
///     .shards(64)
///     .build()
///     .unwrap();
/// assert_eq!(limiter.max_requests(), 10);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimiterBuilder {
    max_requests: u32,
    window: Duration,
    shards: Option<usize>,
}

impl RateLimiterBuilder {
    /// Start from a capacity and a window, with the map's default shard count.
    #[must_use]
    pub const fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            shards: None,
        }
    }

    /// Set the number of independently locked shards of the counter map.
    ///
    /// Must be a power of two greater than one. More shards reduce contention
    /// between unrelated keys.
    #[must_use]
    pub const fn shards(mut self, shards: usize) -> Self {
        self.shards = Some(shards);
        self
    }

    /// Validate the configuration and build the limiter.
    pub fn build(self) -> Result<RateLimiter, ConfigError> {
        if self.max_requests == 0 {
            return Err(ConfigError::ZeroCapacity);
        }
        if self.window.is_zero() {
            return Err(ConfigError::ZeroWindow);
        }
        if let Some(shards) = self.shards
            && (shards < 2 || !shards.is_power_of_two())
        {
            return Err(ConfigError::InvalidShards { shards });
        }
        Ok(RateLimiter::from_parts(
            self.max_requests,
            self.window,
            self.shards,
        ))
    }
}

/// Host-facing rate limiter settings.
///
/// With the `serde` feature this deserializes from configuration files:
///
/// ```toml
/// max_requests = 100
/// window_ms = 60000
/// shards = 32        # optional
/// ```
///
/// The window has no default; a config without one fails to load.
/// Milliseconds are the resolution: [`RateLimitConfig::new`] rounds a
/// sub-millisecond remainder up, so a non-zero [`Duration`] never turns into
/// a zero window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[cfg_attr(feature = "serde", serde(deny_unknown_fields))]
#[non_exhaustive]
pub struct RateLimitConfig {
    /// Requests admitted per key per window.
    pub max_requests: u32,
    /// Window length in milliseconds.
    pub window_ms: u64,
    /// Shard count of the counter map, the map's default when absent.
    #[cfg_attr(feature = "serde", serde(default))]
    pub shards: Option<usize>,
}

impl RateLimitConfig {
    /// Create a config with the default shard count.
    ///
    /// Windows longer than `u64::MAX` milliseconds saturate.
    #[must_use]
    pub fn new(max_requests: u32, window: Duration) -> Self {
        let mut window_ms = u64::try_from(window.as_millis()).unwrap_or(u64::MAX);
        if window.subsec_nanos() % 1_000_000 != 0 {
            window_ms = window_ms.saturating_add(1);
        }
        Self {
            max_requests,
            window_ms,
            shards: None,
        }
    }

    /// The window as a [`Duration`].
    #[must_use]
    pub const fn window(&self) -> Duration {
        Duration::from_millis(self.window_ms)
    }

    /// Validate and build a limiter.
    pub fn build(&self) -> Result<RateLimiter, ConfigError> {
        RateLimiterBuilder::from(*self).build()
    }
}

impl From<RateLimitConfig> for RateLimiterBuilder {
    fn from(config: RateLimitConfig) -> Self {
        Self {
            max_requests: config.max_requests,
            window: config.window(),
            shards: config.shards,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_defaults() {
        let builder = RateLimiterBuilder::new(3, Duration::from_secs(1));
        assert_eq!(builder.shards, None);
        assert!(builder.build().is_ok());
    }

    #[test]
    fn test_invalid_shards_rejected() {
        for shards in [0, 1, 3, 12] {
            let err = RateLimiterBuilder::new(3, Duration::from_secs(1))
                .shards(shards)
                .build()
                .unwrap_err();
            assert_eq!(err, ConfigError::InvalidShards { shards });
        }
        for shards in [2, 8, 64] {
            assert!(
                RateLimiterBuilder::new(3, Duration::from_secs(1))
                    .shards(shards)
                    .build()
                    .is_ok()
            );
        }
    }

    #[test]
    fn test_validation_order() {
        let err = RateLimiterBuilder::new(0, Duration::ZERO)
            .shards(0)
            .build()
            .unwrap_err();
        assert_eq!(err, ConfigError::ZeroCapacity);
    }

    #[test]
    fn test_error_messages() {
        assert_eq!(
            ConfigError::ZeroCapacity.to_string(),
            "Rate limiter max_requests must be at least 1"
        );
        assert_eq!(
            ConfigError::ZeroWindow.to_string(),
            "Rate limiter window must be longer than zero"
        );
        assert_eq!(
            ConfigError::InvalidShards { shards: 3 }.to_string(),
            "Rate limiter shard count must be a power of two above 1, got 3"
        );
    }

    #[test]
    fn test_config_roundtrips_window() {
        let config = RateLimitConfig::new(5, Duration::from_millis(1500));
        assert_eq!(config.window_ms, 1500);
        assert_eq!(config.window(), Duration::from_millis(1500));

        let limiter = config.build().unwrap();
        assert_eq!(limiter.max_requests(), 5);
        assert_eq!(limiter.window(), Duration::from_millis(1500));
    }

    #[test]
    fn test_config_zero_window() {
        let config = RateLimitConfig::new(5, Duration::ZERO);
        assert_eq!(config.build().unwrap_err(), ConfigError::ZeroWindow);

        let mut config = RateLimitConfig::new(5, Duration::from_secs(1));
        config.window_ms = 0;
        assert_eq!(config.build().unwrap_err(), ConfigError::ZeroWindow);
    }

    #[test]
    fn test_config_rounds_sub_millisecond_windows_up() {
        assert_eq!(RateLimitConfig::new(5, Duration::from_micros(10)).window_ms, 1);
        assert_eq!(RateLimitConfig::new(5, Duration::from_micros(1500)).window_ms, 2);
        assert_eq!(RateLimitConfig::new(5, Duration::from_millis(7)).window_ms, 7);
        assert!(RateLimitConfig::new(5, Duration::from_nanos(1)).build().is_ok());
    }

    #[test]
    fn test_config_saturates_huge_windows() {
        let config = RateLimitConfig::new(5, Duration::MAX);
        assert_eq!(config.window_ms, u64::MAX);
        assert!(config.build().is_ok());
    }

    #[test]
    fn test_config_into_builder() {
        let mut config = RateLimitConfig::new(2, Duration::from_secs(1));
        config.shards = Some(4);
        let builder = RateLimiterBuilder::from(config);
        assert_eq!(builder.shards, Some(4));
        assert!(builder.build().is_ok());

        config.shards = Some(5);
        assert_eq!(
            config.build().unwrap_err(),
            ConfigError::InvalidShards { shards: 5 }
        );
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_config_deserialize() {
        let config: RateLimitConfig =
            serde_json::from_str(r#"{"max_requests": 10, "window_ms": 1000}"#).unwrap();
        assert_eq!(config.max_requests, 10);
        assert_eq!(config.shards, None);

        let missing_window =
            serde_json::from_str::<RateLimitConfig>(r#"{"max_requests": 10}"#);
        assert!(missing_window.is_err());
    }
}
