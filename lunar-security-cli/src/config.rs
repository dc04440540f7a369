//! TOML configuration for the command line tool.
//!
//! ```toml
//! [rate_limit]
//! max_requests = 100
//! window_ms = 60000
//! shards = 16
//! ```
//!
//! Flags given on the command line override values from the file.

use anyhow::{Context, Result, bail};
use lunar_security::{RateLimitConfig, RateLimiter};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// Top-level configuration file.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    /// Limiter settings for `throttle`.
    #[serde(default)]
    pub rate_limit: Option<RateLimitConfig>,
}

impl FileConfig {
    /// Read and parse a config file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::parse(&text).with_context(|| format!("Invalid config file {}", path.display()))
    }

    /// Parse config text.
    pub fn parse(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }
}

/// Rate limit values given on the command line.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct LimitOverrides {
    pub max_requests: Option<u32>,
    pub window_ms: Option<u64>,
    pub shards: Option<usize>,
}

/// Merge file settings with flag overrides into a limiter.
///
/// Both `max_requests` and the window must come from one source or the
/// other; there are no defaults.
pub fn build_limiter(file: Option<RateLimitConfig>, flags: LimitOverrides) -> Result<RateLimiter> {
    let max_requests = flags
        .max_requests
        .or(file.map(|c| c.max_requests));
    let window_ms = flags.window_ms.or(file.map(|c| c.window_ms));

    let (Some(max_requests), Some(window_ms)) = (max_requests, window_ms) else {
        bail!("Rate limiter needs max_requests and window_ms, from --max/--window-ms or [rate_limit]");
    };

    let mut config = RateLimitConfig::new(max_requests, Duration::from_millis(window_ms));
    config.shards = flags.shards.or(file.and_then(|c| c.shards));

    tracing::debug!(
        max_requests,
        window_ms,
        shards = ?config.shards,
        "building rate limiter"
    );

    config.build().context("Invalid rate limit configuration")
}
