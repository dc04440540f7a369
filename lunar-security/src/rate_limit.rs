//! Per-key fixed-window rate limiting.
//!
//! Each identity key (an address, an account id, an API token) owns a counter
//! `{count, window_start}`. A check admits while `count < max_requests` and
//! the window is open; once `window` has elapsed since `window_start`, the
//! counter restarts at the time of the check. The admitted rate per key never
//! exceeds `max_requests` per window, and one key's traffic never affects
//! another's.
//!
//! Counters live in a sharded concurrent map. A check holds the lock of its
//! key's entry for the whole read-compare-increment-reset step, so concurrent
//! checks neither lose updates nor deadlock.
//!
//! Keys are opaque byte strings: [`RateLimiter::check`] takes text and
//! [`RateLimiter::check_bytes`] takes arbitrary bytes, and both address the
//! same counter for the same bytes.
//!
//! # Example
//!
//! ```
//! use lunar_security::RateLimiter;
//! use std::time::Duration;
//!
//! let limiter = RateLimiter::new(2, Duration::from_secs(60)).unwrap();
//!
//! assert!(limiter.check("10.0.0.1"));
//! assert!(limiter.check("10.0.0.1"));
//! assert!(!limiter.check("10.0.0.1")); // third request in the window
//! assert!(limiter.check("10.0.0.2")); // other keys are unaffected
//! ```

mod config;

use crate::constants::{EVICT_AFTER_WINDOWS, SWEEP_INTERVAL};
use dashmap::DashMap;
use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, trace};

pub use config::{ConfigError, RateLimitConfig, RateLimiterBuilder};

/// Request count for one key in its current window.
#[derive(Debug, Clone, Copy)]
struct WindowCounter {
    count: u32,
    window_start: Instant,
}

impl WindowCounter {
    const fn opened(now: Instant) -> Self {
        Self {
            count: 0,
            window_start: now,
        }
    }

    fn is_expired(&self, now: Instant, window: Duration) -> bool {
        now.saturating_duration_since(self.window_start) >= window
    }

    /// Roll the window if it elapsed, then count the request if there is room.
    fn try_admit(&mut self, now: Instant, window: Duration, max_requests: u32) -> bool {
        if self.is_expired(now, window) {
            self.count = 0;
            self.window_start = now;
        }
        if self.count < max_requests {
            self.count += 1;
            true
        } else {
            false
        }
    }
}

/// Snapshot of one key's counter, as seen by [`RateLimiter::status`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub struct RateLimitStatus {
    /// Requests admitted in the current window.
    pub count: u32,
    /// Requests still admissible in the current window.
    pub remaining: u32,
    /// Configured capacity per window.
    pub max_requests: u32,
    /// Time until the current window closes, `None` if no window is open.
    pub resets_in: Option<Duration>,
}

impl RateLimitStatus {
    /// Fraction of the window's capacity already used, in `0.0..=1.0`.
    pub fn utilization(&self) -> f64 {
        f64::from(self.count) / f64::from(self.max_requests)
    }
}

/// Concurrency-safe per-key request counter.
///
/// Dropping the limiter discards every counter; nothing is persisted.
pub struct RateLimiter {
    max_requests: u32,
    window: Duration,
    counters: DashMap<Box<[u8]>, WindowCounter>,
    checks: AtomicU32,
}

impl RateLimiter {
    /// Create a limiter admitting `max_requests` per `window` per key.
    ///
    /// A zero capacity or a zero window is a configuration error: a limiter
    /// that can never admit anything is rejected here instead of silently
    /// throttling every caller.
    ///
    /// # Example
    ///
    /// ```
    /// use lunar_security::{ConfigError, RateLimiter};
    /// use std::time::Duration;
    ///
    /// assert!(RateLimiter::new(100, Duration::from_secs(1)).is_ok());
    /// assert_eq!(
    ///     RateLimiter::new(0, Duration::from_secs(1)).unwrap_err(),
    ///     ConfigError::ZeroCapacity
    /// );
    /// ```
    pub fn new(max_requests: u32, window: Duration) -> Result<Self, ConfigError> {
        RateLimiterBuilder::new(max_requests, window).build()
    }

    /// Start a builder for non-default shard counts.
    #[must_use]
    pub const fn builder(max_requests: u32, window: Duration) -> RateLimiterBuilder {
        RateLimiterBuilder::new(max_requests, window)
    }

    /// `shards` is already validated as a power of two above one.
    fn from_parts(max_requests: u32, window: Duration, shards: Option<usize>) -> Self {
        let counters = shards.map_or_else(DashMap::new, DashMap::with_shard_amount);
        Self {
            max_requests,
            window,
            counters,
            checks: AtomicU32::new(0),
        }
    }

    /// Configured capacity per window.
    pub const fn max_requests(&self) -> u32 {
        self.max_requests
    }

    /// Configured window length.
    pub const fn window(&self) -> Duration {
        self.window
    }

    /// Count a request for `key` now, returning whether it is admitted.
    ///
    /// The first request for an unseen key is always admitted.
    pub fn check(&self, key: &str) -> bool {
        self.check_bytes_at(key.as_bytes(), Instant::now())
    }

    /// Count a request for `key` at `now`.
    ///
    /// For hosts that carry their own clock, and for deterministic tests.
    /// Instants earlier than a key's window start are treated as inside that
    /// window.
    pub fn check_at(&self, key: &str, now: Instant) -> bool {
        self.check_bytes_at(key.as_bytes(), now)
    }

    /// [`check`](Self::check) for keys that are not text.
    pub fn check_bytes(&self, key: &[u8]) -> bool {
        self.check_bytes_at(key, Instant::now())
    }

    /// [`check_at`](Self::check_at) for keys that are not text.
    pub fn check_bytes_at(&self, key: &[u8], now: Instant) -> bool {
        let admitted = if let Some(mut counter) = self.counters.get_mut(key) {
            counter.try_admit(now, self.window, self.max_requests)
        } else {
            self.counters
                .entry(key.into())
                .or_insert_with(|| WindowCounter::opened(now))
                .try_admit(now, self.window, self.max_requests)
        };

        if !admitted {
            debug!(
                key = %String::from_utf8_lossy(key),
                max_requests = self.max_requests,
                "rate limit exceeded"
            );
        }

        // Wrapping keeps the cadence exact: u32::MAX + 1 is a multiple of the interval
        let checks = self.checks.fetch_add(1, Ordering::Relaxed).wrapping_add(1);
        if checks % SWEEP_INTERVAL == 0 {
            let evicted = self.sweep(now);
            trace!(evicted, "swept idle rate limit counters");
        }
        admitted
    }

    /// Inspect `key`'s counter without counting a request.
    pub fn status(&self, key: &str) -> RateLimitStatus {
        self.status_at(key, Instant::now())
    }

    /// Inspect `key`'s counter as of `now`.
    pub fn status_at(&self, key: &str, now: Instant) -> RateLimitStatus {
        let live = self
            .counters
            .get(key.as_bytes())
            .map(|counter| *counter)
            .filter(|counter| !counter.is_expired(now, self.window));

        let (count, resets_in) = match live {
            Some(counter) => {
                let elapsed = now.saturating_duration_since(counter.window_start);
                (counter.count, Some(self.window.saturating_sub(elapsed)))
            },
            None => (0, None),
        };

        RateLimitStatus {
            count,
            remaining: self.max_requests.saturating_sub(count),
            max_requests: self.max_requests,
            resets_in,
        }
    }

    /// Forget `key`'s counter. Returns whether one existed.
    pub fn reset(&self, key: &str) -> bool {
        self.counters.remove(key.as_bytes()).is_some()
    }

    /// Forget every counter.
    pub fn clear(&self) {
        self.counters.clear();
    }

    /// Number of keys currently holding a counter, expired or not.
    pub fn tracked_keys(&self) -> usize {
        self.counters.len()
    }

    /// Evict counters idle for several windows, returning how many went.
    ///
    /// Checks already do this lazily; hosts with many one-off keys can call it
    /// from a maintenance task to bound memory sooner.
    pub fn purge_expired(&self) -> usize {
        self.purge_expired_at(Instant::now())
    }

    /// [`purge_expired`](Self::purge_expired) as of `now`.
    pub fn purge_expired_at(&self, now: Instant) -> usize {
        let evicted = self.sweep(now);
        trace!(evicted, "purged idle rate limit counters");
        evicted
    }

    /// Drop counters idle for longer than the eviction horizon.
    ///
    /// Must not be called while holding a reference into `counters`.
    fn sweep(&self, now: Instant) -> usize {
        let horizon = self
            .window
            .checked_mul(EVICT_AFTER_WINDOWS)
            .unwrap_or(Duration::MAX);
        let mut evicted = 0;
        self.counters.retain(|_, counter| {
            let keep = !counter.is_expired(now, horizon);
            if !keep {
                evicted += 1;
            }
            keep
        });
        evicted
    }
}

impl fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RateLimiter")
            .field("max_requests", &self.max_requests)
            .field("window", &self.window)
            .field("tracked_keys", &self.counters.len())
            .finish_non_exhaustive()
    }
}
