//! Configuration Module
//!
//! Handles loading and managing server configuration from environment variables.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::cache::CacheSettings;

/// Server configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
/// Durations are expressed in milliseconds so sub-second sweeps can be tuned.
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server port
    pub server_port: u16,
    /// Maximum number of resident cache entries
    pub capacity: usize,
    /// Lifetime of a freshly produced entry, in milliseconds
    pub refresh_interval_ms: u64,
    /// Sweeper tick, in milliseconds
    pub sweep_tick_ms: u64,
    /// How far ahead of expiry the sweeper refreshes, in milliseconds
    pub refresh_lookahead_ms: u64,
    /// Bound on waiting for another caller's recompute, in milliseconds
    pub recompute_timeout_ms: u64,
    /// Deadline for a single producer invocation, in milliseconds
    pub producer_timeout_ms: u64,
    /// Pages below this depth are cached; deeper pages are computed every time
    pub cacheable_page_depth: u32,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    /// - `CACHE_CAPACITY` - Maximum resident entries (default: 10000)
    /// - `REFRESH_INTERVAL_MS` - Entry lifetime (default: 30000)
    /// - `SWEEP_TICK_MS` - Sweeper frequency (default: 1000)
    /// - `REFRESH_LOOKAHEAD_MS` - Refresh window before expiry (default: 1000)
    /// - `RECOMPUTE_TIMEOUT_MS` - Wait bound for in-flight recomputes (default: 2000)
    /// - `PRODUCER_TIMEOUT_MS` - Producer deadline (default: 5000)
    /// - `CACHEABLE_PAGE_DEPTH` - Admission page depth (default: 5)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            server_port: env_or("SERVER_PORT", defaults.server_port),
            capacity: env_or("CACHE_CAPACITY", defaults.capacity),
            refresh_interval_ms: env_or("REFRESH_INTERVAL_MS", defaults.refresh_interval_ms),
            sweep_tick_ms: env_or("SWEEP_TICK_MS", defaults.sweep_tick_ms),
            refresh_lookahead_ms: env_or("REFRESH_LOOKAHEAD_MS", defaults.refresh_lookahead_ms),
            recompute_timeout_ms: env_or("RECOMPUTE_TIMEOUT_MS", defaults.recompute_timeout_ms),
            producer_timeout_ms: env_or("PRODUCER_TIMEOUT_MS", defaults.producer_timeout_ms),
            cacheable_page_depth: env_or("CACHEABLE_PAGE_DEPTH", defaults.cacheable_page_depth),
        }
    }

    /// Sweeper tick as a Duration.
    pub fn sweep_tick(&self) -> Duration {
        Duration::from_millis(self.sweep_tick_ms)
    }

    /// Builds the engine settings from this configuration.
    pub fn cache_settings(&self) -> CacheSettings {
        CacheSettings {
            capacity: self.capacity,
            refresh_interval: Duration::from_millis(self.refresh_interval_ms),
            refresh_lookahead: Duration::from_millis(self.refresh_lookahead_ms),
            recompute_timeout: Duration::from_millis(self.recompute_timeout_ms),
            producer_timeout: Duration::from_millis(self.producer_timeout_ms),
            cacheable_page_depth: self.cacheable_page_depth,
            ..CacheSettings::default()
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_port: 3000,
            capacity: 10_000,
            refresh_interval_ms: 30_000,
            sweep_tick_ms: 1_000,
            refresh_lookahead_ms: 1_000,
            recompute_timeout_ms: 2_000,
            producer_timeout_ms: 5_000,
            cacheable_page_depth: 5,
        }
    }
}

fn env_or<T: FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
