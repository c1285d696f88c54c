//! Per-route loading configuration

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Milliseconds a cache entry stays fresh after fetching. Default: always
/// stale, so every read revalidates.
pub const DEFAULT_STALE_TIME_MS: u64 = 0;

/// Milliseconds an unread cache entry survives before garbage collection.
pub const DEFAULT_GC_TIME_MS: u64 = 300_000;

/// Growth curve for retry delays
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backoff {
    /// `delay * attempt`
    #[default]
    Linear,
    /// `delay * 2^(attempt - 1)`
    Exponential,
}

/// Retry policy for failed loaders
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Additional attempts after the first failure
    pub max_retries: u32,
    /// Base delay between attempts, in milliseconds
    pub delay_ms: u64,
    pub backoff: Backoff,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 0,
            delay_ms: 1_000,
            backoff: Backoff::Linear,
        }
    }
}

impl RetryConfig {
    /// Delay before retry `attempt` (1-based)
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let millis = match self.backoff {
            Backoff::Linear => self.delay_ms.saturating_mul(attempt as u64),
            Backoff::Exponential => self
                .delay_ms
                .saturating_mul(1u64 << attempt.saturating_sub(1).min(32)),
        };
        Duration::from_millis(millis)
    }
}

/// Loading behavior for one route
///
/// Everything optional with conservative defaults: no polling, no retries,
/// no preloading, revalidate on every read, keep unread entries for five
/// minutes.
///
/// # Examples
///
/// ```
/// use waypoint_loader::config::RouteConfig;
///
/// let config = RouteConfig::new()
///     .with_stale_time_ms(30_000)
///     .with_refetch_on_focus(true)
///     .with_retries(3, 500);
/// assert_eq!(config.retry.max_retries, 3);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RouteConfig {
    /// Milliseconds a fetched entry counts as fresh
    pub stale_time_ms: u64,
    /// Milliseconds an unread entry survives before eviction
    pub gc_time_ms: u64,
    /// Refetch when the host regains focus
    pub refetch_on_focus: bool,
    /// Refetch when connectivity returns
    pub refetch_on_reconnect: bool,
    /// Refetch on navigation even when the cache entry is still fresh
    pub refetch_on_mount: bool,
    /// Poll at this interval while the route is active
    pub polling_interval_ms: Option<u64>,
    pub retry: RetryConfig,
    /// Whether the prefetcher may warm this route
    pub preload: bool,
}

impl Default for RouteConfig {
    fn default() -> Self {
        Self {
            stale_time_ms: DEFAULT_STALE_TIME_MS,
            gc_time_ms: DEFAULT_GC_TIME_MS,
            refetch_on_focus: false,
            refetch_on_reconnect: false,
            refetch_on_mount: false,
            polling_interval_ms: None,
            retry: RetryConfig::default(),
            preload: false,
        }
    }
}

impl RouteConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_stale_time_ms(mut self, millis: u64) -> Self {
        self.stale_time_ms = millis;
        self
    }

    pub fn with_gc_time_ms(mut self, millis: u64) -> Self {
        self.gc_time_ms = millis;
        self
    }

    pub fn with_refetch_on_focus(mut self, enabled: bool) -> Self {
        self.refetch_on_focus = enabled;
        self
    }

    pub fn with_refetch_on_reconnect(mut self, enabled: bool) -> Self {
        self.refetch_on_reconnect = enabled;
        self
    }

    pub fn with_refetch_on_mount(mut self, enabled: bool) -> Self {
        self.refetch_on_mount = enabled;
        self
    }

    pub fn with_polling_interval_ms(mut self, millis: u64) -> Self {
        self.polling_interval_ms = Some(millis);
        self
    }

    pub fn with_retries(mut self, max_retries: u32, delay_ms: u64) -> Self {
        self.retry.max_retries = max_retries;
        self.retry.delay_ms = delay_ms;
        self
    }

    pub fn with_backoff(mut self, backoff: Backoff) -> Self {
        self.retry.backoff = backoff;
        self
    }

    pub fn with_preload(mut self, enabled: bool) -> Self {
        self.preload = enabled;
        self
    }

    pub fn stale_time(&self) -> Duration {
        Duration::from_millis(self.stale_time_ms)
    }

    pub fn gc_time(&self) -> Duration {
        Duration::from_millis(self.gc_time_ms)
    }
}
