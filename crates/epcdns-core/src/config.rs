//! Cache and refresher configuration.

use std::path::PathBuf;
use std::time::Duration;

/// Configuration for a [`Cache`](crate::Cache).
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Number of resolver worker threads.
    pub workers: usize,

    /// Prefix for the names of threads spawned by the cache.
    pub thread_name: String,

    /// Upper bound on one resolution attempt. Waiters of an attempt still
    /// pending after this long receive `ResolveError::Timeout`.
    pub query_timeout: Duration,

    /// How often the watchdog looks for overdue attempts.
    pub watchdog_interval: Duration,

    /// Maximum lifetime of a positive answer (caps the TTL from DNS records).
    pub max_positive_ttl: Duration,

    /// Lifetime of failed outcomes and of answers that carry no TTL.
    /// Zero means failures are retried on the next lookup.
    pub negative_ttl: Duration,

    /// How long shutdown waits for queued and in-flight work to drain.
    pub shutdown_grace: Duration,

    /// Add every first-time miss to the refresher's list, so every key the
    /// cache has resolved is kept warm and persisted. Disable to refresh only
    /// explicitly registered keys.
    pub track_new_queries: bool,

    /// Background refresher settings.
    pub refresh: RefreshConfig,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            workers: 4,
            thread_name: "epcdns".to_string(),
            query_timeout: Duration::from_secs(5),
            watchdog_interval: Duration::from_millis(250),
            max_positive_ttl: Duration::from_secs(86400), // 24 hours
            negative_ttl: Duration::ZERO,
            shutdown_grace: Duration::from_secs(2),
            track_new_queries: true,
            refresh: RefreshConfig::default(),
        }
    }
}

impl CacheConfig {
    /// Create a configuration with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the number of worker threads. Values below one are raised to one.
    pub fn workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    /// Set the thread name prefix.
    pub fn thread_name(mut self, name: impl Into<String>) -> Self {
        self.thread_name = name.into();
        self
    }

    /// Set the per-attempt timeout.
    pub fn query_timeout(mut self, timeout: Duration) -> Self {
        self.query_timeout = timeout;
        self
    }

    /// Set the watchdog interval.
    pub fn watchdog_interval(mut self, interval: Duration) -> Self {
        self.watchdog_interval = interval;
        self
    }

    /// Set the maximum positive TTL.
    pub fn max_positive_ttl(mut self, ttl: Duration) -> Self {
        self.max_positive_ttl = ttl;
        self
    }

    /// Set the negative TTL.
    pub fn negative_ttl(mut self, ttl: Duration) -> Self {
        self.negative_ttl = ttl;
        self
    }

    /// Set the shutdown grace period.
    pub fn shutdown_grace(mut self, grace: Duration) -> Self {
        self.shutdown_grace = grace;
        self
    }

    /// Set whether new queries are added to the refresh list.
    pub fn track_new_queries(mut self, track: bool) -> Self {
        self.track_new_queries = track;
        self
    }

    /// Set the refresher configuration.
    pub fn refresh(mut self, refresh: RefreshConfig) -> Self {
        self.refresh = refresh;
        self
    }
}

/// Configuration for the background [`Refresher`](crate::Refresher).
#[derive(Debug, Clone)]
pub struct RefreshConfig {
    /// Time between refresh passes.
    pub interval: Duration,

    /// Refresh an answer once it has consumed this percentage of its TTL.
    pub percent: u8,

    /// Maximum refreshes outstanding at once.
    pub max_concurrent: usize,

    /// Refresh-list file loaded at startup and saved on change.
    pub query_file: Option<PathBuf>,

    /// How often a changed refresh list is written out.
    pub save_interval: Duration,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(60),
            percent: 80,
            max_concurrent: 10,
            query_file: None,
            save_interval: Duration::from_secs(60),
        }
    }
}

impl RefreshConfig {
    /// Set the refresh interval.
    pub fn interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Set the refresh threshold. Values above 100 are clamped.
    pub fn percent(mut self, percent: u8) -> Self {
        self.percent = percent.min(100);
        self
    }

    /// Set the maximum number of concurrent refreshes.
    pub fn max_concurrent(mut self, max: usize) -> Self {
        self.max_concurrent = max.max(1);
        self
    }

    /// Set the refresh-list file.
    pub fn query_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.query_file = Some(path.into());
        self
    }

    /// Set the save interval.
    pub fn save_interval(mut self, interval: Duration) -> Self {
        self.save_interval = interval;
        self
    }
}
