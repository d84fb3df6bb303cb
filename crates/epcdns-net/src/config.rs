//! Resolver configuration.

use std::net::SocketAddr;
use std::time::Duration;

/// Configuration for [`HickoryResolver`](crate::HickoryResolver).
#[derive(Debug, Clone)]
pub struct ResolverConfig {
    /// Use system DNS configuration (reads /etc/resolv.conf on Unix).
    /// If false, uses custom nameservers.
    pub use_system_config: bool,

    /// Custom nameservers to use when `use_system_config` is false.
    pub nameservers: Vec<SocketAddr>,

    /// Entries kept by the underlying client's own cache.
    pub cache_size: usize,

    /// Whether to read from /etc/hosts file.
    pub use_hosts_file: bool,

    /// Number of attempts per query.
    pub attempts: usize,

    /// Timeout for each attempt.
    pub timeout: Duration,

    /// Threads of the runtime that drives lookups.
    pub runtime_threads: usize,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            use_system_config: true,
            nameservers: Vec::new(),
            cache_size: 32,
            use_hosts_file: true,
            attempts: 2,
            timeout: Duration::from_secs(2),
            runtime_threads: 2,
        }
    }
}

impl ResolverConfig {
    /// System nameservers and defaults.
    pub fn system() -> Self {
        Self::default()
    }

    /// Query only the given nameservers.
    pub fn with_nameservers(nameservers: Vec<SocketAddr>) -> Self {
        Self {
            use_system_config: false,
            nameservers,
            ..Default::default()
        }
    }

    /// Use Google's public DNS servers.
    pub fn google() -> Self {
        Self::with_nameservers(vec![
            SocketAddr::from(([8, 8, 8, 8], 53)),
            SocketAddr::from(([8, 8, 4, 4], 53)),
        ])
    }

    /// Use Cloudflare's public DNS servers.
    pub fn cloudflare() -> Self {
        Self::with_nameservers(vec![
            SocketAddr::from(([1, 1, 1, 1], 53)),
            SocketAddr::from(([1, 0, 0, 1], 53)),
        ])
    }

    pub fn cache_size(mut self, size: usize) -> Self {
        self.cache_size = size;
        self
    }

    pub fn use_hosts_file(mut self, use_hosts: bool) -> Self {
        self.use_hosts_file = use_hosts;
        self
    }

    /// Set the number of attempts. At least one is always made.
    pub fn attempts(mut self, attempts: usize) -> Self {
        self.attempts = attempts.max(1);
        self
    }

    /// Set the timeout per attempt.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn runtime_threads(mut self, threads: usize) -> Self {
        self.runtime_threads = threads.max(1);
        self
    }

    /// The bound on one whole lookup, every attempt included.
    pub fn query_timeout(&self) -> Duration {
        self.timeout.saturating_mul(self.attempts.max(1) as u32)
    }
}
