//! Log targets used by the EPC DNS core.
//!
//! The crate emits all diagnostics through the `tracing` crate and never
//! installs a subscriber itself. To see them, install one in the application:
//!
//! ```ignore
//! tracing_subscriber::fmt()
//!     .with_env_filter("epcdns_core::refresher=debug,epcdns_core=info")
//!     .init();
//! ```

/// Target names for log filtering.
///
/// Use these with `tracing` directives to filter logs by subsystem.
pub mod targets {
    /// Core crate target.
    pub const CORE: &str = "epcdns_core";
    /// Cache lookups, hits and misses.
    pub const CACHE: &str = "epcdns_core::cache";
    /// Resolver worker pool.
    pub const PROCESSOR: &str = "epcdns_core::processor";
    /// Background refresher.
    pub const REFRESHER: &str = "epcdns_core::refresher";
    /// Refresh-list persistence.
    pub const PERSIST: &str = "epcdns_core::persist";
    /// Interval timers.
    pub const TIMER: &str = "epcdns_core::timer";
}

