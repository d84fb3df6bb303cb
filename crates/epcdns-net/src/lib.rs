//! Networking module for EPC DNS.
//!
//! Provides [`HickoryResolver`], a resolver primitive for the
//! [`epcdns_core::Cache`] backed by the hickory-resolver DNS client.
//!
//! # Example
//!
//! ```ignore
//! use epcdns_core::{Cache, CacheConfig, RecordType};
//! use epcdns_net::{HickoryResolver, ResolverConfig};
//! use std::time::Duration;
//!
//! let resolver = HickoryResolver::new(
//!     ResolverConfig::with_nameservers(vec!["192.0.2.53:53".parse()?])
//!         .attempts(3)
//!         .timeout(Duration::from_secs(1)),
//! )?;
//! let cache = Cache::new(resolver, CacheConfig::default())?;
//! let lookup = cache.query(RecordType::Naptr, "internet.apn.epc.mnc001.mcc001.3gppnetwork.org", false)?;
//! ```

mod config;
mod error;
mod resolver;

pub use config::ResolverConfig;
pub use error::{NetworkError, Result};
pub use resolver::HickoryResolver;

static_assertions::assert_impl_all!(HickoryResolver: Send, Sync);
