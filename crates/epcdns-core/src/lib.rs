//! Core of the EPC DNS engine.
//!
//! This crate provides the resolution side of peer discovery:
//!
//! - **Records**: a typed model of A, AAAA, NS, CNAME, SRV and NAPTR records
//! - **Query keys**: normalized `(record type, domain)` identities
//! - **Cache**: blocking and callback lookups with request de-duplication
//!   and TTL-based expiry
//! - **Query processor**: the worker pool that calls the resolver primitive
//! - **Refresher**: keeps important queries warm and persists their list
//! - **Timers**: fixed-interval timers on dedicated threads
//!
//! The resolver primitive itself is a trait, [`Resolve`]. Any
//! `Fn(&QueryKey) -> Result<Response, ResolveError>` closure implements it,
//! and the `epcdns-net` crate provides one backed by a real DNS client.
//!
//! # Example
//!
//! ```
//! use std::net::Ipv4Addr;
//! use std::sync::mpsc;
//! use epcdns_core::{Cache, CacheConfig, QueryKey, RData, RecordType, ResolveError, ResourceRecord, Response};
//!
//! let cache = Cache::new(
//!     |key: &QueryKey| -> Result<Response, ResolveError> {
//!         Ok(Response::with_answers(vec![ResourceRecord::new(
//!             key.domain(),
//!             60,
//!             RData::A(Ipv4Addr::new(192, 0, 2, 10)),
//!         )]))
//!     },
//!     CacheConfig::default(),
//! )?;
//!
//! let (tx, rx) = mpsc::channel();
//! cache.query_with(RecordType::A, "mme1.example", false, move |result| {
//!     let _ = tx.send(result.map(|lookup| lookup.answers().len()));
//! })?;
//! assert_eq!(rx.recv().unwrap(), Ok(1));
//! # Ok::<(), epcdns_core::CacheError>(())
//! ```

mod cache;
pub mod config;
mod error;
mod key;
pub mod logging;
pub mod persist;
mod processor;
mod record;
mod refresher;
mod resolver;
pub mod timer;

pub use cache::{Cache, CacheStats, CachedAnswer, Lookup, QueryCallback, QueryResult};
pub use config::{CacheConfig, RefreshConfig};
pub use error::{CacheError, PersistenceError, ResolveError, Result};
pub use key::QueryKey;
pub use processor::QueryProcessor;
pub use record::{RData, RecordType, ResourceRecord, Response, UnknownRecordType};
pub use refresher::Refresher;
pub use resolver::Resolve;
pub use timer::IntervalTimer;

static_assertions::assert_impl_all!(Cache: Send, Sync);
static_assertions::assert_impl_all!(CachedAnswer: Send, Sync);
static_assertions::assert_impl_all!(IntervalTimer: Send, Sync);
