//! Error types for the networking crate.

use std::io;

use thiserror::Error;

/// Errors raised while building a resolver.
///
/// Lookup failures are not reported here; they surface as
/// [`epcdns_core::ResolveError`] through the cache.
#[derive(Error, Debug)]
pub enum NetworkError {
    /// Custom nameservers were requested but none were given.
    #[error("no nameservers configured")]
    NoNameservers,

    /// The system resolver configuration could not be read.
    #[error("failed to read system DNS configuration: {0}")]
    SystemConfig(String),

    /// The async runtime driving lookups could not be started.
    #[error("failed to start resolver runtime: {0}")]
    Runtime(#[source] io::Error),
}

/// A specialized Result type for network operations.
pub type Result<T> = std::result::Result<T, NetworkError>;
