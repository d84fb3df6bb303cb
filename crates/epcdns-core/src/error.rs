//! Error types for the EPC DNS core.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Why a single resolution attempt failed.
///
/// One attempt produces exactly one outcome, and every waiter registered
/// against that attempt (blocked callers and callbacks alike) receives the
/// same value, which is why this type is `Clone`.
#[derive(Error, Debug, Clone, PartialEq, Eq, Hash)]
pub enum ResolveError {
    /// The domain does not exist.
    #[error("domain does not exist (NXDOMAIN)")]
    NxDomain,

    /// The server failed to complete the request.
    #[error("server failure (SERVFAIL)")]
    ServFail,

    /// The resolution did not complete within the configured bound.
    #[error("resolution timed out")]
    Timeout,

    /// Transport or other network-level failure.
    #[error("network error: {0}")]
    Network(String),

    /// The cache stopped before the attempt could complete.
    #[error("cache is shut down")]
    Shutdown,
}

/// Errors raised by refresh-list persistence.
#[derive(Error, Debug)]
pub enum PersistenceError {
    /// The refresh-list file could not be read.
    #[error("failed to read refresh list {path}: {source}")]
    Read {
        /// File that was being read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// The refresh-list file could not be written.
    #[error("failed to write refresh list {path}: {source}")]
    Write {
        /// File that was being written.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// No refresh-list file has been configured.
    #[error("no refresh list file configured")]
    NotConfigured,
}

/// The main error type for cache operations.
#[derive(Error, Debug)]
pub enum CacheError {
    /// The record type or domain was malformed and never entered the cache.
    #[error("invalid query key: {0}")]
    InvalidKey(String),

    /// The resolution attempt failed.
    #[error("resolution failed: {0}")]
    Resolution(#[from] ResolveError),

    /// Reading or writing the refresh list failed.
    #[error(transparent)]
    Persistence(#[from] PersistenceError),

    /// A background thread could not be started.
    #[error("failed to spawn {name} thread: {source}")]
    ThreadSpawn {
        /// Name of the thread that failed to start.
        name: String,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
}

impl CacheError {
    /// The resolution failure carried by this error, if any.
    pub fn resolve_error(&self) -> Option<&ResolveError> {
        match self {
            Self::Resolution(err) => Some(err),
            _ => None,
        }
    }
}

/// A specialized Result type for cache operations.
pub type Result<T> = std::result::Result<T, CacheError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolution_conversion() {
        let err: CacheError = ResolveError::Timeout.into();
        assert_eq!(err.resolve_error(), Some(&ResolveError::Timeout));
        assert_eq!(err.to_string(), "resolution failed: resolution timed out");
    }

    #[test]
    fn test_invalid_key_has_no_resolve_error() {
        let err = CacheError::InvalidKey("empty domain".into());
        assert!(err.resolve_error().is_none());
    }
}
