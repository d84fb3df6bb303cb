//! The resolver primitive the worker pool calls into.

use crate::error::ResolveError;
use crate::key::QueryKey;
use crate::record::Response;

/// Performs one network resolution for a key.
///
/// Implementations block the calling worker thread until the answer or a
/// failure is available. The cache guarantees that at most one call per key
/// is in flight at a time.
pub trait Resolve: Send + Sync + 'static {
    /// Resolve `key`, returning every section of the response.
    fn resolve(&self, key: &QueryKey) -> Result<Response, ResolveError>;
}

impl<F> Resolve for F
where
    F: Fn(&QueryKey) -> Result<Response, ResolveError> + Send + Sync + 'static,
{
    fn resolve(&self, key: &QueryKey) -> Result<Response, ResolveError> {
        self(key)
    }
}
