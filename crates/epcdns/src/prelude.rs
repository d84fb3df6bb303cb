//! Prelude module for EPC DNS.
//!
//! This module re-exports the most commonly used types for convenient importing:
//!
//! ```ignore
//! use epcdns::prelude::*;
//! ```
//!
//! This provides access to:
//! - The cache and its configuration (`Cache`, `CacheConfig`, `RefreshConfig`)
//! - Query and record types (`QueryKey`, `RecordType`, `Response`)
//! - Node selection (`NodeSelector`, `NodeIdentity`, `PlmnId`) with `selection`
//! - The hickory resolver (`HickoryResolver`) with `networking`

// ============================================================================
// Cache
// ============================================================================

pub use crate::{Cache, CacheConfig, CacheStats, Lookup, QueryResult, RefreshConfig};

// ============================================================================
// Queries and Records
// ============================================================================

pub use crate::{QueryKey, RData, RecordType, Resolve, ResourceRecord, Response};

// ============================================================================
// Errors
// ============================================================================

pub use crate::{CacheError, ResolveError};

// ============================================================================
// Node Selection
// ============================================================================

#[cfg(feature = "selection")]
pub use crate::select::{
    Candidate, ColocatedCandidateList, DiameterApplication, DiameterProtocol, DiameterSelector, NodeIdentity,
    NodeSelector, PlmnId, Protocol, SelectError, Selection, Tac,
};

// ============================================================================
// Networking
// ============================================================================

#[cfg(feature = "networking")]
pub use crate::net::{HickoryResolver, ResolverConfig};
