//! EPC DNS - a caching DNS layer and 3GPP node selection for telecom
//! signaling.
//!
//! This is the umbrella crate that re-exports all public APIs. The cache and
//! its refresher live at the root; node selection is under [`select`]
//! (feature `selection`, on by default) and the hickory-backed resolver
//! under [`net`] (feature `networking`).
//!
//! # Example
//!
//! ```no_run
//! use epcdns::prelude::*;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let resolver = |_key: &QueryKey| -> std::result::Result<Response, ResolveError> {
//!         Err(ResolveError::NxDomain)
//!     };
//!     let cache = Cache::new(resolver, CacheConfig::default())?;
//!
//!     let plmn = PlmnId::new("001", "01")?;
//!     let selection = NodeSelector::new(&cache, NodeIdentity::Pgw { plmn, apn: "internet".into() })
//!         .protocol(Protocol::S5Gtp)?
//!         .select()?;
//!     assert!(selection.is_empty());
//!     Ok(())
//! }
//! ```

pub use epcdns_core::*;

pub mod prelude;

/// 3GPP node selection.
#[cfg(feature = "selection")]
pub mod select {
    pub use epcdns_select::*;
}

/// DNS client backed resolver primitive.
#[cfg(feature = "networking")]
pub mod net {
    pub use epcdns_net::*;
}
