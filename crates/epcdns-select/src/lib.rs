//! 3GPP node selection for EPC DNS.
//!
//! This crate answers "which host should I talk to?" for EPC nodes, on top
//! of the [`epcdns_core::Cache`]:
//!
//! - **Naming**: TS 23.003 domain names built from a [`PlmnId`]
//! - **Node identities**: MME, PGW, SGW and UPF variants with their legal
//!   protocols
//! - **Node selection**: S-NAPTR resolution, filtering and deterministic
//!   ranking into [`ColocatedCandidateGroup`]s
//! - **Colocation**: pairing two selections, preferring shared nodes
//! - **Diameter**: peer discovery within a realm
//!
//! # Example
//!
//! ```ignore
//! use epcdns_select::{NodeIdentity, NodeSelector, PlmnId, Protocol};
//!
//! let plmn = PlmnId::new("310", "14")?;
//! let selection = NodeSelector::new(&cache, NodeIdentity::Pgw { plmn, apn: "internet".into() })
//!     .protocol(Protocol::S5Gtp)?
//!     .select()?;
//!
//! for group in selection.groups() {
//!     println!("{}: {} hosts", group.node_name(), group.candidates().len());
//! }
//! ```

mod canonical;
mod colocation;
pub mod diameter;
mod error;
pub mod fqdn;
pub mod logging;
mod node;
mod plmn;
mod records;
mod selector;
pub mod service;

pub use canonical::CanonicalName;
pub use colocation::{ColocatedCandidate, ColocatedCandidateList, PairType};
pub use diameter::{
    DiameterApplication, DiameterHost, DiameterNaptr, DiameterProtocol, DiameterSelector, DiameterSrv,
    DiameterTarget,
};
pub use error::{CandidateParseError, Result, SelectError};
pub use node::{NodeIdentity, NodeKind, Tac};
pub use plmn::PlmnId;
pub use selector::{Candidate, ColocatedCandidateGroup, DEFAULT_MAX_DEPTH, NodeSelector, Selection};
pub use service::{AppProtocol, AppService, Protocol, ServiceParameters};
