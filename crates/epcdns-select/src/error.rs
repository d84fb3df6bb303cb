//! Error types for node selection.

use epcdns_core::CacheError;
use thiserror::Error;

use crate::node::NodeKind;
use crate::service::Protocol;

/// Why a single NAPTR or SRV record was not turned into a candidate.
///
/// These never abort a selection: the record is skipped and the reason is
/// logged.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CandidateParseError {
    /// The NAPTR service field was empty or had no service tag.
    #[error("malformed service field '{0}'")]
    MalformedService(String),

    /// The NAPTR flag is not one of `a`, `s` or empty.
    #[error("unsupported NAPTR flag '{0}'")]
    UnsupportedFlag(String),

    /// A terminal record pointed at the root domain.
    #[error("empty replacement for {0}")]
    EmptyReplacement(String),

    /// Non-terminal records nested beyond the configured depth.
    #[error("non-terminal NAPTR chain deeper than {0} at {1}")]
    TooDeep(usize, String),
}

/// The main error type for node selection.
#[derive(Error, Debug)]
pub enum SelectError {
    /// The MCC or MNC is not made of the expected number of digits.
    #[error("invalid PLMN: {0}")]
    InvalidPlmn(String),

    /// The protocol is not legal for the node being selected.
    #[error("{protocol} is not supported by {node}")]
    UnsupportedProtocol {
        /// The node the protocol was requested for.
        node: NodeKind,
        /// The rejected protocol.
        protocol: Protocol,
    },

    /// The top-level NAPTR query failed.
    #[error(transparent)]
    Cache(#[from] CacheError),
}

/// A specialized Result type for node selection.
pub type Result<T> = std::result::Result<T, SelectError>;
