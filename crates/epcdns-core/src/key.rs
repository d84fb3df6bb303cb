//! Canonical identity of a cached query.

use std::fmt;

use crate::error::{CacheError, Result};
use crate::record::RecordType;

const MAX_NAME_LEN: usize = 253;
const MAX_LABEL_LEN: usize = 63;

/// A `(record type, domain)` pair in normalized form.
///
/// The domain is ASCII-lowercased, trimmed, and stripped of trailing dots, so
/// `NODE1.Example.` and `node1.example` identify the same cache entry.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct QueryKey {
    record_type: RecordType,
    domain: String,
}

impl QueryKey {
    /// Build a key, normalizing and validating the domain.
    pub fn new(record_type: RecordType, domain: &str) -> Result<Self> {
        let domain = normalize_domain(domain)?;
        Ok(Self {
            record_type,
            domain,
        })
    }

    /// Parse a `<record-type> <domain>` line as written to the refresh list.
    pub fn parse_line(line: &str) -> Result<Self> {
        let mut parts = line.split_whitespace();
        let (Some(rtype), Some(domain), None) = (parts.next(), parts.next(), parts.next()) else {
            return Err(CacheError::InvalidKey(format!(
                "expected '<type> <domain>', got '{line}'"
            )));
        };
        let record_type = rtype
            .parse::<RecordType>()
            .map_err(|e| CacheError::InvalidKey(e.to_string()))?;
        Self::new(record_type, domain)
    }

    /// The record type.
    pub fn record_type(&self) -> RecordType {
        self.record_type
    }

    /// The normalized domain.
    pub fn domain(&self) -> &str {
        &self.domain
    }
}

impl fmt::Display for QueryKey {
    /// Formats as `<record-type> <domain>`, the refresh-list line format.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.record_type, self.domain)
    }
}

fn normalize_domain(domain: &str) -> Result<String> {
    let trimmed = domain.trim().trim_end_matches('.');
    if trimmed.is_empty() {
        return Err(CacheError::InvalidKey(format!("empty domain '{domain}'")));
    }
    if trimmed.len() > MAX_NAME_LEN {
        return Err(CacheError::InvalidKey(format!(
            "domain exceeds {MAX_NAME_LEN} octets"
        )));
    }
    if trimmed.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return Err(CacheError::InvalidKey(format!(
            "domain '{trimmed}' contains whitespace"
        )));
    }
    for label in trimmed.split('.') {
        if label.is_empty() {
            return Err(CacheError::InvalidKey(format!(
                "domain '{trimmed}' contains an empty label"
            )));
        }
        if label.len() > MAX_LABEL_LEN {
            return Err(CacheError::InvalidKey(format!(
                "label '{label}' exceeds {MAX_LABEL_LEN} octets"
            )));
        }
    }
    Ok(trimmed.to_ascii_lowercase())
}
