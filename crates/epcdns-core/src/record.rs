//! Typed DNS resource records.
//!
//! Wire encoding is the resolver primitive's business. The cache and the
//! node selector only ever see these already-parsed values.

use std::fmt;
use std::net::{Ipv4Addr, Ipv6Addr};
use std::str::FromStr;

/// Record types the cache knows how to store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u16)]
pub enum RecordType {
    /// IPv4 host address.
    A = 1,
    /// Authoritative name server.
    Ns = 2,
    /// Canonical name for an alias.
    Cname = 5,
    /// IPv6 host address.
    Aaaa = 28,
    /// Service locator.
    Srv = 33,
    /// Naming authority pointer.
    Naptr = 35,
}

impl RecordType {
    /// All supported record types.
    pub const ALL: [RecordType; 6] = [
        RecordType::A,
        RecordType::Ns,
        RecordType::Cname,
        RecordType::Aaaa,
        RecordType::Srv,
        RecordType::Naptr,
    ];

    /// The numeric type code.
    pub fn code(self) -> u16 {
        self as u16
    }

    /// Look up a record type by its numeric code.
    pub fn from_code(code: u16) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.code() == code)
    }

    /// The mnemonic used in zone files and in the refresh list.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::A => "A",
            Self::Ns => "NS",
            Self::Cname => "CNAME",
            Self::Aaaa => "AAAA",
            Self::Srv => "SRV",
            Self::Naptr => "NAPTR",
        }
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a record type string is not recognized.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown record type: {0}")]
pub struct UnknownRecordType(pub String);

impl FromStr for RecordType {
    type Err = UnknownRecordType;

    /// Accepts the mnemonic in any case, or the numeric type code.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if let Ok(code) = trimmed.parse::<u16>() {
            return Self::from_code(code).ok_or_else(|| UnknownRecordType(s.to_string()));
        }
        Self::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| UnknownRecordType(s.to_string()))
    }
}

/// Record payload.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RData {
    /// IPv4 address.
    A(Ipv4Addr),
    /// IPv6 address.
    Aaaa(Ipv6Addr),
    /// Name server host.
    Ns(String),
    /// Alias target.
    Cname(String),
    /// Service location.
    Srv {
        /// Lower values are tried first.
        priority: u16,
        /// Relative weight among equal priorities.
        weight: u16,
        /// Service port.
        port: u16,
        /// Target host.
        target: String,
    },
    /// Naming authority pointer.
    Naptr {
        /// Processing order, lowest first.
        order: u16,
        /// Preference among equal orders, lowest first.
        preference: u16,
        /// Flags such as `a` or `s`.
        flags: String,
        /// Service parameters.
        service: String,
        /// Substitution expression.
        regexp: String,
        /// Next domain name to query.
        replacement: String,
    },
}

impl RData {
    /// The record type this payload belongs to.
    pub fn record_type(&self) -> RecordType {
        match self {
            Self::A(_) => RecordType::A,
            Self::Aaaa(_) => RecordType::Aaaa,
            Self::Ns(_) => RecordType::Ns,
            Self::Cname(_) => RecordType::Cname,
            Self::Srv { .. } => RecordType::Srv,
            Self::Naptr { .. } => RecordType::Naptr,
        }
    }
}

/// A single resource record.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceRecord {
    /// Owner name.
    pub name: String,
    /// Time to live in seconds. Zero means "do not use for expiry".
    pub ttl: u32,
    /// Payload.
    pub data: RData,
}

impl ResourceRecord {
    /// Create a record.
    pub fn new(name: impl Into<String>, ttl: u32, data: RData) -> Self {
        Self {
            name: name.into(),
            ttl,
            data,
        }
    }

    /// The record's type.
    pub fn record_type(&self) -> RecordType {
        self.data.record_type()
    }
}

/// The sections of one resolver response.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Response {
    /// Answer section.
    pub answers: Vec<ResourceRecord>,
    /// Authority section.
    pub authorities: Vec<ResourceRecord>,
    /// Additional section.
    pub additional: Vec<ResourceRecord>,
}

impl Response {
    /// A response carrying only answers.
    pub fn with_answers(answers: Vec<ResourceRecord>) -> Self {
        Self {
            answers,
            ..Default::default()
        }
    }

    /// Iterate over every record in every section.
    pub fn records(&self) -> impl Iterator<Item = &ResourceRecord> {
        self.answers
            .iter()
            .chain(self.authorities.iter())
            .chain(self.additional.iter())
    }

    /// The smallest non-zero TTL across all sections.
    ///
    /// Zero TTLs never shorten an answer's lifetime. Returns `None` when no
    /// record carries a TTL.
    pub fn min_ttl(&self) -> Option<u32> {
        self.records().map(|r| r.ttl).filter(|&ttl| ttl != 0).min()
    }

    /// True when the answer section is empty.
    pub fn is_empty(&self) -> bool {
        self.answers.is_empty()
    }
}
