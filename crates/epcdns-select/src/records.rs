//! Typed access to the cached records selection works from.

use std::net::{Ipv4Addr, Ipv6Addr};

use epcdns_core::{Cache, CacheError, RData, RecordType, ResolveError};

/// The fields of a NAPTR record selection cares about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Naptr {
    pub order: u16,
    pub preference: u16,
    /// Lowercased.
    pub flags: String,
    pub service: String,
    /// Normalized; empty for the root domain.
    pub replacement: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Srv {
    pub priority: u16,
    pub weight: u16,
    pub port: u16,
    /// Normalized; empty for the root domain.
    pub target: String,
}

/// Lowercase a host name and drop its trailing dot.
pub(crate) fn normalize(name: &str) -> String {
    name.trim().trim_end_matches('.').to_ascii_lowercase()
}

/// Answer records of `record_type` for `domain`.
///
/// A name that does not exist yields no records rather than an error.
fn answers(cache: &Cache, record_type: RecordType, domain: &str) -> Result<Vec<RData>, CacheError> {
    match cache.query(record_type, domain, false) {
        Ok(lookup) => Ok(lookup
            .answers()
            .iter()
            .filter(|r| r.record_type() == record_type)
            .map(|r| r.data.clone())
            .collect()),
        Err(err) if err.resolve_error() == Some(&ResolveError::NxDomain) => Ok(Vec::new()),
        Err(err) => Err(err),
    }
}

pub(crate) fn naptr(cache: &Cache, domain: &str) -> Result<Vec<Naptr>, CacheError> {
    Ok(answers(cache, RecordType::Naptr, domain)?
        .into_iter()
        .filter_map(|data| match data {
            RData::Naptr {
                order,
                preference,
                flags,
                service,
                replacement,
                ..
            } => Some(Naptr {
                order,
                preference,
                flags: flags.to_ascii_lowercase(),
                service,
                replacement: normalize(&replacement),
            }),
            _ => None,
        })
        .collect())
}

pub(crate) fn srv(cache: &Cache, domain: &str) -> Result<Vec<Srv>, CacheError> {
    Ok(answers(cache, RecordType::Srv, domain)?
        .into_iter()
        .filter_map(|data| match data {
            RData::Srv {
                priority,
                weight,
                port,
                target,
            } => Some(Srv {
                priority,
                weight,
                port,
                target: normalize(&target),
            }),
            _ => None,
        })
        .collect())
}

/// IPv4 and IPv6 addresses of `host`, sorted and de-duplicated.
///
/// A failed lookup contributes nothing and is reported to `on_error`.
pub(crate) fn addresses<F>(cache: &Cache, host: &str, mut on_error: F) -> (Vec<Ipv4Addr>, Vec<Ipv6Addr>)
where
    F: FnMut(RecordType, CacheError),
{
    let mut ipv4 = Vec::new();
    let mut ipv6 = Vec::new();

    match answers(cache, RecordType::A, host) {
        Ok(records) => ipv4.extend(records.into_iter().filter_map(|d| match d {
            RData::A(addr) => Some(addr),
            _ => None,
        })),
        Err(err) => on_error(RecordType::A, err),
    }
    match answers(cache, RecordType::Aaaa, host) {
        Ok(records) => ipv6.extend(records.into_iter().filter_map(|d| match d {
            RData::Aaaa(addr) => Some(addr),
            _ => None,
        })),
        Err(err) => on_error(RecordType::Aaaa, err),
    }

    ipv4.sort();
    ipv4.dedup();
    ipv6.sort();
    ipv6.dedup();
    (ipv4, ipv6)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize() {
        assert_eq!(normalize(" PGW1.Example.NET. "), "pgw1.example.net");
        assert_eq!(normalize("."), "");
    }
}
