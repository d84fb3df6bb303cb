//! An in-memory zone standing in for DNS.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::net::{Ipv4Addr, Ipv6Addr};
use std::sync::Arc;

use epcdns_core::{Cache, CacheConfig, QueryKey, RData, RecordType, Resolve, ResolveError, ResourceRecord, Response};
use parking_lot::Mutex;

#[derive(Default)]
pub struct Zone {
    records: Mutex<HashMap<QueryKey, Vec<ResourceRecord>>>,
    failing: Mutex<HashSet<QueryKey>>,
}

impl Zone {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn add(&self, record_type: RecordType, domain: &str, data: RData) {
        let key = QueryKey::new(record_type, domain).unwrap();
        self.records
            .lock()
            .entry(key)
            .or_default()
            .push(ResourceRecord::new(domain, 300, data));
    }

    pub fn naptr(&self, domain: &str, order: u16, preference: u16, flags: &str, service: &str, replacement: &str) {
        self.add(
            RecordType::Naptr,
            domain,
            RData::Naptr {
                order,
                preference,
                flags: flags.into(),
                service: service.into(),
                regexp: String::new(),
                replacement: replacement.into(),
            },
        );
    }

    pub fn srv(&self, domain: &str, priority: u16, weight: u16, port: u16, target: &str) {
        self.add(
            RecordType::Srv,
            domain,
            RData::Srv {
                priority,
                weight,
                port,
                target: target.into(),
            },
        );
    }

    pub fn a(&self, host: &str, addr: Ipv4Addr) {
        self.add(RecordType::A, host, RData::A(addr));
    }

    pub fn aaaa(&self, host: &str, addr: Ipv6Addr) {
        self.add(RecordType::Aaaa, host, RData::Aaaa(addr));
    }

    /// Make lookups of this key fail with `ServFail`.
    pub fn servfail(&self, record_type: RecordType, domain: &str) {
        self.failing.lock().insert(QueryKey::new(record_type, domain).unwrap());
    }

    pub fn cache(self: &Arc<Self>) -> Cache {
        Cache::with_resolver(self.clone(), CacheConfig::default()).unwrap()
    }
}

impl Resolve for Zone {
    fn resolve(&self, key: &QueryKey) -> Result<Response, ResolveError> {
        if self.failing.lock().contains(key) {
            return Err(ResolveError::ServFail);
        }
        match self.records.lock().get(key) {
            Some(records) => Ok(Response::with_answers(records.clone())),
            None => Err(ResolveError::NxDomain),
        }
    }
}
