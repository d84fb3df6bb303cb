//! The resolver primitive backed by hickory-resolver.

use std::fmt;
use std::time::{Duration, Instant};

use epcdns_core::{QueryKey, RData, RecordType, Resolve, ResolveError, ResourceRecord, Response};
use hickory_resolver::config::{NameServerConfig, ResolveHosts, ResolverConfig as HickoryConfig, ResolverOpts};
use hickory_resolver::name_server::TokioConnectionProvider;
use hickory_resolver::proto::rr::{RData as HickoryRData, Record, RecordType as HickoryRecordType};
use hickory_resolver::proto::xfer::Protocol;
use hickory_resolver::{Resolver, TokioResolver};
use tokio::runtime::{self, Runtime};

use crate::config::ResolverConfig;
use crate::error::{NetworkError, Result};

const LOG_TARGET: &str = "epcdns_net::resolver";

/// A blocking [`Resolve`] implementation over hickory-resolver.
///
/// Lookups run on a private tokio runtime, so the resolver can be called
/// from the cache's plain worker threads. Each lookup is bounded by the
/// configured attempts times the per-attempt timeout.
///
/// # Example
///
/// ```ignore
/// use epcdns_core::{Cache, CacheConfig};
/// use epcdns_net::{HickoryResolver, ResolverConfig};
///
/// let resolver = HickoryResolver::new(ResolverConfig::system())?;
/// let cache = Cache::new(resolver, CacheConfig::default())?;
/// ```
pub struct HickoryResolver {
    resolver: TokioResolver,
    runtime: Runtime,
    query_timeout: Duration,
}

impl HickoryResolver {
    /// Create a resolver with the given configuration.
    pub fn new(config: ResolverConfig) -> Result<Self> {
        let (resolver_config, resolver_opts) = build_resolver_config(&config)?;

        let runtime = runtime::Builder::new_multi_thread()
            .worker_threads(config.runtime_threads.max(1))
            .thread_name("epcdns-net")
            .enable_all()
            .build()
            .map_err(NetworkError::Runtime)?;

        let resolver = Resolver::builder_with_config(resolver_config, TokioConnectionProvider::default())
            .with_options(resolver_opts)
            .build();

        tracing::info!(
            target: LOG_TARGET,
            system = config.use_system_config,
            nameservers = config.nameservers.len(),
            attempts = config.attempts,
            timeout_ms = config.timeout.as_millis() as u64,
            "DNS resolver ready"
        );

        Ok(Self {
            resolver,
            runtime,
            query_timeout: config.query_timeout(),
        })
    }

    /// Create a resolver using system DNS settings.
    pub fn system() -> Result<Self> {
        Self::new(ResolverConfig::system())
    }

    /// Bound applied to one lookup.
    pub fn query_timeout(&self) -> Duration {
        self.query_timeout
    }

    /// Drop everything the underlying client has cached.
    pub fn clear_cache(&self) {
        self.resolver.clear_cache();
    }
}

impl Resolve for HickoryResolver {
    fn resolve(&self, key: &QueryKey) -> std::result::Result<Response, ResolveError> {
        let started = Instant::now();
        let record_type = to_hickory(key.record_type());
        let name = format!("{}.", key.domain());

        let result = self.runtime.block_on(async {
            tokio::time::timeout(self.query_timeout, self.resolver.lookup(name.as_str(), record_type)).await
        });

        let outcome = match result {
            Err(_) => Err(ResolveError::Timeout),
            Ok(Ok(lookup)) => Ok(convert_records(record_type, lookup.records())),
            Ok(Err(err)) if err.is_nx_domain() => Err(ResolveError::NxDomain),
            // NOERROR without data, or a server that answered without
            // records: an empty response.
            Ok(Err(err)) if err.is_no_records_found() => Ok(Response::default()),
            Ok(Err(err)) => Err(ResolveError::Network(err.to_string())),
        };

        tracing::debug!(
            target: LOG_TARGET,
            key = %key,
            ok = outcome.is_ok(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "lookup finished"
        );
        outcome
    }
}

impl fmt::Debug for HickoryResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HickoryResolver")
            .field("query_timeout", &self.query_timeout)
            .finish_non_exhaustive()
    }
}

/// Build hickory resolver configuration from our ResolverConfig.
fn build_resolver_config(config: &ResolverConfig) -> Result<(HickoryConfig, ResolverOpts)> {
    let (resolver_config, mut opts) = if config.use_system_config {
        hickory_resolver::system_conf::read_system_conf()
            .map_err(|e| NetworkError::SystemConfig(e.to_string()))?
    } else if config.nameservers.is_empty() {
        return Err(NetworkError::NoNameservers);
    } else {
        let mut resolver_config = HickoryConfig::new();
        for addr in &config.nameservers {
            resolver_config.add_name_server(NameServerConfig::new(*addr, Protocol::Udp));
            resolver_config.add_name_server(NameServerConfig::new(*addr, Protocol::Tcp));
        }
        (resolver_config, ResolverOpts::default())
    };

    opts.cache_size = config.cache_size;
    opts.use_hosts_file = if config.use_hosts_file {
        ResolveHosts::Auto
    } else {
        ResolveHosts::Never
    };
    opts.attempts = config.attempts.max(1);
    opts.timeout = config.timeout;

    Ok((resolver_config, opts))
}

fn to_hickory(record_type: RecordType) -> HickoryRecordType {
    match record_type {
        RecordType::A => HickoryRecordType::A,
        RecordType::Aaaa => HickoryRecordType::AAAA,
        RecordType::Ns => HickoryRecordType::NS,
        RecordType::Cname => HickoryRecordType::CNAME,
        RecordType::Srv => HickoryRecordType::SRV,
        RecordType::Naptr => HickoryRecordType::NAPTR,
    }
}

fn host_name(name: &hickory_resolver::proto::rr::Name) -> String {
    name.to_utf8().trim_end_matches('.').to_owned()
}

fn text(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

/// Convert one record; types the cache does not model are dropped.
fn convert_record(record: &Record) -> Option<ResourceRecord> {
    let data = match record.data() {
        HickoryRData::A(a) => RData::A(a.0),
        HickoryRData::AAAA(aaaa) => RData::Aaaa(aaaa.0),
        HickoryRData::NS(ns) => RData::Ns(host_name(&ns.0)),
        HickoryRData::CNAME(cname) => RData::Cname(host_name(&cname.0)),
        HickoryRData::SRV(srv) => RData::Srv {
            priority: srv.priority(),
            weight: srv.weight(),
            port: srv.port(),
            target: host_name(srv.target()),
        },
        HickoryRData::NAPTR(naptr) => RData::Naptr {
            order: naptr.order(),
            preference: naptr.preference(),
            flags: text(naptr.flags()),
            service: text(naptr.services()),
            regexp: text(naptr.regexp()),
            replacement: host_name(naptr.replacement()),
        },
        _ => return None,
    };
    Some(ResourceRecord::new(host_name(record.name()), record.ttl(), data))
}

/// Records of the queried type become answers, anything else (CNAME
/// chains, glue) goes to the additional section.
fn convert_records<'a, I>(queried: HickoryRecordType, records: I) -> Response
where
    I: IntoIterator<Item = &'a Record>,
{
    let mut response = Response::default();
    for record in records {
        let Some(converted) = convert_record(record) else {
            continue;
        };
        if record.record_type() == queried {
            response.answers.push(converted);
        } else {
            response.additional.push(converted);
        }
    }
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use hickory_resolver::proto::rr::Name;
    use hickory_resolver::proto::rr::rdata::{A, CNAME, SRV};

    fn name(s: &str) -> Name {
        Name::from_ascii(s).unwrap()
    }

    #[test]
    fn test_record_type_mapping() {
        for record_type in RecordType::ALL {
            assert_eq!(u16::from(to_hickory(record_type)), record_type.code());
        }
    }

    #[test]
    fn test_convert_records_splits_sections() {
        let records = vec![
            Record::from_rdata(name("www.example."), 60, HickoryRData::CNAME(CNAME(name("host.example.")))),
            Record::from_rdata(name("host.example."), 300, HickoryRData::A(A::new(192, 0, 2, 1))),
        ];
        let response = convert_records(HickoryRecordType::A, &records);

        assert_eq!(response.answers.len(), 1);
        assert_eq!(response.answers[0].name, "host.example");
        assert_eq!(response.answers[0].ttl, 300);
        assert_eq!(response.answers[0].data, RData::A([192, 0, 2, 1].into()));
        assert_eq!(response.additional.len(), 1);
        assert_eq!(response.additional[0].data, RData::Cname("host.example".into()));
    }

    #[test]
    fn test_convert_srv() {
        let records = vec![Record::from_rdata(
            name("_diameter._sctp.example."),
            120,
            HickoryRData::SRV(SRV::new(10, 60, 3868, name("hss.example."))),
        )];
        let response = convert_records(HickoryRecordType::SRV, &records);
        assert_eq!(
            response.answers[0].data,
            RData::Srv {
                priority: 10,
                weight: 60,
                port: 3868,
                target: "hss.example".into(),
            }
        );
    }

    #[test]
    fn test_custom_config_requires_nameservers() {
        let err = build_resolver_config(&ResolverConfig::with_nameservers(Vec::new())).unwrap_err();
        assert!(matches!(err, NetworkError::NoNameservers));
    }
}
