//! PGW selection against a static zone.
//!
//! Run with: RUST_LOG=debug cargo run -p epcdns --example select_pgw

use std::collections::HashMap;
use std::net::Ipv4Addr;

use epcdns::prelude::*;

fn zone(plmn: &PlmnId) -> HashMap<QueryKey, Vec<ResourceRecord>> {
    let apn = plmn.apn_fqdn("internet");
    let naptr = |order, preference, host: &str| {
        ResourceRecord::new(
            apn.as_str(),
            300,
            RData::Naptr {
                order,
                preference,
                flags: "a".into(),
                service: "x-3gpp-pgw:x-s5-gtp:x-s8-gtp".into(),
                regexp: String::new(),
                replacement: host.into(),
            },
        )
    };

    let mut zone = HashMap::new();
    zone.insert(
        QueryKey::new(RecordType::Naptr, &apn).expect("valid name"),
        vec![
            naptr(100, 50, "topoff.s5.pgw2.east.example.net"),
            naptr(100, 10, "topoff.s5.pgw1.west.example.net"),
        ],
    );
    for (host, last) in [("topoff.s5.pgw1.west.example.net", 1), ("topoff.s5.pgw2.east.example.net", 2)] {
        zone.insert(
            QueryKey::new(RecordType::A, host).expect("valid name"),
            vec![ResourceRecord::new(host, 300, RData::A(Ipv4Addr::new(192, 0, 2, last)))],
        );
    }
    zone
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let plmn = PlmnId::new("001", "01")?;
    let zone = zone(&plmn);
    let cache = Cache::new(
        move |key: &QueryKey| -> std::result::Result<Response, ResolveError> {
            zone.get(key)
                .map(|records| Response::with_answers(records.clone()))
                .ok_or(ResolveError::NxDomain)
        },
        CacheConfig::default(),
    )?;

    let selection = NodeSelector::new(&cache, NodeIdentity::Pgw { plmn, apn: "internet".into() })
        .protocol(Protocol::S5Gtp)?
        .select()?;

    for candidate in selection.candidates() {
        println!("{candidate} -> {:?}", candidate.ipv4());
    }
    println!("{:?}", cache.stats());

    cache.shutdown();
    Ok(())
}
