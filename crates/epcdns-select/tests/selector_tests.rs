//! Integration tests for S-NAPTR node selection against an in-memory zone.

mod common;

use std::net::{Ipv4Addr, Ipv6Addr};

use common::Zone;
use epcdns_core::{RecordType, ResolveError};
use epcdns_select::{
    Candidate, ColocatedCandidateList, NodeIdentity, NodeSelector, PairType, PlmnId, Protocol, SelectError,
    Selection, Tac,
};

const APN_DOMAIN: &str = "internet.apn.epc.mnc001.mcc001.3gppnetwork.org";

fn plmn() -> PlmnId {
    PlmnId::new("001", "01").unwrap()
}

fn pgw() -> NodeIdentity {
    NodeIdentity::Pgw {
        plmn: plmn(),
        apn: "internet".into(),
    }
}

fn hosts(selection: &Selection) -> Vec<&str> {
    selection.candidates().map(Candidate::host).collect()
}

#[test]
fn test_pgw_selection_filters_and_orders() {
    let zone = Zone::new();
    zone.naptr(APN_DOMAIN, 100, 999, "a", "x-3gpp-pgw:x-s5-gtp:x-s8-gtp", "topoff.s5.pgw1.west.example.net");
    zone.naptr(APN_DOMAIN, 100, 100, "a", "x-3gpp-pgw:x-s5-gtp", "topoff.s5.pgw2.east.example.net");
    zone.naptr(APN_DOMAIN, 50, 10, "a", "x-3gpp-pgw:x-s8-gtp", "topoff.s8.pgw3.example.net");
    zone.naptr(APN_DOMAIN, 10, 10, "a", "x-3gpp-sgw:x-s5-gtp", "sgw1.example.net");
    zone.a("topoff.s5.pgw1.west.example.net", Ipv4Addr::new(10, 0, 0, 1));
    zone.a("topoff.s5.pgw2.east.example.net", Ipv4Addr::new(10, 0, 0, 2));
    zone.aaaa("topoff.s5.pgw2.east.example.net", Ipv6Addr::LOCALHOST);

    let cache = zone.cache();
    let selection = NodeSelector::new(&cache, pgw())
        .protocol(Protocol::S5Gtp)
        .unwrap()
        .select()
        .unwrap();

    assert_eq!(selection.domain(), APN_DOMAIN);
    assert_eq!(
        hosts(&selection),
        vec!["topoff.s5.pgw2.east.example.net", "topoff.s5.pgw1.west.example.net"]
    );

    let best = selection.first().unwrap();
    assert_eq!(best.order(), 100);
    assert_eq!(best.preference(), 100);
    assert_eq!(best.ipv4(), &[Ipv4Addr::new(10, 0, 0, 2)]);
    assert_eq!(best.ipv6(), &[Ipv6Addr::LOCALHOST]);
    assert!(best.supports(Protocol::S5Gtp));
    assert_eq!(best.canonical_name().node_name(), "pgw2.east.example.net");
}

#[test]
fn test_reshuffled_records_give_identical_output() {
    let records = [
        (20, 10, "topon.s5.pgw1.west.example.net"),
        (10, 10, "topon.s5.pgw2.west.example.net"),
        (10, 10, "topon.s8.pgw2.west.example.net"),
        (10, 10, "pgw9.example.net"),
        (10, 20, "pgw4.example.net"),
        (10, 10, "pgw5.example.net"),
    ];

    let select = |order: &[usize]| {
        let zone = Zone::new();
        for &i in order {
            let (o, p, host) = records[i];
            zone.naptr(APN_DOMAIN, o, p, "a", "x-3gpp-pgw:x-s5-gtp", host);
            zone.a(host, Ipv4Addr::new(10, 0, 0, i as u8));
        }
        NodeSelector::new(&zone.cache(), pgw()).select().unwrap()
    };

    let baseline = select(&[0, 1, 2, 3, 4, 5]);
    assert_eq!(baseline.len(), 6);
    for order in [[5, 4, 3, 2, 1, 0], [2, 0, 5, 1, 3, 4], [3, 5, 1, 4, 0, 2]] {
        assert_eq!(select(&order), baseline);
    }

    let groups = baseline.groups();
    assert_eq!(groups.len(), 5);
    assert_eq!(groups[0].node_name(), "pgw5.example.net");
    assert_eq!(groups[1].node_name(), "pgw9.example.net");
    assert_eq!(groups[2].node_name(), "pgw2.west.example.net");
    assert_eq!(groups[2].candidates().len(), 2);
    assert_eq!(groups[3].node_name(), "pgw4.example.net");
    assert_eq!(groups[4].node_name(), "pgw1.west.example.net");
}

#[test]
fn test_equal_priority_decided_by_canonical_name() {
    let zone = Zone::new();
    for host in ["b.site.example", "a.site.example", "topon.s5.a.other.example"] {
        zone.naptr(APN_DOMAIN, 10, 10, "a", "x-3gpp-pgw:x-s5-gtp", host);
    }
    let selection = NodeSelector::new(&zone.cache(), pgw()).select().unwrap();

    assert_eq!(
        hosts(&selection),
        vec!["topon.s5.a.other.example", "a.site.example", "b.site.example"]
    );
}

#[test]
fn test_no_records_is_empty_not_error() {
    let zone = Zone::new();
    let selection = NodeSelector::new(&zone.cache(), pgw()).select().unwrap();
    assert!(selection.is_empty());
    assert_eq!(selection.len(), 0);
}

#[test]
fn test_unusable_records_are_skipped() {
    let zone = Zone::new();
    zone.naptr(APN_DOMAIN, 10, 10, "u", "x-3gpp-pgw:x-s5-gtp", "pgw1.example.net");
    zone.naptr(APN_DOMAIN, 10, 10, "a", "", "pgw2.example.net");
    zone.naptr(APN_DOMAIN, 10, 10, "a", "x-3gpp-pgw:x-s5-gtp", ".");
    zone.naptr(APN_DOMAIN, 20, 10, "a", "x-3gpp-pgw:x-s5-gtp", "pgw3.example.net");

    let selection = NodeSelector::new(&zone.cache(), pgw()).select().unwrap();
    assert_eq!(hosts(&selection), vec!["pgw3.example.net"]);
}

#[test]
fn test_unsupported_protocol_rejected() {
    let zone = Zone::new();
    let cache = zone.cache();
    let err = NodeSelector::new(&cache, pgw()).protocol(Protocol::S11).unwrap_err();
    assert!(matches!(
        err,
        SelectError::UnsupportedProtocol {
            protocol: Protocol::S11,
            ..
        }
    ));
}

#[test]
fn test_srv_records_become_candidates() {
    let plmn = plmn();
    let identity = NodeIdentity::SgwTai {
        plmn: plmn.clone(),
        tac: Tac::from_u16(0x0102),
    };
    let domain = plmn.tai_fqdn_bytes(0x02, 0x01);

    let zone = Zone::new();
    zone.naptr(&domain, 10, 10, "s", "x-3gpp-sgw:x-s11", "_gtp._udp.sgw.example.net");
    zone.srv("_gtp._udp.sgw.example.net", 1, 10, 2123, "sgw-a.example.net");
    zone.srv("_gtp._udp.sgw.example.net", 1, 90, 2123, "sgw-b.example.net");
    zone.srv("_gtp._udp.sgw.example.net", 0, 5, 2124, "sgw-c.example.net");
    zone.srv("_gtp._udp.sgw.example.net", 0, 5, 2124, ".");
    zone.a("sgw-b.example.net", Ipv4Addr::new(192, 0, 2, 2));

    let selection = NodeSelector::new(&zone.cache(), identity)
        .protocol(Protocol::S11)
        .unwrap()
        .select()
        .unwrap();

    let ports: Vec<_> = selection.candidates().map(|c| (c.host(), c.port())).collect();
    assert_eq!(ports.len(), 3);
    assert!(ports.contains(&("sgw-b.example.net", Some(2123))));

    let b = selection.candidates().find(|c| c.host() == "sgw-b.example.net").unwrap();
    assert_eq!(b.weight(), 90);
    assert_eq!(b.ipv4(), &[Ipv4Addr::new(192, 0, 2, 2)]);
}

#[test]
fn test_non_terminal_records_followed_to_depth_limit() {
    let zone = Zone::new();
    zone.naptr(APN_DOMAIN, 10, 10, "", "", "next.example.net");
    zone.naptr("next.example.net", 30, 10, "a", "x-3gpp-pgw:x-s5-gtp", "pgw1.example.net");
    // A self-referencing chain must terminate.
    zone.naptr("next.example.net", 40, 10, "", "", "next.example.net");

    let cache = zone.cache();
    let selection = NodeSelector::new(&cache, pgw()).select().unwrap();
    assert_eq!(hosts(&selection), vec!["pgw1.example.net"]);
    assert_eq!(selection.first().unwrap().order(), 30);

    let shallow = NodeSelector::new(&cache, pgw()).max_depth(0).select().unwrap();
    assert!(shallow.is_empty());
}

#[test]
fn test_converging_chains_expand_each_domain_once() {
    let zone = Zone::new();
    zone.naptr(APN_DOMAIN, 10, 10, "", "", "x1.example.net");
    zone.naptr(APN_DOMAIN, 20, 10, "", "", "x2.example.net");
    for x in ["x1.example.net", "x2.example.net"] {
        zone.naptr(x, 10, 10, "", "", "y1.example.net");
        zone.naptr(x, 20, 10, "", "", "y2.example.net");
    }
    for y in ["y1.example.net", "y2.example.net"] {
        zone.naptr(y, 10, 10, "", "", "z.example.net");
    }
    zone.naptr("z.example.net", 50, 10, "a", "x-3gpp-pgw:x-s5-gtp", "pgw1.example.net");
    zone.a("pgw1.example.net", Ipv4Addr::new(192, 0, 2, 1));

    let cache = zone.cache();
    let selection = NodeSelector::new(&cache, pgw()).select().unwrap();
    assert_eq!(hosts(&selection), vec!["pgw1.example.net"]);

    // Six NAPTR domains plus A and AAAA for the single host.
    let stats = cache.stats();
    assert_eq!(stats.hits + stats.misses, 8);
}

#[test]
fn test_usage_type_and_capability_filters() {
    let zone = Zone::new();
    zone.naptr(APN_DOMAIN, 10, 10, "a", "x-3gpp-pgw:x-s5-gtp+ue-1.2", "pgw1.example.net");
    zone.naptr(APN_DOMAIN, 20, 10, "a", "x-3gpp-pgw:x-s5-gtp+ue-3+nc-nr", "pgw2.example.net");
    zone.naptr(APN_DOMAIN, 30, 10, "a", "x-3gpp-pgw:x-s5-gtp", "pgw3.example.net");
    let cache = zone.cache();

    let by_usage = NodeSelector::new(&cache, pgw()).usage_type(3).select().unwrap();
    assert_eq!(hosts(&by_usage), vec!["pgw2.example.net", "pgw3.example.net"]);

    let by_capability = NodeSelector::new(&cache, pgw())
        .network_capability("NR")
        .select()
        .unwrap();
    assert_eq!(hosts(&by_capability), vec!["pgw2.example.net"]);
}

#[test]
fn test_every_requested_usage_type_must_be_served() {
    let zone = Zone::new();
    zone.naptr(APN_DOMAIN, 10, 10, "a", "x-3gpp-pgw:x-s5-gtp+ue-1.2", "pgw1.example.net");
    zone.naptr(APN_DOMAIN, 20, 10, "a", "x-3gpp-pgw:x-s5-gtp+ue-1.2.3+nc-nr", "pgw2.example.net");
    zone.naptr(APN_DOMAIN, 30, 10, "a", "x-3gpp-pgw:x-s5-gtp+nc-nr.smf", "pgw3.example.net");
    let cache = zone.cache();

    // pgw1 lists 1 but not 3.
    let both = NodeSelector::new(&cache, pgw()).usage_type(1).usage_type(3).select().unwrap();
    assert_eq!(hosts(&both), vec!["pgw2.example.net", "pgw3.example.net"]);

    let listed = NodeSelector::new(&cache, pgw()).usage_type(1).usage_type(2).select().unwrap();
    assert_eq!(hosts(&listed), vec!["pgw1.example.net", "pgw2.example.net", "pgw3.example.net"]);

    // pgw2 offers nr but not smf.
    let capabilities = NodeSelector::new(&cache, pgw())
        .network_capability("nr")
        .network_capability("smf")
        .select()
        .unwrap();
    assert_eq!(hosts(&capabilities), vec!["pgw3.example.net"]);
}

#[test]
fn test_top_level_failure_is_error() {
    let zone = Zone::new();
    zone.servfail(RecordType::Naptr, APN_DOMAIN);

    let err = NodeSelector::new(&zone.cache(), pgw()).select().unwrap_err();
    match err {
        SelectError::Cache(err) => assert_eq!(err.resolve_error(), Some(&ResolveError::ServFail)),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_colocated_sgw_and_pgw() {
    let plmn = plmn();
    let tai = plmn.tai_fqdn_bytes(0x02, 0x01);

    let zone = Zone::new();
    zone.naptr(&tai, 10, 10, "a", "x-3gpp-sgw:x-s5-gtp", "topon.s5.gw2.west.example.net");
    zone.naptr(&tai, 20, 10, "a", "x-3gpp-sgw:x-s5-gtp", "topon.s5.gw1.west.example.net");
    zone.naptr(APN_DOMAIN, 10, 10, "a", "x-3gpp-pgw:x-s5-gtp", "topon.s5.gw3.west.example.net");
    zone.naptr(APN_DOMAIN, 20, 10, "a", "x-3gpp-pgw:x-s5-gtp", "topon.s5.gw1.west.example.net");
    let cache = zone.cache();

    let sgws = NodeSelector::new(
        &cache,
        NodeIdentity::SgwTai {
            plmn: plmn.clone(),
            tac: Tac::new(0x02, 0x01),
        },
    )
    .select()
    .unwrap();
    let pgws = NodeSelector::new(&cache, pgw()).select().unwrap();

    let pairs = ColocatedCandidateList::new(sgws.candidates(), pgws.candidates());
    assert_eq!(pairs.len(), 4);
    let best = pairs.first().unwrap();
    assert_eq!(best.pair_type(), PairType::Colocated);
    assert_eq!(best.first().canonical_name().node_name(), "gw1.west.example.net");
}
