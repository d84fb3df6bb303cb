//! S-NAPTR node selection (TS 29.303).
//!
//! [`NodeSelector`] turns a [`NodeIdentity`] into an ordered list of
//! candidate hosts:
//!
//! 1. Build the node's domain and resolve its NAPTR records through the
//!    [`Cache`].
//! 2. Keep records whose service matches the node's application service and
//!    that carry a wanted protocol entry. That entry must list every wanted
//!    usage type (an entry without a `ue-` list serves all of them) and
//!    every wanted network capability.
//! 3. Follow each record: `a` resolves the replacement's addresses, `s`
//!    resolves SRV records and then each target's addresses, an empty flag
//!    re-queries NAPTR on the replacement.
//! 4. Group candidates by canonical node name and sort the groups by order,
//!    preference, then [`CanonicalName`].
//!
//! Records that cannot be used are skipped and logged. A node with no
//! matching records yields an empty [`Selection`], not an error.

use std::cmp::{Ordering, Reverse};
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::net::{Ipv4Addr, Ipv6Addr};
use std::time::Instant;

use epcdns_core::{Cache, CacheError};

use crate::canonical::CanonicalName;
use crate::error::{CandidateParseError, Result, SelectError};
use crate::logging::targets;
use crate::node::NodeIdentity;
use crate::records::{self, Naptr};
use crate::service::{AppProtocol, Protocol, ServiceParameters};

/// Default limit on nested non-terminal NAPTR records.
pub const DEFAULT_MAX_DEPTH: usize = 4;

/// One host that can serve the selected node.
#[derive(Debug, Clone)]
pub struct Candidate {
    name: CanonicalName,
    port: Option<u16>,
    protocols: Vec<AppProtocol>,
    order: u16,
    preference: u16,
    priority: u16,
    weight: u16,
    ipv4: Vec<Ipv4Addr>,
    ipv6: Vec<Ipv6Addr>,
}

impl Candidate {
    /// A candidate for `host` with the given NAPTR order and preference.
    pub fn new(host: &str, order: u16, preference: u16) -> Self {
        Self {
            name: CanonicalName::new(host),
            port: None,
            protocols: Vec::new(),
            order,
            preference,
            priority: 0,
            weight: 0,
            ipv4: Vec::new(),
            ipv6: Vec::new(),
        }
    }

    /// Attach the SRV priority, weight and port the host was found through.
    pub fn with_srv(mut self, priority: u16, weight: u16, port: u16) -> Self {
        self.priority = priority;
        self.weight = weight;
        self.port = Some(port);
        self
    }

    /// Attach the matching protocol entries; they are kept sorted.
    pub fn with_protocols(mut self, protocols: Vec<AppProtocol>) -> Self {
        self.protocols = protocols;
        self.protocols.sort();
        self
    }

    /// Attach resolved addresses, sorted and de-duplicated.
    pub fn with_addresses(mut self, mut ipv4: Vec<Ipv4Addr>, mut ipv6: Vec<Ipv6Addr>) -> Self {
        ipv4.sort();
        ipv4.dedup();
        ipv6.sort();
        ipv6.dedup();
        self.ipv4 = ipv4;
        self.ipv6 = ipv6;
        self
    }

    /// The host name, lowercased without a trailing dot.
    pub fn host(&self) -> &str {
        self.name.raw()
    }

    /// The host as a canonical name, used for grouping and tie-breaks.
    pub fn canonical_name(&self) -> &CanonicalName {
        &self.name
    }

    /// The SRV port, when the host was found through an SRV record.
    pub fn port(&self) -> Option<u16> {
        self.port
    }

    /// Protocols of the NAPTR record that matched the request.
    pub fn protocols(&self) -> &[AppProtocol] {
        &self.protocols
    }

    /// NAPTR order of the record that led here.
    pub fn order(&self) -> u16 {
        self.order
    }

    /// NAPTR preference of the record that led here.
    pub fn preference(&self) -> u16 {
        self.preference
    }

    /// SRV priority; zero for hosts found through `a` records.
    pub fn priority(&self) -> u16 {
        self.priority
    }

    /// SRV weight; zero for hosts found through `a` records.
    pub fn weight(&self) -> u16 {
        self.weight
    }

    /// IPv4 addresses of the host, sorted. May be empty.
    pub fn ipv4(&self) -> &[Ipv4Addr] {
        &self.ipv4
    }

    /// IPv6 addresses of the host, sorted. May be empty.
    pub fn ipv6(&self) -> &[Ipv6Addr] {
        &self.ipv6
    }

    /// Whether the matching record listed `protocol`.
    pub fn supports(&self, protocol: Protocol) -> bool {
        self.protocols.iter().any(|p| p.protocol == protocol)
    }
}

impl PartialEq for Candidate {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Candidate {}

impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Candidate {
    /// Order, preference, SRV priority, higher weight first, then the
    /// canonical name and the remaining fields.
    fn cmp(&self, other: &Self) -> Ordering {
        (self.order, self.preference, self.priority, Reverse(self.weight))
            .cmp(&(other.order, other.preference, other.priority, Reverse(other.weight)))
            .then_with(|| self.name.cmp(&other.name))
            .then_with(|| self.port.cmp(&other.port))
            .then_with(|| self.protocols.cmp(&other.protocols))
            .then_with(|| self.ipv4.cmp(&other.ipv4))
            .then_with(|| self.ipv6.cmp(&other.ipv6))
    }
}

impl fmt::Display for Candidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.host())?;
        if let Some(port) = self.port {
            write!(f, ":{port}")?;
        }
        write!(f, " (order {}, preference {})", self.order, self.preference)
    }
}

/// Candidates that share one canonical node name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColocatedCandidateGroup {
    name: CanonicalName,
    order: u16,
    preference: u16,
    candidates: Vec<Candidate>,
}

impl ColocatedCandidateGroup {
    /// Build a group from candidates of one node. Returns `None` for an
    /// empty list.
    fn new(mut candidates: Vec<Candidate>) -> Option<Self> {
        candidates.sort();
        let first = candidates.first()?;
        Some(Self {
            name: first.name.clone(),
            order: first.order,
            preference: first.preference,
            candidates,
        })
    }

    /// The name of the best-ranked member.
    pub fn name(&self) -> &CanonicalName {
        &self.name
    }

    /// The canonical node name shared by the members.
    pub fn node_name(&self) -> String {
        self.name.node_name()
    }

    /// The lowest order among the members.
    pub fn order(&self) -> u16 {
        self.order
    }

    /// The lowest preference among members with the lowest order.
    pub fn preference(&self) -> u16 {
        self.preference
    }

    /// Members, best first.
    pub fn candidates(&self) -> &[Candidate] {
        &self.candidates
    }
}

impl PartialOrd for ColocatedCandidateGroup {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ColocatedCandidateGroup {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.order, self.preference)
            .cmp(&(other.order, other.preference))
            .then_with(|| self.name.cmp(&other.name))
            .then_with(|| self.candidates.cmp(&other.candidates))
    }
}

/// The ordered result of one selection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    domain: String,
    groups: Vec<ColocatedCandidateGroup>,
}

impl Selection {
    /// Group and order candidates found for `domain`.
    ///
    /// The result depends only on the set of candidates, never on the
    /// order they are given in. Identical candidates collapse into one.
    pub fn new(domain: impl Into<String>, mut candidates: Vec<Candidate>) -> Self {
        candidates.sort();
        candidates.dedup();

        let mut by_node: BTreeMap<Vec<String>, Vec<Candidate>> = BTreeMap::new();
        for candidate in candidates {
            by_node
                .entry(candidate.name.labels().to_vec())
                .or_default()
                .push(candidate);
        }

        let mut groups: Vec<ColocatedCandidateGroup> = by_node
            .into_values()
            .filter_map(ColocatedCandidateGroup::new)
            .collect();
        groups.sort();

        Self {
            domain: domain.into(),
            groups,
        }
    }

    /// The domain the NAPTR records were read from.
    pub fn domain(&self) -> &str {
        &self.domain
    }

    /// Groups, best first.
    pub fn groups(&self) -> &[ColocatedCandidateGroup] {
        &self.groups
    }

    /// Every candidate, group by group.
    pub fn candidates(&self) -> impl Iterator<Item = &Candidate> {
        self.groups.iter().flat_map(|g| g.candidates.iter())
    }

    /// The best candidate, if any.
    pub fn first(&self) -> Option<&Candidate> {
        self.candidates().next()
    }

    /// True when nothing matched.
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Number of candidates across all groups.
    pub fn len(&self) -> usize {
        self.groups.iter().map(|g| g.candidates.len()).sum()
    }
}

/// Selects hosts for one node identity.
///
/// # Example
///
/// ```ignore
/// let selection = NodeSelector::new(&cache, NodeIdentity::Pgw { plmn, apn: "internet".into() })
///     .protocol(Protocol::S5Gtp)?
///     .select()?;
///
/// if let Some(best) = selection.first() {
///     println!("PGW: {best}");
/// }
/// ```
pub struct NodeSelector<'a> {
    cache: &'a Cache,
    identity: NodeIdentity,
    protocols: Vec<Protocol>,
    usage_types: Vec<u32>,
    network_capabilities: Vec<String>,
    max_depth: usize,
}

impl<'a> NodeSelector<'a> {
    /// Select `identity` through `cache`.
    ///
    /// Without further constraints every record for the node's service
    /// matches.
    pub fn new(cache: &'a Cache, identity: NodeIdentity) -> Self {
        Self {
            cache,
            identity,
            protocols: Vec::new(),
            usage_types: Vec::new(),
            network_capabilities: Vec::new(),
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    /// Require a protocol. Without any, every protocol of the service is
    /// accepted.
    ///
    /// Fails when the protocol is not legal for the node.
    pub fn protocol(mut self, protocol: Protocol) -> Result<Self> {
        let node = self.identity.kind();
        if !node.supports(protocol) {
            return Err(SelectError::UnsupportedProtocol { node, protocol });
        }
        if !self.protocols.contains(&protocol) {
            self.protocols.push(protocol);
        }
        Ok(self)
    }

    /// Require that the host serves this UE usage type. Repeated calls
    /// require all of the given types.
    pub fn usage_type(mut self, usage_type: u32) -> Self {
        if !self.usage_types.contains(&usage_type) {
            self.usage_types.push(usage_type);
        }
        self
    }

    /// Require that the host offers this network capability. Repeated
    /// calls require all of the given capabilities.
    pub fn network_capability(mut self, capability: impl Into<String>) -> Self {
        let capability = capability.into().to_ascii_lowercase();
        if !self.network_capabilities.contains(&capability) {
            self.network_capabilities.push(capability);
        }
        self
    }

    /// Limit nested non-terminal NAPTR records.
    pub fn max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    /// The node being selected.
    pub fn identity(&self) -> &NodeIdentity {
        &self.identity
    }

    /// Requested protocols; empty accepts any.
    pub fn protocols(&self) -> &[Protocol] {
        &self.protocols
    }

    /// The domain whose NAPTR records are consulted.
    pub fn domain(&self) -> String {
        self.identity.fqdn()
    }

    /// Run the selection.
    ///
    /// Only a failure to read the node's own NAPTR records is an error. A
    /// domain that does not exist gives an empty selection.
    pub fn select(&self) -> Result<Selection> {
        let started = Instant::now();
        let domain = self.domain();

        let mut walk = Walk::default();
        self.collect(&domain, 0, &mut walk)?;
        let selection = Selection::new(domain, walk.candidates);

        tracing::debug!(
            target: targets::SELECTOR,
            node = %self.identity.kind(),
            domain = selection.domain(),
            candidates = selection.len(),
            groups = selection.groups().len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "node selection complete"
        );
        Ok(selection)
    }

    fn collect(&self, domain: &str, depth: usize, walk: &mut Walk) -> std::result::Result<(), CacheError> {
        if !walk.visited.insert(domain.to_owned()) {
            tracing::trace!(target: targets::SELECTOR, domain, depth, "NAPTR records already expanded");
            return Ok(());
        }
        let naptrs = records::naptr(self.cache, domain)?;
        tracing::trace!(target: targets::SELECTOR, domain, depth, records = naptrs.len(), "NAPTR records");

        for naptr in &naptrs {
            if let Err(err) = self.follow(naptr, depth, walk) {
                tracing::warn!(
                    target: targets::SELECTOR,
                    domain,
                    service = %naptr.service,
                    replacement = %naptr.replacement,
                    "skipping NAPTR record: {err}"
                );
            }
        }
        Ok(())
    }

    fn follow(&self, naptr: &Naptr, depth: usize, walk: &mut Walk) -> std::result::Result<(), CandidateParseError> {
        match naptr.flags.as_str() {
            "" => {
                if naptr.replacement.is_empty() {
                    return Err(CandidateParseError::EmptyReplacement(naptr.service.clone()));
                }
                if depth >= self.max_depth {
                    return Err(CandidateParseError::TooDeep(self.max_depth, naptr.replacement.clone()));
                }
                if let Err(err) = self.collect(&naptr.replacement, depth + 1, walk) {
                    tracing::warn!(
                        target: targets::SELECTOR,
                        replacement = %naptr.replacement,
                        "non-terminal NAPTR lookup failed: {err}"
                    );
                }
                Ok(())
            }
            flag @ ("a" | "s") => {
                let params = ServiceParameters::parse(&naptr.service)?;
                let Some(protocols) = self.matching(&params) else {
                    tracing::trace!(target: targets::SELECTOR, service = %naptr.service, "service does not match");
                    return Ok(());
                };
                if naptr.replacement.is_empty() {
                    return Err(CandidateParseError::EmptyReplacement(naptr.service.clone()));
                }

                if flag == "a" {
                    let (ipv4, ipv6) = self.addresses(&naptr.replacement);
                    walk.candidates.push(
                        Candidate::new(&naptr.replacement, naptr.order, naptr.preference)
                            .with_protocols(protocols)
                            .with_addresses(ipv4, ipv6),
                    );
                } else {
                    self.follow_srv(naptr, protocols, &mut walk.candidates);
                }
                Ok(())
            }
            other => Err(CandidateParseError::UnsupportedFlag(other.to_owned())),
        }
    }

    fn follow_srv(&self, naptr: &Naptr, protocols: Vec<AppProtocol>, out: &mut Vec<Candidate>) {
        let srvs = match records::srv(self.cache, &naptr.replacement) {
            Ok(srvs) => srvs,
            Err(err) => {
                tracing::warn!(
                    target: targets::SELECTOR,
                    replacement = %naptr.replacement,
                    "SRV lookup failed: {err}"
                );
                return;
            }
        };

        for srv in srvs.into_iter().filter(|s| !s.target.is_empty()) {
            let (ipv4, ipv6) = self.addresses(&srv.target);
            out.push(
                Candidate::new(&srv.target, naptr.order, naptr.preference)
                    .with_srv(srv.priority, srv.weight, srv.port)
                    .with_protocols(protocols.clone())
                    .with_addresses(ipv4, ipv6),
            );
        }
    }

    fn addresses(&self, host: &str) -> (Vec<Ipv4Addr>, Vec<Ipv6Addr>) {
        records::addresses(self.cache, host, |record_type, err| {
            tracing::warn!(target: targets::SELECTOR, host, %record_type, "address lookup failed: {err}");
        })
    }

    /// The protocols of `params` that satisfy the request, or `None` when
    /// the record does not match.
    fn matching(&self, params: &ServiceParameters) -> Option<Vec<AppProtocol>> {
        if params.service != self.identity.service() {
            return None;
        }

        let matching: Vec<AppProtocol> = params
            .protocols
            .iter()
            .filter(|p| self.protocols.is_empty() || self.protocols.contains(&p.protocol))
            .filter(|p| p.serves_usage_types(&self.usage_types))
            .filter(|p| p.offers_capabilities(&self.network_capabilities))
            .cloned()
            .collect();

        let unconstrained = self.protocols.is_empty()
            && self.usage_types.is_empty()
            && self.network_capabilities.is_empty();
        if matching.is_empty() && !(unconstrained && params.protocols.is_empty()) {
            return None;
        }
        Some(matching)
    }
}

/// State of one [`NodeSelector::select`] call.
#[derive(Default)]
struct Walk {
    candidates: Vec<Candidate>,
    /// Domains whose NAPTR records were already expanded. Chains that
    /// revisit a domain stop there.
    visited: HashSet<String>,
}

impl fmt::Debug for NodeSelector<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeSelector")
            .field("identity", &self.identity)
            .field("protocols", &self.protocols)
            .field("usage_types", &self.usage_types)
            .field("network_capabilities", &self.network_capabilities)
            .field("max_depth", &self.max_depth)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_candidate_order() {
        let a = Candidate::new("b.example", 10, 5);
        let b = Candidate::new("a.example", 10, 10);
        let c = Candidate::new("a.example", 20, 1);
        let mut list = vec![c.clone(), b.clone(), a.clone()];
        list.sort();
        assert_eq!(list, vec![a, b, c]);
    }

    #[test]
    fn test_higher_weight_first() {
        let light = Candidate::new("a.example", 1, 1).with_srv(0, 10, 2123);
        let heavy = Candidate::new("b.example", 1, 1).with_srv(0, 90, 2123);
        assert!(heavy < light);
    }

    #[test]
    fn test_selection_groups_by_node() {
        let selection = Selection::new(
            "apn.example",
            vec![
                Candidate::new("topon.s5.pgw1.example.net", 20, 10),
                Candidate::new("topon.s8.pgw1.example.net", 10, 10),
                Candidate::new("pgw2.example.net", 10, 20),
            ],
        );
        assert_eq!(selection.len(), 3);
        let groups = selection.groups();
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].node_name(), "pgw1.example.net");
        assert_eq!(groups[0].order(), 10);
        assert_eq!(groups[0].candidates().len(), 2);
        assert_eq!(groups[1].node_name(), "pgw2.example.net");
        assert_eq!(selection.first().map(Candidate::host), Some("topon.s8.pgw1.example.net"));
    }

    #[test]
    fn test_identical_candidates_collapse() {
        let selection = Selection::new(
            "apn.example",
            vec![Candidate::new("pgw1.example.net", 1, 1), Candidate::new("PGW1.example.net.", 1, 1)],
        );
        assert_eq!(selection.len(), 1);
    }
}
