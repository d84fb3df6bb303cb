//! Diameter peer discovery (RFC 6408, TS 29.272 §7).
//!
//! A realm publishes NAPTR records whose service field names the Diameter
//! application and transport, e.g. `aaa+ap16777251:diameter.sctp` for S6a
//! over SCTP. Matching records are followed to hosts (`a`) or SRV lists
//! (`s`).

use std::cmp::Reverse;
use std::fmt;
use std::net::{Ipv4Addr, Ipv6Addr};
use std::time::Instant;

use epcdns_core::Cache;

use crate::error::{CandidateParseError, Result};
use crate::logging::targets;
use crate::plmn::PlmnId;
use crate::records::{self, Naptr};

/// A Diameter application identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiameterApplication {
    /// NASREQ (RFC 7155).
    Nasreq,
    /// Mobile IPv4 (RFC 4004).
    MobileIpv4,
    /// Base accounting (RFC 6733).
    BaseAccounting,
    /// Credit control (RFC 4006).
    CreditControl,
    /// EAP (RFC 4072).
    Eap,
    /// SIP (RFC 4740).
    Sip6,
    /// Mobile IPv6 IKE (RFC 5778).
    MobileIpv6Ike,
    /// Mobile IPv6 auth (RFC 5778).
    MobileIpv6Auth,
    /// QoS (RFC 5866).
    Qos,
    /// Relay agents advertise every application.
    Relay,
    /// 3GPP STa.
    Sta,
    /// 3GPP S6a/S6d.
    S6a,
    /// 3GPP SWm.
    Swm,
    /// 3GPP S9.
    S9,
    /// WiMAX NAP authentication.
    WimaxNetworkAccessAuthentication,
    /// WiMAX NAP authentication and authorization.
    WimaxNetworkAccessAuthenticationAuthorization,
    /// WiMAX Diameter EAP.
    WimaxDiameterEap,
    /// WiMAX accounting.
    WimaxAccounting,
    /// WiMAX Mobile IPv4.
    WimaxMobileIpv4,
    /// WiMAX Mobile IPv6.
    WimaxMobileIpv6,
    /// WiMAX DHCP.
    WimaxDhcp,
    /// WiMAX location based services.
    WimaxLocationBasedServices,
    /// WiMAX policy and charging control, release 1.
    WimaxPolicyAndChargingControlR1,
    /// WiMAX policy and charging control, release 2.
    WimaxPolicyAndChargingControlR2,
    /// Any other application id.
    Other(u32),
}

impl DiameterApplication {
    /// The numeric application id.
    pub fn id(self) -> u32 {
        match self {
            Self::Nasreq => 1,
            Self::MobileIpv4 => 2,
            Self::BaseAccounting => 3,
            Self::CreditControl => 4,
            Self::Eap => 5,
            Self::Sip6 => 6,
            Self::MobileIpv6Ike => 7,
            Self::MobileIpv6Auth => 8,
            Self::Qos => 9,
            Self::Relay => u32::MAX,
            Self::Sta => 16_777_250,
            Self::S6a => 16_777_251,
            Self::Swm => 16_777_264,
            Self::S9 => 16_777_267,
            Self::WimaxNetworkAccessAuthentication => 16_777_281,
            Self::WimaxNetworkAccessAuthenticationAuthorization => 16_777_282,
            Self::WimaxDiameterEap => 16_777_283,
            Self::WimaxAccounting => 16_777_284,
            Self::WimaxMobileIpv4 => 16_777_285,
            Self::WimaxMobileIpv6 => 16_777_286,
            Self::WimaxDhcp => 16_777_287,
            Self::WimaxLocationBasedServices => 16_777_288,
            Self::WimaxPolicyAndChargingControlR1 => 16_777_289,
            Self::WimaxPolicyAndChargingControlR2 => 16_777_290,
            Self::Other(id) => id,
        }
    }

    /// The application tag of a NAPTR service field, `aaa+ap<id>`.
    pub fn service_tag(self) -> String {
        format!("aaa+ap{}", self.id())
    }
}

impl fmt::Display for DiameterApplication {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id())
    }
}

/// Transport of a Diameter connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiameterProtocol {
    /// Diameter over TCP.
    Tcp,
    /// Diameter over SCTP.
    Sctp,
    /// Diameter over TLS/TCP.
    TlsTcp,
}

impl DiameterProtocol {
    /// The protocol tag of a NAPTR service field.
    pub fn tag(self) -> &'static str {
        match self {
            Self::Tcp => "diameter.tcp",
            Self::Sctp => "diameter.sctp",
            Self::TlsTcp => "diameters.tcp",
        }
    }
}

impl fmt::Display for DiameterProtocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// A Diameter peer host and its addresses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiameterHost {
    /// Host name, lowercased without a trailing dot.
    pub name: String,
    /// IPv4 addresses, sorted.
    pub ipv4: Vec<Ipv4Addr>,
    /// IPv6 addresses, sorted.
    pub ipv6: Vec<Ipv6Addr>,
}

/// One SRV record of a Diameter service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiameterSrv {
    /// SRV priority; lower is preferred.
    pub priority: u16,
    /// SRV weight within a priority.
    pub weight: u16,
    /// Port to connect to.
    pub port: u16,
    /// The SRV target and its addresses.
    pub host: DiameterHost,
}

/// Where a matching NAPTR record leads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiameterTarget {
    /// `a` flag: connect to this host on the default port.
    Host(DiameterHost),
    /// `s` flag: SRV records, by priority then descending weight.
    Service(Vec<DiameterSrv>),
}

/// A NAPTR record that matched the requested application and transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiameterNaptr {
    /// NAPTR order.
    pub order: u16,
    /// NAPTR preference.
    pub preference: u16,
    /// The NAPTR service field as published.
    pub service: String,
    /// The replacement domain.
    pub replacement: String,
    /// What the replacement resolved to.
    pub target: DiameterTarget,
}

/// Selects Diameter peers within a realm.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiameterSelector {
    realm: String,
    application: DiameterApplication,
    protocol: DiameterProtocol,
}

impl DiameterSelector {
    /// Select peers for `application` over `protocol` in `realm`.
    pub fn new(realm: &str, application: DiameterApplication, protocol: DiameterProtocol) -> Self {
        Self {
            realm: records::normalize(realm),
            application,
            protocol,
        }
    }

    /// Select within the home network realm of `plmn`.
    pub fn for_plmn(plmn: &PlmnId, application: DiameterApplication, protocol: DiameterProtocol) -> Self {
        Self::new(&plmn.diameter_fqdn(), application, protocol)
    }

    /// The realm, normalized.
    pub fn realm(&self) -> &str {
        &self.realm
    }

    /// The requested application.
    pub fn application(&self) -> DiameterApplication {
        self.application
    }

    /// The requested transport.
    pub fn protocol(&self) -> DiameterProtocol {
        self.protocol
    }

    /// Whether a NAPTR service field names this application and transport.
    pub fn matches(&self, service: &str) -> bool {
        let mut parts = service.trim().split(':');
        let app_tag = parts.next().unwrap_or_default();
        app_tag.eq_ignore_ascii_case(&self.application.service_tag())
            && parts.any(|p| p.trim().eq_ignore_ascii_case(self.protocol.tag()))
    }

    /// Resolve the realm and return matching records, best first.
    ///
    /// A realm with no matching records gives an empty list.
    pub fn select(&self, cache: &Cache) -> Result<Vec<DiameterNaptr>> {
        let started = Instant::now();
        let mut naptrs = records::naptr(cache, &self.realm)?;
        naptrs.sort_by(|a, b| {
            (a.order, a.preference, &a.replacement).cmp(&(b.order, b.preference, &b.replacement))
        });

        let mut selected = Vec::new();
        for naptr in naptrs.iter().filter(|n| self.matches(&n.service)) {
            match self.follow(cache, naptr) {
                Ok(target) => selected.push(DiameterNaptr {
                    order: naptr.order,
                    preference: naptr.preference,
                    service: naptr.service.clone(),
                    replacement: naptr.replacement.clone(),
                    target,
                }),
                Err(err) => tracing::warn!(
                    target: targets::DIAMETER,
                    realm = %self.realm,
                    replacement = %naptr.replacement,
                    "skipping NAPTR record: {err}"
                ),
            }
        }

        tracing::debug!(
            target: targets::DIAMETER,
            realm = %self.realm,
            application = self.application.id(),
            protocol = self.protocol.tag(),
            selected = selected.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "diameter selection complete"
        );
        Ok(selected)
    }

    fn follow(&self, cache: &Cache, naptr: &Naptr) -> std::result::Result<DiameterTarget, CandidateParseError> {
        if naptr.replacement.is_empty() {
            return Err(CandidateParseError::EmptyReplacement(naptr.service.clone()));
        }
        match naptr.flags.as_str() {
            "a" => Ok(DiameterTarget::Host(host(cache, &naptr.replacement))),
            "s" => {
                let srvs = match records::srv(cache, &naptr.replacement) {
                    Ok(srvs) => srvs,
                    Err(err) => {
                        tracing::warn!(
                            target: targets::DIAMETER,
                            replacement = %naptr.replacement,
                            "SRV lookup failed: {err}"
                        );
                        Vec::new()
                    }
                };
                let mut srvs: Vec<DiameterSrv> = srvs
                    .into_iter()
                    .filter(|s| !s.target.is_empty())
                    .map(|s| DiameterSrv {
                        priority: s.priority,
                        weight: s.weight,
                        port: s.port,
                        host: host(cache, &s.target),
                    })
                    .collect();
                srvs.sort_by(|a, b| {
                    (a.priority, Reverse(a.weight), &a.host.name, a.port)
                        .cmp(&(b.priority, Reverse(b.weight), &b.host.name, b.port))
                });
                Ok(DiameterTarget::Service(srvs))
            }
            other => Err(CandidateParseError::UnsupportedFlag(other.to_owned())),
        }
    }
}

fn host(cache: &Cache, name: &str) -> DiameterHost {
    let (ipv4, ipv6) = records::addresses(cache, name, |record_type, err| {
        tracing::warn!(target: targets::DIAMETER, host = name, %record_type, "address lookup failed: {err}");
    });
    DiameterHost {
        name: name.to_owned(),
        ipv4,
        ipv6,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_application_ids() {
        assert_eq!(DiameterApplication::S6a.id(), 16_777_251);
        assert_eq!(DiameterApplication::Relay.id(), 4_294_967_295);
        assert_eq!(DiameterApplication::Other(42).service_tag(), "aaa+ap42");
    }

    #[test]
    fn test_service_matching() {
        let selector = DiameterSelector::new("Realm.Example.", DiameterApplication::S6a, DiameterProtocol::Sctp);
        assert_eq!(selector.realm(), "realm.example");
        assert!(selector.matches("aaa+ap16777251:diameter.sctp"));
        assert!(selector.matches("AAA+AP16777251:DIAMETER.SCTP"));
        assert!(!selector.matches("aaa+ap16777251:diameter.tcp"));
        assert!(!selector.matches("aaa+ap16777264:diameter.sctp"));
        assert!(!selector.matches(""));
    }

    #[test]
    fn test_for_plmn_uses_diameter_realm() {
        let plmn = PlmnId::new("001", "01").unwrap();
        let selector = DiameterSelector::for_plmn(&plmn, DiameterApplication::S6a, DiameterProtocol::TlsTcp);
        assert_eq!(selector.realm(), "diameter.epc.mnc001.mcc001.3gppnetwork.org");
        assert_eq!(selector.protocol().tag(), "diameters.tcp");
    }
}
