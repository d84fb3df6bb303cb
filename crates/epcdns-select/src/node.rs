//! Node identities: what is being selected and how its name is built.

use std::fmt;

use crate::plmn::PlmnId;
use crate::service::{AppService, Protocol};

const PGW_PROTOCOLS: &[Protocol] = &[
    Protocol::Gn,
    Protocol::Gp,
    Protocol::S2aGtp,
    Protocol::S2aMipv4,
    Protocol::S2aPmip,
    Protocol::S2bGtp,
    Protocol::S2bPmip,
    Protocol::S2cDsmip,
    Protocol::S5Gtp,
    Protocol::S5Pmip,
    Protocol::S8Gtp,
    Protocol::S8Pmip,
];

const SGW_PROTOCOLS: &[Protocol] = &[
    Protocol::S1U,
    Protocol::S11,
    Protocol::S12,
    Protocol::S2aPmip,
    Protocol::S2bPmip,
    Protocol::S4,
    Protocol::S5Gtp,
    Protocol::S5Pmip,
    Protocol::S8Gtp,
    Protocol::S8Pmip,
];

const MME_PROTOCOLS: &[Protocol] = &[
    Protocol::Gn,
    Protocol::Gp,
    Protocol::Nq,
    Protocol::S10,
    Protocol::S11,
    Protocol::S1Mme,
    Protocol::S3,
    Protocol::S6a,
    Protocol::Sv,
];

const UPF_PROTOCOLS: &[Protocol] = &[Protocol::Sxa, Protocol::Sxb, Protocol::Sxc];

/// A tracking area code split into its low and high bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Tac {
    pub lb: u8,
    pub hb: u8,
}

impl Tac {
    pub fn new(lb: u8, hb: u8) -> Self {
        Self { lb, hb }
    }

    /// Split a 16-bit TAC.
    pub fn from_u16(tac: u16) -> Self {
        let [hb, lb] = tac.to_be_bytes();
        Self { lb, hb }
    }
}

/// The node being selected, with everything needed to name it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum NodeIdentity {
    /// A specific MME.
    Mme { plmn: PlmnId, mmec: String, mmegi: String },
    /// Any MME of a pool.
    MmePool { plmn: PlmnId, mmegi: String },
    /// A PGW serving an APN.
    Pgw { plmn: PlmnId, apn: String },
    /// A PGW user plane function serving an APN.
    PgwUpf { plmn: PlmnId, apn: String },
    /// An SGW serving a tracking area.
    SgwTai { plmn: PlmnId, tac: Tac },
    /// An SGW by node name.
    SgwNode { plmn: PlmnId, node: String },
    /// An SGW user plane function serving a tracking area.
    SgwUpfTai { plmn: PlmnId, tac: Tac },
    /// An SGW user plane function by node name.
    SgwUpfNode { plmn: PlmnId, node: String },
    /// The user plane function colocated with an eNodeB.
    EnodebUpf { plmn: PlmnId, enb: String },
}

/// The variant of a [`NodeIdentity`] without its data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Mme,
    MmePool,
    Pgw,
    PgwUpf,
    SgwTai,
    SgwNode,
    SgwUpfTai,
    SgwUpfNode,
    EnodebUpf,
}

impl NodeKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Mme => "mme",
            Self::MmePool => "mme-pool",
            Self::Pgw => "pgw",
            Self::PgwUpf => "pgw-upf",
            Self::SgwTai => "sgw-tai",
            Self::SgwNode => "sgw-node",
            Self::SgwUpfTai => "sgw-upf-tai",
            Self::SgwUpfNode => "sgw-upf-node",
            Self::EnodebUpf => "enodeb-upf",
        }
    }

    /// The application service the node publishes.
    pub fn service(self) -> AppService {
        match self {
            Self::Mme | Self::MmePool => AppService::Mme,
            Self::Pgw => AppService::Pgw,
            Self::SgwTai | Self::SgwNode => AppService::Sgw,
            Self::PgwUpf | Self::SgwUpfTai | Self::SgwUpfNode | Self::EnodebUpf => AppService::Upf,
        }
    }

    /// Protocols that may be requested for this node (TS 23.003 Table 19.4.3.1).
    pub fn protocols(self) -> &'static [Protocol] {
        match self.service() {
            AppService::Mme => MME_PROTOCOLS,
            AppService::Pgw => PGW_PROTOCOLS,
            AppService::Sgw => SGW_PROTOCOLS,
            _ => UPF_PROTOCOLS,
        }
    }

    pub fn supports(self, protocol: Protocol) -> bool {
        self.protocols().contains(&protocol)
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl NodeIdentity {
    pub fn kind(&self) -> NodeKind {
        match self {
            Self::Mme { .. } => NodeKind::Mme,
            Self::MmePool { .. } => NodeKind::MmePool,
            Self::Pgw { .. } => NodeKind::Pgw,
            Self::PgwUpf { .. } => NodeKind::PgwUpf,
            Self::SgwTai { .. } => NodeKind::SgwTai,
            Self::SgwNode { .. } => NodeKind::SgwNode,
            Self::SgwUpfTai { .. } => NodeKind::SgwUpfTai,
            Self::SgwUpfNode { .. } => NodeKind::SgwUpfNode,
            Self::EnodebUpf { .. } => NodeKind::EnodebUpf,
        }
    }

    pub fn plmn(&self) -> &PlmnId {
        match self {
            Self::Mme { plmn, .. }
            | Self::MmePool { plmn, .. }
            | Self::Pgw { plmn, .. }
            | Self::PgwUpf { plmn, .. }
            | Self::SgwTai { plmn, .. }
            | Self::SgwNode { plmn, .. }
            | Self::SgwUpfTai { plmn, .. }
            | Self::SgwUpfNode { plmn, .. }
            | Self::EnodebUpf { plmn, .. } => plmn,
        }
    }

    pub fn service(&self) -> AppService {
        self.kind().service()
    }

    pub fn protocols(&self) -> &'static [Protocol] {
        self.kind().protocols()
    }

    /// The domain whose NAPTR records list candidates for this node.
    pub fn fqdn(&self) -> String {
        match self {
            Self::Mme { plmn, mmec, mmegi } => plmn.mme_fqdn(mmec, mmegi),
            Self::MmePool { plmn, mmegi } => plmn.mme_pool_fqdn(mmegi),
            Self::Pgw { plmn, apn } | Self::PgwUpf { plmn, apn } => plmn.apn_fqdn(apn),
            Self::SgwTai { plmn, tac } | Self::SgwUpfTai { plmn, tac } => {
                plmn.tai_fqdn_bytes(tac.lb, tac.hb)
            }
            Self::SgwNode { plmn, node } | Self::SgwUpfNode { plmn, node } => plmn.epc_node_fqdn(node),
            Self::EnodebUpf { plmn, enb } => plmn.global_enodeb_id_fqdn(enb),
        }
    }
}

impl fmt::Display for NodeIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind(), self.fqdn())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plmn() -> PlmnId {
        PlmnId::new("001", "01").unwrap()
    }

    #[test]
    fn test_tac_from_u16() {
        assert_eq!(Tac::from_u16(0x1a0b), Tac::new(0x0b, 0x1a));
    }

    #[test]
    fn test_fqdn_per_variant() {
        let sgw = NodeIdentity::SgwTai {
            plmn: plmn(),
            tac: Tac::from_u16(0x0102),
        };
        assert_eq!(sgw.fqdn(), "tac-lb02.tac-hb01.tac.epc.mnc001.mcc001.3gppnetwork.org");
        assert_eq!(sgw.service(), AppService::Sgw);

        let upf = NodeIdentity::SgwUpfNode {
            plmn: plmn(),
            node: "sgw1".into(),
        };
        assert_eq!(upf.fqdn(), "sgw1.node.epc.mnc001.mcc001.3gppnetwork.org");
        assert_eq!(upf.service(), AppService::Upf);

        let pgw = NodeIdentity::Pgw {
            plmn: plmn(),
            apn: "internet".into(),
        };
        assert_eq!(pgw.fqdn(), "internet.apn.epc.mnc001.mcc001.3gppnetwork.org");
    }

    #[test]
    fn test_protocol_tables() {
        assert!(NodeKind::Pgw.supports(Protocol::S5Gtp));
        assert!(!NodeKind::Pgw.supports(Protocol::S11));
        assert!(NodeKind::SgwTai.supports(Protocol::S11));
        assert!(NodeKind::MmePool.supports(Protocol::S6a));
        assert!(NodeKind::EnodebUpf.supports(Protocol::Sxb));
        assert!(!NodeKind::EnodebUpf.supports(Protocol::S1U));
        assert!(!NodeKind::Mme.supports(Protocol::Unknown));
    }
}
