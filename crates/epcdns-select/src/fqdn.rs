//! Domain name templates for EPC nodes (TS 23.003 §19).
//!
//! Every builder is a method on [`PlmnId`] so the operator's network is
//! always part of the name. Numeric fields are inserted as given; TAC bytes
//! passed as `u8` are rendered as two lowercase hex digits.

use crate::plmn::PlmnId;

const THREE_GPP_NETWORK: &str = "3gppnetwork.org";
const VISITED_COUNTRY: &str = "visited-country.pub.3gppnetwork.org";

/// Render a TAC byte the way TAI names expect it.
pub fn tac_byte(byte: u8) -> String {
    format!("{byte:02x}")
}

impl PlmnId {
    /// `mnc<MNC>.mcc<MCC>.3gppnetwork.org`
    pub fn home_network(&self) -> String {
        format!("mnc{}.mcc{}.{THREE_GPP_NETWORK}", self.mnc_padded(), self.mcc())
    }

    /// `mnc<MNC>.mcc<MCC>.gprs`
    pub fn home_network_gprs(&self) -> String {
        format!("mnc{}.mcc{}.gprs", self.mnc_padded(), self.mcc())
    }

    /// `epc.mnc<MNC>.mcc<MCC>.3gppnetwork.org`
    pub fn epc(&self) -> String {
        format!("epc.{}", self.home_network())
    }

    /// Tracking area identity.
    pub fn tai_fqdn(&self, lb: &str, hb: &str) -> String {
        format!("tac-lb{lb}.tac-hb{hb}.tac.{}", self.epc())
    }

    /// Tracking area identity from raw TAC bytes.
    pub fn tai_fqdn_bytes(&self, lb: u8, hb: u8) -> String {
        self.tai_fqdn(&tac_byte(lb), &tac_byte(hb))
    }

    /// A single MME.
    pub fn mme_fqdn(&self, mmec: &str, mmegi: &str) -> String {
        format!("mmec{mmec}.mmegi{mmegi}.mme.{}", self.epc())
    }

    /// An MME pool.
    pub fn mme_pool_fqdn(&self, mmegi: &str) -> String {
        format!("mmegi{mmegi}.mme.{}", self.epc())
    }

    /// Routing area identity.
    pub fn rai_fqdn(&self, rac: &str, lac: &str) -> String {
        format!("rac{rac}.lac{lac}.rac.{}", self.epc())
    }

    pub fn rnc_fqdn(&self, rnc: &str) -> String {
        format!("rnc{rnc}.rnc.{}", self.epc())
    }

    /// An SGSN addressed by NRI within a routing area.
    pub fn sgsn_fqdn(&self, nri: &str, rac: &str, lac: &str) -> String {
        format!("nri-sgsn{nri}.rac{rac}.lac{lac}.rac.{}", self.epc())
    }

    /// The domain under which node names are published.
    pub fn epc_nodes_domain_fqdn(&self) -> String {
        format!("node.{}", self.epc())
    }

    /// A named node, for example an SGW selected by name.
    pub fn epc_node_fqdn(&self, node: &str) -> String {
        format!("{node}.{}", self.epc_nodes_domain_fqdn())
    }

    pub fn nonemergency_epdg_oi_fqdn(&self) -> String {
        format!("epdg.{}", self.epc())
    }

    pub fn nonemergency_epdg_tai_fqdn(&self, lb: &str, hb: &str) -> String {
        format!("tac-lb{lb}.tac-hb{hb}.tac.epdg.{}", self.epc())
    }

    pub fn nonemergency_epdg_lac_fqdn(&self, lac: &str) -> String {
        format!("lac{lac}.epdg.{}", self.epc())
    }

    pub fn nonemergency_epdg_visitedcountry_fqdn(&self) -> String {
        format!("epdg.epc.mcc{}.{VISITED_COUNTRY}", self.mcc())
    }

    pub fn emergency_epdg_oi_fqdn(&self) -> String {
        format!("sos.epdg.{}", self.epc())
    }

    pub fn emergency_epdg_tai_fqdn(&self, lb: &str, hb: &str) -> String {
        format!("tac-lb{lb}.tac-hb{hb}.tac.sos.epdg.{}", self.epc())
    }

    pub fn emergency_epdg_lac_fqdn(&self, lac: &str) -> String {
        format!("lac{lac}.sos.epdg.{}", self.epc())
    }

    pub fn emergency_epdg_visitedcountry_fqdn(&self) -> String {
        format!("sos.epdg.epc.mcc{}.{VISITED_COUNTRY}", self.mcc())
    }

    /// Global eNodeB identity.
    pub fn global_enodeb_id_fqdn(&self, enb: &str) -> String {
        format!("enb{enb}.enb.{}", self.epc())
    }

    /// Local home network.
    pub fn local_homenetwork_fqdn(&self, lhn: &str) -> String {
        format!("lhn{lhn}.lhn.epc.mcc{}.{VISITED_COUNTRY}", self.mcc())
    }

    /// APN in the EPC domain, used for S-NAPTR gateway selection.
    pub fn apn_fqdn(&self, apn: &str) -> String {
        format!("{apn}.apn.{}", self.epc())
    }

    /// APN in the legacy GPRS domain.
    pub fn apn(&self, apn: &str) -> String {
        format!("{apn}.apn.{}", self.home_network_gprs())
    }

    /// Diameter realm of the home network.
    pub fn diameter_fqdn(&self) -> String {
        format!("diameter.{}", self.epc())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plmn() -> PlmnId {
        PlmnId::new("310", "14").unwrap()
    }

    #[test]
    fn test_home_network() {
        assert_eq!(plmn().home_network(), "mnc014.mcc310.3gppnetwork.org");
        assert_eq!(plmn().home_network_gprs(), "mnc014.mcc310.gprs");
        assert_eq!(plmn().epc(), "epc.mnc014.mcc310.3gppnetwork.org");
    }

    #[test]
    fn test_tai_from_bytes() {
        assert_eq!(
            plmn().tai_fqdn_bytes(0x0b, 0x1a),
            "tac-lb0b.tac-hb1a.tac.epc.mnc014.mcc310.3gppnetwork.org"
        );
    }

    #[test]
    fn test_node_names() {
        let p = plmn();
        assert_eq!(
            p.mme_fqdn("12", "8001"),
            "mmec12.mmegi8001.mme.epc.mnc014.mcc310.3gppnetwork.org"
        );
        assert_eq!(p.mme_pool_fqdn("8001"), "mmegi8001.mme.epc.mnc014.mcc310.3gppnetwork.org");
        assert_eq!(
            p.sgsn_fqdn("1f", "aa", "1234"),
            "nri-sgsn1f.racaa.lac1234.rac.epc.mnc014.mcc310.3gppnetwork.org"
        );
        assert_eq!(p.epc_node_fqdn("sgw1"), "sgw1.node.epc.mnc014.mcc310.3gppnetwork.org");
        assert_eq!(p.global_enodeb_id_fqdn("0a1b2"), "enb0a1b2.enb.epc.mnc014.mcc310.3gppnetwork.org");
    }

    #[test]
    fn test_epdg_names() {
        let p = plmn();
        assert_eq!(p.nonemergency_epdg_oi_fqdn(), "epdg.epc.mnc014.mcc310.3gppnetwork.org");
        assert_eq!(p.emergency_epdg_oi_fqdn(), "sos.epdg.epc.mnc014.mcc310.3gppnetwork.org");
        assert_eq!(
            p.emergency_epdg_lac_fqdn("0001"),
            "lac0001.sos.epdg.epc.mnc014.mcc310.3gppnetwork.org"
        );
        assert_eq!(
            p.nonemergency_epdg_visitedcountry_fqdn(),
            "epdg.epc.mcc310.visited-country.pub.3gppnetwork.org"
        );
        assert_eq!(
            p.emergency_epdg_visitedcountry_fqdn(),
            "sos.epdg.epc.mcc310.visited-country.pub.3gppnetwork.org"
        );
    }

    #[test]
    fn test_apn_names() {
        let p = plmn();
        assert_eq!(p.apn_fqdn("internet"), "internet.apn.epc.mnc014.mcc310.3gppnetwork.org");
        assert_eq!(p.apn("internet"), "internet.apn.mnc014.mcc310.gprs");
        assert_eq!(p.diameter_fqdn(), "diameter.epc.mnc014.mcc310.3gppnetwork.org");
    }
}
