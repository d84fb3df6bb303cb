//! Public land mobile network identities.

use std::fmt;

use crate::error::{Result, SelectError};

/// A PLMN identity: mobile country code plus mobile network code.
///
/// The MNC keeps the number of digits it was created with (two or three);
/// names built from it always use the three-digit, zero-padded form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PlmnId {
    mcc: String,
    mnc: String,
}

impl PlmnId {
    /// Create a PLMN identity from decimal strings.
    ///
    /// The MCC must be three digits and the MNC two or three.
    pub fn new(mcc: &str, mnc: &str) -> Result<Self> {
        if mcc.len() != 3 || !mcc.bytes().all(|b| b.is_ascii_digit()) {
            return Err(SelectError::InvalidPlmn(format!("MCC '{mcc}' must be three digits")));
        }
        if !(2..=3).contains(&mnc.len()) || !mnc.bytes().all(|b| b.is_ascii_digit()) {
            return Err(SelectError::InvalidPlmn(format!(
                "MNC '{mnc}' must be two or three digits"
            )));
        }
        Ok(Self {
            mcc: mcc.to_owned(),
            mnc: mnc.to_owned(),
        })
    }

    /// Decode the 3-octet BCD encoding used on the wire (TS 24.008).
    ///
    /// Octet 1 carries MCC digits 2 and 1, octet 2 MNC digit 3 and MCC
    /// digit 3, octet 3 MNC digits 2 and 1. An MNC digit 3 of `0xF` marks
    /// a two-digit MNC.
    pub fn from_bcd(octets: [u8; 3]) -> Result<Self> {
        let digit = |nibble: u8| -> Result<char> {
            if nibble <= 9 {
                Ok(char::from(b'0' + nibble))
            } else {
                Err(SelectError::InvalidPlmn(format!(
                    "non-decimal nibble {nibble:#x} in {octets:02x?}"
                )))
            }
        };

        let mut mcc = String::with_capacity(3);
        mcc.push(digit(octets[0] & 0x0f)?);
        mcc.push(digit(octets[0] >> 4)?);
        mcc.push(digit(octets[1] & 0x0f)?);

        let mut mnc = String::with_capacity(3);
        mnc.push(digit(octets[2] & 0x0f)?);
        mnc.push(digit(octets[2] >> 4)?);
        let filler = octets[1] >> 4;
        if filler != 0x0f {
            mnc.push(digit(filler)?);
        }

        Ok(Self { mcc, mnc })
    }

    /// The three-digit mobile country code.
    pub fn mcc(&self) -> &str {
        &self.mcc
    }

    /// The mobile network code as given.
    pub fn mnc(&self) -> &str {
        &self.mnc
    }

    /// The mobile network code zero-padded to three digits.
    pub fn mnc_padded(&self) -> String {
        format!("{:0>3}", self.mnc)
    }
}

impl fmt::Display for PlmnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.mcc, self.mnc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_validates_digits() {
        assert!(PlmnId::new("310", "14").is_ok());
        assert!(PlmnId::new("310", "014").is_ok());
        assert!(PlmnId::new("31", "014").is_err());
        assert!(PlmnId::new("310", "1").is_err());
        assert!(PlmnId::new("3a0", "14").is_err());
        assert!(PlmnId::new("310", "1234").is_err());
    }

    #[test]
    fn test_mnc_is_padded() {
        let plmn = PlmnId::new("001", "01").unwrap();
        assert_eq!(plmn.mnc(), "01");
        assert_eq!(plmn.mnc_padded(), "001");
        assert_eq!(plmn.to_string(), "001-01");
    }

    #[test]
    fn test_from_bcd_two_digit_mnc() {
        // MCC 310, MNC 14: 0x13 0xf0 0x41
        let plmn = PlmnId::from_bcd([0x13, 0xf0, 0x41]).unwrap();
        assert_eq!(plmn.mcc(), "310");
        assert_eq!(plmn.mnc(), "14");
    }

    #[test]
    fn test_from_bcd_three_digit_mnc() {
        // MCC 310, MNC 410: 0x13 0x00 0x14
        let plmn = PlmnId::from_bcd([0x13, 0x00, 0x14]).unwrap();
        assert_eq!(plmn.mcc(), "310");
        assert_eq!(plmn.mnc(), "410");
    }

    #[test]
    fn test_from_bcd_rejects_non_decimal() {
        assert!(PlmnId::from_bcd([0x1a, 0xf0, 0x41]).is_err());
    }
}
