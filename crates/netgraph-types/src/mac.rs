//! MAC address type with lenient parsing and canonical formatting.

use crate::ParseError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A 48-bit Ethernet MAC address.
///
/// Parsing accepts the notations vendor APIs emit: colon or hyphen separated
/// octets, Cisco dotted triplets and bare hex. Display is always lower-case
/// and colon separated, so two records naming the same interface compare equal.
///
/// # Examples
///
/// ```
/// use netgraph_types::MacAddress;
///
/// let mac: MacAddress = "00:18:0A:12:34:56".parse().unwrap();
/// assert_eq!(mac.to_string(), "00:18:0a:12:34:56");
///
/// let dotted: MacAddress = "0018.0a12.3456".parse().unwrap();
/// assert_eq!(mac, dotted);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MacAddress([u8; 6]);

impl MacAddress {
    /// Creates a new MAC address from raw bytes.
    pub const fn new(bytes: [u8; 6]) -> Self {
        MacAddress(bytes)
    }

    /// Returns the raw bytes of the MAC address.
    pub const fn as_bytes(&self) -> &[u8; 6] {
        &self.0
    }
}

impl fmt::Display for MacAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
            self.0[0], self.0[1], self.0[2], self.0[3], self.0[4], self.0[5]
        )
    }
}

impl FromStr for MacAddress {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ParseError::InvalidMacAddress(s.to_string());

        let trimmed = s.trim();
        let digits: String = if trimmed.contains([':', '-']) {
            let parts: Vec<&str> = trimmed.split([':', '-']).collect();
            if parts.len() != 6 || parts.iter().any(|p| p.is_empty() || p.len() > 2) {
                return Err(invalid());
            }
            parts.iter().map(|p| format!("{:0>2}", p)).collect()
        } else if trimmed.contains('.') {
            let parts: Vec<&str> = trimmed.split('.').collect();
            if parts.len() != 3 || parts.iter().any(|p| p.len() != 4) {
                return Err(invalid());
            }
            parts.concat()
        } else {
            trimmed.to_string()
        };

        if digits.len() != 12 || !digits.is_ascii() {
            return Err(invalid());
        }

        let mut bytes = [0u8; 6];
        for (i, byte) in bytes.iter_mut().enumerate() {
            *byte = u8::from_str_radix(&digits[i * 2..i * 2 + 2], 16).map_err(|_| invalid())?;
        }

        Ok(MacAddress(bytes))
    }
}

impl TryFrom<String> for MacAddress {
    type Error = ParseError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<MacAddress> for String {
    fn from(mac: MacAddress) -> String {
        mac.to_string()
    }
}

impl From<[u8; 6]> for MacAddress {
    fn from(bytes: [u8; 6]) -> Self {
        MacAddress(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_colon_format() {
        let mac: MacAddress = "00:11:22:33:44:55".parse().unwrap();
        assert_eq!(mac.as_bytes(), &[0x00, 0x11, 0x22, 0x33, 0x44, 0x55]);
    }

    #[test]
    fn test_parse_hyphen_and_upper_case() {
        let mac: MacAddress = "AA-BB-CC-DD-EE-FF".parse().unwrap();
        assert_eq!(mac.to_string(), "aa:bb:cc:dd:ee:ff");
    }

    #[test]
    fn test_parse_dotted_and_bare() {
        let dotted: MacAddress = "0011.2233.4455".parse().unwrap();
        let bare: MacAddress = "001122334455".parse().unwrap();
        assert_eq!(dotted, bare);
        assert_eq!(bare.to_string(), "00:11:22:33:44:55");
    }

    #[test]
    fn test_parse_short_octets() {
        // Some firmware drops leading zeros per octet
        let mac: MacAddress = "0:11:2:33:4:55".parse().unwrap();
        assert_eq!(mac.to_string(), "00:11:02:33:04:55");
    }

    #[test]
    fn test_serde_as_string() {
        let mac: MacAddress = serde_json::from_str("\"00:18:0A:12:34:56\"").unwrap();
        assert_eq!(serde_json::to_string(&mac).unwrap(), "\"00:18:0a:12:34:56\"");
        assert!(serde_json::from_str::<MacAddress>("\"nope\"").is_err());
    }

    #[test]
    fn test_invalid_format() {
        assert!("invalid".parse::<MacAddress>().is_err());
        assert!("00:11:22:33:44".parse::<MacAddress>().is_err());
        assert!("00:11:22:33:44:55:66".parse::<MacAddress>().is_err());
        assert!("gg:11:22:33:44:55".parse::<MacAddress>().is_err());
        assert!("0011.2233.445".parse::<MacAddress>().is_err());
        assert!("".parse::<MacAddress>().is_err());
    }
}
