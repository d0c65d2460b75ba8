//! Bluetooth device addresses.
//!
//! Scanner backends report addresses as [`MacAddress`]; the admission filter
//! compares them as normalized lower-case strings so that allow-list entries
//! match regardless of how they were written on the command line.

use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// A Bluetooth MAC address stored as a compact 6-byte array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct MacAddress(pub [u8; 6]);

impl fmt::Display for MacAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:02X}:{:02X}:{:02X}:{:02X}:{:02X}:{:02X}",
            self.0[0], self.0[1], self.0[2], self.0[3], self.0[4], self.0[5]
        )
    }
}

/// Errors returned when parsing a MAC address string.
#[derive(Error, Debug, PartialEq)]
pub enum ParseMacError {
    #[error("invalid MAC address: expected 6 parts, got {0}")]
    InvalidLength(usize),
    #[error("invalid MAC address: part {0} has wrong length")]
    InvalidPartLength(usize),
    #[error("invalid MAC address: '{0}' is not valid hex")]
    InvalidHex(String),
}

impl FromStr for MacAddress {
    type Err = ParseMacError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.trim().split(':').collect();
        if parts.len() != 6 {
            return Err(ParseMacError::InvalidLength(parts.len()));
        }

        let mut bytes = [0u8; 6];
        for (i, part) in parts.iter().enumerate() {
            if part.len() != 2 {
                return Err(ParseMacError::InvalidPartLength(i));
            }
            if !part.bytes().all(|b| b.is_ascii_hexdigit()) {
                return Err(ParseMacError::InvalidHex(part.to_string()));
            }
            bytes[i] = u8::from_str_radix(part, 16)
                .map_err(|_| ParseMacError::InvalidHex(part.to_string()))?;
        }

        Ok(MacAddress(bytes))
    }
}

impl From<[u8; 6]> for MacAddress {
    fn from(bytes: [u8; 6]) -> Self {
        Self(bytes)
    }
}

#[cfg(feature = "bluer")]
impl From<bluer::Address> for MacAddress {
    fn from(addr: bluer::Address) -> Self {
        Self(addr.0)
    }
}

/// Normalize an address string for comparison (trimmed, lower case).
pub fn normalize_address(address: &str) -> String {
    address.trim().to_ascii_lowercase()
}

/// Parse an allow-list entry from the command line.
///
/// The entry must be a valid MAC address; it is returned normalized.
///
/// # Example
/// ```
/// use bthome_listener::mac_address::parse_allowed_address;
///
/// assert_eq!(parse_allowed_address("B0:C7:DE:3B:29:15").unwrap(), "b0:c7:de:3b:29:15");
/// assert!(parse_allowed_address("B0:C7:DE").is_err());
/// ```
pub fn parse_allowed_address(src: &str) -> Result<String, ParseMacError> {
    let mac: MacAddress = src.parse()?;
    Ok(normalize_address(&mac.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let addr = MacAddress([0xB0, 0xC7, 0xDE, 0x3B, 0x29, 0x15]);
        assert_eq!(format!("{}", addr), "B0:C7:DE:3B:29:15");
    }

    #[test]
    fn test_from_str_lowercase() {
        let addr: MacAddress = "b0:c7:de:3b:29:15".parse().unwrap();
        assert_eq!(addr.0, [0xB0, 0xC7, 0xDE, 0x3B, 0x29, 0x15]);
    }

    #[test]
    fn test_from_str_invalid() {
        assert!(matches!(
            "invalid".parse::<MacAddress>(),
            Err(ParseMacError::InvalidLength(1))
        ));
        assert!(matches!(
            "B0:C7:DE:3B:29:1".parse::<MacAddress>(),
            Err(ParseMacError::InvalidPartLength(5))
        ));
        assert!(matches!(
            "B0:C7:DE:3B:29:GG".parse::<MacAddress>(),
            Err(ParseMacError::InvalidHex(_))
        ));
    }

    #[test]
    fn test_from_str_rejects_sign_prefix() {
        assert_eq!(
            "+b:c7:de:3b:29:15".parse::<MacAddress>(),
            Err(ParseMacError::InvalidHex("+b".to_string()))
        );
        assert_eq!(
            parse_allowed_address("b0:c7:de:3b:29:-1"),
            Err(ParseMacError::InvalidHex("-1".to_string()))
        );
    }

    #[test]
    fn test_normalize_address() {
        assert_eq!(normalize_address("B0:C7:DE:3B:29:15"), "b0:c7:de:3b:29:15");
        assert_eq!(normalize_address(" b0:c7:de:3b:29:15 "), "b0:c7:de:3b:29:15");
    }

    #[test]
    fn test_parse_allowed_address() {
        assert_eq!(
            parse_allowed_address("B0:c7:DE:3b:29:15").unwrap(),
            "b0:c7:de:3b:29:15"
        );
        assert_eq!(
            parse_allowed_address("nope"),
            Err(ParseMacError::InvalidLength(1))
        );
    }
}
