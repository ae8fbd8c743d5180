use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// 8-byte hardware identifier (device EUI or gateway MAC).
///
/// Rendered as 16 lowercase hex characters everywhere it is displayed,
/// searched or serialized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Eui([u8; 8]);

impl Eui {
    pub const fn new(bytes: [u8; 8]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 8] {
        &self.0
    }

    /// Lowercase hex rendering, the form both the similarity scoring and
    /// the substring gate run against.
    pub fn to_hex(&self) -> String {
        self.0.iter().map(|b| format!("{b:02x}")).collect()
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self, DomainError> {
        let bytes: [u8; 8] = bytes.try_into().map_err(|_| {
            DomainError::InvalidArgument(format!("expected 8 bytes for EUI, got {}", bytes.len()))
        })?;
        Ok(Self(bytes))
    }
}

impl fmt::Display for Eui {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl FromStr for Eui {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if !s.is_ascii() || s.len() != 16 {
            return Err(DomainError::InvalidArgument(format!(
                "invalid EUI {s:?}: expected 16 hex characters"
            )));
        }

        let mut bytes = [0u8; 8];
        for (i, byte) in bytes.iter_mut().enumerate() {
            *byte = u8::from_str_radix(&s[i * 2..i * 2 + 2], 16).map_err(|_| {
                DomainError::InvalidArgument(format!(
                    "invalid EUI {s:?}: expected 16 hex characters"
                ))
            })?;
        }
        Ok(Self(bytes))
    }
}

impl TryFrom<String> for Eui {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Eui> for String {
    fn from(eui: Eui) -> Self {
        eui.to_hex()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_round_trip() {
        let eui = Eui::new([0x01, 0x02, 0x03, 0x04, 0xaa, 0xbb, 0xcc, 0xdd]);
        assert_eq!(eui.to_hex(), "01020304aabbccdd");
        assert_eq!("01020304aabbccdd".parse::<Eui>().unwrap(), eui);
    }

    #[test]
    fn test_parse_accepts_uppercase() {
        let eui: Eui = "01020304AABBCCDD".parse().unwrap();
        assert_eq!(eui.to_hex(), "01020304aabbccdd");
    }

    #[test]
    fn test_parse_rejects_bad_length() {
        assert!("0102".parse::<Eui>().is_err());
        assert!("01020304aabbccdd00".parse::<Eui>().is_err());
    }

    #[test]
    fn test_parse_rejects_non_hex() {
        assert!("01020304aabbcczz".parse::<Eui>().is_err());
        assert!("aaaaaaaaaaaaaaä".parse::<Eui>().is_err());
    }

    #[test]
    fn test_from_slice() {
        let eui = Eui::from_slice(&[1, 2, 3, 4, 5, 6, 7, 8]).unwrap();
        assert_eq!(eui.to_hex(), "0102030405060708");
        assert!(Eui::from_slice(&[1, 2, 3]).is_err());
    }
}
