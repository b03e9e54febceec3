//! # Ledger Addresses
//!
//! An address is 32 raw bytes shown to humans in base58: the 58-symbol
//! alphabet that leaves out `0`, `O`, `I` and `l` so nobody misreads a
//! payee over a café counter.
//!
//! Both the URI codec and the instruction builder go through
//! [`Address::parse`], so a string that one path accepts the other path
//! accepts too. The textual rule is checked first (32–44 characters, all in
//! the alphabet), then the string must decode to exactly 32 bytes.

use std::fmt;
use std::str::FromStr;

use curve25519_dalek::edwards::CompressedEdwardsY;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

use crate::config::{ADDRESS_ALPHABET, ADDRESS_LENGTH, ADDRESS_MAX_CHARS, ADDRESS_MIN_CHARS};

/// Reasons a string is not a valid address.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AddressError {
    #[error("address must be {ADDRESS_MIN_CHARS}-{ADDRESS_MAX_CHARS} characters, got {0}")]
    InvalidLength(usize),

    #[error("address contains a character outside the base58 alphabet: {0:?}")]
    InvalidCharacter(char),

    #[error("address decodes to {0} bytes, expected {ADDRESS_LENGTH}")]
    InvalidByteLength(usize),
}

/// A 32-byte ledger address (account, program, or mint).
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Address([u8; ADDRESS_LENGTH]);

impl Address {
    /// Wrap raw bytes. No validation: every 32-byte value is an address.
    pub const fn new(bytes: [u8; ADDRESS_LENGTH]) -> Self {
        Self(bytes)
    }

    /// Parse the base58 text form, enforcing the address rule.
    pub fn parse(s: &str) -> Result<Self, AddressError> {
        check_address_text(s)?;
        let decoded = bs58::decode(s)
            .into_vec()
            // The alphabet check above already rules out decode failures.
            .map_err(|_| AddressError::InvalidByteLength(0))?;
        let bytes: [u8; ADDRESS_LENGTH] = decoded
            .as_slice()
            .try_into()
            .map_err(|_| AddressError::InvalidByteLength(decoded.len()))?;
        Ok(Self(bytes))
    }

    /// Raw bytes.
    pub fn as_bytes(&self) -> &[u8; ADDRESS_LENGTH] {
        &self.0
    }

    /// Raw bytes, by value.
    pub fn to_bytes(self) -> [u8; ADDRESS_LENGTH] {
        self.0
    }

    /// Base58 text form.
    pub fn to_base58(&self) -> String {
        bs58::encode(self.0).into_string()
    }

    /// Returns `true` if the bytes decompress to a point on the Ed25519
    /// curve. Program-derived addresses are exactly the ones that don't,
    /// which is what guarantees nobody holds a private key for them.
    pub fn is_on_curve(&self) -> bool {
        CompressedEdwardsY(self.0).decompress().is_some()
    }
}

/// Checks the textual address rule without decoding.
///
/// Length is measured in characters of the alphabet, which are all ASCII,
/// so the byte length is checked after the alphabet scan.
pub fn check_address_text(s: &str) -> Result<(), AddressError> {
    if let Some(bad) = s.chars().find(|c| !ADDRESS_ALPHABET.contains(*c)) {
        return Err(AddressError::InvalidCharacter(bad));
    }
    if !(ADDRESS_MIN_CHARS..=ADDRESS_MAX_CHARS).contains(&s.len()) {
        return Err(AddressError::InvalidLength(s.len()));
    }
    Ok(())
}

/// Returns `true` if `s` parses as an [`Address`].
pub fn is_valid_address(s: &str) -> bool {
    Address::parse(s).is_ok()
}

impl FromStr for Address {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_base58())
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self.to_base58())
    }
}

impl From<[u8; ADDRESS_LENGTH]> for Address {
    fn from(bytes: [u8; ADDRESS_LENGTH]) -> Self {
        Self(bytes)
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_base58())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{SYSTEM_PROGRAM_ID, TOKEN_PROGRAM_ID};

    #[test]
    fn system_program_is_all_zeroes() {
        let addr = Address::parse(SYSTEM_PROGRAM_ID).unwrap();
        assert_eq!(addr.to_bytes(), [0u8; 32]);
        assert_eq!(addr.to_string(), SYSTEM_PROGRAM_ID);
    }

    #[test]
    fn base58_roundtrip() {
        let addr = Address::new([7u8; 32]);
        let text = addr.to_base58();
        assert!((32..=44).contains(&text.len()));
        assert_eq!(Address::parse(&text).unwrap(), addr);
    }

    #[test]
    fn known_program_id_parses() {
        assert!(is_valid_address(TOKEN_PROGRAM_ID));
    }

    #[test]
    fn rejects_short_and_long_strings() {
        assert_eq!(
            Address::parse("1111111111111111111111111111111"),
            Err(AddressError::InvalidLength(31))
        );
        let long = "1".repeat(45);
        assert_eq!(Address::parse(&long), Err(AddressError::InvalidLength(45)));
    }

    #[test]
    fn rejects_ambiguous_characters() {
        for bad in ['0', 'O', 'I', 'l'] {
            let mut s = "1".repeat(31);
            s.push(bad);
            assert_eq!(Address::parse(&s), Err(AddressError::InvalidCharacter(bad)));
        }
    }

    #[test]
    fn rejects_text_that_decodes_to_wrong_width() {
        // 44 'z's is far above 2^256.
        let s = "z".repeat(44);
        assert!(matches!(
            Address::parse(&s),
            Err(AddressError::InvalidByteLength(n)) if n != 32
        ));
    }

    #[test]
    fn serde_uses_base58_string() {
        let addr = Address::new([1u8; 32]);
        let json = serde_json::to_string(&addr).unwrap();
        assert_eq!(json, format!("\"{}\"", addr));
        let back: Address = serde_json::from_str(&json).unwrap();
        assert_eq!(back, addr);
    }

    #[test]
    fn identity_point_is_on_curve() {
        // y = 1 encodes the neutral element.
        let mut bytes = [0u8; 32];
        bytes[0] = 1;
        assert!(Address::new(bytes).is_on_curve());
    }
}
