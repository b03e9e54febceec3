//! # Decimal Amounts
//!
//! Payment amounts travel as text (`amount=1.5`) and land on the ledger as
//! integers in the asset's smallest unit. Floating point never touches them
//! in between.
//!
//! [`DecimalAmount`] keeps the digits themselves, normalized so that two
//! equal values always compare equal and print identically:
//!
//! - the integer part has no leading zeros (`"0"` when empty),
//! - the fractional part has no trailing zeros.
//!
//! That makes the string form lossless for any precision, and the
//! conversion to smallest units a pure digit shuffle with checked
//! arithmetic.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// Errors from parsing or scaling a decimal amount.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AmountError {
    /// The text is not a plain non-negative decimal (`^[0-9]+(\.[0-9]+)?$`).
    #[error("malformed decimal amount: {0:?}")]
    Malformed(String),

    /// The scaled value does not fit in 64 bits.
    #[error("amount {amount} with {decimals} decimals exceeds the 64-bit smallest-unit range")]
    Overflow {
        /// The amount being scaled.
        amount: String,
        /// The decimals it was scaled by.
        decimals: u8,
    },
}

/// A non-negative decimal number of unbounded precision.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct DecimalAmount {
    integer: String,
    fraction: String,
}

impl DecimalAmount {
    /// Zero.
    pub fn zero() -> Self {
        Self {
            integer: "0".to_string(),
            fraction: String::new(),
        }
    }

    /// Parse a plain decimal string. No sign, no exponent, no grouping,
    /// at least one digit on each side of an optional `.`.
    pub fn parse(s: &str) -> Result<Self, AmountError> {
        let (int_part, frac_part) = match s.split_once('.') {
            Some((i, f)) => (i, f),
            None => (s, ""),
        };
        let all_digits = |part: &str| part.bytes().all(|b| b.is_ascii_digit());
        let well_formed = !int_part.is_empty()
            && all_digits(int_part)
            && all_digits(frac_part)
            && (frac_part.is_empty() == !s.contains('.'));
        if !well_formed {
            return Err(AmountError::Malformed(s.to_string()));
        }
        Ok(Self::from_parts(int_part, frac_part))
    }

    /// Build from the smallest-unit integer, e.g. `(1_500_000_000, 9)` → `1.5`.
    pub fn from_smallest_units(units: u64, decimals: u8) -> Self {
        let digits = units.to_string();
        let decimals = decimals as usize;
        if digits.len() > decimals {
            let (i, f) = digits.split_at(digits.len() - decimals);
            Self::from_parts(i, f)
        } else {
            let padded = format!("{digits:0>decimals$}");
            Self::from_parts("0", &padded)
        }
    }

    fn from_parts(int_part: &str, frac_part: &str) -> Self {
        let integer = int_part.trim_start_matches('0');
        let fraction = frac_part.trim_end_matches('0');
        Self {
            integer: if integer.is_empty() { "0" } else { integer }.to_string(),
            fraction: fraction.to_string(),
        }
    }

    /// Returns `true` for zero.
    pub fn is_zero(&self) -> bool {
        self.integer == "0" && self.fraction.is_empty()
    }

    /// Number of significant fractional digits.
    pub fn fraction_digits(&self) -> usize {
        self.fraction.len()
    }

    /// Round half-up to at most `places` fractional digits.
    pub fn round_dp(&self, places: usize) -> Self {
        if self.fraction.len() <= places {
            return self.clone();
        }
        let round_up = self.fraction.as_bytes()[places] >= b'5';
        let mut digits: Vec<u8> = self
            .integer
            .bytes()
            .chain(self.fraction.bytes().take(places))
            .collect();
        if round_up {
            increment_digits(&mut digits);
        }
        // `increment_digits` may have grown the integer part by one digit.
        let split = digits.len() - places;
        let text = String::from_utf8_lossy(&digits);
        Self::from_parts(&text[..split], &text[split..])
    }

    /// Scale to the smallest unit: `round(self × 10^decimals)`, half-up.
    ///
    /// Fails with [`AmountError::Overflow`] when the result does not fit in
    /// a `u64` (including absurd `decimals` values).
    pub fn to_smallest_units(&self, decimals: u8) -> Result<u64, AmountError> {
        let overflow = || AmountError::Overflow {
            amount: self.to_string(),
            decimals,
        };
        let places = decimals as usize;
        let rounded = self.round_dp(places);

        let mut value: u64 = 0;
        let frac_digits = rounded
            .fraction
            .bytes()
            .chain(std::iter::repeat(b'0'))
            .take(places);
        for digit in rounded.integer.bytes().chain(frac_digits) {
            value = value
                .checked_mul(10)
                .and_then(|v| v.checked_add(u64::from(digit - b'0')))
                .ok_or_else(overflow)?;
        }
        Ok(value)
    }
}

/// Add one to a big-endian ASCII digit string, growing it on carry-out.
fn increment_digits(digits: &mut Vec<u8>) {
    for d in digits.iter_mut().rev() {
        if *d == b'9' {
            *d = b'0';
        } else {
            *d += 1;
            return;
        }
    }
    digits.insert(0, b'1');
}

impl FromStr for DecimalAmount {
    type Err = AmountError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for DecimalAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.fraction.is_empty() {
            f.write_str(&self.integer)
        } else {
            write!(f, "{}.{}", self.integer, self.fraction)
        }
    }
}

impl fmt::Debug for DecimalAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DecimalAmount({self})")
    }
}

impl Serialize for DecimalAmount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for DecimalAmount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
