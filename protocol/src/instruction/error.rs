//! Error types for instruction building.

use thiserror::Error;

use crate::address::AddressError;
use crate::crypto::PdaError;

/// Failures while turning a request into instructions.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuildError {
    /// An address field does not satisfy the address rule.
    #[error("invalid {field} address {value:?}: {reason}")]
    InvalidAddress {
        /// Which input: `sender`, `recipient`, `spl-token`, `reference`.
        field: &'static str,
        /// The rejected text.
        value: String,
        /// Why it was rejected.
        reason: AddressError,
    },

    /// The amount in smallest units does not fit in 64 bits. Fatal for the
    /// request: the caller has to lower the amount or the precision.
    #[error("amount {amount} overflows 64-bit smallest units at {decimals} decimals")]
    AmountOverflow { amount: String, decimals: u8 },

    /// The amount rounds to zero smallest units.
    #[error("amount {amount} is below the smallest unit at {decimals} decimals")]
    ZeroAmount { amount: String, decimals: u8 },

    /// Associated token account derivation failed.
    #[error("associated account derivation failed: {0}")]
    Derivation(#[from] PdaError),
}
