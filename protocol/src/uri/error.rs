//! Error types for the payment-request URI codec.

use thiserror::Error;

use crate::address::AddressError;
use crate::config::MAX_URI_LENGTH;

/// Every way a payment-request URI can be rejected.
///
/// Decoding checks in declaration order (input size first, text fields
/// last), so the variant returned is the first problem in the URI.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UriError {
    /// The URI exceeds the wire-format limit.
    #[error("URI is {0} bytes, limit is {MAX_URI_LENGTH}")]
    InputTooLarge(usize),

    /// The scheme is missing or is not the payment scheme.
    #[error("unexpected URI scheme: {0:?}")]
    SchemeMismatch(String),

    /// No recipient between the scheme and the query.
    #[error("recipient address missing")]
    RecipientMissing,

    /// The recipient is not a valid address.
    #[error("invalid recipient address: {0}")]
    RecipientInvalid(AddressError),

    /// No `amount` parameter.
    #[error("amount parameter missing")]
    AmountMissing,

    /// `amount` is not a positive plain decimal within precision limits.
    #[error("invalid amount: {0}")]
    AmountInvalid(String),

    /// `spl-token` is not a valid address.
    #[error("invalid spl-token mint: {0}")]
    SplTokenInvalid(String),

    /// A `reference` is not a valid address.
    #[error("invalid reference #{index}: {reason}")]
    ReferenceInvalid {
        /// Zero-based position among the `reference` parameters.
        index: usize,
        /// What was wrong with it.
        reason: AddressError,
    },

    /// `label`, `message` or `memo` is not valid percent-encoded UTF-8.
    #[error("{field} is not valid percent-encoded UTF-8")]
    TextInvalid {
        /// The offending parameter name.
        field: &'static str,
    },

    /// The request cannot be encoded.
    #[error("cannot encode request: {0}")]
    Encoding(String),
}
