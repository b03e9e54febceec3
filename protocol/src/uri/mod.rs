//! # Payment-Request URIs
//!
//! The URI is the whole contract between two phones: whatever the emitter
//! encodes, the receiver must decode to the same [`TransferRequest`].
//!
//! ```text
//! solana:<recipient>?amount=<decimal>
//!        [&spl-token=<mint>]
//!        [&reference=<address>]*
//!        [&label=<pct>][&message=<pct>][&memo=<pct>]
//! ```
//!
//! ## Layout
//!
//! ```text
//! request.rs : TransferRequest, the decoded form
//! codec.rs   : encode / decode / decode_with_decimals
//! error.rs   : UriError, one variant per rejection reason
//! ```
//!
//! Decoding validates in a fixed order and stops at the first failure, so a
//! malformed URI always produces the same diagnostic on every device.

pub mod codec;
pub mod error;
pub mod request;

pub use codec::{decode, decode_with_decimals, encode, DecimalsLookup};
pub use error::UriError;
pub use request::TransferRequest;
