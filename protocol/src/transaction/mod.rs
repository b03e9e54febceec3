//! # Transaction Module
//!
//! Combines built instructions with a freshness token and a fee payer into a
//! [`TransactionEnvelope`], and compiles envelopes into the ledger's legacy
//! wire message for signing.
//!
//! ## Architecture
//!
//! ```text
//! envelope.rs : BlockReference, TransactionEnvelope, assemble()
//! message.rs  : CompiledMessage (legacy format), SignedTransaction
//! error.rs    : AssembleError
//! ```
//!
//! ## Transaction Lifecycle
//!
//! 1. **Build**: [`crate::instruction`] produces the instructions.
//! 2. **Assemble**: [`assemble`] wraps them with a block reference and fee payer.
//! 3. **Compile**: [`TransactionEnvelope::compile`] lays out the message bytes.
//! 4. **Sign**: an external [`Signer`](crate::capability::Signer) signs those bytes.
//! 5. **Submit**: an external [`Broadcaster`](crate::capability::Broadcaster)
//!    sends the [`SignedTransaction`] wire bytes.
//!
//! ## Design Decisions
//!
//! - Assembly never signs and never transmits. Envelopes are created per
//!   payment attempt and never persisted.
//! - Compilation is deterministic: accounts keep first-seen order inside
//!   each signer/writable group, so equal envelopes give equal bytes.

pub mod envelope;
pub mod error;
pub mod message;

pub use envelope::{assemble, BlockReference, TransactionEnvelope};
pub use error::AssembleError;
pub use message::{CompiledInstruction, CompiledMessage, MessageHeader, SignedTransaction};
