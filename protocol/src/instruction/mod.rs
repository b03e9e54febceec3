//! # Instruction Module
//!
//! Turns a [`TransferRequest`](crate::uri::TransferRequest) plus the
//! sender's address into the ordered ledger instructions that move the
//! money.
//!
//! ## Architecture
//!
//! ```text
//! types.rs    : Instruction and AccountMeta
//! programs.rs : one constructor per on-chain instruction kind, plus
//!               associated-token-account derivation
//! builder.rs  : TransferInstructionBuilder: picks native vs token path
//! error.rs    : BuildError
//! ```
//!
//! ## Design Decisions
//!
//! - The account list and signer/writable flags of each instruction are
//!   fixed by the on-chain program. A wrong flag is not caught locally; the
//!   network silently rejects the transaction. Hence one constructor per
//!   kind in `programs.rs`, each with a test pinning its layout.
//! - The builder is deterministic: no RNG, no clock. Equal inputs give
//!   byte-identical instructions.
//! - Account existence is an input, never a lookup. The builder does not
//!   do I/O.

pub mod builder;
pub mod error;
pub mod programs;
pub mod types;

pub use builder::{build_transfer_instructions, AccountStatus, TransferInstructionBuilder};
pub use error::BuildError;
pub use programs::associated_token_address;
pub use types::{AccountMeta, Instruction};
