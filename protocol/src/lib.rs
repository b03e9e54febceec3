// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # TAPAY Protocol: Core Library
//!
//! Phone-to-phone crypto payments with nothing in between but a few
//! centimetres of air. One phone shows a payment request, the other taps
//! it, reads the request over a contactless link, builds the transfer and
//! hands it to its wallet to sign and send.
//!
//! ## Architecture
//!
//! The library is the systems part of that exchange. Screens, key storage
//! and RPC clients live in the host app and plug in through
//! [`capability`].
//!
//! - **config**: Versioned wire contract: URI grammar, AID, status words.
//! - **address**: 32-byte ledger addresses and their base58 text form.
//! - **amount**: Lossless decimal amounts. No floats near money.
//! - **crypto**: SHA-256, program-derived addresses, Ed25519 keys.
//! - **uri**: `solana:` payment-request codec.
//! - **instruction**: Native and token transfer instructions.
//! - **transaction**: Envelope assembly and legacy message compilation.
//! - **transport**: Host-card-emulation state machine and APDU framing.
//! - **capability**: Signer, broadcaster, block source and oracles.
//! - **payment**: Drives the above from a received URI to a confirmation.
//!
//! ## Design Philosophy
//!
//! 1. Both phones must agree on every byte, so every byte is pinned by a test.
//! 2. The codec, builder and assembler are pure. All I/O sits behind traits.
//! 3. Contactless faults are normal weather, not exceptions.
//! 4. If it touches money, it has tests. Plural.

pub mod address;
pub mod amount;
pub mod capability;
pub mod config;
pub mod crypto;
pub mod instruction;
pub mod payment;
pub mod transaction;
pub mod transport;
pub mod uri;

pub use address::{Address, AddressError};
pub use amount::DecimalAmount;
pub use instruction::{build_transfer_instructions, Instruction};
pub use payment::{PaymentError, PaymentFlow};
pub use transaction::{assemble, TransactionEnvelope};
pub use transport::{ContactlessTransport, TransportEvent, TransportMode};
pub use uri::{decode, encode, TransferRequest};
