//! # Cryptographic Primitives
//!
//! Three small jobs, all delegated to audited crates:
//!
//! - **SHA-256** (`sha2`) for program-derived address preimages.
//! - **Program-derived addresses**: deterministic addresses that are
//!   provably off the Ed25519 curve (`curve25519-dalek` decides that).
//! - **Ed25519 keys** (`ed25519-dalek`) for the local signer used by the
//!   CLI and tests. Real wallets plug their own custody in behind
//!   [`crate::capability::Signer`].

pub mod hash;
pub mod keys;
pub mod pda;

pub use hash::{sha256, sha256_multi};
pub use keys::{KeyError, Keypair};
pub use pda::{create_program_address, find_program_address, PdaError};
