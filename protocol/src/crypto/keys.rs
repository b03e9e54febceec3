//! # Key Management
//!
//! Ed25519 keypairs for the local signer. In a shipping wallet the secret
//! lives in a hardware-backed store and never reaches this crate; the
//! [`Keypair`] here exists so the CLI and the test-suite can produce real,
//! verifiable signatures.
//!
//! Key bytes are never logged. If you add logging to this module, you will
//! be asked to leave.

use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey, SECRET_KEY_LENGTH};
use rand::rngs::OsRng;
use std::fmt;
use thiserror::Error;

use crate::address::Address;

/// Errors that can occur during key operations.
///
/// Intentionally vague about *why* something failed; error messages are a
/// classic place to leak key material.
#[derive(Debug, Error)]
pub enum KeyError {
    #[error("invalid secret key bytes: wrong length or not valid hex")]
    InvalidSecretKey,
}

/// An Ed25519 signing keypair. Its public half is a ledger [`Address`].
///
/// Deliberately not `Serialize`: exporting a secret should be a conscious
/// call to [`Keypair::secret_key_bytes`], not a side effect of logging a
/// struct.
pub struct Keypair {
    signing_key: SigningKey,
}

impl Keypair {
    /// Generate a fresh keypair from the OS RNG.
    pub fn generate() -> Self {
        Self {
            signing_key: SigningKey::generate(&mut OsRng),
        }
    }

    /// Construct a keypair deterministically from a 32-byte seed.
    pub fn from_seed(seed: &[u8; SECRET_KEY_LENGTH]) -> Self {
        Self {
            signing_key: SigningKey::from_bytes(seed),
        }
    }

    /// Reconstruct a keypair from a hex-encoded 32-byte secret.
    pub fn from_hex(hex_str: &str) -> Result<Self, KeyError> {
        let bytes = hex::decode(hex_str.trim()).map_err(|_| KeyError::InvalidSecretKey)?;
        let seed: [u8; SECRET_KEY_LENGTH] = bytes
            .as_slice()
            .try_into()
            .map_err(|_| KeyError::InvalidSecretKey)?;
        Ok(Self::from_seed(&seed))
    }

    /// The public key as a ledger address.
    pub fn address(&self) -> Address {
        Address::new(self.signing_key.verifying_key().to_bytes())
    }

    /// Sign a message, returning the raw 64-byte signature.
    pub fn sign(&self, message: &[u8]) -> [u8; 64] {
        self.signing_key.sign(message).to_bytes()
    }

    /// Export the 32-byte secret. Handle with extreme care.
    pub fn secret_key_bytes(&self) -> [u8; SECRET_KEY_LENGTH] {
        self.signing_key.to_bytes()
    }
}

/// Verify a raw signature against an address interpreted as an Ed25519 key.
///
/// Returns `false` for off-curve addresses (program-derived ones) instead
/// of erroring: nobody can sign for those.
pub fn verify(address: &Address, message: &[u8], signature: &[u8; 64]) -> bool {
    let Ok(key) = VerifyingKey::from_bytes(address.as_bytes()) else {
        return false;
    };
    key.verify(message, &Signature::from_bytes(signature)).is_ok()
}

impl Clone for Keypair {
    fn clone(&self) -> Self {
        Self::from_seed(&self.signing_key.to_bytes())
    }
}

impl fmt::Debug for Keypair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Keypair(pub={})", self.address())
    }
}
