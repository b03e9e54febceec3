//! # Program-Derived Addresses
//!
//! A program-derived address (PDA) is the SHA-256 of
//!
//! ```text
//! seed_0 ‖ seed_1 ‖ … ‖ [bump] ‖ program_id ‖ "ProgramDerivedAddress"
//! ```
//!
//! kept only if the digest is *not* a valid Ed25519 point. Off-curve means
//! no private key exists, so only the owning program can sign for it.
//! [`find_program_address`] walks the bump from 255 down and returns the
//! first off-curve hit, which every client on every platform will agree on.

use thiserror::Error;

use super::hash::sha256_multi;
use crate::address::Address;
use crate::config::{MAX_SEEDS, MAX_SEED_LENGTH, PDA_MARKER};

/// Errors from program-derived address derivation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PdaError {
    #[error("too many seeds: {0} (max {MAX_SEEDS})")]
    TooManySeeds(usize),

    #[error("seed {index} is {len} bytes (max {MAX_SEED_LENGTH})")]
    SeedTooLong { index: usize, len: usize },

    #[error("derived address lies on the Ed25519 curve")]
    OnCurve,

    #[error("no bump seed produced an off-curve address")]
    NoViableBump,
}

/// Derive the address for exactly these seeds. Fails with
/// [`PdaError::OnCurve`] if the result is a valid public key.
pub fn create_program_address(seeds: &[&[u8]], program_id: &Address) -> Result<Address, PdaError> {
    if seeds.len() > MAX_SEEDS {
        return Err(PdaError::TooManySeeds(seeds.len()));
    }
    if let Some((index, seed)) = seeds
        .iter()
        .enumerate()
        .find(|(_, s)| s.len() > MAX_SEED_LENGTH)
    {
        return Err(PdaError::SeedTooLong {
            index,
            len: seed.len(),
        });
    }

    let mut parts: Vec<&[u8]> = Vec::with_capacity(seeds.len() + 2);
    parts.extend_from_slice(seeds);
    parts.push(program_id.as_bytes());
    parts.push(PDA_MARKER);

    let candidate = Address::new(sha256_multi(&parts));
    if candidate.is_on_curve() {
        return Err(PdaError::OnCurve);
    }
    Ok(candidate)
}

/// Search for the canonical bump and return `(address, bump)`.
pub fn find_program_address(seeds: &[&[u8]], program_id: &Address) -> Result<(Address, u8), PdaError> {
    // The bump counts as a seed.
    if seeds.len() >= MAX_SEEDS {
        return Err(PdaError::TooManySeeds(seeds.len() + 1));
    }
    for bump in (1..=u8::MAX).rev() {
        let bump_seed = [bump];
        let mut with_bump: Vec<&[u8]> = Vec::with_capacity(seeds.len() + 1);
        with_bump.extend_from_slice(seeds);
        with_bump.push(&bump_seed);
        match create_program_address(&with_bump, program_id) {
            Ok(address) => return Ok((address, bump)),
            Err(PdaError::OnCurve) => continue,
            Err(e) => return Err(e),
        }
    }
    Err(PdaError::NoViableBump)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
