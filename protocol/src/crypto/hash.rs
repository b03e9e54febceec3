//! # Hashing Utilities
//!
//! SHA-256 is the only hash the ledger asks of us: program-derived
//! addresses are SHA-256 over the seeds, the bump, the program id and a
//! fixed marker.

use sha2::{Digest, Sha256};

/// Compute the SHA-256 hash of the input data.
///
/// # Example
///
/// ```
/// use tapay_protocol::crypto::sha256;
///
/// let hash = sha256(b"tapay");
/// assert_eq!(hash.len(), 32);
/// ```
pub fn sha256(data: &[u8]) -> [u8; 32] {
    sha256_multi(&[data])
}

/// Hash multiple byte slices as if they were concatenated, without
/// building the concatenation.
pub fn sha256_multi(parts: &[&[u8]]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part);
    }
    hasher.finalize().into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sha256_known_vector() {
        // NIST: SHA-256("abc")
        assert_eq!(
            hex::encode(sha256(b"abc")),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn multi_equals_concatenation() {
        assert_eq!(sha256_multi(&[b"ab", b"", b"c"]), sha256(b"abc"));
    }
}
