//! # External Capabilities
//!
//! Everything this crate needs from the outside world, as async traits:
//! key custody, network submission, fresh block hashes and account
//! lookups. A wallet wires in its secure-element signer and RPC client;
//! tests and the CLI use the local implementations at the bottom.
//!
//! Failures come back as `anyhow::Error` and are passed to the caller
//! untouched. This crate never reinterprets a signer refusal or a
//! broadcaster rejection.

use std::sync::Arc;

use anyhow::{bail, Context};
use async_trait::async_trait;
use parking_lot::Mutex;

use crate::address::Address;
use crate::crypto::Keypair;
use crate::transaction::{BlockReference, SignedTransaction, TransactionEnvelope};

/// Produces signed wire bytes for an envelope.
#[async_trait]
pub trait Signer: Send + Sync {
    async fn sign(&self, envelope: &TransactionEnvelope, key: &Address) -> anyhow::Result<Vec<u8>>;
}

/// Submits signed wire bytes and returns a confirmation id.
#[async_trait]
pub trait Broadcaster: Send + Sync {
    async fn submit(&self, signed: &[u8]) -> anyhow::Result<String>;
}

/// Supplies a recent block hash.
#[async_trait]
pub trait BlockReferenceSource: Send + Sync {
    async fn latest(&self) -> anyhow::Result<BlockReference>;
}

/// Answers whether an account exists on the ledger.
#[async_trait]
pub trait AccountExistenceOracle: Send + Sync {
    async fn exists(&self, address: &Address) -> anyhow::Result<bool>;
}

/// Answers how many decimals a token mint uses.
#[async_trait]
pub trait MintDecimalsOracle: Send + Sync {
    async fn decimals(&self, mint: &Address) -> anyhow::Result<u8>;
}

// ---------------------------------------------------------------------------
// Local implementations
// ---------------------------------------------------------------------------

/// Signs with an in-process Ed25519 keypair.
///
/// Only signs messages whose sole required signer is this keypair.
#[derive(Debug, Clone)]
pub struct KeypairSigner {
    keypair: Keypair,
}

impl KeypairSigner {
    pub fn new(keypair: Keypair) -> Self {
        Self { keypair }
    }

    pub fn address(&self) -> Address {
        self.keypair.address()
    }
}

#[async_trait]
impl Signer for KeypairSigner {
    async fn sign(&self, envelope: &TransactionEnvelope, key: &Address) -> anyhow::Result<Vec<u8>> {
        let own = self.keypair.address();
        if *key != own {
            bail!("signer holds the key for {own}, not {key}");
        }

        let message = envelope.compile().context("compiling transaction message")?;
        if message.signers() != [own] {
            bail!(
                "transaction needs {} signatures, this signer can only provide one",
                message.signers().len()
            );
        }

        let signature = self.keypair.sign(&message.serialize());
        Ok(SignedTransaction {
            signatures: vec![signature],
            message,
        }
        .serialize())
    }
}

/// Always returns the same block hash. For offline signing and tests.
#[derive(Debug, Clone, Copy)]
pub struct StaticBlockReference(pub BlockReference);

#[async_trait]
impl BlockReferenceSource for StaticBlockReference {
    async fn latest(&self) -> anyhow::Result<BlockReference> {
        Ok(self.0)
    }
}

/// Reports the same decimals for every mint. For a payer that already
/// knows the mint, and for tests.
#[derive(Debug, Clone, Copy)]
pub struct FixedMintDecimals(pub u8);

#[async_trait]
impl MintDecimalsOracle for FixedMintDecimals {
    async fn decimals(&self, _mint: &Address) -> anyhow::Result<u8> {
        Ok(self.0)
    }
}

/// Keeps submitted transactions in memory. The confirmation id is the
/// base58 first signature, which is how the ledger names a transaction.
#[derive(Debug, Default, Clone)]
pub struct MemoryBroadcaster {
    submitted: Arc<Mutex<Vec<Vec<u8>>>>,
}

impl MemoryBroadcaster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn submitted(&self) -> Vec<Vec<u8>> {
        self.submitted.lock().clone()
    }
}

#[async_trait]
impl Broadcaster for MemoryBroadcaster {
    async fn submit(&self, signed: &[u8]) -> anyhow::Result<String> {
        // compact-u16 count (one byte below 128 signatures), then signatures.
        let first = signed
            .get(1..65)
            .filter(|_| signed.first().is_some_and(|&n| n > 0))
            .context("transaction carries no signature")?;
        self.submitted.lock().push(signed.to_vec());
        Ok(bs58::encode(first).into_string())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
