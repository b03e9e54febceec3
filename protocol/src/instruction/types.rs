//! Core instruction types.

use serde::{Deserialize, Serialize};

use crate::address::Address;

/// One account referenced by an instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountMeta {
    pub pubkey: Address,
    pub is_signer: bool,
    pub is_writable: bool,
}

impl AccountMeta {
    /// A writable account.
    pub fn writable(pubkey: Address, is_signer: bool) -> Self {
        Self {
            pubkey,
            is_signer,
            is_writable: true,
        }
    }

    /// A read-only account.
    pub fn readonly(pubkey: Address, is_signer: bool) -> Self {
        Self {
            pubkey,
            is_signer,
            is_writable: false,
        }
    }
}

/// A single call into an on-chain program.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instruction {
    /// The program that executes the instruction.
    pub program_id: Address,
    /// Accounts in the order the program expects them.
    pub accounts: Vec<AccountMeta>,
    /// Program-specific payload.
    #[serde(with = "hex_bytes")]
    pub data: Vec<u8>,
}

impl Instruction {
    pub fn new(program_id: Address, accounts: Vec<AccountMeta>, data: Vec<u8>) -> Self {
        Self {
            program_id,
            accounts,
            data,
        }
    }

    /// Addresses that must sign, in account order.
    pub fn signers(&self) -> impl Iterator<Item = &Address> {
        self.accounts
            .iter()
            .filter(|meta| meta.is_signer)
            .map(|meta| &meta.pubkey)
    }
}

/// Instruction data as hex in JSON output.
mod hex_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(deserializer)?;
        hex::decode(s).map_err(serde::de::Error::custom)
    }
}
