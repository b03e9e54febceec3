//! The signable envelope and its freshness token.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use tracing::debug;

use super::error::AssembleError;
use super::message::CompiledMessage;
use crate::address::{Address, AddressError};
use crate::instruction::Instruction;

/// A recent block hash. The ledger refuses transactions whose reference is
/// too old, which is what stops a captured transaction from being replayed
/// later.
///
/// Opaque to this crate: it is fetched by a
/// [`BlockReferenceSource`](crate::capability::BlockReferenceSource) and
/// copied into the message untouched.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlockReference([u8; 32]);

impl BlockReference {
    pub const fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Parse the base58 text form. Block hashes share the address encoding.
    pub fn parse(s: &str) -> Result<Self, AddressError> {
        Address::parse(s).map(|a| Self(a.to_bytes()))
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_base58(&self) -> String {
        bs58::encode(self.0).into_string()
    }
}

impl FromStr for BlockReference {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for BlockReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_base58())
    }
}

impl fmt::Debug for BlockReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BlockReference({})", self.to_base58())
    }
}

impl Serialize for BlockReference {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_base58())
    }
}

impl<'de> Deserialize<'de> for BlockReference {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}

/// Everything a signer needs: instructions, freshness token, fee payer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionEnvelope {
    pub instructions: Vec<Instruction>,
    pub recent_block_reference: BlockReference,
    pub fee_payer: Address,
}

impl TransactionEnvelope {
    /// Lay the envelope out as a legacy ledger message.
    pub fn compile(&self) -> Result<CompiledMessage, AssembleError> {
        CompiledMessage::compile(
            &self.instructions,
            &self.fee_payer,
            &self.recent_block_reference,
        )
    }

    /// The exact bytes a signer signs.
    pub fn message_bytes(&self) -> Result<Vec<u8>, AssembleError> {
        Ok(self.compile()?.serialize())
    }
}

/// Wrap instructions into an envelope. The only check is that there is at
/// least one instruction; nothing is signed or sent.
pub fn assemble(
    instructions: Vec<Instruction>,
    recent_block_reference: BlockReference,
    fee_payer: Address,
) -> Result<TransactionEnvelope, AssembleError> {
    if instructions.is_empty() {
        return Err(AssembleError::EmptyTransaction);
    }
    debug!(
        instructions = instructions.len(),
        fee_payer = %fee_payer,
        block_reference = %recent_block_reference,
        "assembled transaction envelope"
    );
    Ok(TransactionEnvelope {
        instructions,
        recent_block_reference,
        fee_payer,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instruction::programs::system_transfer;

    fn transfer() -> Instruction {
        system_transfer(&Address::new([1; 32]), &Address::new([2; 32]), 10)
    }

    #[test]
    fn assemble_keeps_inputs_verbatim() {
        let block = BlockReference::new([7; 32]);
        let payer = Address::new([1; 32]);
        let env = assemble(vec![transfer()], block, payer).unwrap();
        assert_eq!(env.instructions, vec![transfer()]);
        assert_eq!(env.recent_block_reference, block);
        assert_eq!(env.fee_payer, payer);
    }

    #[test]
    fn empty_instruction_list_rejected() {
        assert_eq!(
            assemble(vec![], BlockReference::new([7; 32]), Address::new([1; 32])),
            Err(AssembleError::EmptyTransaction)
        );
    }

    #[test]
    fn block_reference_text_form() {
        let block = BlockReference::new([7; 32]);
        let text = block.to_string();
        assert_eq!(text.parse::<BlockReference>().unwrap(), block);
        assert!("not-a-hash".parse::<BlockReference>().is_err());
    }

    #[test]
    fn envelope_json_roundtrip() {
        let env = assemble(
            vec![transfer()],
            BlockReference::new([7; 32]),
            Address::new([1; 32]),
        )
        .unwrap();
        let json = serde_json::to_string(&env).unwrap();
        assert!(json.contains(&BlockReference::new([7; 32]).to_string()));
        let back: TransactionEnvelope = serde_json::from_str(&json).unwrap();
        assert_eq!(back, env);
    }

    #[test]
    fn message_bytes_are_deterministic() {
        let build = || {
            assemble(
                vec![transfer()],
                BlockReference::new([7; 32]),
                Address::new([1; 32]),
            )
            .unwrap()
        };
        assert_eq!(
            build().message_bytes().unwrap(),
            build().message_bytes().unwrap()
        );
    }
}
