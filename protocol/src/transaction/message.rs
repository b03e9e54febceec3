//! Legacy ledger message compilation and the signed wire format.
//!
//! ```text
//! message   = header(3) ‖ cu16(n) ‖ key_0..key_n ‖ blockhash(32)
//!             ‖ cu16(m) ‖ ix_0..ix_m
//! header    = [num_required_signatures, num_readonly_signed,
//!              num_readonly_unsigned]
//! ix        = program_index(1) ‖ cu16(k) ‖ account_index_0..k
//!             ‖ cu16(len) ‖ data
//! signed tx = cu16(s) ‖ signature_0..s (64 each) ‖ message
//! ```
//!
//! `cu16` is the ledger's compact-u16: seven bits per byte, low bits first,
//! high bit set on every byte but the last.
//!
//! Account keys are grouped as writable signers, read-only signers,
//! writable non-signers, read-only non-signers. The fee payer is always key
//! zero. Inside a group keys keep the order in which they were first seen.
//! A key's flags are the union over every place it appears.

use std::collections::HashMap;

use super::envelope::BlockReference;
use super::error::AssembleError;
use crate::address::Address;
use crate::crypto::keys::verify;
use crate::instruction::Instruction;

const MAX_ACCOUNT_KEYS: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageHeader {
    pub num_required_signatures: u8,
    pub num_readonly_signed_accounts: u8,
    pub num_readonly_unsigned_accounts: u8,
}

/// An instruction with its addresses replaced by indices into the key table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledInstruction {
    pub program_id_index: u8,
    pub accounts: Vec<u8>,
    pub data: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledMessage {
    pub header: MessageHeader,
    pub account_keys: Vec<Address>,
    pub recent_block_reference: BlockReference,
    pub instructions: Vec<CompiledInstruction>,
}

#[derive(Debug, Clone, Copy, Default)]
struct KeyFlags {
    signer: bool,
    writable: bool,
}

impl CompiledMessage {
    pub fn compile(
        instructions: &[Instruction],
        fee_payer: &Address,
        recent_block_reference: &BlockReference,
    ) -> Result<Self, AssembleError> {
        if instructions.is_empty() {
            return Err(AssembleError::EmptyTransaction);
        }

        let mut seen: Vec<Address> = Vec::new();
        let mut flags: HashMap<Address, KeyFlags> = HashMap::new();
        let mut note = |key: &Address, signer: bool, writable: bool| {
            let entry = flags.entry(*key).or_insert_with(|| {
                seen.push(*key);
                KeyFlags::default()
            });
            entry.signer |= signer;
            entry.writable |= writable;
        };

        note(fee_payer, true, true);
        for ix in instructions {
            note(&ix.program_id, false, false);
            for meta in &ix.accounts {
                note(&meta.pubkey, meta.is_signer, meta.is_writable);
            }
        }

        if seen.len() > MAX_ACCOUNT_KEYS {
            return Err(AssembleError::TooManyAccounts(seen.len()));
        }

        let group = |signer: bool, writable: bool| {
            seen.iter()
                .copied()
                .filter(|k| {
                    let f = flags[k];
                    f.signer == signer && f.writable == writable
                })
                .collect::<Vec<_>>()
        };
        let writable_signed = group(true, true);
        let readonly_signed = group(true, false);
        let writable_unsigned = group(false, true);
        let readonly_unsigned = group(false, false);

        // Read-only groups never hold the fee payer, so they stay below 256.
        let signer_count = writable_signed.len() + readonly_signed.len();
        let header = MessageHeader {
            num_required_signatures: u8::try_from(signer_count)
                .map_err(|_| AssembleError::TooManyAccounts(seen.len()))?,
            num_readonly_signed_accounts: readonly_signed.len() as u8,
            num_readonly_unsigned_accounts: readonly_unsigned.len() as u8,
        };

        let account_keys: Vec<Address> = writable_signed
            .into_iter()
            .chain(readonly_signed)
            .chain(writable_unsigned)
            .chain(readonly_unsigned)
            .collect();
        let index: HashMap<Address, u8> = account_keys
            .iter()
            .enumerate()
            .map(|(i, k)| (*k, i as u8))
            .collect();

        let instructions = instructions
            .iter()
            .map(|ix| CompiledInstruction {
                program_id_index: index[&ix.program_id],
                accounts: ix.accounts.iter().map(|m| index[&m.pubkey]).collect(),
                data: ix.data.clone(),
            })
            .collect();

        Ok(Self {
            header,
            account_keys,
            recent_block_reference: *recent_block_reference,
            instructions,
        })
    }

    /// Keys that must sign, in signature order. A header claiming more
    /// signers than there are keys yields only the keys present.
    pub fn signers(&self) -> &[Address] {
        let count = (self.header.num_required_signatures as usize).min(self.account_keys.len());
        &self.account_keys[..count]
    }

    pub fn serialize(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(
            3 + 1 + self.account_keys.len() * 32 + 32 + 1 + self.instructions.len() * 16,
        );
        out.push(self.header.num_required_signatures);
        out.push(self.header.num_readonly_signed_accounts);
        out.push(self.header.num_readonly_unsigned_accounts);

        write_compact_u16(&mut out, self.account_keys.len());
        for key in &self.account_keys {
            out.extend_from_slice(key.as_bytes());
        }
        out.extend_from_slice(self.recent_block_reference.as_bytes());

        write_compact_u16(&mut out, self.instructions.len());
        for ix in &self.instructions {
            out.push(ix.program_id_index);
            write_compact_u16(&mut out, ix.accounts.len());
            out.extend_from_slice(&ix.accounts);
            write_compact_u16(&mut out, ix.data.len());
            out.extend_from_slice(&ix.data);
        }
        out
    }
}

/// A compiled message plus one signature per required signer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedTransaction {
    pub signatures: Vec<[u8; 64]>,
    pub message: CompiledMessage,
}

impl SignedTransaction {
    /// Wire bytes, ready for a broadcaster.
    pub fn serialize(&self) -> Vec<u8> {
        let message = self.message.serialize();
        let mut out = Vec::with_capacity(1 + self.signatures.len() * 64 + message.len());
        write_compact_u16(&mut out, self.signatures.len());
        for sig in &self.signatures {
            out.extend_from_slice(sig);
        }
        out.extend_from_slice(&message);
        out
    }

    /// Checks the signature count and every signature against its signer.
    pub fn verify(&self) -> bool {
        let signers = self.message.signers();
        let required = self.message.header.num_required_signatures as usize;
        if signers.len() != required || signers.len() != self.signatures.len() {
            return false;
        }
        let message = self.message.serialize();
        signers
            .iter()
            .zip(&self.signatures)
            .all(|(key, sig)| verify(key, &message, sig))
    }
}

/// Append `value` in compact-u16 form. Lengths in this crate stay far below
/// `u16::MAX`; larger values would produce a longer, invalid encoding.
fn write_compact_u16(out: &mut Vec<u8>, mut value: usize) {
    loop {
        let byte = (value & 0x7f) as u8;
        value >>= 7;
        if value == 0 {
            out.push(byte);
            return;
        }
        out.push(byte | 0x80);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
