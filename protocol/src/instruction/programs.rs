//! On-chain program identifiers and one constructor per instruction kind.
//!
//! Account order and flags below are what the programs require. They are
//! pinned by the tests at the bottom of this file; change them only with the
//! program's source open next to you.

use crate::address::Address;
use crate::config::{CREATE_IDEMPOTENT_OPCODE, SYSTEM_TRANSFER_OPCODE, TOKEN_TRANSFER_OPCODE};
use crate::crypto::{find_program_address, PdaError};

use super::types::{AccountMeta, Instruction};

/// `11111111111111111111111111111111`
pub const SYSTEM_PROGRAM: Address = Address::new([0; 32]);

/// `TokenkegQfeZyiNwAJbNbGKPFXCWuBvf9Ss623VQ5DA`
pub const TOKEN_PROGRAM: Address = Address::new([
    6, 221, 246, 225, 215, 101, 161, 147, 217, 203, 225, 70, 206, 235, 121, 172, 28, 180, 133,
    237, 95, 91, 55, 145, 58, 140, 245, 133, 126, 255, 0, 169,
]);

/// `ATokenGPvbdGVxr1b2hvZbsiqW5xWH25efTNsLJA8knL`
pub const ASSOCIATED_TOKEN_PROGRAM: Address = Address::new([
    140, 151, 37, 143, 78, 36, 137, 241, 187, 61, 16, 41, 20, 142, 13, 131, 11, 90, 19, 153, 218,
    255, 16, 132, 4, 142, 123, 216, 219, 233, 248, 89,
]);

/// Derive the associated token account holding `mint` for `owner`.
///
/// Seeds are `[owner, token_program, mint]` under the associated token
/// program.
pub fn associated_token_address(owner: &Address, mint: &Address) -> Result<Address, PdaError> {
    let (address, _bump) = find_program_address(
        &[owner.as_bytes(), TOKEN_PROGRAM.as_bytes(), mint.as_bytes()],
        &ASSOCIATED_TOKEN_PROGRAM,
    )?;
    Ok(address)
}

/// System program `Transfer`: `[2u32 LE][lamports u64 LE]`.
pub fn system_transfer(from: &Address, to: &Address, lamports: u64) -> Instruction {
    let mut data = Vec::with_capacity(12);
    data.extend_from_slice(&SYSTEM_TRANSFER_OPCODE.to_le_bytes());
    data.extend_from_slice(&lamports.to_le_bytes());

    Instruction::new(
        SYSTEM_PROGRAM,
        vec![
            AccountMeta::writable(*from, true),
            AccountMeta::writable(*to, false),
        ],
        data,
    )
}

/// Token program `Transfer`: `[3][amount u64 LE]`.
pub fn token_transfer(
    source: &Address,
    destination: &Address,
    authority: &Address,
    amount: u64,
) -> Instruction {
    let mut data = Vec::with_capacity(9);
    data.push(TOKEN_TRANSFER_OPCODE);
    data.extend_from_slice(&amount.to_le_bytes());

    Instruction::new(
        TOKEN_PROGRAM,
        vec![
            AccountMeta::writable(*source, false),
            AccountMeta::writable(*destination, false),
            AccountMeta::readonly(*authority, true),
        ],
        data,
    )
}

/// Associated token program `CreateIdempotent`: succeeds whether or not the
/// account already exists, so it is safe to prepend blindly.
pub fn create_associated_token_account_idempotent(
    payer: &Address,
    associated_account: &Address,
    owner: &Address,
    mint: &Address,
) -> Instruction {
    Instruction::new(
        ASSOCIATED_TOKEN_PROGRAM,
        vec![
            AccountMeta::writable(*payer, true),
            AccountMeta::writable(*associated_account, false),
            AccountMeta::readonly(*owner, false),
            AccountMeta::readonly(*mint, false),
            AccountMeta::readonly(SYSTEM_PROGRAM, false),
            AccountMeta::readonly(TOKEN_PROGRAM, false),
        ],
        vec![CREATE_IDEMPOTENT_OPCODE],
    )
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
