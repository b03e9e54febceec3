//! Transfer instruction construction via the builder pattern.
//!
//! [`TransferInstructionBuilder`] takes a sender and a decoded request and
//! returns the ordered instruction list:
//!
//! ```text
//! native: [ system::Transfer ]
//! token:  [ ata::CreateIdempotent (unless the recipient account is known
//!           to exist), token::Transfer ]
//! ```
//!
//! Reference addresses ride along on the final transfer instruction as
//! read-only accounts, after the accounts the program requires, so the payee
//! can find the transaction by reference.

use tracing::debug;

use super::error::BuildError;
use super::programs::{
    associated_token_address, create_associated_token_account_idempotent, system_transfer,
    token_transfer,
};
use super::types::{AccountMeta, Instruction};
use crate::address::Address;
use crate::amount::{AmountError, DecimalAmount};
use crate::config::NATIVE_DECIMALS;
use crate::uri::TransferRequest;

/// What the caller knows about the recipient's token account.
///
/// Existence checks need the network, which the builder never touches; the
/// caller resolves it (or doesn't) beforehand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AccountStatus {
    /// Confirmed to exist: no create instruction.
    Exists,
    /// Confirmed missing.
    Missing,
    /// Not checked or the check failed.
    #[default]
    Unknown,
}

/// Build the instructions for `request`, paid by `sender`, without any
/// knowledge of the recipient's token account.
pub fn build_transfer_instructions(
    sender: &str,
    request: &TransferRequest,
) -> Result<Vec<Instruction>, BuildError> {
    TransferInstructionBuilder::new(sender, request).build()
}

/// Fluent builder for transfer instructions.
///
/// # Usage
///
/// ```rust,no_run
/// use tapay_protocol::instruction::{AccountStatus, TransferInstructionBuilder};
/// use tapay_protocol::uri::decode;
///
/// let request = decode("solana:...?amount=1.5").unwrap();
/// let instructions = TransferInstructionBuilder::new("sender-address", &request)
///     .recipient_account(AccountStatus::Exists)
///     .build()
///     .unwrap();
/// ```
pub struct TransferInstructionBuilder<'a> {
    sender: &'a str,
    request: &'a TransferRequest,
    recipient_account: AccountStatus,
}

impl<'a> TransferInstructionBuilder<'a> {
    pub fn new(sender: &'a str, request: &'a TransferRequest) -> Self {
        Self {
            sender,
            request,
            recipient_account: AccountStatus::Unknown,
        }
    }

    /// Sets what is known about the recipient's associated token account.
    /// Ignored for native transfers.
    pub fn recipient_account(mut self, status: AccountStatus) -> Self {
        self.recipient_account = status;
        self
    }

    /// Consumes the builder and produces the ordered instruction list.
    pub fn build(self) -> Result<Vec<Instruction>, BuildError> {
        let sender = parse_field("sender", self.sender)?;
        let recipient = parse_field("recipient", &self.request.recipient)?;
        let references = self
            .request
            .references
            .iter()
            .map(|r| parse_field("reference", r))
            .collect::<Result<Vec<_>, _>>()?;

        let mut instructions = match &self.request.spl_token {
            None => {
                let lamports = to_smallest_units(&self.request.amount, NATIVE_DECIMALS)?;
                vec![system_transfer(&sender, &recipient, lamports)]
            }
            Some(mint) => {
                let mint = parse_field("spl-token", mint)?;
                let decimals = self.request.token_decimals;
                let amount = to_smallest_units(&self.request.amount, decimals)?;
                self.token_instructions(&sender, &recipient, &mint, amount)?
            }
        };

        if let Some(transfer) = instructions.last_mut() {
            transfer
                .accounts
                .extend(references.into_iter().map(|r| AccountMeta::readonly(r, false)));
        }

        debug!(
            sender = %sender,
            recipient = %recipient,
            token = self.request.is_token(),
            instructions = instructions.len(),
            "built transfer instructions"
        );
        Ok(instructions)
    }

    fn token_instructions(
        &self,
        sender: &Address,
        recipient: &Address,
        mint: &Address,
        amount: u64,
    ) -> Result<Vec<Instruction>, BuildError> {
        let sender_ata = associated_token_address(sender, mint)?;
        let recipient_ata = associated_token_address(recipient, mint)?;

        let mut instructions = Vec::with_capacity(2);
        if self.recipient_account != AccountStatus::Exists {
            instructions.push(create_associated_token_account_idempotent(
                sender,
                &recipient_ata,
                recipient,
                mint,
            ));
        }
        instructions.push(token_transfer(&sender_ata, &recipient_ata, sender, amount));
        Ok(instructions)
    }
}

fn parse_field(field: &'static str, value: &str) -> Result<Address, BuildError> {
    Address::parse(value).map_err(|reason| BuildError::InvalidAddress {
        field,
        value: value.to_string(),
        reason,
    })
}

fn to_smallest_units(amount: &DecimalAmount, decimals: u8) -> Result<u64, BuildError> {
    let units = amount.to_smallest_units(decimals).map_err(|e| match e {
        AmountError::Overflow { amount, decimals } => BuildError::AmountOverflow { amount, decimals },
        AmountError::Malformed(amount) => BuildError::AmountOverflow { amount, decimals },
    })?;
    if units == 0 {
        return Err(BuildError::ZeroAmount {
            amount: amount.to_string(),
            decimals,
        });
    }
    Ok(units)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
