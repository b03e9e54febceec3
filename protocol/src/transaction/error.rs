//! Error types for transaction assembly.

use thiserror::Error;

/// Failures while assembling or compiling a transaction.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AssembleError {
    /// A transaction must carry at least one instruction.
    #[error("transaction has no instructions")]
    EmptyTransaction,

    /// Account indices are a single byte in the compiled message.
    #[error("transaction references {0} accounts (max 256)")]
    TooManyAccounts(usize),
}
