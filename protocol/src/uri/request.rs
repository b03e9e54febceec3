//! The decoded form of a payment request.

use serde::{Deserialize, Serialize};

use crate::amount::DecimalAmount;
use crate::config::{DEFAULT_TOKEN_DECIMALS, NATIVE_DECIMALS};

/// What the payee asks for.
///
/// Address fields are kept as text: the codec validates them on the way in
/// and the instruction builder validates them again before touching the
/// ledger, so a request built by hand cannot skip the address rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferRequest {
    /// Payee's wallet address.
    pub recipient: String,
    /// Amount in whole units of the asset (not smallest units).
    pub amount: DecimalAmount,
    /// Token mint; `None` means the native asset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spl_token: Option<String>,
    /// Decimals of the asset being transferred.
    pub token_decimals: u8,
    /// Opaque addresses attached to the transfer so the payee can find it.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub references: Vec<String>,
    /// Who is asking (e.g. a shop name).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// What the payment is for.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Memo recorded on the ledger.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memo: Option<String>,
}

impl TransferRequest {
    /// A native-asset request with no optional fields.
    pub fn native(recipient: impl Into<String>, amount: DecimalAmount) -> Self {
        Self {
            recipient: recipient.into(),
            amount,
            spl_token: None,
            token_decimals: NATIVE_DECIMALS,
            references: Vec::new(),
            label: None,
            message: None,
            memo: None,
        }
    }

    /// A token request. Decimals start at the default; set them with
    /// [`TransferRequest::with_decimals`] once the mint is known.
    pub fn token(
        recipient: impl Into<String>,
        amount: DecimalAmount,
        mint: impl Into<String>,
    ) -> Self {
        Self {
            spl_token: Some(mint.into()),
            token_decimals: DEFAULT_TOKEN_DECIMALS,
            ..Self::native(recipient, amount)
        }
    }

    pub fn with_decimals(mut self, decimals: u8) -> Self {
        self.token_decimals = decimals;
        self
    }

    pub fn with_reference(mut self, reference: impl Into<String>) -> Self {
        self.references.push(reference.into());
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_memo(mut self, memo: impl Into<String>) -> Self {
        self.memo = Some(memo.into());
        self
    }

    /// Returns `true` for a token (rather than native) transfer.
    pub fn is_token(&self) -> bool {
        self.spl_token.is_some()
    }
}
