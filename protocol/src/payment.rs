//! # Payment Flow
//!
//! The caller-side glue between a received URI and a submitted transaction:
//!
//! ```text
//! URI ─decode─▶ TransferRequest ─┬─ MintDecimalsOracle      (token only)
//!                                ├─ AccountExistenceOracle  (token only)
//!                                ├─ BlockReferenceSource
//!                                ▼
//!          TransferInstructionBuilder ─▶ assemble ─▶ Signer ─▶ Broadcaster
//! ```
//!
//! The codec, builder and assembler never touch the network. Every external
//! call happens here, each under its own timeout, and failures are handed
//! back unmodified inside [`PaymentError::Dependency`].
//!
//! The one soft dependency is the account-existence check: if it fails the
//! builder is told [`AccountStatus::Unknown`] and prepends the idempotent
//! create instruction, which is correct either way.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{debug, info, warn};

use crate::address::Address;
use crate::capability::{
    AccountExistenceOracle, BlockReferenceSource, Broadcaster, MintDecimalsOracle, Signer,
};
use crate::config::DEPENDENCY_TIMEOUT;
use crate::instruction::{
    associated_token_address, AccountStatus, BuildError, TransferInstructionBuilder,
};
use crate::transaction::{assemble, AssembleError, TransactionEnvelope};
use crate::transport::{TransportError, TransportEvent};
use crate::uri::{decode, decode_with_decimals, TransferRequest, UriError};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct PaymentConfig {
    /// Budget for each individual capability call.
    pub dependency_timeout: Duration,
}

impl Default for PaymentConfig {
    fn default() -> Self {
        Self {
            dependency_timeout: DEPENDENCY_TIMEOUT,
        }
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum PaymentError {
    #[error(transparent)]
    Uri(#[from] UriError),

    #[error(transparent)]
    Build(#[from] BuildError),

    #[error(transparent)]
    Assemble(#[from] AssembleError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    /// An external capability failed. `source` is exactly what it returned.
    #[error("{capability} failed: {source}")]
    Dependency {
        capability: &'static str,
        #[source]
        source: anyhow::Error,
    },

    #[error("{capability} did not answer within {millis} ms")]
    Timeout { capability: &'static str, millis: u64 },
}

/// What a successful payment leaves behind.
#[derive(Debug, Clone, Serialize)]
pub struct PaymentReceipt {
    /// The id the broadcaster returned.
    pub confirmation_id: String,
    /// The request that was paid, with resolved decimals.
    pub request: TransferRequest,
    pub envelope: TransactionEnvelope,
}

// ---------------------------------------------------------------------------
// PaymentFlow
// ---------------------------------------------------------------------------

pub struct PaymentFlow {
    signer: Arc<dyn Signer>,
    broadcaster: Arc<dyn Broadcaster>,
    block_source: Arc<dyn BlockReferenceSource>,
    accounts: Option<Arc<dyn AccountExistenceOracle>>,
    mints: Option<Arc<dyn MintDecimalsOracle>>,
    config: PaymentConfig,
}

impl PaymentFlow {
    pub fn new(
        signer: Arc<dyn Signer>,
        broadcaster: Arc<dyn Broadcaster>,
        block_source: Arc<dyn BlockReferenceSource>,
    ) -> Self {
        Self {
            signer,
            broadcaster,
            block_source,
            accounts: None,
            mints: None,
            config: PaymentConfig::default(),
        }
    }

    /// Check whether the recipient's token account exists before building.
    /// Without it every token payment carries the create instruction.
    pub fn with_account_oracle(mut self, oracle: Arc<dyn AccountExistenceOracle>) -> Self {
        self.accounts = Some(oracle);
        self
    }

    /// Resolve each mint's real decimals. Without it tokens default to 9.
    pub fn with_mint_oracle(mut self, oracle: Arc<dyn MintDecimalsOracle>) -> Self {
        self.mints = Some(oracle);
        self
    }

    pub fn with_config(mut self, config: PaymentConfig) -> Self {
        self.config = config;
        self
    }

    /// Decode `uri` and, for token requests, fix up the mint's decimals.
    ///
    /// With decimals known the URI is decoded a second time, so an amount
    /// finer than the mint allows is rejected here rather than rounded away.
    pub async fn resolve_request(&self, uri: &str) -> Result<TransferRequest, PaymentError> {
        let request = decode(uri)?;
        let (Some(oracle), Some(mint)) = (self.mints.as_ref(), request.spl_token.clone()) else {
            return Ok(request);
        };

        // decode() has already validated the mint.
        let mint =
            Address::parse(&mint).map_err(|reason| UriError::SplTokenInvalid(reason.to_string()))?;
        let decimals = self
            .call("mint decimals oracle", oracle.decimals(&mint))
            .await?;
        debug!(mint = %mint, decimals, "resolved mint decimals");
        Ok(decode_with_decimals(uri, &|_: &Address| Some(decimals))?)
    }

    /// Build and assemble the transaction paying `request` from `sender`.
    pub async fn prepare(
        &self,
        sender: &Address,
        request: &TransferRequest,
    ) -> Result<TransactionEnvelope, PaymentError> {
        let status = self.recipient_account_status(request).await?;
        let sender_text = sender.to_string();
        let instructions = TransferInstructionBuilder::new(&sender_text, request)
            .recipient_account(status)
            .build()?;

        let block = self
            .call("block reference source", self.block_source.latest())
            .await?;
        Ok(assemble(instructions, block, *sender)?)
    }

    /// Resolve, prepare, sign and submit.
    pub async fn pay(&self, sender: &Address, uri: &str) -> Result<PaymentReceipt, PaymentError> {
        let request = self.resolve_request(uri).await?;
        self.pay_request(sender, request).await
    }

    /// Prepare, sign and submit an already resolved request, such as the one
    /// [`PaymentFlow::receive_request`] returns.
    pub async fn pay_request(
        &self,
        sender: &Address,
        request: TransferRequest,
    ) -> Result<PaymentReceipt, PaymentError> {
        let envelope = self.prepare(sender, &request).await?;

        let signed = self
            .call("signer", self.signer.sign(&envelope, sender))
            .await?;
        let confirmation_id = self
            .call("broadcaster", self.broadcaster.submit(&signed))
            .await?;

        info!(
            confirmation = %confirmation_id,
            recipient = %request.recipient,
            amount = %request.amount,
            token = request.is_token(),
            "payment submitted"
        );
        Ok(PaymentReceipt {
            confirmation_id,
            request,
            envelope,
        })
    }

    /// Wait on a transport's events for the next received URI and resolve
    /// it. A transport fault ends the wait with that fault. Unless it is
    /// `Halted` the reader is still polling and the caller can wait again.
    pub async fn receive_request(
        &self,
        events: &mut broadcast::Receiver<TransportEvent>,
    ) -> Result<TransferRequest, PaymentError> {
        loop {
            match events.recv().await {
                Ok(TransportEvent::MessageReceived(uri)) => return self.resolve_request(&uri).await,
                Ok(TransportEvent::TransportError(e)) => return Err(e.into()),
                Ok(TransportEvent::ModeChanged(_)) => continue,
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "transport events lagged");
                }
                Err(RecvError::Closed) => {
                    return Err(TransportError::Halted("event channel closed".into()).into());
                }
            }
        }
    }

    async fn recipient_account_status(
        &self,
        request: &TransferRequest,
    ) -> Result<AccountStatus, PaymentError> {
        let (Some(oracle), Some(mint)) = (&self.accounts, &request.spl_token) else {
            return Ok(AccountStatus::Unknown);
        };
        let owner = parse_build_field("recipient", &request.recipient)?;
        let mint = parse_build_field("spl-token", mint)?;
        let ata = associated_token_address(&owner, &mint).map_err(BuildError::from)?;

        match self.call("account existence oracle", oracle.exists(&ata)).await {
            Ok(true) => Ok(AccountStatus::Exists),
            Ok(false) => Ok(AccountStatus::Missing),
            Err(e) => {
                warn!(account = %ata, error = %e, "account check failed, assuming unknown");
                Ok(AccountStatus::Unknown)
            }
        }
    }

    async fn call<T, F>(&self, capability: &'static str, fut: F) -> Result<T, PaymentError>
    where
        F: Future<Output = anyhow::Result<T>>,
    {
        let budget = self.config.dependency_timeout;
        match tokio::time::timeout(budget, fut).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(source)) => Err(PaymentError::Dependency { capability, source }),
            Err(_) => Err(PaymentError::Timeout {
                capability,
                millis: budget.as_millis() as u64,
            }),
        }
    }
}

fn parse_build_field(field: &'static str, value: &str) -> Result<Address, BuildError> {
    Address::parse(value).map_err(|reason| BuildError::InvalidAddress {
        field,
        value: value.to_string(),
        reason,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::{
        FixedMintDecimals, KeypairSigner, MemoryBroadcaster, StaticBlockReference,
    };
    use crate::crypto::Keypair;
    use crate::instruction::programs::{ASSOCIATED_TOKEN_PROGRAM, TOKEN_PROGRAM};
    use crate::transaction::BlockReference;
    use crate::transport::{ContactlessTransport, TransportMode};
    use async_trait::async_trait;

    struct Accounts(anyhow::Result<bool>);

    #[async_trait]
    impl AccountExistenceOracle for Accounts {
        async fn exists(&self, _address: &Address) -> anyhow::Result<bool> {
            match &self.0 {
                Ok(b) => Ok(*b),
                Err(e) => Err(anyhow::anyhow!("{e}")),
            }
        }
    }

    struct HangingSource;

    #[async_trait]
    impl BlockReferenceSource for HangingSource {
        async fn latest(&self) -> anyhow::Result<BlockReference> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(BlockReference::new([0; 32]))
        }
    }

    struct RejectingBroadcaster;

    #[async_trait]
    impl Broadcaster for RejectingBroadcaster {
        async fn submit(&self, _signed: &[u8]) -> anyhow::Result<String> {
            anyhow::bail!("blockhash not found")
        }
    }

    fn keypair() -> Keypair {
        Keypair::from_seed(&[1; 32])
    }

    fn flow(broadcaster: Arc<dyn Broadcaster>) -> PaymentFlow {
        PaymentFlow::new(
            Arc::new(KeypairSigner::new(keypair())),
            broadcaster,
            Arc::new(StaticBlockReference(BlockReference::new([7; 32]))),
        )
    }

    fn recipient() -> Address {
        Address::new([2; 32])
    }

    fn mint() -> Address {
        Address::new([9; 32])
    }

    #[tokio::test]
    async fn pays_native_request() {
        let broadcaster = MemoryBroadcaster::new();
        let flow = flow(Arc::new(broadcaster.clone()));
        let uri = format!("solana:{}?amount=0.25", recipient());

        let receipt = flow.pay(&keypair().address(), &uri).await.unwrap();
        assert_eq!(receipt.envelope.fee_payer, keypair().address());
        assert_eq!(receipt.envelope.instructions.len(), 1);
        assert_eq!(broadcaster.submitted().len(), 1);
        assert!(receipt.confirmation_id.len() > 80);
    }

    #[tokio::test]
    async fn mint_oracle_sets_decimals_and_revalidates_precision() {
        let flow = flow(Arc::new(MemoryBroadcaster::new()))
            .with_mint_oracle(Arc::new(FixedMintDecimals(2)));

        let ok = format!("solana:{}?amount=1.25&spl-token={}", recipient(), mint());
        assert_eq!(flow.resolve_request(&ok).await.unwrap().token_decimals, 2);

        let too_fine = format!("solana:{}?amount=1.255&spl-token={}", recipient(), mint());
        assert!(matches!(
            flow.resolve_request(&too_fine).await,
            Err(PaymentError::Uri(UriError::AmountInvalid(_)))
        ));
    }

    #[tokio::test]
    async fn existing_account_skips_create() {
        let flow = flow(Arc::new(MemoryBroadcaster::new()))
            .with_account_oracle(Arc::new(Accounts(Ok(true))));
        let request =
            TransferRequest::token(recipient().to_string(), "1".parse().unwrap(), mint().to_string());

        let env = flow.prepare(&keypair().address(), &request).await.unwrap();
        assert_eq!(env.instructions.len(), 1);
        assert_eq!(env.instructions[0].program_id, TOKEN_PROGRAM);
    }

    #[tokio::test]
    async fn failed_account_check_falls_back_to_create() {
        let flow = flow(Arc::new(MemoryBroadcaster::new()))
            .with_account_oracle(Arc::new(Accounts(Err(anyhow::anyhow!("rpc down")))));
        let request =
            TransferRequest::token(recipient().to_string(), "1".parse().unwrap(), mint().to_string());

        let env = flow.prepare(&keypair().address(), &request).await.unwrap();
        assert_eq!(env.instructions.len(), 2);
        assert_eq!(env.instructions[0].program_id, ASSOCIATED_TOKEN_PROGRAM);
    }

    #[tokio::test]
    async fn broadcaster_error_propagates_unmodified() {
        let flow = flow(Arc::new(RejectingBroadcaster));
        let uri = format!("solana:{}?amount=1", recipient());
        match flow.pay(&keypair().address(), &uri).await {
            Err(PaymentError::Dependency { capability, source }) => {
                assert_eq!(capability, "broadcaster");
                assert_eq!(source.to_string(), "blockhash not found");
            }
            other => panic!("expected dependency error, got {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn hanging_block_source_times_out() {
        let flow = PaymentFlow::new(
            Arc::new(KeypairSigner::new(keypair())),
            Arc::new(MemoryBroadcaster::new()),
            Arc::new(HangingSource),
        )
        .with_config(PaymentConfig {
            dependency_timeout: Duration::from_secs(2),
        });
        let request = TransferRequest::native(recipient().to_string(), "1".parse().unwrap());
        assert!(matches!(
            flow.prepare(&keypair().address(), &request).await,
            Err(PaymentError::Timeout {
                capability: "block reference source",
                millis: 2000
            })
        ));
    }

    #[tokio::test]
    async fn wrong_signer_key_is_a_dependency_error() {
        let flow = flow(Arc::new(MemoryBroadcaster::new()));
        let uri = format!("solana:{}?amount=1", recipient());
        let stranger = Address::new([5; 32]);
        assert!(matches!(
            flow.pay(&stranger, &uri).await,
            Err(PaymentError::Dependency { capability: "signer", .. })
        ));
    }

    #[tokio::test]
    async fn receive_request_from_transport_events() {
        let flow = flow(Arc::new(MemoryBroadcaster::new()));
        let transport = ContactlessTransport::default();
        let mut events = transport.subscribe();

        transport.set_mode(TransportMode::Sending("ignored".into()));
        transport.set_mode(TransportMode::Receiving);
        let card = crate::transport::EmulatedCard::new(Arc::new({
            let peer = ContactlessTransport::default();
            peer.set_mode(TransportMode::Sending(format!("solana:{}?amount=3", recipient())));
            peer
        }));
        transport.on_tag_discovered(&card).await;

        let request = flow.receive_request(&mut events).await.unwrap();
        assert_eq!(request.amount.to_string(), "3");

        transport.reset_with_error("user cancelled");
        assert!(matches!(
            flow.receive_request(&mut events).await,
            Err(PaymentError::Transport(TransportError::Halted(_)))
        ));
    }

    #[tokio::test]
    async fn received_token_request_pays_at_mint_decimals() {
        let broadcaster = MemoryBroadcaster::new();
        let flow = flow(Arc::new(broadcaster.clone()))
            .with_mint_oracle(Arc::new(FixedMintDecimals(6)));
        let reader = ContactlessTransport::default();
        let mut events = reader.subscribe();
        let card = crate::transport::EmulatedCard::new(Arc::new({
            let peer = ContactlessTransport::default();
            peer.set_mode(TransportMode::Sending(format!(
                "solana:{}?amount=1.5&spl-token={}",
                recipient(),
                mint()
            )));
            peer
        }));
        reader.on_tag_discovered(&card).await;

        let request = flow.receive_request(&mut events).await.unwrap();
        assert_eq!(request.token_decimals, 6);
        let receipt = flow
            .pay_request(&keypair().address(), request)
            .await
            .unwrap();

        let transfer = receipt.envelope.instructions.last().unwrap();
        assert_eq!(transfer.program_id, TOKEN_PROGRAM);
        assert_eq!(&transfer.data[1..], &1_500_000u64.to_le_bytes());
        assert_eq!(broadcaster.submitted().len(), 1);
    }
}
