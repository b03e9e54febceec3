// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # TAPAY CLI
//!
//! Entry point for the `tapay` binary. Parses CLI arguments, initializes
//! logging, and dispatches to the requested subcommand.
//!
//! Results go to stdout (a bare URI, or pretty JSON); logs go to stderr.

mod cli;
mod logging;

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;
use tracing::info;

use tapay_protocol::capability::{
    FixedMintDecimals, KeypairSigner, MemoryBroadcaster, StaticBlockReference,
};
use tapay_protocol::config::{CONTACT_PROTOCOL_VERSION, PROTOCOL_VERSION, URI_FORMAT_VERSION};
use tapay_protocol::crypto::Keypair;
use tapay_protocol::instruction::{AccountStatus, TransferInstructionBuilder};
use tapay_protocol::transaction::BlockReference;
use tapay_protocol::transport::{ContactOutcome, ProximityField};
use tapay_protocol::uri::decode_with_decimals;
use tapay_protocol::{
    assemble, decode, encode, Address, ContactlessTransport, DecimalAmount, Instruction,
    PaymentFlow, TransactionEnvelope, TransferRequest, TransportMode,
};

use crate::cli::{
    BuildArgs, Commands, DecodeArgs, EncodeArgs, RecipientAccount, RequestArgs, SimulateArgs,
    TapayCli,
};
use crate::logging::init_logging;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = TapayCli::parse();
    init_logging(&cli.log_level, cli.log_format);

    match cli.command {
        Commands::Encode(args) => run_encode(args),
        Commands::Decode(args) => run_decode(args),
        Commands::Build(args) => run_build(args),
        Commands::Simulate(args) => run_simulate(args).await,
        Commands::Version => {
            print_version();
            Ok(())
        }
    }
}

// ---------------------------------------------------------------------------
// Subcommands
// ---------------------------------------------------------------------------

fn run_encode(args: EncodeArgs) -> Result<()> {
    let request = request_from_args(args.recipient, &args.request)?;
    let uri = encode(&request).context("encoding payment request")?;
    println!("{uri}");
    Ok(())
}

fn run_decode(args: DecodeArgs) -> Result<()> {
    let request = decode_uri(&args.uri, args.decimals)?;
    print_json(&request)
}

#[derive(Serialize)]
struct BuildOutput {
    request: TransferRequest,
    instructions: Vec<Instruction>,
    #[serde(skip_serializing_if = "Option::is_none")]
    envelope: Option<TransactionEnvelope>,
    #[serde(skip_serializing_if = "Option::is_none")]
    message_hex: Option<String>,
}

fn run_build(args: BuildArgs) -> Result<()> {
    let request = decode_uri(&args.uri, args.decimals)?;
    let status = match args.recipient_account {
        RecipientAccount::Exists => AccountStatus::Exists,
        RecipientAccount::Missing => AccountStatus::Missing,
        RecipientAccount::Unknown => AccountStatus::Unknown,
    };
    let instructions = TransferInstructionBuilder::new(&args.sender, &request)
        .recipient_account(status)
        .build()
        .context("building transfer instructions")?;

    let (envelope, message_hex) = match args.blockhash {
        Some(blockhash) => {
            let block = BlockReference::parse(&blockhash)
                .with_context(|| format!("invalid block hash {blockhash:?}"))?;
            let payer = Address::parse(&args.sender).context("invalid sender address")?;
            let envelope = assemble(instructions.clone(), block, payer)
                .context("assembling transaction")?;
            let message = envelope.message_bytes().context("compiling message")?;
            (Some(envelope), Some(hex::encode(message)))
        }
        None => (None, None),
    };

    print_json(&BuildOutput {
        request,
        instructions,
        envelope,
        message_hex,
    })
}

#[derive(Serialize)]
struct SimulationReport {
    uri: String,
    payee: Address,
    payer: Address,
    confirmation_id: String,
    signed_transaction_hex: String,
    instructions: Vec<Instruction>,
}

async fn run_simulate(args: SimulateArgs) -> Result<()> {
    let report = simulate(&args).await?;
    print_json(&report)
}

/// Two phones in memory: the payee stages a request, the payer taps, reads
/// it, signs and submits to an in-memory broadcaster.
async fn simulate(args: &SimulateArgs) -> Result<SimulationReport> {
    let payer_key = match &args.payer_key {
        Some(hex) => Keypair::from_hex(hex).context("invalid payer key")?,
        None => Keypair::generate(),
    };
    let payee_key = Keypair::generate();
    let payer = payer_key.address();
    let payee = payee_key.address();

    let request = request_from_args(payee.to_string(), &args.request)?;
    let uri = encode(&request).context("encoding payment request")?;

    let payee_phone = Arc::new(ContactlessTransport::default());
    let payer_phone = Arc::new(ContactlessTransport::default());
    payee_phone.set_mode(TransportMode::Sending(uri.clone()));
    let mut events = payer_phone.subscribe();

    let field = ProximityField::between(Arc::clone(&payer_phone), Arc::clone(&payee_phone));
    let delivered = match field.tap().await {
        ContactOutcome::Delivered(payload) => payload,
        ContactOutcome::Failed(e) => anyhow::bail!("contactless exchange failed: {e}"),
        ContactOutcome::NoExchange => anyhow::bail!("phones did not exchange a request"),
    };

    let broadcaster = MemoryBroadcaster::new();
    let block = BlockReference::new(rand::random());
    let mut flow = PaymentFlow::new(
        Arc::new(KeypairSigner::new(payer_key)),
        Arc::new(broadcaster.clone()),
        Arc::new(StaticBlockReference(block)),
    );
    if let Some(decimals) = args.request.decimals {
        flow = flow.with_mint_oracle(Arc::new(FixedMintDecimals(decimals)));
    }

    let received = flow
        .receive_request(&mut events)
        .await
        .context("reading request from transport")?;
    info!(recipient = %received.recipient, amount = %received.amount, "request received");

    let receipt = flow
        .pay_request(&payer, received)
        .await
        .context("paying request")?;
    let signed = broadcaster
        .submitted()
        .pop()
        .context("broadcaster recorded no transaction")?;

    Ok(SimulationReport {
        uri: delivered,
        payee,
        payer,
        confirmation_id: receipt.confirmation_id,
        signed_transaction_hex: hex::encode(signed),
        instructions: receipt.envelope.instructions,
    })
}

fn print_version() {
    println!("tapay {PROTOCOL_VERSION}");
    println!("  uri format:          v{URI_FORMAT_VERSION}");
    println!("  contactless protocol: v{CONTACT_PROTOCOL_VERSION}");
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn request_from_args(recipient: String, args: &RequestArgs) -> Result<TransferRequest> {
    let amount = DecimalAmount::parse(&args.amount)
        .with_context(|| format!("invalid amount {:?}", args.amount))?;

    let mut request = match &args.spl_token {
        Some(mint) => {
            let request = TransferRequest::token(recipient, amount, mint.clone());
            match args.decimals {
                Some(decimals) => request.with_decimals(decimals),
                None => request,
            }
        }
        None => TransferRequest::native(recipient, amount),
    };
    request.references = args.references.clone();
    request.label = args.label.clone();
    request.message = args.message.clone();
    request.memo = args.memo.clone();
    Ok(request)
}

fn decode_uri(uri: &str, decimals: Option<u8>) -> Result<TransferRequest> {
    let request = match decimals {
        Some(d) => decode_with_decimals(uri, &|_: &Address| Some(d)),
        None => decode(uri),
    };
    request.context("decoding payment URI")
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("serializing output")?;
    println!("{json}");
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    use tapay_protocol::instruction::programs::{SYSTEM_PROGRAM, TOKEN_PROGRAM};

    fn simulate_args(amount: &str, spl_token: Option<String>, decimals: Option<u8>) -> SimulateArgs {
        SimulateArgs {
            request: RequestArgs {
                amount: amount.to_string(),
                spl_token,
                decimals,
                references: Vec::new(),
                label: Some("Kiosk".to_string()),
                message: None,
                memo: None,
            },
            payer_key: Some(hex::encode([3u8; 32])),
        }
    }

    #[tokio::test]
    async fn simulate_pays_token_at_requested_decimals() {
        let mint = Address::new([0x77; 32]).to_string();
        let report = simulate(&simulate_args("1.5", Some(mint.clone()), Some(6)))
            .await
            .unwrap();

        assert!(report.uri.contains(&format!("spl-token={mint}")));
        let transfer = report.instructions.last().unwrap();
        assert_eq!(transfer.program_id, TOKEN_PROGRAM);
        assert_eq!(&transfer.data[1..], &1_500_000u64.to_le_bytes());
    }

    #[tokio::test]
    async fn simulate_pays_native_in_lamports() {
        let report = simulate(&simulate_args("0.25", None, None)).await.unwrap();

        assert_eq!(report.payer, Keypair::from_seed(&[3; 32]).address());
        assert_eq!(report.instructions.len(), 1);
        let transfer = &report.instructions[0];
        assert_eq!(transfer.program_id, SYSTEM_PROGRAM);
        assert_eq!(&transfer.data[4..], &250_000_000u64.to_le_bytes());
    }
}
