//! # CLI Interface
//!
//! Defines the command-line argument structure for `tapay` using `clap`
//! derive. Five subcommands: `encode`, `decode`, `build`, `simulate` and
//! `version`.

use clap::{Parser, Subcommand, ValueEnum};

use crate::logging::LogFormat;

/// TAPAY command-line tools.
///
/// Encode and decode payment-request URIs, build the transfer a payer would
/// sign, and run a full two-phone contactless payment in memory.
#[derive(Parser, Debug)]
#[command(name = "tapay", about = "TAPAY payment-request tools", version, propagate_version = true)]
pub struct TapayCli {
    /// Default log filter when `RUST_LOG` is not set.
    #[arg(long, global = true, env = "TAPAY_LOG", default_value = "warn")]
    pub log_level: String,

    /// Log output format.
    #[arg(long, global = true, env = "TAPAY_LOG_FORMAT", value_enum, default_value_t = LogFormat::Pretty)]
    pub log_format: LogFormat,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Encode a payment request as a URI.
    Encode(EncodeArgs),
    /// Decode a payment-request URI and print it as JSON.
    Decode(DecodeArgs),
    /// Build the instructions (and optionally the message) paying a URI.
    Build(BuildArgs),
    /// Run a complete payment between two simulated phones.
    Simulate(SimulateArgs),
    /// Print version information and exit.
    Version,
}

/// Request fields shared by `encode` and `simulate`.
#[derive(Parser, Debug)]
pub struct RequestArgs {
    /// Amount in whole units, as a plain decimal (`1.5`, not `1,5` or `1.5e0`).
    #[arg(long)]
    pub amount: String,

    /// Token mint. Omit for the native asset.
    #[arg(long)]
    pub spl_token: Option<String>,

    /// Decimals of the token mint.
    #[arg(long, requires = "spl_token")]
    pub decimals: Option<u8>,

    /// Reference address to attach. Repeatable.
    #[arg(long = "reference")]
    pub references: Vec<String>,

    #[arg(long)]
    pub label: Option<String>,

    #[arg(long)]
    pub message: Option<String>,

    #[arg(long)]
    pub memo: Option<String>,
}

/// Arguments for the `encode` subcommand.
#[derive(Parser, Debug)]
pub struct EncodeArgs {
    /// Recipient address.
    #[arg(long)]
    pub recipient: String,

    #[command(flatten)]
    pub request: RequestArgs,
}

/// Arguments for the `decode` subcommand.
#[derive(Parser, Debug)]
pub struct DecodeArgs {
    /// The payment-request URI.
    pub uri: String,

    /// Decimals to assume for the token mint, if the URI names one.
    #[arg(long)]
    pub decimals: Option<u8>,
}

/// What is known about the recipient's token account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum RecipientAccount {
    Exists,
    Missing,
    Unknown,
}

/// Arguments for the `build` subcommand.
#[derive(Parser, Debug)]
pub struct BuildArgs {
    /// The payment-request URI to pay.
    pub uri: String,

    /// Payer address.
    #[arg(long)]
    pub sender: String,

    /// Decimals to assume for the token mint, if the URI names one.
    #[arg(long)]
    pub decimals: Option<u8>,

    /// Whether the recipient's token account is known to exist.
    #[arg(long, value_enum, default_value_t = RecipientAccount::Unknown)]
    pub recipient_account: RecipientAccount,

    /// Recent block hash. When given, the assembled envelope and the hex
    /// message bytes to sign are printed as well.
    #[arg(long)]
    pub blockhash: Option<String>,
}

/// Arguments for the `simulate` subcommand.
#[derive(Parser, Debug)]
pub struct SimulateArgs {
    #[command(flatten)]
    pub request: RequestArgs,

    /// Hex-encoded 32-byte secret for the paying phone. Random when omitted.
    ///
    /// **Never pass a real key on the command line.**
    #[arg(long, env = "TAPAY_PAYER_KEY")]
    pub payer_key: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli_structure() {
        // Ensures the derive macros produce a valid CLI definition.
        TapayCli::command().debug_assert();
    }

    #[test]
    fn parses_repeated_references() {
        let cli = TapayCli::parse_from([
            "tapay",
            "encode",
            "--recipient",
            "r",
            "--amount",
            "1",
            "--reference",
            "a",
            "--reference",
            "b",
        ]);
        match cli.command {
            Commands::Encode(args) => assert_eq!(args.request.references, vec!["a", "b"]),
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn decimals_require_a_mint() {
        let res = TapayCli::try_parse_from([
            "tapay", "encode", "--recipient", "r", "--amount", "1", "--decimals", "6",
        ]);
        assert!(res.is_err());
    }
}
