//! # Protocol Configuration & Constants
//!
//! Every magic number in TAPAY lives here. Two phones built from different
//! codebases have to agree on these bytes exactly, so treat this file as a
//! versioned wire contract: changing a value means bumping the matching
//! version constant.

use std::time::Duration;

// ---------------------------------------------------------------------------
// Contract Versions
// ---------------------------------------------------------------------------

/// Version of the payment-request URI grammar implemented by [`crate::uri`].
pub const URI_FORMAT_VERSION: u16 = 1;

/// Version of the contactless framing (AID, SELECT header, status words).
pub const CONTACT_PROTOCOL_VERSION: u16 = 1;

/// Crate version string, for CLI banners and logs.
pub const PROTOCOL_VERSION: &str = "0.1.0";

// ---------------------------------------------------------------------------
// Payment-Request URI
// ---------------------------------------------------------------------------

/// URI scheme carried by every payment request.
pub const URI_SCHEME: &str = "solana";

/// Hard cap on the encoded URI, in UTF-8 bytes. Anything larger is rejected
/// before a single character is parsed.
pub const MAX_URI_LENGTH: usize = 2048;

/// Query parameter names, in the order the encoder emits them.
pub const PARAM_AMOUNT: &str = "amount";
pub const PARAM_SPL_TOKEN: &str = "spl-token";
pub const PARAM_REFERENCE: &str = "reference";
pub const PARAM_LABEL: &str = "label";
pub const PARAM_MESSAGE: &str = "message";
pub const PARAM_MEMO: &str = "memo";

// ---------------------------------------------------------------------------
// Amounts & Decimals
// ---------------------------------------------------------------------------

/// Decimals of the native asset (1 SOL = 10^9 lamports).
pub const NATIVE_DECIMALS: u8 = 9;

/// Decimals assumed for a token mint when no lookup is available. Only a
/// default: real mints range from 0 to 9 and the caller should resolve them.
pub const DEFAULT_TOKEN_DECIMALS: u8 = 9;

/// Maximum fractional digits a request amount may carry on the wire.
pub const MAX_FRACTION_DIGITS: usize = 9;

// ---------------------------------------------------------------------------
// Addresses
// ---------------------------------------------------------------------------

/// Raw address length in bytes.
pub const ADDRESS_LENGTH: usize = 32;

/// Shortest base58 text form accepted for an address.
pub const ADDRESS_MIN_CHARS: usize = 32;

/// Longest base58 text form accepted for an address.
pub const ADDRESS_MAX_CHARS: usize = 44;

/// The 58-symbol address alphabet. No `0`, `O`, `I` or `l`.
pub const ADDRESS_ALPHABET: &str =
    "123456789ABCDEFGHJKLMNPQRSTUVWXYZabcdefghijkmnopqrstuvwxyz";

// ---------------------------------------------------------------------------
// Ledger Programs
// ---------------------------------------------------------------------------

/// System program (native transfers, account creation).
pub const SYSTEM_PROGRAM_ID: &str = "11111111111111111111111111111111";

/// SPL Token program.
pub const TOKEN_PROGRAM_ID: &str = "TokenkegQfeZyiNwAJbNbGKPFXCWuBvf9Ss623VQ5DA";

/// Associated Token Account program.
pub const ASSOCIATED_TOKEN_PROGRAM_ID: &str = "ATokenGPvbdGVxr1b2hvZbsiqW5xWH25efTNsLJA8knL";

/// System program `Transfer` discriminant, encoded as a little-endian u32.
pub const SYSTEM_TRANSFER_OPCODE: u32 = 2;

/// Token program `Transfer` discriminant, a single byte.
pub const TOKEN_TRANSFER_OPCODE: u8 = 3;

/// Associated token program `CreateIdempotent` discriminant.
pub const CREATE_IDEMPOTENT_OPCODE: u8 = 1;

/// Domain marker appended to every program-derived address preimage.
pub const PDA_MARKER: &[u8] = b"ProgramDerivedAddress";

/// Limits on program-derived address seeds.
pub const MAX_SEED_LENGTH: usize = 32;
pub const MAX_SEEDS: usize = 16;

// ---------------------------------------------------------------------------
// Contactless Framing
// ---------------------------------------------------------------------------

/// Application identifier shared by both peers: a proprietary `F0` AID
/// followed by "TAPAY" and the framing version.
pub const AID: [u8; 7] = [0xF0, 0x54, 0x41, 0x50, 0x41, 0x59, 0x01];

/// SELECT-by-name command header: CLA, INS, P1, P2.
pub const SELECT_HEADER: [u8; 4] = [0x00, 0xA4, 0x04, 0x00];

/// Status word appended to a successful response.
pub const SW_SUCCESS: [u8; 2] = [0x90, 0x00];

/// Generic failure status word ("no precise diagnosis").
pub const SW_FAILURE: [u8; 2] = [0x6F, 0x00];

// ---------------------------------------------------------------------------
// Timing
// ---------------------------------------------------------------------------

/// How long a reader waits for the card to answer a SELECT. Contactless
/// round-trips finish in tens of milliseconds; a second means the phones
/// have already drifted apart.
pub const TRANSCEIVE_TIMEOUT: Duration = Duration::from_millis(1_000);

/// Default budget for each external capability call made by the payment flow.
pub const DEPENDENCY_TIMEOUT: Duration = Duration::from_secs(15);

/// Capacity of the transport event channel. Subscribers that fall further
/// behind than this see a `Lagged` error and resume from the newest event.
pub const EVENT_CHANNEL_CAPACITY: usize = 64;

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
