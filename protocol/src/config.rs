//! # Protocol Configuration & Constants
//!
//! Every magic number in the Fichaje protocol lives here. If you're
//! hardcoding a constant somewhere else, you're doing it wrong.
//!
//! The distribution rates in particular are consensus-critical: every
//! participant must compute the same payout split for the same transfer
//! value, or settled transfers stop adding up.

// ---------------------------------------------------------------------------
// Fund Distribution
// ---------------------------------------------------------------------------

/// Basis-point denominator. All rates are expressed in basis points
/// (1 bp = 0.01%) and divided by this value.
pub const RATE_DENOMINATOR_BPS: u64 = 10_000;

/// Formation-rights cut of the transfer value, in basis points.
/// 500 bps = 5%. Paid to the designated formation-rights account on
/// approval, compensating the clubs that trained the player.
pub const FORMATION_RATE_BPS: u64 = 500;

/// Agent commission, in basis points. 500 bps = 5%. Paid to the transfer's
/// agent on approval; redirected to the origin club when no agent is
/// designated, so the three shares always sum to the full value.
pub const AGENT_RATE_BPS: u64 = 500;

// ---------------------------------------------------------------------------
// Cryptographic Parameters
// ---------------------------------------------------------------------------

/// Ed25519 for actor signatures. Deterministic, compact, well-audited.
pub const SIGNING_ALGORITHM: &str = "Ed25519";

/// Ed25519 secret key length in bytes.
pub const SIGNING_KEY_LENGTH: usize = 32;

/// Ed25519 public key length in bytes.
pub const VERIFYING_KEY_LENGTH: usize = 32;

/// Ed25519 signature length. Always 64 bytes.
pub const SIGNATURE_LENGTH: usize = 64;

/// X25519 for the document sealed-box key agreement.
pub const KEY_EXCHANGE_ALGORITHM: &str = "X25519";

/// X25519 key length in bytes (both halves).
pub const EXCHANGE_KEY_LENGTH: usize = 32;

/// AES-256-GCM for the symmetric layer of the sealed box. 256-bit keys,
/// 96-bit nonces, 128-bit authentication tags.
pub const SYMMETRIC_ALGORITHM: &str = "AES-256-GCM";

/// AES-256-GCM key length in bytes.
pub const AES_KEY_LENGTH: usize = 32;

/// AES-256-GCM nonce length in bytes. 96 bits is the standard and the only
/// length you should use.
pub const AES_NONCE_LENGTH: usize = 12;

/// AES-256-GCM authentication tag length in bytes.
pub const AES_TAG_LENGTH: usize = 16;

/// Hash function for content addressing and address derivation.
pub const PRIMARY_HASH_FUNCTION: &str = "BLAKE3";

/// Hash output length in bytes.
pub const HASH_OUTPUT_LENGTH: usize = 32;

/// Domain-separation context for deriving the sealed-box symmetric key from
/// the X25519 shared secret. Changing this string re-keys every document
/// ever sealed, so don't.
pub const SEALED_KDF_CONTEXT: &str = "fichaje-protocol sealed document v1";

/// Version tag carried in the sealed-document wire format. Bumped on any
/// incompatible change to the bundle layout.
pub const SEALED_BUNDLE_VERSION: u8 = 1;

// ---------------------------------------------------------------------------
// Addresses
// ---------------------------------------------------------------------------

/// Bech32 human-readable prefix for all protocol addresses.
pub const ADDRESS_HRP: &str = "fich";

// ---------------------------------------------------------------------------
// Limits
// ---------------------------------------------------------------------------

/// Maximum size of a contract document accepted by the custody workflow,
/// in bytes. Signed transfer contracts are PDFs, not film archives.
pub const MAX_DOCUMENT_SIZE_BYTES: usize = 32 * 1024 * 1024;

/// Maximum player name length in bytes.
pub const MAX_PLAYER_NAME_LENGTH: usize = 256;

/// Maximum club name length in bytes.
pub const MAX_CLUB_NAME_LENGTH: usize = 256;

// ---------------------------------------------------------------------------
// Network Defaults
// ---------------------------------------------------------------------------

/// Default port for the ledger HTTP API.
pub const DEFAULT_API_PORT: u16 = 9640;

/// Default port for the Prometheus metrics endpoint.
pub const DEFAULT_METRICS_PORT: u16 = 9641;

/// Protocol version string, kept in sync with the crate version.
pub const PROTOCOL_VERSION: &str = "0.1.0";
