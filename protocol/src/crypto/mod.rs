//! # Cryptographic Primitives
//!
//! Everything security-related in the protocol flows through here: content
//! hashing, symmetric encryption, and the sealed-box construction that
//! carries contract documents to the federation.
//!
//! We deliberately chose boring, well-audited cryptography:
//!
//! - **BLAKE3** for hashing — content addresses and key derivation.
//! - **AES-256-GCM** for symmetric encryption — AEAD done right.
//! - **X25519** for key agreement — an ephemeral key per document, so a
//!   ciphertext is bound to exactly one recipient key.
//!
//! Everything here is a thin, type-safe wrapper around audited
//! implementations. If you're tempted to optimize these functions, go read
//! about timing attacks and come back when you've lost the urge.

pub mod encryption;
pub mod hash;
pub mod sealed;

pub use encryption::{decrypt, encrypt};
pub use hash::blake3_hash;
pub use sealed::{FederationKeypair, SealedDocument};
