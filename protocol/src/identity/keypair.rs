//! # Actor Keypairs
//!
//! Ed25519 keypair generation and signing for protocol actors.
//!
//! ## Why Ed25519?
//!
//! - Deterministic signatures (no k-value footguns like ECDSA).
//! - 128-bit security level in 32+32 bytes.
//! - Constant-time implementations exist and are well-audited.
//!
//! ## Security considerations
//!
//! - Private keys are zeroized on drop (thanks, ed25519-dalek).
//! - Key generation uses `OsRng`. If your OS RNG is broken, you have
//!   bigger problems than football transfers.
//! - Key bytes are never logged.

use ed25519_dalek::{
    Signature as DalekSignature, Signer, SigningKey, Verifier, VerifyingKey, SECRET_KEY_LENGTH,
};
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::identity::address::Address;

/// Errors that can occur during key operations.
///
/// Intentionally vague about *why* something failed — leaking details about
/// key material through error messages is a classic footgun.
#[derive(Debug, Error)]
pub enum KeyError {
    #[error("invalid secret key bytes: wrong length or not a valid scalar")]
    InvalidSecretKey,

    #[error("invalid public key bytes: not a valid Ed25519 point")]
    InvalidPublicKey,
}

/// An actor's Ed25519 keypair.
///
/// This is the atomic unit of identity: a club, the federation authority,
/// and an agent are each, at bottom, one of these. The signing key is the
/// crown jewel — it never leaves the actor's environment, and this type
/// intentionally does NOT implement `Serialize`. Exporting the secret is a
/// deliberate act via [`secret_key_bytes`](Self::secret_key_bytes).
///
/// # Examples
///
/// ```
/// use fichaje_protocol::identity::ActorKeypair;
///
/// let club = ActorKeypair::generate();
/// let sig = club.sign(b"sign transfer 7");
/// assert!(club.public_key().verify(b"sign transfer 7", &sig));
/// ```
pub struct ActorKeypair {
    signing_key: SigningKey,
}

/// The public half of an actor identity, safe to share with the world.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActorPublicKey {
    bytes: [u8; 32],
}

/// An Ed25519 signature over a submitted action.
///
/// 64 bytes, deterministic for a given (key, message) pair. Stored as
/// `Vec<u8>` for serde compatibility; a wrong-length signature simply fails
/// verification — no panics.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActorSignature {
    bytes: Vec<u8>,
}

impl ActorKeypair {
    /// Generate a fresh keypair using the OS cryptographic RNG.
    pub fn generate() -> Self {
        Self {
            signing_key: SigningKey::generate(&mut OsRng),
        }
    }

    /// Construct a keypair deterministically from a 32-byte seed.
    ///
    /// In Ed25519 the 32-byte secret key *is* the seed. A weak seed makes
    /// a weak key; use a CSPRNG or KDF to produce it.
    pub fn from_seed(seed: &[u8; 32]) -> Self {
        Self {
            signing_key: SigningKey::from_bytes(seed),
        }
    }

    /// Reconstruct a keypair from a hex-encoded secret key, as stored in a
    /// devnet key file.
    pub fn from_hex(hex_str: &str) -> Result<Self, KeyError> {
        let bytes = hex::decode(hex_str).map_err(|_| KeyError::InvalidSecretKey)?;
        let arr: [u8; SECRET_KEY_LENGTH] =
            bytes.try_into().map_err(|_| KeyError::InvalidSecretKey)?;
        Ok(Self::from_seed(&arr))
    }

    /// The public key for this keypair.
    pub fn public_key(&self) -> ActorPublicKey {
        ActorPublicKey {
            bytes: self.signing_key.verifying_key().to_bytes(),
        }
    }

    /// The protocol address derived from this keypair's public key.
    pub fn address(&self) -> Address {
        self.public_key().address()
    }

    /// Sign a message. Ed25519 signatures are deterministic — no nonce
    /// management, no RNG needed at signing time.
    pub fn sign(&self, message: &[u8]) -> ActorSignature {
        ActorSignature {
            bytes: self.signing_key.sign(message).to_bytes().to_vec(),
        }
    }

    /// Export the raw 32-byte secret key material. Handle with care:
    /// don't log it, don't transmit it, don't paste it into a chat.
    pub fn secret_key_bytes(&self) -> [u8; 32] {
        self.signing_key.to_bytes()
    }
}

impl Clone for ActorKeypair {
    /// Cloning a keypair is allowed but should make you uncomfortable.
    /// Every copy of a private key is another thing to protect.
    fn clone(&self) -> Self {
        Self {
            signing_key: SigningKey::from_bytes(&self.signing_key.to_bytes()),
        }
    }
}

impl fmt::Debug for ActorKeypair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Never print secret key material in debug output. Not even partially.
        write!(f, "ActorKeypair(addr={})", self.address())
    }
}

impl ActorPublicKey {
    /// Create a public key from raw bytes without validation.
    ///
    /// Use [`try_from_slice`](Self::try_from_slice) for untrusted input.
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self { bytes }
    }

    /// Validate a byte slice as an Ed25519 public key.
    ///
    /// Rejects wrong lengths and bytes that are not a valid curve point —
    /// some 32-byte values aren't, and accepting them invites degenerate
    /// cases later.
    pub fn try_from_slice(slice: &[u8]) -> Result<Self, KeyError> {
        let bytes: [u8; 32] = slice.try_into().map_err(|_| KeyError::InvalidPublicKey)?;
        VerifyingKey::from_bytes(&bytes).map_err(|_| KeyError::InvalidPublicKey)?;
        Ok(Self { bytes })
    }

    /// Raw key bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.bytes
    }

    /// The protocol address for this public key.
    pub fn address(&self) -> Address {
        Address::from_public_key_bytes(&self.bytes)
    }

    /// Verify a signature against this public key.
    ///
    /// Returns a plain boolean — callers want a yes/no answer, not a
    /// taxonomy of the ways a forged signature can be wrong.
    pub fn verify(&self, message: &[u8], signature: &ActorSignature) -> bool {
        let Ok(verifying_key) = VerifyingKey::from_bytes(&self.bytes) else {
            return false;
        };
        let sig_bytes: [u8; 64] = match signature.bytes.as_slice().try_into() {
            Ok(b) => b,
            Err(_) => return false,
        };
        verifying_key
            .verify(message, &DalekSignature::from_bytes(&sig_bytes))
            .is_ok()
    }

    /// Hex-encoded representation.
    pub fn to_hex(&self) -> String {
        hex::encode(self.bytes)
    }
}

impl fmt::Debug for ActorPublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ActorPublicKey({})", &self.to_hex()[..16])
    }
}

impl ActorSignature {
    /// Create a signature from its raw 64-byte representation.
    pub fn from_bytes(bytes: [u8; 64]) -> Self {
        Self {
            bytes: bytes.to_vec(),
        }
    }

    /// Raw signature bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Hex-encoded signature string.
    pub fn to_hex(&self) -> String {
        hex::encode(&self.bytes)
    }
}

impl fmt::Debug for ActorSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let hex_str = self.to_hex();
        if hex_str.len() >= 128 {
            write!(f, "ActorSignature({}...{})", &hex_str[..8], &hex_str[120..])
        } else {
            write!(f, "ActorSignature({})", hex_str)
        }
    }
}
