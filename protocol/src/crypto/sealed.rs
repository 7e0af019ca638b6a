//! # Sealed Documents — X25519 + AES-256-GCM Hybrid Encryption
//!
//! The confidential contract document travels from a submitting club to the
//! federation as a *sealed box*: the sender generates a fresh ephemeral
//! X25519 keypair, runs Diffie-Hellman against the federation's static
//! public key, derives an AES-256 key from the shared secret with BLAKE3's
//! `derive_key` mode, and encrypts the document under that key.
//!
//! The recipient key is mixed into the key derivation, so a bundle sealed
//! for one federation key cannot be quietly re-addressed to another — the
//! ciphertext is cryptographically bound to the intended recipient.
//!
//! ## Protocol Flow
//!
//! 1. Club seals the document to the federation public key. The ephemeral
//!    secret is consumed by the DH computation and never touches disk.
//! 2. The bundle (ephemeral public key, nonce, ciphertext + tag) is encoded
//!    to bytes and published to content-addressed storage.
//! 3. The federation reviewer fetches the bytes, decodes the bundle, and
//!    re-derives the same key from its static secret. The private key never
//!    leaves the reviewer's machine.
//!
//! ## Key Derivation
//!
//! The raw DH output is NOT used directly as an encryption key — DH outputs
//! are curve points with algebraic structure, not uniform bytes. We derive:
//!
//! ```text
//! key = blake3::derive_key(SEALED_KDF_CONTEXT,
//!                          dh_secret || ephemeral_pk || recipient_pk)
//! ```

use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use x25519_dalek::{EphemeralSecret, PublicKey, StaticSecret};

use crate::config::{AES_NONCE_LENGTH, SEALED_BUNDLE_VERSION, SEALED_KDF_CONTEXT};
use crate::crypto::encryption::{self, EncryptionError};
use crate::crypto::hash::derive_key;

/// Errors in the sealed-document construction.
#[derive(Debug, Error)]
pub enum SealedError {
    /// The bundle bytes did not decode to a well-formed [`SealedDocument`].
    #[error("malformed sealed bundle: {0}")]
    Malformed(String),

    /// The bundle decoded but carries a version this build does not speak.
    #[error("unsupported bundle version {got}, expected {expected}")]
    UnsupportedVersion {
        /// Version found in the bundle.
        got: u8,
        /// Version this build produces and accepts.
        expected: u8,
    },

    /// The symmetric layer rejected the ciphertext — wrong private key or
    /// tampered bundle. Indistinguishable on purpose.
    #[error("sealed bundle decryption failed -- wrong key or corrupted data")]
    DecryptFailed,

    /// The symmetric layer failed while sealing. Should not happen with a
    /// healthy RNG.
    #[error("sealing failed")]
    SealFailed,
}

impl From<EncryptionError> for SealedError {
    fn from(e: EncryptionError) -> Self {
        match e {
            EncryptionError::EncryptFailed => SealedError::SealFailed,
            _ => SealedError::DecryptFailed,
        }
    }
}

// ---------------------------------------------------------------------------
// Federation Keypair
// ---------------------------------------------------------------------------

/// The federation's static X25519 keypair — the single "padlock" every club
/// seals documents to.
///
/// Exactly one legitimate holder exists for the secret half. There is no
/// re-key operation here by design: generating a new keypair does not and
/// cannot re-encrypt historical documents, which stay sealed to the old
/// public key.
///
/// Like the signing keypairs in `identity`, this type intentionally does
/// NOT implement `Serialize` — exporting the secret is a deliberate act via
/// [`secret_bytes`](Self::secret_bytes), not a side effect of a JSON dump.
pub struct FederationKeypair {
    secret: StaticSecret,
    public: PublicKey,
}

impl FederationKeypair {
    /// Generate a fresh federation keypair from the OS CSPRNG.
    pub fn generate() -> Self {
        let secret = StaticSecret::random_from_rng(OsRng);
        let public = PublicKey::from(&secret);
        Self { secret, public }
    }

    /// Reconstruct a keypair from raw 32-byte secret key material.
    pub fn from_secret_bytes(bytes: [u8; 32]) -> Self {
        let secret = StaticSecret::from(bytes);
        let public = PublicKey::from(&secret);
        Self { secret, public }
    }

    /// The public half, safe to distribute to every club.
    pub fn public_key(&self) -> PublicKey {
        self.public
    }

    /// Raw public key bytes (32 bytes).
    pub fn public_key_bytes(&self) -> [u8; 32] {
        self.public.to_bytes()
    }

    /// Hex-encoded public key, as published in club-facing configuration.
    pub fn public_key_hex(&self) -> String {
        hex::encode(self.public.to_bytes())
    }

    /// Export the raw secret key bytes. Handle with extreme care — this is
    /// the only secret standing between an attacker and every confidential
    /// contract ever custodied.
    pub fn secret_bytes(&self) -> [u8; 32] {
        self.secret.to_bytes()
    }
}

impl std::fmt::Debug for FederationKeypair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Never print secret material, not even partially.
        write!(f, "FederationKeypair(pub={})", self.public_key_hex())
    }
}

// ---------------------------------------------------------------------------
// Sealed Document
// ---------------------------------------------------------------------------

/// A self-describing sealed-document bundle.
///
/// This is the wire format published to content-addressed storage. It must
/// round-trip byte-for-byte through [`to_bytes`](Self::to_bytes) /
/// [`from_bytes`](Self::from_bytes), because the content address is a hash
/// of exactly these bytes.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SealedDocument {
    /// Bundle format version. See [`SEALED_BUNDLE_VERSION`].
    pub version: u8,
    /// The sender's ephemeral X25519 public key.
    pub ephemeral_public_key: [u8; 32],
    /// AES-256-GCM nonce.
    pub nonce: [u8; AES_NONCE_LENGTH],
    /// Ciphertext with the 16-byte GCM authentication tag appended.
    pub ciphertext: Vec<u8>,
}

impl SealedDocument {
    /// Seal `plaintext` to the given recipient public key.
    ///
    /// A fresh ephemeral X25519 keypair is generated per call; its secret
    /// half is consumed by the DH computation and dropped. X25519's
    /// `EphemeralSecret` enforces the single-use at the type level —
    /// reusing an ephemeral key doesn't fail at runtime, it fails to
    /// compile.
    pub fn seal(recipient: &PublicKey, plaintext: &[u8]) -> Result<Self, SealedError> {
        let ephemeral = EphemeralSecret::random_from_rng(OsRng);
        let ephemeral_public = PublicKey::from(&ephemeral);
        let shared = ephemeral.diffie_hellman(recipient);

        let key = Self::session_key(shared.as_bytes(), &ephemeral_public, recipient);
        let (nonce, ciphertext) = encryption::encrypt(&key, plaintext)?;

        Ok(Self {
            version: SEALED_BUNDLE_VERSION,
            ephemeral_public_key: ephemeral_public.to_bytes(),
            nonce,
            ciphertext,
        })
    }

    /// Open the bundle with the recipient's static secret.
    ///
    /// # Errors
    ///
    /// [`SealedError::UnsupportedVersion`] if the bundle was produced by an
    /// incompatible build; [`SealedError::DecryptFailed`] for a wrong key
    /// or any tampering. Both are *integrity* failures, distinct from "the
    /// store couldn't find the bytes" — callers must not collapse them.
    pub fn open(&self, recipient: &FederationKeypair) -> Result<Vec<u8>, SealedError> {
        if self.version != SEALED_BUNDLE_VERSION {
            return Err(SealedError::UnsupportedVersion {
                got: self.version,
                expected: SEALED_BUNDLE_VERSION,
            });
        }

        let ephemeral_public = PublicKey::from(self.ephemeral_public_key);
        let shared = recipient.secret.diffie_hellman(&ephemeral_public);

        let key = Self::session_key(shared.as_bytes(), &ephemeral_public, &recipient.public);
        let plaintext = encryption::decrypt(&key, &self.nonce, &self.ciphertext)?;
        Ok(plaintext)
    }

    /// Encode the bundle to its stable byte representation.
    pub fn to_bytes(&self) -> Vec<u8> {
        bincode::serialize(self).expect("sealed bundle serialization is infallible")
    }

    /// Decode a bundle from bytes previously produced by [`to_bytes`].
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, SealedError> {
        bincode::deserialize(bytes).map_err(|e| SealedError::Malformed(e.to_string()))
    }

    /// Derive the symmetric key for this exchange. Both public keys are
    /// mixed in so the key — and therefore the ciphertext — is bound to
    /// this exact (ephemeral, recipient) pair.
    fn session_key(dh_secret: &[u8], ephemeral: &PublicKey, recipient: &PublicKey) -> [u8; 32] {
        let mut material = Vec::with_capacity(96);
        material.extend_from_slice(dh_secret);
        material.extend_from_slice(ephemeral.as_bytes());
        material.extend_from_slice(recipient.as_bytes());
        derive_key(SEALED_KDF_CONTEXT, &material)
    }
}

impl std::fmt::Debug for SealedDocument {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "SealedDocument(v{}, ephemeral={}, {} ciphertext bytes)",
            self.version,
            &hex::encode(self.ephemeral_public_key)[..16],
            self.ciphertext.len()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seal_open_roundtrip() {
        let federation = FederationKeypair::generate();
        let plaintext = b"contrato confidencial del jugador";

        let sealed = SealedDocument::seal(&federation.public_key(), plaintext).unwrap();
        let opened = sealed.open(&federation).unwrap();
        assert_eq!(opened, plaintext);
    }

    #[test]
    fn empty_document_seals() {
        let federation = FederationKeypair::generate();
        let sealed = SealedDocument::seal(&federation.public_key(), b"").unwrap();
        assert!(sealed.open(&federation).unwrap().is_empty());
    }

    #[test]
    fn multi_megabyte_document_seals() {
        let federation = FederationKeypair::generate();
        let plaintext = vec![0x5A; 3 * 1024 * 1024];
        let sealed = SealedDocument::seal(&federation.public_key(), &plaintext).unwrap();
        assert_eq!(sealed.open(&federation).unwrap(), plaintext);
    }

    #[test]
    fn wrong_private_key_fails_distinctly() {
        let federation = FederationKeypair::generate();
        let impostor = FederationKeypair::generate();

        let sealed = SealedDocument::seal(&federation.public_key(), b"secret").unwrap();
        assert!(matches!(
            sealed.open(&impostor),
            Err(SealedError::DecryptFailed)
        ));
    }

    #[test]
    fn bundle_bytes_roundtrip_exactly() {
        let federation = FederationKeypair::generate();
        let sealed = SealedDocument::seal(&federation.public_key(), b"bytes").unwrap();

        let encoded = sealed.to_bytes();
        let decoded = SealedDocument::from_bytes(&encoded).unwrap();
        assert_eq!(decoded, sealed);
        // Re-encoding must be byte-identical — the content address depends on it.
        assert_eq!(decoded.to_bytes(), encoded);
    }

    #[test]
    fn garbage_bytes_are_malformed_not_decrypt_failed() {
        let result = SealedDocument::from_bytes(&[0xFF; 7]);
        assert!(matches!(result, Err(SealedError::Malformed(_))));
    }

    #[test]
    fn unknown_version_rejected() {
        let federation = FederationKeypair::generate();
        let mut sealed = SealedDocument::seal(&federation.public_key(), b"doc").unwrap();
        sealed.version = 99;
        assert!(matches!(
            sealed.open(&federation),
            Err(SealedError::UnsupportedVersion { got: 99, .. })
        ));
    }

    #[test]
    fn tampered_ciphertext_rejected() {
        let federation = FederationKeypair::generate();
        let mut sealed = SealedDocument::seal(&federation.public_key(), b"doc").unwrap();
        sealed.ciphertext[0] ^= 0x01;
        assert!(matches!(
            sealed.open(&federation),
            Err(SealedError::DecryptFailed)
        ));
    }

    #[test]
    fn each_seal_uses_a_fresh_ephemeral_key() {
        let federation = FederationKeypair::generate();
        let a = SealedDocument::seal(&federation.public_key(), b"same doc").unwrap();
        let b = SealedDocument::seal(&federation.public_key(), b"same doc").unwrap();
        assert_ne!(a.ephemeral_public_key, b.ephemeral_public_key);
        assert_ne!(a.ciphertext, b.ciphertext);
    }

    #[test]
    fn keypair_from_secret_bytes_is_stable() {
        let federation = FederationKeypair::generate();
        let restored = FederationKeypair::from_secret_bytes(federation.secret_bytes());
        assert_eq!(federation.public_key_bytes(), restored.public_key_bytes());
    }

    #[test]
    fn debug_does_not_leak_secret() {
        let federation = FederationKeypair::generate();
        let debug = format!("{:?}", federation);
        assert!(debug.starts_with("FederationKeypair(pub="));
        assert!(!debug.contains(&hex::encode(federation.secret_bytes())));
    }
}
