//! # AES-256-GCM Encryption
//!
//! The symmetric layer of the document sealed box. A sealed document is
//! AES-256-GCM ciphertext under a key derived from an ephemeral X25519
//! agreement — this module only handles the AEAD part.
//!
//! GCM is notoriously unforgiving about nonce reuse. Our strategy: random
//! 96-bit nonces from the OS CSPRNG, and a fresh key per document (the
//! ephemeral key agreement guarantees that), so the birthday bound is
//! never even in sight.

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use rand::RngCore;
use thiserror::Error;

use crate::config::{AES_KEY_LENGTH, AES_NONCE_LENGTH};

/// Errors that can occur during encryption/decryption.
///
/// Deliberately vague about *why* decryption failed. The difference between
/// "wrong key" and "corrupted ciphertext" is none of an attacker's business.
#[derive(Debug, Error)]
pub enum EncryptionError {
    #[error("encryption failed")]
    EncryptFailed,

    #[error("decryption failed -- wrong key or corrupted ciphertext")]
    DecryptFailed,

    #[error("invalid nonce length: expected {AES_NONCE_LENGTH} bytes")]
    InvalidNonceLength,
}

/// Encrypt plaintext with AES-256-GCM under a random nonce.
///
/// Returns the nonce and the ciphertext (which includes the 16-byte GCM
/// authentication tag) separately — the sealed-box wire format stores them
/// as distinct fields rather than a concatenated blob, so the bundle stays
/// self-describing.
pub fn encrypt(
    key: &[u8; AES_KEY_LENGTH],
    plaintext: &[u8],
) -> Result<([u8; AES_NONCE_LENGTH], Vec<u8>), EncryptionError> {
    let cipher = Aes256Gcm::new_from_slice(key).map_err(|_| EncryptionError::EncryptFailed)?;

    let mut nonce_bytes = [0u8; AES_NONCE_LENGTH];
    rand::rngs::OsRng.fill_bytes(&mut nonce_bytes);
    let nonce = Nonce::from_slice(&nonce_bytes);

    let ciphertext = cipher
        .encrypt(nonce, plaintext)
        .map_err(|_| EncryptionError::EncryptFailed)?;

    Ok((nonce_bytes, ciphertext))
}

/// Decrypt ciphertext previously produced by [`encrypt`].
///
/// # Errors
///
/// Returns [`EncryptionError::DecryptFailed`] if the key is wrong or the
/// ciphertext has been modified in any way (bit flip, truncation, spliced
/// tag). We don't distinguish between these cases on purpose.
pub fn decrypt(
    key: &[u8; AES_KEY_LENGTH],
    nonce: &[u8],
    ciphertext: &[u8],
) -> Result<Vec<u8>, EncryptionError> {
    if nonce.len() != AES_NONCE_LENGTH {
        return Err(EncryptionError::InvalidNonceLength);
    }

    let cipher = Aes256Gcm::new_from_slice(key).map_err(|_| EncryptionError::DecryptFailed)?;
    cipher
        .decrypt(Nonce::from_slice(nonce), ciphertext)
        .map_err(|_| EncryptionError::DecryptFailed)
}
