//! # Hashing Utilities
//!
//! BLAKE3 is the only hash function in the protocol. It addresses stored
//! documents, derives actor addresses from public keys, and (via its
//! `derive_key` mode) turns X25519 shared secrets into AES keys.
//!
//! One function, three jobs, zero agility. Hash-function agility is how
//! protocols end up with a "legacy mode" nobody dares delete.

/// Compute the BLAKE3 hash of the input data.
///
/// Returns a 32-byte digest as a fixed-size array. This is the workhorse
/// hash of the protocol — content addresses and address derivation both
/// come through here.
///
/// # Example
///
/// ```
/// use fichaje_protocol::crypto::blake3_hash;
///
/// let hash = blake3_hash(b"signed contract bytes");
/// assert_eq!(hash.len(), 32);
/// ```
pub fn blake3_hash(data: &[u8]) -> [u8; 32] {
    *blake3::hash(data).as_bytes()
}

/// Derive a 32-byte key from input key material using BLAKE3's native
/// `derive_key` mode with a domain-separation context string.
///
/// Functionally equivalent to HKDF, but purpose-built: the context string
/// is baked into the derivation, so the same shared secret used in two
/// different protocol roles yields two unrelated keys.
pub fn derive_key(context: &str, key_material: &[u8]) -> [u8; 32] {
    blake3::derive_key(context, key_material)
}
