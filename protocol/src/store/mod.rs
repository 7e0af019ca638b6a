//! # Content-Addressed Storage
//!
//! The protocol stores sealed contract documents in a content-addressed
//! store: objects are written once and retrieved by the BLAKE3 hash of
//! their bytes. There is no mutation or deletion API — a content address
//! either resolves to exactly the bytes it names, or it doesn't resolve.
//!
//! This is the one external collaborator the document workflow talks to,
//! so it's a trait. Production deployments back it with an IPFS-style
//! network store; tests and devnets use [`MemoryStore`]. Store calls are
//! the protocol's suspension points, hence the async interface — and
//! re-fetching by hash is always safe to retry, because the answer can
//! never change.

use async_trait::async_trait;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::crypto::hash::blake3_hash;

// ---------------------------------------------------------------------------
// Content Hash
// ---------------------------------------------------------------------------

/// The content address of a stored object: the BLAKE3 hash of its bytes.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ContentHash {
    bytes: [u8; 32],
}

impl ContentHash {
    /// Compute the content hash of a byte string.
    pub fn of(data: &[u8]) -> Self {
        Self {
            bytes: blake3_hash(data),
        }
    }

    /// Construct from a raw 32-byte digest.
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self { bytes }
    }

    /// The raw digest.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.bytes
    }

    /// Hex-encoded form, 64 characters.
    pub fn to_hex(&self) -> String {
        hex::encode(self.bytes)
    }

    /// Parse a hex-encoded content hash.
    pub fn from_hex(s: &str) -> Result<Self, StoreError> {
        let decoded = hex::decode(s).map_err(|_| StoreError::InvalidHash(s.to_string()))?;
        let bytes: [u8; 32] = decoded
            .try_into()
            .map_err(|_| StoreError::InvalidHash(s.to_string()))?;
        Ok(Self { bytes })
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl fmt::Debug for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentHash({}…)", &self.to_hex()[..12])
    }
}

impl Serialize for ContentHash {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for ContentHash {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        ContentHash::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors surfaced by a content store.
///
/// `NotFound` and `Unavailable` are different animals: the first is an
/// answer ("nobody has stored these bytes"), the second is the absence of
/// an answer (transport failure, safe to retry). `HashMismatch` is an
/// integrity failure and must never be reported as "no document".
#[derive(Debug, Error)]
pub enum StoreError {
    /// No object exists under this content address.
    #[error("no object stored under content hash {0}")]
    NotFound(ContentHash),

    /// The store returned bytes that do not hash to the requested address.
    /// Either the store is corrupt or it is lying.
    #[error("content hash mismatch: requested {requested}, bytes hash to {actual}")]
    HashMismatch {
        /// The address that was requested.
        requested: ContentHash,
        /// What the returned bytes actually hash to.
        actual: ContentHash,
    },

    /// The string is not a well-formed content hash.
    #[error("invalid content hash: {0:?}")]
    InvalidHash(String),

    /// The store could not be reached. Retryable.
    #[error("content store unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    /// Whether the failed operation is safe and sensible to retry.
    pub fn is_retryable(&self) -> bool {
        matches!(self, StoreError::Unavailable(_))
    }
}

// ---------------------------------------------------------------------------
// Store Interface
// ---------------------------------------------------------------------------

/// The content-addressed store contract the protocol depends on.
///
/// Implementations must be content-addressed in the strict sense: `get`
/// returns exactly the bytes whose hash is the requested address. The
/// provided [`MemoryStore`] re-verifies this on every read; a networked
/// implementation talking to an untrusted gateway must do the same.
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Store a byte string, returning its content address.
    ///
    /// Idempotent by construction — putting the same bytes twice returns
    /// the same hash and stores one object.
    async fn put(&self, data: Vec<u8>) -> Result<ContentHash, StoreError>;

    /// Retrieve the bytes stored under a content address.
    async fn get(&self, hash: &ContentHash) -> Result<Vec<u8>, StoreError>;

    /// Liveness check, mirroring an IPFS daemon's version ping.
    async fn is_available(&self) -> bool;
}

// ---------------------------------------------------------------------------
// In-Memory Implementation
// ---------------------------------------------------------------------------

/// An in-process content store for tests and single-node devnets.
///
/// Backed by a concurrent map, so readers never block each other — which
/// mirrors the real deployment, where document fetches are plentiful and
/// writes are rare.
#[derive(Default)]
pub struct MemoryStore {
    objects: DashMap<ContentHash, Vec<u8>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of distinct objects held.
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    /// Whether the store holds no objects.
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}

#[async_trait]
impl ContentStore for MemoryStore {
    async fn put(&self, data: Vec<u8>) -> Result<ContentHash, StoreError> {
        let hash = ContentHash::of(&data);
        tracing::debug!(hash = %hash, size = data.len(), "storing object");
        self.objects.insert(hash, data);
        Ok(hash)
    }

    async fn get(&self, hash: &ContentHash) -> Result<Vec<u8>, StoreError> {
        let data = self
            .objects
            .get(hash)
            .map(|entry| entry.value().clone())
            .ok_or(StoreError::NotFound(*hash))?;

        // Verify on read even for our own map. A store that skips this
        // check degrades from content-addressed to name-addressed the
        // first time anything corrupts.
        let actual = ContentHash::of(&data);
        if actual != *hash {
            return Err(StoreError::HashMismatch {
                requested: *hash,
                actual,
            });
        }
        Ok(data)
    }

    async fn is_available(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn put_get_roundtrip() {
        let store = MemoryStore::new();
        let hash = store.put(b"sealed bundle bytes".to_vec()).await.unwrap();
        let back = store.get(&hash).await.unwrap();
        assert_eq!(back, b"sealed bundle bytes");
    }

    #[tokio::test]
    async fn put_is_idempotent() {
        let store = MemoryStore::new();
        let h1 = store.put(b"same".to_vec()).await.unwrap();
        let h2 = store.put(b"same".to_vec()).await.unwrap();
        assert_eq!(h1, h2);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn missing_hash_is_not_found() {
        let store = MemoryStore::new();
        let absent = ContentHash::of(b"never stored");
        assert!(matches!(
            store.get(&absent).await,
            Err(StoreError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn empty_object_is_storable() {
        let store = MemoryStore::new();
        let hash = store.put(Vec::new()).await.unwrap();
        assert!(store.get(&hash).await.unwrap().is_empty());
    }

    #[test]
    fn content_hash_hex_roundtrip() {
        let hash = ContentHash::of(b"some document");
        let parsed = ContentHash::from_hex(&hash.to_hex()).unwrap();
        assert_eq!(parsed, hash);
    }

    #[test]
    fn bad_hex_rejected() {
        assert!(ContentHash::from_hex("zzzz").is_err());
        assert!(ContentHash::from_hex("deadbeef").is_err()); // too short
    }

    #[test]
    fn only_unavailable_is_retryable() {
        assert!(StoreError::Unavailable("timeout".into()).is_retryable());
        assert!(!StoreError::NotFound(ContentHash::of(b"x")).is_retryable());
        assert!(!StoreError::InvalidHash("?".into()).is_retryable());
    }

    #[test]
    fn serde_uses_hex_form() {
        let hash = ContentHash::of(b"doc");
        let json = serde_json::to_string(&hash).unwrap();
        let back: ContentHash = serde_json::from_str(&json).unwrap();
        assert_eq!(back, hash);
        assert_eq!(json.trim_matches('"'), hash.to_hex());
    }
}
