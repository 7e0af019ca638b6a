//! # Confidential Document Workflow
//!
//! The pipeline that carries a contract document from a club's hands into
//! federation custody, and back out for an authorized reviewer:
//!
//! ```text
//! submit:   plaintext -> seal(federation_pk) -> bundle bytes -> store.put
//! retrieve: store.get -> decode bundle -> open(federation_sk) -> plaintext
//! ```
//!
//! The content hash the ledger records is the hash of the *sealed* bundle
//! bytes, not the plaintext. Anyone can verify that a fetched bundle matches
//! the ledger's hash; only the federation secret opens it.
//!
//! Failure modes stay distinct end to end: "no bytes at that address",
//! "bytes aren't a bundle", and "bundle won't decrypt" are three different
//! operational problems and each keeps its own error variant.

use thiserror::Error;
use x25519_dalek::PublicKey;

use crate::config::MAX_DOCUMENT_SIZE_BYTES;
use crate::crypto::sealed::{FederationKeypair, SealedDocument, SealedError};
use crate::store::{ContentHash, ContentStore, StoreError};

/// Errors in the submit/retrieve document pipeline.
#[derive(Debug, Error)]
pub enum DocumentError {
    /// The plaintext exceeds the protocol's document size cap.
    #[error("document of {size} bytes exceeds the {max}-byte limit")]
    TooLarge {
        /// Size of the rejected document.
        size: usize,
        /// The configured cap.
        max: usize,
    },

    /// The content store failed. Check [`StoreError::is_retryable`] before
    /// giving up.
    #[error("content store error: {0}")]
    Store(#[from] StoreError),

    /// The fetched bytes were not a well-formed sealed bundle, or the
    /// bundle refused to open. See the inner error for which.
    #[error("sealed bundle error: {0}")]
    Sealed(#[from] SealedError),
}

/// Seal a document to the federation key and publish it.
///
/// Returns the content hash of the sealed bundle bytes — the value the
/// ledger records against the transfer. The plaintext never reaches the
/// store.
pub async fn submit_document<S: ContentStore + ?Sized>(
    store: &S,
    federation_public_key: &PublicKey,
    plaintext: &[u8],
) -> Result<ContentHash, DocumentError> {
    if plaintext.len() > MAX_DOCUMENT_SIZE_BYTES {
        return Err(DocumentError::TooLarge {
            size: plaintext.len(),
            max: MAX_DOCUMENT_SIZE_BYTES,
        });
    }

    let sealed = SealedDocument::seal(federation_public_key, plaintext)?;
    let bytes = sealed.to_bytes();
    let hash = store.put(bytes).await?;

    tracing::info!(hash = %hash, plaintext_size = plaintext.len(), "document sealed and stored");
    Ok(hash)
}

/// Fetch a sealed bundle by content hash and open it.
///
/// Only a holder of the federation secret can call this meaningfully; for
/// everyone else the bundle opens to [`SealedError::DecryptFailed`].
pub async fn retrieve_document<S: ContentStore + ?Sized>(
    store: &S,
    federation: &FederationKeypair,
    hash: &ContentHash,
) -> Result<Vec<u8>, DocumentError> {
    let bytes = store.get(hash).await?;
    let sealed = SealedDocument::from_bytes(&bytes)?;
    let plaintext = sealed.open(federation)?;

    tracing::debug!(hash = %hash, plaintext_size = plaintext.len(), "document retrieved and opened");
    Ok(plaintext)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    #[tokio::test]
    async fn submit_retrieve_roundtrip() {
        let store = MemoryStore::new();
        let federation = FederationKeypair::generate();
        let contract = b"player contract: 5 years, release clause 80M";

        let hash = submit_document(&store, &federation.public_key(), contract)
            .await
            .unwrap();
        let opened = retrieve_document(&store, &federation, &hash).await.unwrap();
        assert_eq!(opened, contract);
    }

    #[tokio::test]
    async fn stored_bytes_are_not_plaintext() {
        let store = MemoryStore::new();
        let federation = FederationKeypair::generate();
        let contract = b"strictly confidential terms";

        let hash = submit_document(&store, &federation.public_key(), contract)
            .await
            .unwrap();
        let raw = store.get(&hash).await.unwrap();

        // The store holds a sealed bundle, not the document.
        assert_ne!(raw, contract.to_vec());
        let window: &[u8] = contract;
        assert!(!raw.windows(window.len()).any(|w| w == window));
    }

    #[tokio::test]
    async fn hash_covers_the_sealed_bundle() {
        let store = MemoryStore::new();
        let federation = FederationKeypair::generate();

        let hash = submit_document(&store, &federation.public_key(), b"doc")
            .await
            .unwrap();
        let raw = store.get(&hash).await.unwrap();
        assert_eq!(ContentHash::of(&raw), hash);
    }

    #[tokio::test]
    async fn oversized_document_rejected_before_sealing() {
        let store = MemoryStore::new();
        let federation = FederationKeypair::generate();
        let huge = vec![0u8; MAX_DOCUMENT_SIZE_BYTES + 1];

        let result = submit_document(&store, &federation.public_key(), &huge).await;
        assert!(matches!(result, Err(DocumentError::TooLarge { .. })));
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn missing_document_is_a_store_error() {
        let store = MemoryStore::new();
        let federation = FederationKeypair::generate();
        let absent = ContentHash::of(b"nothing here");

        let result = retrieve_document(&store, &federation, &absent).await;
        assert!(matches!(
            result,
            Err(DocumentError::Store(StoreError::NotFound(_)))
        ));
    }

    #[tokio::test]
    async fn wrong_federation_key_is_a_sealed_error() {
        let store = MemoryStore::new();
        let federation = FederationKeypair::generate();
        let impostor = FederationKeypair::generate();

        let hash = submit_document(&store, &federation.public_key(), b"doc")
            .await
            .unwrap();
        let result = retrieve_document(&store, &impostor, &hash).await;
        assert!(matches!(
            result,
            Err(DocumentError::Sealed(SealedError::DecryptFailed))
        ));
    }

    #[tokio::test]
    async fn non_bundle_bytes_are_malformed() {
        let store = MemoryStore::new();
        let federation = FederationKeypair::generate();

        // Bytes stored outside the sealing pipeline.
        let hash = store.put(b"just some text".to_vec()).await.unwrap();
        let result = retrieve_document(&store, &federation, &hash).await;
        assert!(matches!(
            result,
            Err(DocumentError::Sealed(SealedError::Malformed(_)))
        ));
    }

    #[tokio::test]
    async fn same_document_twice_yields_distinct_hashes() {
        // Sealing is randomized, so re-submitting a document gives a new
        // bundle and a new address. Escrow-level dedup is not a goal.
        let store = MemoryStore::new();
        let federation = FederationKeypair::generate();

        let h1 = submit_document(&store, &federation.public_key(), b"same")
            .await
            .unwrap();
        let h2 = submit_document(&store, &federation.public_key(), b"same")
            .await
            .unwrap();
        assert_ne!(h1, h2);
    }
}
