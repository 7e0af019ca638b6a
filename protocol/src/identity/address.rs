//! # Protocol Addresses
//!
//! An address is how the ledger refers to an actor:
//!
//! ```text
//! public_key (32 bytes)
//!     -> BLAKE3(public_key) -> 32 bytes
//!     -> Bech32("fich", hash) -> fich1qw508d6qe...
//! ```
//!
//! The `fich` human-readable prefix makes addresses immediately
//! recognizable, and Bech32's checksum catches up to four character errors
//! — which matters when a typo'd destination club would silently receive a
//! seven-figure escrow release.

use bech32::{Bech32, Hrp};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::config::ADDRESS_HRP;
use crate::crypto::hash::blake3_hash;

/// Errors that can occur when parsing an address string.
#[derive(Debug, Error)]
pub enum AddressError {
    /// The Bech32 string could not be decoded.
    #[error("bech32 decode error: {0}")]
    Bech32Decode(String),

    /// The decoded address has an unexpected human-readable prefix.
    #[error("invalid address prefix: expected '{expected}', got '{got}'")]
    InvalidHrp {
        /// The expected HRP.
        expected: String,
        /// The HRP that was actually found.
        got: String,
    },

    /// The decoded data has an unexpected length.
    #[error("invalid address data length: expected {expected} bytes, got {got}")]
    InvalidDataLength {
        /// Expected number of bytes.
        expected: usize,
        /// Actual number of bytes.
        got: usize,
    },
}

/// A protocol address — the BLAKE3 hash of an actor's public key.
///
/// Addresses are small, `Copy`, totally ordered, and hashable, so they work
/// as map keys throughout the ledger. Display and serde use the Bech32
/// string form; the ledger compares the raw hash bytes.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Address {
    key_hash: [u8; 32],
}

impl Address {
    /// Derive the address for a raw Ed25519 public key.
    pub fn from_public_key_bytes(public_key: &[u8; 32]) -> Self {
        Self {
            key_hash: blake3_hash(public_key),
        }
    }

    /// Construct an address directly from its 32-byte hash.
    ///
    /// Used when reloading persisted ledger state; for untrusted strings,
    /// use [`parse`](Self::parse).
    pub fn from_hash(key_hash: [u8; 32]) -> Self {
        Self { key_hash }
    }

    /// The raw 32-byte hash.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.key_hash
    }

    /// Encode as a Bech32 string, `fich1...`.
    pub fn to_bech32(&self) -> String {
        let hrp = Hrp::parse(ADDRESS_HRP).expect("static HRP is valid");
        bech32::encode::<Bech32>(hrp, &self.key_hash)
            .expect("encoding a 32-byte payload never fails")
    }

    /// Parse a Bech32-encoded address, validating prefix, checksum, and
    /// payload length.
    pub fn parse(s: &str) -> Result<Self, AddressError> {
        let (hrp, data) =
            bech32::decode(s).map_err(|e| AddressError::Bech32Decode(e.to_string()))?;

        let expected = Hrp::parse(ADDRESS_HRP).expect("static HRP is valid");
        if hrp != expected {
            return Err(AddressError::InvalidHrp {
                expected: ADDRESS_HRP.to_string(),
                got: hrp.to_string(),
            });
        }

        let key_hash: [u8; 32] = data.as_slice().try_into().map_err(|_| {
            AddressError::InvalidDataLength {
                expected: 32,
                got: data.len(),
            }
        })?;

        Ok(Self { key_hash })
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_bech32())
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = self.to_bech32();
        // Prefix + first few data chars is enough to tell addresses apart
        // in a log line.
        write!(f, "Address({}…)", &s[..12.min(s.len())])
    }
}

impl Serialize for Address {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_bech32())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Address::parse(&s).map_err(serde::de::Error::custom)
    }
}
