//! # Actor Identity
//!
//! Every actor in the protocol — the federation authority, each club, an
//! agent — is an Ed25519 keypair. The ledger never sees the keypair itself;
//! it sees the [`Address`] derived from the public key, and the wallet layer
//! (out of scope here) proves control of it by signing submitted actions.
//!
//! Addresses are `Bech32("fich", BLAKE3(public_key))`: the hash gives a
//! layer of indirection over the raw key, and Bech32 gives checksummed,
//! copy-paste-safe strings for the humans who inevitably copy-paste them.
//!
//! What an address *means* — federation, authorized club, or nobody — is
//! not an identity question. Role resolution is a pure read of ledger state
//! and lives in `fichaje-ledger`.

pub mod address;
pub mod keypair;

pub use address::{Address, AddressError};
pub use keypair::{ActorKeypair, ActorPublicKey, ActorSignature};
