//! # Fichaje Ledger — Transfer Settlement Rules
//!
//! The rules that make a player transfer settle: who may act, when money
//! moves, and what both clubs must have signed before it does.
//!
//! - **Registry** — the federation's club register and role resolution.
//!   A role is a pure read of registry state; there is no override identity.
//! - **Transfer** — one transfer record: the player, the two clubs, the
//!   value, the escrow and signature flags, and the derived lifecycle
//!   status.
//! - **Distribution** — the pure payout split fired at approval.
//! - **Ledger** — the escrow ledger itself: serialized mutations, each one
//!   gated by role + precondition checks, each one atomic.
//!
//! ## Design Principles
//!
//! 1. All monetary operations check for overflow — `checked_add` and
//!    `checked_sub` everywhere, because wrapping arithmetic and money do
//!    not mix.
//! 2. Every mutation re-validates its guards against current ledger state
//!    at execution time, never against a caller's cached view.
//! 3. Authorization failures and precondition failures are distinguishable
//!    down to the exact cause: "not your transfer" is not "already signed".
//! 4. Every public type is serializable (serde) for wire transport.

pub mod distribution;
pub mod ledger;
pub mod registry;
pub mod transfer;

pub use distribution::{distribute, Distribution};
pub use ledger::{ErrorCategory, FichajeLedger, LedgerError};
pub use registry::{Club, ClubRegistry, RegistryError, Role};
pub use transfer::{Party, PlayerData, SignatureSet, Transfer, TransferError, TransferStatus};
