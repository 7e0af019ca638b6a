// Copyright (c) 2026 Fichaje Protocol Contributors. MIT License.
// See LICENSE for details.

//! # Fichaje Protocol — Core Library
//!
//! Primitives for coordinating football player transfers between two
//! autonomous clubs under the supervision of a federation authority: money
//! held in escrow until both parties cryptographically agree, and the
//! confidential contract document exchanged through content-addressed
//! storage and public-key encryption.
//!
//! This crate holds the parts of the protocol that are pure mechanism —
//! nothing here knows about clubs or transfer records. The settlement rules
//! live in `fichaje-ledger`; the HTTP surface lives in `fichaje-node`.
//!
//! ## Architecture
//!
//! - **config** — Protocol constants: distribution rates, key sizes, ports.
//! - **crypto** — BLAKE3 hashing, AES-256-GCM, and X25519 sealed boxes.
//!   Don't roll your own.
//! - **identity** — Ed25519 actor keypairs and Bech32 addresses. An actor
//!   is whoever can produce a signature; a role is what the ledger says
//!   about that actor.
//! - **store** — The content-addressed store interface (put bytes, get by
//!   content hash) plus an in-memory implementation for tests and devnets.
//! - **document** — The confidential contract custody workflow: seal to the
//!   federation's public key, publish, retrieve, open.
//!
//! ## Design Philosophy
//!
//! 1. Every operation that moves money or mutates a record re-validates its
//!    guards against current state, never against a cached view.
//! 2. No unsafe code in crypto paths.
//! 3. Failure modes stay distinguishable: "no document", "can't fetch it",
//!    and "can't decrypt it" are three different errors, not one.

pub mod config;
pub mod crypto;
pub mod document;
pub mod identity;
pub mod store;
