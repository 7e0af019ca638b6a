//! # Club Registry & Role Resolution
//!
//! The federation's register of clubs. A club is created by the federation
//! action "authorize club" and is never deleted — revocation flips the
//! `authorized` flag so the club's historical transfers stay attributable.
//!
//! Role resolution is a *total pure function* of registry state: every
//! actor resolves to exactly one of `FederationAuthority`,
//! `AuthorizedClub`, or `Unauthorized`. There is no privileged override
//! identity, and existence is answered with `Option<&Club>`, never inferred
//! from an empty-name sentinel.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

use fichaje_protocol::config::MAX_CLUB_NAME_LENGTH;
use fichaje_protocol::identity::Address;

/// Errors from registry mutations.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// Club names are required and bounded.
    #[error("invalid club name: {0}")]
    InvalidName(String),

    /// Re-authorization attempted with a different name. Names are
    /// immutable once set; a silent rename would re-label history.
    #[error("club name is immutable: registered as {registered:?}, got {got:?}")]
    NameMismatch {
        /// The name on record.
        registered: String,
        /// The conflicting name in the request.
        got: String,
    },

    /// No club record exists for this address.
    #[error("no club registered at {0}")]
    UnknownClub(Address),

    /// The federation identity cannot also be a club.
    #[error("the federation authority cannot be registered as a club")]
    FederationIsNotAClub,
}

/// A registered club. Created once, never deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Club {
    /// The club's protocol address.
    pub address: Address,
    /// Display name, immutable after first registration.
    pub name: String,
    /// Whether the club may currently act in the protocol.
    pub authorized: bool,
    /// When the club was first registered.
    pub registered_at: DateTime<Utc>,
}

/// What the registry says an actor is.
///
/// Exactly one variant holds for any actor and any registry snapshot —
/// the federation address is rejected at club registration time, so the
/// variants cannot overlap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Role<'a> {
    /// The single federation identity recorded at genesis.
    FederationAuthority,
    /// A registered club with `authorized == true`.
    AuthorizedClub(&'a Club),
    /// Everyone else, including revoked clubs.
    Unauthorized,
}

/// The club register, keyed by address. Iteration order is the address
/// order, which keeps listings deterministic.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClubRegistry {
    federation: Address,
    clubs: BTreeMap<Address, Club>,
}

impl ClubRegistry {
    /// Create a registry with the federation identity fixed at genesis.
    pub fn new(federation: Address) -> Self {
        Self {
            federation,
            clubs: BTreeMap::new(),
        }
    }

    /// The federation authority's address.
    pub fn federation(&self) -> Address {
        self.federation
    }

    /// Register a club, or re-authorize one previously revoked.
    ///
    /// Idempotent: authorizing an already-authorized club with the same
    /// name is a no-op. Re-authorization with a *different* name is
    /// rejected — see [`RegistryError::NameMismatch`].
    pub fn authorize(&mut self, address: Address, name: &str) -> Result<(), RegistryError> {
        if address == self.federation {
            return Err(RegistryError::FederationIsNotAClub);
        }
        let name = name.trim();
        if name.is_empty() || name.len() > MAX_CLUB_NAME_LENGTH {
            return Err(RegistryError::InvalidName(name.to_string()));
        }

        match self.clubs.get_mut(&address) {
            Some(club) => {
                if club.name != name {
                    return Err(RegistryError::NameMismatch {
                        registered: club.name.clone(),
                        got: name.to_string(),
                    });
                }
                club.authorized = true;
            }
            None => {
                self.clubs.insert(
                    address,
                    Club {
                        address,
                        name: name.to_string(),
                        authorized: true,
                        registered_at: Utc::now(),
                    },
                );
            }
        }
        Ok(())
    }

    /// Revoke a club's authorization. Idempotent; the record survives so
    /// its transfers stay attributable.
    pub fn revoke(&mut self, address: Address) -> Result<(), RegistryError> {
        let club = self
            .clubs
            .get_mut(&address)
            .ok_or(RegistryError::UnknownClub(address))?;
        club.authorized = false;
        Ok(())
    }

    /// Look up a club record, revoked or not.
    pub fn club(&self, address: Address) -> Option<&Club> {
        self.clubs.get(&address)
    }

    /// Whether this address is a club with current authorization.
    pub fn is_authorized_club(&self, address: Address) -> bool {
        self.clubs.get(&address).is_some_and(|c| c.authorized)
    }

    /// Resolve an actor's role. Total: never fails, never mutates.
    pub fn resolve_role(&self, actor: Address) -> Role<'_> {
        if actor == self.federation {
            return Role::FederationAuthority;
        }
        match self.clubs.get(&actor) {
            Some(club) if club.authorized => Role::AuthorizedClub(club),
            _ => Role::Unauthorized,
        }
    }

    /// All club records in address order.
    pub fn clubs(&self) -> impl Iterator<Item = &Club> {
        self.clubs.values()
    }

    /// Number of registered clubs, revoked ones included.
    pub fn club_count(&self) -> usize {
        self.clubs.len()
    }
}
