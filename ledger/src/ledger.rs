//! # The Escrow Ledger
//!
//! The single place where role checks, record preconditions, and money
//! meet. Every mutation follows the same shape:
//!
//! 1. Resolve what the caller *is* (registry).
//! 2. Check what the caller *may do here* (party / federation gates).
//! 3. Apply the record-level transition (`transfer` module guards).
//! 4. Move money, if the transition says so, in the same step.
//!
//! Escrowed funds are partitioned per transfer id — no operation touches
//! transfer A's escrow while processing transfer B. Approval and
//! distribution happen in one step: there is no observable state where the
//! dual signature is complete but the escrow still holds the funds.
//!
//! The ledger itself is synchronous and single-threaded; the node wraps it
//! in a lock to get the global sequential ordering the protocol assumes.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

use fichaje_protocol::config::MAX_PLAYER_NAME_LENGTH;
use fichaje_protocol::identity::Address;
use fichaje_protocol::store::ContentHash;

use crate::distribution::{distribute, Distribution};
use crate::registry::{Club, ClubRegistry, RegistryError, Role};
use crate::transfer::{PlayerData, Transfer, TransferError};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// The §-style taxonomy callers sort ledger failures into: was the actor
/// not allowed, or was the action not valid right now?
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// The actor is not permitted to perform this action at all.
    Authorization,
    /// The actor is permitted, but a state guard rejected the action.
    Precondition,
}

/// Errors from ledger operations.
///
/// Every distinguishable cause gets its own variant — "not your transfer"
/// must never read like "already signed".
#[derive(Debug, Error)]
pub enum LedgerError {
    /// Only the federation authority may perform this action.
    #[error("caller is not the federation authority")]
    NotFederation,

    /// The caller is not a currently authorized club.
    #[error("caller {0} is not an authorized club")]
    NotAuthorizedClub(Address),

    /// Only the origin club may perform this action on this transfer.
    #[error("caller is not the origin club of this transfer")]
    NotOrigin,

    /// Only the destination club may perform this action on this transfer.
    #[error("caller is not the destination club of this transfer")]
    NotDestination,

    /// The caller is neither party to this transfer.
    #[error("caller is not a party to this transfer")]
    NotAParty,

    /// Refunds may only be triggered by the depositor or the federation.
    #[error("only the depositing club or the federation may refund")]
    NotDepositorOrFederation,

    /// A transfer needs two distinct clubs.
    #[error("origin and destination are the same club")]
    SameClub,

    /// The named club is not currently authorized to take part.
    #[error("club {0} is not authorized")]
    ClubNotAuthorized(Address),

    /// Player names are required and bounded.
    #[error("invalid player name: {0:?}")]
    InvalidPlayerName(String),

    /// No transfer exists with this id.
    #[error("no transfer with id {0}")]
    UnknownTransfer(u64),

    /// A payout credit would overflow the recipient's balance.
    #[error("balance overflow crediting {0}")]
    BalanceOverflow(Address),

    /// A funded transfer has no matching escrow entry. This indicates
    /// ledger corruption, not caller error.
    #[error("escrow entry missing for funded transfer {0}")]
    EscrowInconsistent(u64),

    /// A record-level state guard rejected the action.
    #[error(transparent)]
    Transfer(#[from] TransferError),

    /// A registry guard rejected the action.
    #[error(transparent)]
    Registry(#[from] RegistryError),
}

impl LedgerError {
    /// Which side of the error taxonomy this failure falls on.
    pub fn category(&self) -> ErrorCategory {
        match self {
            LedgerError::NotFederation
            | LedgerError::NotAuthorizedClub(_)
            | LedgerError::NotOrigin
            | LedgerError::NotDestination
            | LedgerError::NotAParty
            | LedgerError::NotDepositorOrFederation => ErrorCategory::Authorization,

            LedgerError::SameClub
            | LedgerError::ClubNotAuthorized(_)
            | LedgerError::InvalidPlayerName(_)
            | LedgerError::UnknownTransfer(_)
            | LedgerError::BalanceOverflow(_)
            | LedgerError::EscrowInconsistent(_)
            | LedgerError::Transfer(_)
            | LedgerError::Registry(_) => ErrorCategory::Precondition,
        }
    }
}

// ---------------------------------------------------------------------------
// Ledger
// ---------------------------------------------------------------------------

/// The in-memory escrow ledger: club registry, transfer records, per-id
/// escrow, and per-address payout balances.
///
/// Serializable so a node can snapshot and reload its full state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FichajeLedger {
    registry: ClubRegistry,
    transfers: BTreeMap<u64, Transfer>,
    /// Funds escrowed per transfer id, never commingled.
    escrow: BTreeMap<u64, u64>,
    /// Payout balances credited by distributions and refunds.
    balances: BTreeMap<Address, u64>,
    /// Recipient of the formation-rights share.
    formation_account: Address,
    next_id: u64,
}

impl FichajeLedger {
    /// Create a ledger with the federation identity fixed at genesis. The
    /// formation share defaults to the federation until reassigned.
    pub fn new(federation: Address) -> Self {
        Self {
            registry: ClubRegistry::new(federation),
            transfers: BTreeMap::new(),
            escrow: BTreeMap::new(),
            balances: BTreeMap::new(),
            formation_account: federation,
            next_id: 1,
        }
    }

    // ---- Federation operations ----

    /// Register or re-authorize a club. Federation only.
    pub fn authorize_club(
        &mut self,
        caller: Address,
        club: Address,
        name: &str,
    ) -> Result<(), LedgerError> {
        self.require_federation(caller)?;
        self.registry.authorize(club, name)?;
        tracing::info!(%club, name, "club authorized");
        Ok(())
    }

    /// Revoke a club's authorization. Federation only.
    pub fn revoke_club(&mut self, caller: Address, club: Address) -> Result<(), LedgerError> {
        self.require_federation(caller)?;
        self.registry.revoke(club)?;
        tracing::info!(%club, "club revoked");
        Ok(())
    }

    /// Redirect future formation shares to a new account. Federation only.
    /// Already-distributed shares stay where they landed.
    pub fn set_formation_account(
        &mut self,
        caller: Address,
        account: Address,
    ) -> Result<(), LedgerError> {
        self.require_federation(caller)?;
        self.formation_account = account;
        tracing::info!(%account, "formation account updated");
        Ok(())
    }

    // ---- Transfer operations ----

    /// Register a transfer. The caller must be the origin club itself or
    /// the federation acting on its behalf; both clubs must be authorized.
    pub fn create_transfer(
        &mut self,
        caller: Address,
        player: PlayerData,
        origin: Address,
        destination: Address,
        value: u64,
        agent: Option<Address>,
    ) -> Result<u64, LedgerError> {
        if caller != origin && caller != self.registry.federation() {
            return Err(LedgerError::NotOrigin);
        }
        if origin == destination {
            return Err(LedgerError::SameClub);
        }
        if !self.registry.is_authorized_club(origin) {
            return Err(LedgerError::ClubNotAuthorized(origin));
        }
        if !self.registry.is_authorized_club(destination) {
            return Err(LedgerError::ClubNotAuthorized(destination));
        }
        Self::validate_player(&player)?;

        let id = self.next_id;
        self.next_id += 1;
        self.transfers.insert(
            id,
            Transfer::new(id, player, origin, destination, value, agent, caller),
        );
        tracing::info!(id, %origin, %destination, value, "transfer registered");
        Ok(id)
    }

    /// Amend a transfer's player, value, and agent. Origin club only, and
    /// only before any funds move.
    pub fn edit_transfer(
        &mut self,
        caller: Address,
        id: u64,
        player: PlayerData,
        value: u64,
        agent: Option<Address>,
    ) -> Result<(), LedgerError> {
        Self::validate_player(&player)?;
        let transfer = self
            .transfers
            .get_mut(&id)
            .ok_or(LedgerError::UnknownTransfer(id))?;
        if caller != transfer.origin {
            return Err(LedgerError::NotOrigin);
        }
        transfer.edit(player, value, agent)?;
        Ok(())
    }

    /// Escrow the transfer value. Destination club only; the amount must
    /// equal the transfer value exactly.
    pub fn deposit_funds(
        &mut self,
        caller: Address,
        id: u64,
        amount: u64,
    ) -> Result<(), LedgerError> {
        if !self.registry.is_authorized_club(caller) {
            return Err(LedgerError::NotAuthorizedClub(caller));
        }
        let transfer = self
            .transfers
            .get_mut(&id)
            .ok_or(LedgerError::UnknownTransfer(id))?;
        if caller != transfer.destination {
            return Err(LedgerError::NotDestination);
        }

        transfer.deposit(amount)?;
        self.escrow.insert(id, amount);
        tracing::info!(id, amount, "funds escrowed");
        Ok(())
    }

    /// Record a party's signature. If this call completes the dual
    /// signature while funds are escrowed, the transfer is approved and
    /// the escrow distributed in the same step; the returned distribution
    /// is `Some` exactly for that one call.
    pub fn sign_transfer(
        &mut self,
        caller: Address,
        id: u64,
    ) -> Result<Option<Distribution>, LedgerError> {
        if !self.registry.is_authorized_club(caller) {
            return Err(LedgerError::NotAuthorizedClub(caller));
        }
        let transfer = self
            .transfers
            .get(&id)
            .ok_or(LedgerError::UnknownTransfer(id))?;
        let party = transfer.party_of(caller).ok_or(LedgerError::NotAParty)?;

        // Stage the payout before mutating anything, so a credit overflow
        // cannot leave a signature recorded without its distribution.
        let will_approve = transfer.funds_deposited
            && !transfer.approved
            && transfer.signatures.complete_with(party);
        let staged = if will_approve {
            let amount = *self
                .escrow
                .get(&id)
                .ok_or(LedgerError::EscrowInconsistent(id))?;
            let split = distribute(amount, transfer.agent.is_some());
            let credits = self.stage_credits(transfer, split)?;
            Some((split, credits))
        } else {
            None
        };

        let transfer = self
            .transfers
            .get_mut(&id)
            .ok_or(LedgerError::UnknownTransfer(id))?;
        let approved = transfer.sign(party)?;

        if approved {
            let (split, credits) =
                staged.ok_or(LedgerError::EscrowInconsistent(id))?;
            self.escrow.remove(&id);
            for (account, new_balance) in credits {
                self.balances.insert(account, new_balance);
            }
            tracing::info!(
                id,
                origin_share = split.origin_share,
                formation_share = split.formation_share,
                agent_share = split.agent_share,
                "transfer approved, escrow distributed"
            );
            return Ok(Some(split));
        }

        tracing::info!(id, %party, "signature recorded");
        Ok(None)
    }

    /// Return the escrow to the depositor and reset the transfer to the
    /// awaiting-deposit boundary. Destination club or federation only.
    /// Returns the amount refunded.
    pub fn refund(&mut self, caller: Address, id: u64) -> Result<u64, LedgerError> {
        let transfer = self
            .transfers
            .get(&id)
            .ok_or(LedgerError::UnknownTransfer(id))?;
        if caller != transfer.destination && caller != self.registry.federation() {
            return Err(LedgerError::NotDepositorOrFederation);
        }
        let depositor = transfer.destination;

        // Stage the credit before touching the record or the escrow, so a
        // balance overflow cannot destroy the escrowed funds.
        let staged = if transfer.funds_deposited && !transfer.approved {
            let amount = *self
                .escrow
                .get(&id)
                .ok_or(LedgerError::EscrowInconsistent(id))?;
            let new_balance = self
                .balance(depositor)
                .checked_add(amount)
                .ok_or(LedgerError::BalanceOverflow(depositor))?;
            Some((amount, new_balance))
        } else {
            None
        };

        let transfer = self
            .transfers
            .get_mut(&id)
            .ok_or(LedgerError::UnknownTransfer(id))?;
        transfer.refund()?;
        let (amount, new_balance) = staged.ok_or(LedgerError::EscrowInconsistent(id))?;
        self.escrow.remove(&id);
        self.balances.insert(depositor, new_balance);

        tracing::info!(id, amount, %depositor, "escrow refunded");
        Ok(amount)
    }

    /// Record the sealed document's content hash. Origin club only, first
    /// write wins.
    pub fn attach_document(
        &mut self,
        caller: Address,
        id: u64,
        hash: ContentHash,
    ) -> Result<(), LedgerError> {
        let transfer = self
            .transfers
            .get_mut(&id)
            .ok_or(LedgerError::UnknownTransfer(id))?;
        if caller != transfer.origin {
            return Err(LedgerError::NotOrigin);
        }
        transfer.attach_document(hash)?;
        tracing::info!(id, %hash, "document attached");
        Ok(())
    }

    // ---- Reads ----

    /// A transfer by id.
    pub fn transfer(&self, id: u64) -> Option<&Transfer> {
        self.transfers.get(&id)
    }

    /// All transfers in id order.
    pub fn transfers(&self) -> impl Iterator<Item = &Transfer> {
        self.transfers.values()
    }

    /// Total number of transfers ever registered.
    pub fn transfer_count(&self) -> usize {
        self.transfers.len()
    }

    /// Amount currently escrowed for a transfer, zero if none.
    pub fn escrowed(&self, id: u64) -> u64 {
        self.escrow.get(&id).copied().unwrap_or(0)
    }

    /// Sum of all escrowed funds across transfers.
    pub fn escrowed_total(&self) -> u128 {
        self.escrow.values().map(|&v| v as u128).sum()
    }

    /// A club record, revoked or not.
    pub fn club(&self, address: Address) -> Option<&Club> {
        self.registry.club(address)
    }

    /// All club records in address order.
    pub fn clubs(&self) -> impl Iterator<Item = &Club> {
        self.registry.clubs()
    }

    /// Number of registered clubs.
    pub fn club_count(&self) -> usize {
        self.registry.club_count()
    }

    /// Payout balance held for an address.
    pub fn balance(&self, address: Address) -> u64 {
        self.balances.get(&address).copied().unwrap_or(0)
    }

    /// Current formation-rights account.
    pub fn formation_account(&self) -> Address {
        self.formation_account
    }

    /// The federation authority's address.
    pub fn federation(&self) -> Address {
        self.registry.federation()
    }

    /// Resolve an actor's role against current registry state.
    pub fn resolve_role(&self, actor: Address) -> Role<'_> {
        self.registry.resolve_role(actor)
    }

    /// The transferred player's age in whole years on the given date.
    pub fn player_age(
        &self,
        id: u64,
        on: chrono::NaiveDate,
    ) -> Result<Option<u32>, LedgerError> {
        let transfer = self
            .transfers
            .get(&id)
            .ok_or(LedgerError::UnknownTransfer(id))?;
        Ok(transfer.player.age_on(on))
    }

    // ---- Internals ----

    fn require_federation(&self, caller: Address) -> Result<(), LedgerError> {
        if caller != self.registry.federation() {
            return Err(LedgerError::NotFederation);
        }
        Ok(())
    }

    fn validate_player(player: &PlayerData) -> Result<(), LedgerError> {
        let name = player.name.trim();
        if name.is_empty() || name.len() > MAX_PLAYER_NAME_LENGTH {
            return Err(LedgerError::InvalidPlayerName(player.name.clone()));
        }
        Ok(())
    }

    /// Compute the post-distribution balances without writing them.
    /// Credits to the same address (an agent who is also the origin, say)
    /// are merged first so the overflow check is exact.
    fn stage_credits(
        &self,
        transfer: &Transfer,
        split: Distribution,
    ) -> Result<Vec<(Address, u64)>, LedgerError> {
        let mut merged: BTreeMap<Address, u64> = BTreeMap::new();
        let mut add = |account: Address, amount: u64| -> Result<(), LedgerError> {
            let entry = merged.entry(account).or_insert(0);
            *entry = entry
                .checked_add(amount)
                .ok_or(LedgerError::BalanceOverflow(account))?;
            Ok(())
        };

        add(transfer.origin, split.origin_share)?;
        add(self.formation_account, split.formation_share)?;
        if let Some(agent) = transfer.agent {
            add(agent, split.agent_share)?;
        }

        merged
            .into_iter()
            .map(|(account, credit)| {
                let new_balance = self
                    .balance(account)
                    .checked_add(credit)
                    .ok_or(LedgerError::BalanceOverflow(account))?;
                Ok((account, new_balance))
            })
            .collect()
    }
}
