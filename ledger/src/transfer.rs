//! # Transfer Record & State Machine
//!
//! One transfer record ("fichaje"): the player, the two clubs, the agreed
//! value, and the escrow/signature flags that drive the lifecycle:
//!
//! ```text
//! Created --deposit--> Funded --sign--> SingleSigned --sign--> Approved
//!    ^                   |                   |
//!    +------refund-------+-------refund------+
//! ```
//!
//! `Approved` is terminal. A transfer can bounce between funded and
//! refunded indefinitely, but approval fires exactly once, and only in the
//! same step that records the second signature while funds are present.
//!
//! This module holds the *record-level* preconditions — who is allowed to
//! trigger each mutation is the ledger's concern, not the record's.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use fichaje_protocol::identity::Address;
use fichaje_protocol::store::ContentHash;

/// Record-level precondition failures.
#[derive(Debug, Error)]
pub enum TransferError {
    /// Deposits must match the transfer value exactly. Partial funding is
    /// not part of this protocol.
    #[error("wrong deposit amount: transfer value is {expected}, got {got}")]
    WrongAmount {
        /// The transfer's agreed value.
        expected: u64,
        /// What the caller tried to deposit.
        got: u64,
    },

    /// Funds are already escrowed for this transfer.
    #[error("funds already deposited for this transfer")]
    AlreadyDeposited,

    /// The operation needs escrowed funds and there are none.
    #[error("no funds deposited for this transfer")]
    NoFundsDeposited,

    /// This party's signature is already recorded.
    #[error("{party} club has already signed this transfer")]
    AlreadySigned {
        /// Which party repeated itself.
        party: Party,
    },

    /// The transfer is approved and therefore immutable.
    #[error("transfer is approved and can no longer change")]
    AlreadyApproved,

    /// A document hash is already recorded. First write wins; replacing
    /// the hash would rewrite the audit trail.
    #[error("a document is already attached to this transfer")]
    DocumentAlreadyAttached,
}

/// The two club-side parties to a transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Party {
    /// The selling club.
    Origin,
    /// The buying club, which deposits the funds.
    Destination,
}

impl std::fmt::Display for Party {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Party::Origin => write!(f, "origin"),
            Party::Destination => write!(f, "destination"),
        }
    }
}

/// The player being transferred. The birth date is stored; age is always
/// derived at read time so it can never go stale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerData {
    /// The player's name.
    pub name: String,
    /// Date of birth.
    pub birth_date: NaiveDate,
}

impl PlayerData {
    /// The player's age in whole years on the given date.
    ///
    /// Returns `None` if `on` precedes the birth date.
    pub fn age_on(&self, on: NaiveDate) -> Option<u32> {
        on.years_since(self.birth_date)
    }
}

/// The dual-signature state of a transfer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureSet {
    /// Whether the origin club has signed.
    pub origin: bool,
    /// Whether the destination club has signed.
    pub destination: bool,
}

impl SignatureSet {
    fn get(&self, party: Party) -> bool {
        match party {
            Party::Origin => self.origin,
            Party::Destination => self.destination,
        }
    }

    fn set(&mut self, party: Party) {
        match party {
            Party::Origin => self.origin = true,
            Party::Destination => self.destination = true,
        }
    }

    /// Both parties have signed.
    pub fn complete(&self) -> bool {
        self.origin && self.destination
    }

    /// Whether a signature from `party` would complete the pair, i.e. the
    /// other party has already signed.
    pub fn complete_with(&self, party: Party) -> bool {
        match party {
            Party::Origin => self.destination,
            Party::Destination => self.origin,
        }
    }
}

/// The derived lifecycle status of a transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransferStatus {
    /// Registered, awaiting the destination club's deposit.
    Created,
    /// Funds escrowed, awaiting both signatures.
    Funded,
    /// Funds escrowed, one signature recorded.
    SingleSigned,
    /// Terminal: both signatures landed while funded, funds distributed.
    Approved,
}

impl std::fmt::Display for TransferStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransferStatus::Created => write!(f, "Created"),
            TransferStatus::Funded => write!(f, "Funded"),
            TransferStatus::SingleSigned => write!(f, "SingleSigned"),
            TransferStatus::Approved => write!(f, "Approved"),
        }
    }
}

/// One transfer record, the aggregate root of the settlement protocol.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transfer {
    /// Monotonic id assigned by the ledger, never reused.
    pub id: u64,
    /// The player changing clubs.
    pub player: PlayerData,
    /// The selling club. Immutable after creation.
    pub origin: Address,
    /// The buying club. Immutable after creation.
    pub destination: Address,
    /// Transfer value in ledger base units.
    pub value: u64,
    /// Optional agent entitled to the agent share.
    pub agent: Option<Address>,
    /// Whether exactly `value` is currently escrowed for this transfer.
    pub funds_deposited: bool,
    /// The dual-signature flags.
    pub signatures: SignatureSet,
    /// Terminal flag; set in the same step as the second signature.
    pub approved: bool,
    /// Content address of the sealed contract document, at most one.
    pub document_hash: Option<ContentHash>,
    /// The identity that registered this transfer (origin club, or the
    /// federation acting on its behalf).
    pub uploaded_by: Address,
    /// When the transfer was registered.
    pub created_at: DateTime<Utc>,
}

impl Transfer {
    /// Create a record in `Created` status. Party and authorization checks
    /// belong to the ledger; this constructor only shapes the record.
    pub fn new(
        id: u64,
        player: PlayerData,
        origin: Address,
        destination: Address,
        value: u64,
        agent: Option<Address>,
        uploaded_by: Address,
    ) -> Self {
        Self {
            id,
            player,
            origin,
            destination,
            value,
            agent,
            funds_deposited: false,
            signatures: SignatureSet::default(),
            approved: false,
            document_hash: None,
            uploaded_by,
            created_at: Utc::now(),
        }
    }

    /// The derived lifecycle status.
    ///
    /// A signature can only exist while funds are escrowed (refund clears
    /// both), so the mapping is unambiguous.
    pub fn status(&self) -> TransferStatus {
        if self.approved {
            TransferStatus::Approved
        } else if self.signatures.origin || self.signatures.destination {
            TransferStatus::SingleSigned
        } else if self.funds_deposited {
            TransferStatus::Funded
        } else {
            TransferStatus::Created
        }
    }

    /// Which party an address is in this transfer, if any.
    pub fn party_of(&self, actor: Address) -> Option<Party> {
        if actor == self.origin {
            Some(Party::Origin)
        } else if actor == self.destination {
            Some(Party::Destination)
        } else {
            None
        }
    }

    /// Record the destination club's deposit.
    ///
    /// # Errors
    ///
    /// [`TransferError::AlreadyApproved`], [`TransferError::AlreadyDeposited`],
    /// or [`TransferError::WrongAmount`] — the deposit must equal `value`
    /// exactly.
    pub fn deposit(&mut self, amount: u64) -> Result<(), TransferError> {
        if self.approved {
            return Err(TransferError::AlreadyApproved);
        }
        if self.funds_deposited {
            return Err(TransferError::AlreadyDeposited);
        }
        if amount != self.value {
            return Err(TransferError::WrongAmount {
                expected: self.value,
                got: amount,
            });
        }
        self.funds_deposited = true;
        Ok(())
    }

    /// Record a party's signature.
    ///
    /// Returns `true` iff this call completed the dual signature while
    /// funds are escrowed — that is, iff this exact call approved the
    /// transfer. The caller must distribute the escrow in the same atomic
    /// step. Exactly one call per transfer can ever return `true`.
    ///
    /// # Errors
    ///
    /// [`TransferError::AlreadyApproved`], [`TransferError::NoFundsDeposited`]
    /// (signatures affirm a funded deal, not an intention), or
    /// [`TransferError::AlreadySigned`].
    pub fn sign(&mut self, party: Party) -> Result<bool, TransferError> {
        if self.approved {
            return Err(TransferError::AlreadyApproved);
        }
        if !self.funds_deposited {
            return Err(TransferError::NoFundsDeposited);
        }
        if self.signatures.get(party) {
            return Err(TransferError::AlreadySigned { party });
        }

        self.signatures.set(party);

        if self.signatures.complete() {
            self.approved = true;
            return Ok(true);
        }
        Ok(false)
    }

    /// Clear the escrow flag and both signatures.
    ///
    /// Signatures do not survive a refund: once the money has moved back,
    /// both clubs must re-affirm the deal against the re-deposited funds.
    ///
    /// # Errors
    ///
    /// [`TransferError::AlreadyApproved`] or [`TransferError::NoFundsDeposited`].
    pub fn refund(&mut self) -> Result<(), TransferError> {
        if self.approved {
            return Err(TransferError::AlreadyApproved);
        }
        if !self.funds_deposited {
            return Err(TransferError::NoFundsDeposited);
        }
        self.funds_deposited = false;
        self.signatures = SignatureSet::default();
        Ok(())
    }

    /// Record the sealed document's content hash. First write wins.
    ///
    /// # Errors
    ///
    /// [`TransferError::AlreadyApproved`] or
    /// [`TransferError::DocumentAlreadyAttached`].
    pub fn attach_document(&mut self, hash: ContentHash) -> Result<(), TransferError> {
        if self.approved {
            return Err(TransferError::AlreadyApproved);
        }
        if self.document_hash.is_some() {
            return Err(TransferError::DocumentAlreadyAttached);
        }
        self.document_hash = Some(hash);
        Ok(())
    }

    /// Amend player data, value, and agent.
    ///
    /// Only valid before any money moves: a deposit was matched against a
    /// specific value, so a funded transfer's terms are frozen.
    ///
    /// # Errors
    ///
    /// [`TransferError::AlreadyApproved`] or [`TransferError::AlreadyDeposited`].
    pub fn edit(
        &mut self,
        player: PlayerData,
        value: u64,
        agent: Option<Address>,
    ) -> Result<(), TransferError> {
        if self.approved {
            return Err(TransferError::AlreadyApproved);
        }
        if self.funds_deposited {
            return Err(TransferError::AlreadyDeposited);
        }
        self.player = player;
        self.value = value;
        self.agent = agent;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fichaje_protocol::identity::ActorKeypair;

    fn addr() -> Address {
        ActorKeypair::generate().address()
    }

    fn player() -> PlayerData {
        PlayerData {
            name: "Iker Muniain".into(),
            birth_date: NaiveDate::from_ymd_opt(1992, 12, 19).unwrap(),
        }
    }

    fn sample(value: u64) -> Transfer {
        let origin = addr();
        Transfer::new(1, player(), origin, addr(), value, None, origin)
    }

    #[test]
    fn fresh_transfer_is_created() {
        let t = sample(1_000);
        assert_eq!(t.status(), TransferStatus::Created);
        assert!(!t.funds_deposited);
        assert!(!t.approved);
        assert!(t.document_hash.is_none());
    }

    #[test]
    fn exact_deposit_funds_the_transfer() {
        let mut t = sample(1_000);
        t.deposit(1_000).unwrap();
        assert_eq!(t.status(), TransferStatus::Funded);
    }

    #[test]
    fn wrong_amount_rejected_with_both_figures() {
        let mut t = sample(1_000);
        let err = t.deposit(999).unwrap_err();
        assert!(matches!(
            err,
            TransferError::WrongAmount {
                expected: 1_000,
                got: 999
            }
        ));
        assert!(!t.funds_deposited);
    }

    #[test]
    fn double_deposit_rejected() {
        let mut t = sample(1_000);
        t.deposit(1_000).unwrap();
        assert!(matches!(
            t.deposit(1_000),
            Err(TransferError::AlreadyDeposited)
        ));
    }

    #[test]
    fn signing_requires_funds() {
        let mut t = sample(1_000);
        assert!(matches!(
            t.sign(Party::Origin),
            Err(TransferError::NoFundsDeposited)
        ));
    }

    #[test]
    fn second_signature_approves() {
        let mut t = sample(1_000);
        t.deposit(1_000).unwrap();

        assert!(!t.sign(Party::Origin).unwrap());
        assert_eq!(t.status(), TransferStatus::SingleSigned);

        assert!(t.sign(Party::Destination).unwrap());
        assert_eq!(t.status(), TransferStatus::Approved);
    }

    #[test]
    fn signature_order_does_not_matter() {
        let mut t = sample(1_000);
        t.deposit(1_000).unwrap();
        assert!(!t.sign(Party::Destination).unwrap());
        assert!(t.sign(Party::Origin).unwrap());
        assert!(t.approved);
    }

    #[test]
    fn repeat_signature_rejected_with_party() {
        let mut t = sample(1_000);
        t.deposit(1_000).unwrap();
        t.sign(Party::Origin).unwrap();
        assert!(matches!(
            t.sign(Party::Origin),
            Err(TransferError::AlreadySigned {
                party: Party::Origin
            })
        ));
        assert!(t.signatures.origin);
        assert!(!t.signatures.destination);
    }

    #[test]
    fn refund_clears_funds_and_signatures() {
        let mut t = sample(1_000);
        t.deposit(1_000).unwrap();
        t.sign(Party::Origin).unwrap();

        t.refund().unwrap();
        assert!(!t.funds_deposited);
        assert_eq!(t.signatures, SignatureSet::default());
        assert_eq!(t.status(), TransferStatus::Created);
    }

    #[test]
    fn refund_without_funds_rejected() {
        let mut t = sample(1_000);
        assert!(matches!(t.refund(), Err(TransferError::NoFundsDeposited)));
    }

    #[test]
    fn approved_transfer_is_frozen() {
        let mut t = sample(1_000);
        t.deposit(1_000).unwrap();
        t.sign(Party::Origin).unwrap();
        t.sign(Party::Destination).unwrap();

        assert!(matches!(t.deposit(1_000), Err(TransferError::AlreadyApproved)));
        assert!(matches!(
            t.sign(Party::Origin),
            Err(TransferError::AlreadyApproved)
        ));
        assert!(matches!(t.refund(), Err(TransferError::AlreadyApproved)));
        assert!(matches!(
            t.attach_document(ContentHash::of(b"late")),
            Err(TransferError::AlreadyApproved)
        ));
        assert!(matches!(
            t.edit(player(), 2_000, None),
            Err(TransferError::AlreadyApproved)
        ));
    }

    #[test]
    fn cycle_funded_refunded_then_approve_once() {
        let mut t = sample(1_000);
        for _ in 0..3 {
            t.deposit(1_000).unwrap();
            t.refund().unwrap();
        }
        t.deposit(1_000).unwrap();
        t.sign(Party::Origin).unwrap();
        assert!(t.sign(Party::Destination).unwrap());
        assert!(t.approved);
    }

    #[test]
    fn document_attaches_once() {
        let mut t = sample(1_000);
        t.attach_document(ContentHash::of(b"contract v1")).unwrap();
        assert!(matches!(
            t.attach_document(ContentHash::of(b"contract v2")),
            Err(TransferError::DocumentAlreadyAttached)
        ));
        assert_eq!(t.document_hash, Some(ContentHash::of(b"contract v1")));
    }

    #[test]
    fn edit_before_funding_only() {
        let mut t = sample(1_000);
        t.edit(player(), 2_500, Some(addr())).unwrap();
        assert_eq!(t.value, 2_500);
        assert!(t.agent.is_some());

        t.deposit(2_500).unwrap();
        assert!(matches!(
            t.edit(player(), 3_000, None),
            Err(TransferError::AlreadyDeposited)
        ));
        assert_eq!(t.value, 2_500);
    }

    #[test]
    fn player_age_derives_from_birth_date() {
        let p = player();
        let on = NaiveDate::from_ymd_opt(2026, 8, 26).unwrap();
        assert_eq!(p.age_on(on), Some(33));
        // Day before the birthday.
        let before = NaiveDate::from_ymd_opt(2025, 12, 18).unwrap();
        assert_eq!(p.age_on(before), Some(32));
        // A date before birth has no age.
        let prenatal = NaiveDate::from_ymd_opt(1990, 1, 1).unwrap();
        assert_eq!(p.age_on(prenatal), None);
    }
}
