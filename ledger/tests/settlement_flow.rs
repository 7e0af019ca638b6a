//! End-to-end settlement flows: the full lifecycle from club authorization
//! through deposit, dual signature, distribution, and refund, plus the
//! sealed-document round trip against the in-memory content store.

use chrono::NaiveDate;

use fichaje_ledger::{
    ErrorCategory, FichajeLedger, LedgerError, PlayerData, TransferStatus,
};
use fichaje_protocol::crypto::sealed::FederationKeypair;
use fichaje_protocol::document::{retrieve_document, submit_document};
use fichaje_protocol::identity::{ActorKeypair, Address};
use fichaje_protocol::store::MemoryStore;

const ONE_AND_A_HALF: u64 = 1_500_000_000_000_000_000;

struct Network {
    ledger: FichajeLedger,
    federation: Address,
    club_a: Address,
    club_b: Address,
}

fn network() -> Network {
    let federation = ActorKeypair::generate().address();
    let club_a = ActorKeypair::generate().address();
    let club_b = ActorKeypair::generate().address();

    let mut ledger = FichajeLedger::new(federation);
    ledger
        .authorize_club(federation, club_a, "Club Atletico A")
        .unwrap();
    ledger
        .authorize_club(federation, club_b, "Club Deportivo B")
        .unwrap();

    Network {
        ledger,
        federation,
        club_a,
        club_b,
    }
}

fn young_player() -> PlayerData {
    PlayerData {
        name: "Pablo Torres".into(),
        birth_date: NaiveDate::from_ymd_opt(2004, 6, 15).unwrap(),
    }
}

fn register(net: &mut Network, value: u64) -> u64 {
    net.ledger
        .create_transfer(
            net.club_a,
            young_player(),
            net.club_a,
            net.club_b,
            value,
            None,
        )
        .unwrap()
}

#[test]
fn scenario_a_full_settlement_at_reference_value() {
    let mut net = network();
    let id = register(&mut net, ONE_AND_A_HALF);

    net.ledger
        .deposit_funds(net.club_b, id, ONE_AND_A_HALF)
        .unwrap();
    assert!(net.ledger.transfer(id).unwrap().funds_deposited);

    // First signature: no distribution yet.
    assert!(net.ledger.sign_transfer(net.club_a, id).unwrap().is_none());
    let t = net.ledger.transfer(id).unwrap();
    assert!(t.signatures.origin);
    assert!(!t.signatures.destination);
    assert!(!t.approved);

    // Second signature approves and distributes in the same step.
    let split = net
        .ledger
        .sign_transfer(net.club_b, id)
        .unwrap()
        .expect("approval must fire on the second signature");

    // 5% formation; no agent, so the agent cut is redirected to origin.
    assert_eq!(split.origin_share, 1_425_000_000_000_000_000);
    assert_eq!(split.formation_share, 75_000_000_000_000_000);
    assert_eq!(split.agent_share, 0);

    let t = net.ledger.transfer(id).unwrap();
    assert!(t.approved);
    assert_eq!(t.status(), TransferStatus::Approved);
    assert_eq!(net.ledger.escrowed(id), 0);
    assert_eq!(net.ledger.balance(net.club_a), 1_425_000_000_000_000_000);
    assert_eq!(net.ledger.balance(net.federation), 75_000_000_000_000_000);
}

#[test]
fn scenario_b_wrong_deposit_amount_rejected() {
    let mut net = network();
    let id = register(&mut net, ONE_AND_A_HALF);

    let err = net
        .ledger
        .deposit_funds(net.club_b, id, 1_400_000_000_000_000_000)
        .unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Precondition);
    assert!(!net.ledger.transfer(id).unwrap().funds_deposited);
    assert_eq!(net.ledger.escrowed(id), 0);
}

#[test]
fn scenario_c_double_sign_rejected() {
    let mut net = network();
    let id = register(&mut net, ONE_AND_A_HALF);
    net.ledger
        .deposit_funds(net.club_b, id, ONE_AND_A_HALF)
        .unwrap();
    net.ledger.sign_transfer(net.club_a, id).unwrap();

    let err = net.ledger.sign_transfer(net.club_a, id).unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Precondition);
    assert!(err.to_string().contains("already signed"));

    let t = net.ledger.transfer(id).unwrap();
    assert!(t.signatures.origin);
    assert!(!t.signatures.destination);
    assert!(!t.approved);
}

#[test]
fn scenario_d_refund_resets_to_awaiting_deposit() {
    let mut net = network();
    let id = register(&mut net, ONE_AND_A_HALF);
    net.ledger
        .deposit_funds(net.club_b, id, ONE_AND_A_HALF)
        .unwrap();
    net.ledger.sign_transfer(net.club_a, id).unwrap();

    let refunded = net.ledger.refund(net.club_b, id).unwrap();
    assert_eq!(refunded, ONE_AND_A_HALF);

    let t = net.ledger.transfer(id).unwrap();
    assert!(!t.funds_deposited);
    assert_eq!(t.status(), TransferStatus::Created);
    // Policy: a refund clears both signatures, forcing re-affirmation once
    // funds return.
    assert!(!t.signatures.origin);
    assert!(!t.signatures.destination);

    // The transfer can still settle after a fresh deposit.
    net.ledger
        .deposit_funds(net.club_b, id, ONE_AND_A_HALF)
        .unwrap();
    net.ledger.sign_transfer(net.club_b, id).unwrap();
    assert!(net
        .ledger
        .sign_transfer(net.club_a, id)
        .unwrap()
        .is_some());
}

#[test]
fn scenario_e_unauthorized_deposit_rejected_before_mutation() {
    let mut net = network();
    let id = register(&mut net, ONE_AND_A_HALF);
    let intruder = ActorKeypair::generate().address();

    let err = net
        .ledger
        .deposit_funds(intruder, id, ONE_AND_A_HALF)
        .unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Authorization);
    assert!(!net.ledger.transfer(id).unwrap().funds_deposited);
    assert_eq!(net.ledger.escrowed(id), 0);
}

#[test]
fn p1_fund_conservation_across_awkward_values() {
    for value in [1u64, 7, 99, 10_001, 333_333_333, ONE_AND_A_HALF - 1] {
        let mut net = network();
        let id = register(&mut net, value);
        net.ledger.deposit_funds(net.club_b, id, value).unwrap();
        net.ledger.sign_transfer(net.club_a, id).unwrap();
        let split = net
            .ledger
            .sign_transfer(net.club_b, id)
            .unwrap()
            .unwrap();

        assert_eq!(
            split.origin_share + split.formation_share + split.agent_share,
            value,
            "value {value} leaked units in distribution"
        );
        assert_eq!(
            net.ledger.balance(net.club_a) + net.ledger.balance(net.federation),
            value
        );
    }
}

#[test]
fn p2_no_premature_approval() {
    let mut net = network();
    let id = register(&mut net, 1_000);

    // Signing before deposit is rejected outright.
    let err = net.ledger.sign_transfer(net.club_a, id).unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Precondition);
    assert!(!net.ledger.transfer(id).unwrap().approved);

    // One signature after deposit is still not approval.
    net.ledger.deposit_funds(net.club_b, id, 1_000).unwrap();
    net.ledger.sign_transfer(net.club_a, id).unwrap();
    assert!(!net.ledger.transfer(id).unwrap().approved);
}

#[test]
fn p3_approved_transfer_is_terminal() {
    let mut net = network();
    let id = register(&mut net, 1_000);
    net.ledger.deposit_funds(net.club_b, id, 1_000).unwrap();
    net.ledger.sign_transfer(net.club_a, id).unwrap();
    net.ledger.sign_transfer(net.club_b, id).unwrap();

    let before = serde_json::to_value(net.ledger.transfer(id).unwrap()).unwrap();

    assert!(net.ledger.deposit_funds(net.club_b, id, 1_000).is_err());
    assert!(net.ledger.sign_transfer(net.club_a, id).is_err());
    assert!(net.ledger.refund(net.club_b, id).is_err());
    assert!(net
        .ledger
        .edit_transfer(net.club_a, id, young_player(), 2_000, None)
        .is_err());

    let after = serde_json::to_value(net.ledger.transfer(id).unwrap()).unwrap();
    assert_eq!(before, after, "approved record must not change");
}

#[test]
fn p4_refund_exactness() {
    let mut net = network();
    let id = register(&mut net, 123_457);
    net.ledger.deposit_funds(net.club_b, id, 123_457).unwrap();

    let refunded = net.ledger.refund(net.club_b, id).unwrap();
    assert_eq!(refunded, 123_457);
    assert_eq!(net.ledger.balance(net.club_b), 123_457);
    assert!(!net.ledger.transfer(id).unwrap().funds_deposited);

    // A second refund finds nothing to return.
    assert!(matches!(
        net.ledger.refund(net.club_b, id),
        Err(LedgerError::Transfer(_))
    ));
    assert_eq!(net.ledger.balance(net.club_b), 123_457);
}

#[test]
fn p5_role_exclusivity_over_lifecycle() {
    use fichaje_ledger::Role;

    let mut net = network();
    let outsider = ActorKeypair::generate().address();

    assert!(matches!(
        net.ledger.resolve_role(net.federation),
        Role::FederationAuthority
    ));
    assert!(matches!(
        net.ledger.resolve_role(net.club_a),
        Role::AuthorizedClub(_)
    ));
    assert!(matches!(
        net.ledger.resolve_role(outsider),
        Role::Unauthorized
    ));

    net.ledger.revoke_club(net.federation, net.club_a).unwrap();
    assert!(matches!(
        net.ledger.resolve_role(net.club_a),
        Role::Unauthorized
    ));
}

#[tokio::test]
async fn p6_document_round_trip_through_ledger_and_store() {
    let mut net = network();
    let id = register(&mut net, ONE_AND_A_HALF);

    let store = MemoryStore::new();
    let federation_keys = FederationKeypair::generate();
    let contract = vec![0xC3u8; 2 * 1024 * 1024];

    // Origin club seals and publishes, then records the hash.
    let hash = submit_document(&store, &federation_keys.public_key(), &contract)
        .await
        .unwrap();
    net.ledger.attach_document(net.club_a, id, hash).unwrap();

    // Federation reviewer reads the hash off the ledger and opens the
    // document byte-for-byte.
    let recorded = net
        .ledger
        .transfer(id)
        .unwrap()
        .document_hash
        .expect("hash must be recorded");
    let opened = retrieve_document(&store, &federation_keys, &recorded)
        .await
        .unwrap();
    assert_eq!(opened, contract);
}

#[test]
fn document_cannot_be_replaced() {
    let mut net = network();
    let id = register(&mut net, 1_000);
    let first = fichaje_protocol::store::ContentHash::of(b"first bundle");

    net.ledger.attach_document(net.club_a, id, first).unwrap();
    let err = net
        .ledger
        .attach_document(
            net.club_a,
            id,
            fichaje_protocol::store::ContentHash::of(b"second bundle"),
        )
        .unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Precondition);
    assert_eq!(net.ledger.transfer(id).unwrap().document_hash, Some(first));
}
