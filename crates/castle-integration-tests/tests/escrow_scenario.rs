//! # End-to-End Escrow Scenario
//!
//! Full trade cycles through the engine: balances, escrow and deal status
//! checked after every step.

mod common;

use castle_core::Amount;
use castle_engine::ErrorKind;
use castle_state::DealStatus;

use common::*;

#[test]
fn insufficient_buyer_tops_up_and_completes_trade() {
    let (engine, _store) = memory_engine();
    let id = create(&engine, SELLER, "100");
    fund(&engine, BUYER, 50);

    let err = engine.join_deal(BUYER, &id).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InsufficientFunds);
    assert_eq!(engine.balance_of(BUYER), Amount::whole(50));
    assert_eq!(engine.deal(&id).unwrap().status(), DealStatus::Open);

    fund(&engine, BUYER, 100);
    assert_eq!(engine.balance_of(BUYER), Amount::whole(150));

    let joined = engine.join_deal(BUYER, &id).unwrap();
    assert_eq!(joined.status(), DealStatus::InProcess);
    assert_eq!(joined.escrow_amount(), Amount::whole(100));
    assert_eq!(joined.buyer_id(), Some(BUYER));
    assert_eq!(engine.balance_of(BUYER), Amount::whole(50));

    let shipped = engine.confirm_shipped(SELLER, &id).unwrap();
    assert_eq!(shipped.status(), DealStatus::Transferred);
    assert_eq!(shipped.escrow_amount(), Amount::whole(100));

    let seller_before = engine.balance_of(SELLER);
    let completed = engine.confirm_received(BUYER, &id).unwrap();
    assert_eq!(completed.status(), DealStatus::Completed);
    assert_eq!(completed.escrow_amount(), Amount::ZERO);
    assert_eq!(engine.balance_of(SELLER), seller_before.checked_add(Amount::whole(100)).unwrap());
    assert_eq!(engine.balance_of(BUYER), Amount::whole(50));
}

#[test]
fn money_is_conserved_across_lifecycle() {
    let (engine, _store) = memory_engine();
    fund(&engine, BUYER, 500);
    fund(&engine, STRANGER, 20);
    let total = total_money(&engine);

    let completed = create(&engine, SELLER, "120.5");
    let cancelled = create(&engine, SELLER, "10");
    let pending = create(&engine, SELLER, "99,99");

    engine.join_deal(BUYER, &completed).unwrap();
    assert_eq!(total_money(&engine), total);
    engine.confirm_shipped(SELLER, &completed).unwrap();
    engine.confirm_received(BUYER, &completed).unwrap();
    assert_eq!(total_money(&engine), total);

    engine.cancel_deal(SELLER, &cancelled).unwrap();
    engine.join_deal(BUYER, &pending).unwrap();
    assert_eq!(total_money(&engine), total);

    assert_eq!(engine.balance_of(SELLER), Amount::parse("120.5").unwrap());
    assert_eq!(
        engine.balance_of(BUYER),
        Amount::parse("279.51").unwrap()
    );
}

#[test]
fn double_receipt_credits_seller_once() {
    let (engine, _store) = memory_engine();
    let id = create(&engine, SELLER, "30");
    fund(&engine, BUYER, 30);
    engine.join_deal(BUYER, &id).unwrap();
    engine.confirm_shipped(SELLER, &id).unwrap();

    engine.confirm_received(BUYER, &id).unwrap();
    let second = engine.confirm_received(BUYER, &id).unwrap_err();
    assert_eq!(second.kind(), ErrorKind::InvalidState);
    assert_eq!(engine.balance_of(SELLER), Amount::whole(30));
}

#[test]
fn confirmations_target_the_named_deal() {
    let (engine, _store) = memory_engine();
    fund(&engine, BUYER, 10);
    let first = create(&engine, SELLER, "4");
    let second = create(&engine, SELLER, "6");
    engine.join_deal(BUYER, &first).unwrap();
    engine.join_deal(BUYER, &second).unwrap();

    engine.confirm_shipped(SELLER, &second).unwrap();
    assert_eq!(engine.deal(&first).unwrap().status(), DealStatus::InProcess);
    assert_eq!(engine.deal(&second).unwrap().status(), DealStatus::Transferred);

    engine.confirm_received(BUYER, &second).unwrap();
    assert_eq!(engine.balance_of(SELLER), Amount::whole(6));
    assert_eq!(engine.deal(&first).unwrap().escrow_amount(), Amount::whole(4));
}

#[test]
fn transition_log_tracks_the_trade() {
    let (engine, _store) = memory_engine();
    let id = create(&engine, SELLER, "1");
    fund(&engine, BUYER, 1);
    engine.join_deal(BUYER, &id).unwrap();
    engine.confirm_shipped(SELLER, &id).unwrap();
    let deal = engine.confirm_received(BUYER, &id).unwrap();

    let path: Vec<(DealStatus, DealStatus)> =
        deal.transitions().iter().map(|r| (r.from, r.to)).collect();
    assert_eq!(
        path,
        vec![
            (DealStatus::Open, DealStatus::InProcess),
            (DealStatus::InProcess, DealStatus::Transferred),
            (DealStatus::Transferred, DealStatus::Completed),
        ]
    );
    let actors: Vec<_> = deal.transitions().iter().map(|r| r.actor).collect();
    assert_eq!(actors, vec![BUYER, SELLER, BUYER]);
    assert!(deal.created_at().is_some());
}

#[test]
fn many_deals_get_unique_ids() {
    let (engine, _store) = memory_engine();
    let mut ids = std::collections::HashSet::new();
    for _ in 0..500 {
        assert!(ids.insert(create(&engine, SELLER, "1")));
    }
    assert_eq!(engine.deals_for(SELLER).len(), 500);
}
