//! # Concurrent Access
//!
//! Many threads driving the same engine. Mutations are serialized; readers
//! only ever see committed states. Engines opened separately on one file
//! stand in for separate processes sharing a document.

mod common;

use std::sync::{Arc, Barrier};
use std::thread;

use castle_core::{Amount, UserId};
use castle_engine::ErrorKind;
use castle_state::DealStatus;
use castle_store::JsonFileStore;

use common::*;

#[test]
fn concurrent_joins_admit_exactly_one_buyer() {
    for round in 0..20 {
        let (engine, _store) = memory_engine();
        let engine = Arc::new(engine);
        let id = create(&engine, SELLER, "100");
        let buyers: Vec<UserId> = (0..8).map(|i| UserId::new(10_000 + i)).collect();
        for buyer in &buyers {
            fund(&engine, *buyer, 100);
        }

        let barrier = Arc::new(Barrier::new(buyers.len()));
        let handles: Vec<_> = buyers
            .iter()
            .map(|buyer| {
                let engine = Arc::clone(&engine);
                let barrier = Arc::clone(&barrier);
                let id = id.clone();
                let buyer = *buyer;
                thread::spawn(move || {
                    barrier.wait();
                    engine.join_deal(buyer, &id).map_err(|e| e.kind())
                })
            })
            .collect();
        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        let winners = results.iter().filter(|r| r.is_ok()).count();
        assert_eq!(winners, 1, "round {round}: {results:?}");
        assert!(results
            .iter()
            .filter_map(|r| r.as_ref().err())
            .all(|kind| *kind == ErrorKind::InvalidState));

        let deal = engine.deal(&id).unwrap();
        assert_eq!(deal.status(), DealStatus::InProcess);
        let debited: Vec<_> = buyers
            .iter()
            .filter(|b| engine.balance_of(**b) == Amount::ZERO)
            .collect();
        assert_eq!(debited, vec![&deal.buyer_id().unwrap()]);
    }
}

#[test]
fn engines_sharing_a_file_admit_exactly_one_buyer() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("data.json");
    let buyers: Vec<UserId> = (0..4).map(|i| UserId::new(40_000 + i)).collect();
    let id = {
        let setup = engine_over(JsonFileStore::new(&path), 1);
        for buyer in &buyers {
            fund(&setup, *buyer, 100);
        }
        create(&setup, SELLER, "100")
    };

    let barrier = Arc::new(Barrier::new(buyers.len()));
    let handles: Vec<_> = buyers
        .iter()
        .enumerate()
        .map(|(i, buyer)| {
            let path = path.clone();
            let barrier = Arc::clone(&barrier);
            let id = id.clone();
            let buyer = *buyer;
            thread::spawn(move || {
                let engine = engine_over(JsonFileStore::new(&path), 100 + i as u64);
                barrier.wait();
                engine.join_deal(buyer, &id).map(|_| ()).map_err(|e| e.kind())
            })
        })
        .collect();
    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1, "{results:?}");
    assert!(results
        .iter()
        .filter_map(|r| r.as_ref().err())
        .all(|kind| *kind == ErrorKind::InvalidState));

    let engine = engine_over(JsonFileStore::new(&path), 2);
    let deal = engine.deal(&id).unwrap();
    assert_eq!(deal.status(), DealStatus::InProcess);
    let debited: Vec<_> = buyers
        .iter()
        .filter(|b| engine.balance_of(**b) == Amount::ZERO)
        .collect();
    assert_eq!(debited, vec![&deal.buyer_id().unwrap()]);
    assert_eq!(total_money(&engine), Amount::whole(400));
}

#[test]
fn parallel_trades_conserve_money() {
    let (engine, _store) = memory_engine();
    let engine = Arc::new(engine);
    let pairs: Vec<(UserId, UserId)> = (0..6)
        .map(|i| (UserId::new(20_000 + i), UserId::new(30_000 + i)))
        .collect();
    for (_, buyer) in &pairs {
        fund(&engine, *buyer, 50);
    }
    let total = total_money(&engine);

    let handles: Vec<_> = pairs
        .iter()
        .map(|(seller, buyer)| {
            let engine = Arc::clone(&engine);
            let (seller, buyer) = (*seller, *buyer);
            thread::spawn(move || {
                for _ in 0..5 {
                    let id = create(&engine, seller, "10");
                    engine.join_deal(buyer, &id).unwrap();
                    engine.confirm_shipped(seller, &id).unwrap();
                    engine.confirm_received(buyer, &id).unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(total_money(&engine), total);
    for (seller, buyer) in &pairs {
        assert_eq!(engine.balance_of(*seller), Amount::whole(50));
        assert_eq!(engine.balance_of(*buyer), Amount::ZERO);
    }
}

#[test]
fn readers_see_only_committed_states() {
    let (engine, _store) = memory_engine();
    let engine = Arc::new(engine);
    fund(&engine, BUYER, 1_000);
    let total = total_money(&engine);

    let writer = {
        let engine = Arc::clone(&engine);
        thread::spawn(move || {
            for _ in 0..50 {
                let id = create(&engine, SELLER, "7");
                engine.join_deal(BUYER, &id).unwrap();
                engine.confirm_shipped(SELLER, &id).unwrap();
                engine.confirm_received(BUYER, &id).unwrap();
            }
        })
    };
    let reader = {
        let engine = Arc::clone(&engine);
        thread::spawn(move || {
            for _ in 0..500 {
                let snapshot = engine.repository().snapshot();
                snapshot.validate().unwrap();
                let balances = snapshot.users.total_balance().unwrap();
                let escrow = snapshot
                    .deals
                    .iter()
                    .try_fold(Amount::ZERO, |sum, d| sum.checked_add(d.escrow_amount()))
                    .unwrap();
                assert_eq!(balances.checked_add(escrow).unwrap(), total);
            }
        })
    };
    writer.join().unwrap();
    reader.join().unwrap();
}
