//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use rand::rngs::StdRng;
use rand::SeedableRng;

use castle_core::{Amount, DealIdGenerator, UserId};
use castle_engine::{CreateDealRequest, DealLifecycleEngine, Repository};
use castle_store::{DurableStore, MemoryStore};

pub const OPERATOR: UserId = UserId::new(6_828_395_702);
pub const SELLER: UserId = UserId::new(1001);
pub const BUYER: UserId = UserId::new(2002);
pub const STRANGER: UserId = UserId::new(3003);

/// Engine over any store, with a deterministic id generator.
pub fn engine_over(store: impl DurableStore + 'static, seed: u64) -> DealLifecycleEngine {
    let repo = Repository::open(store).unwrap();
    DealLifecycleEngine::with_id_generator(
        repo,
        OPERATOR,
        DealIdGenerator::from_rng(StdRng::seed_from_u64(seed)),
    )
}

/// Engine over a fresh in-memory store, returning the store for inspection.
pub fn memory_engine() -> (DealLifecycleEngine, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    (engine_over(Arc::clone(&store), 42), store)
}

pub fn create(engine: &DealLifecycleEngine, seller: UserId, price: &str) -> String {
    let request = CreateDealRequest::new(seller, "NFT", "Plush Pepe", "Rare collectible", price);
    engine.create_deal(&request).unwrap().id().to_string()
}

pub fn fund(engine: &DealLifecycleEngine, user: UserId, units: u32) {
    engine
        .credit_account(OPERATOR, user, Amount::whole(units))
        .unwrap();
}

/// Sum of every balance plus every escrow held by a deal.
pub fn total_money(engine: &DealLifecycleEngine) -> Amount {
    let snapshot = engine.repository().snapshot();
    let balances = snapshot.users.total_balance().unwrap();
    let total = snapshot
        .deals
        .iter()
        .try_fold(balances, |sum, deal| sum.checked_add(deal.escrow_amount()));
    total.unwrap()
}
