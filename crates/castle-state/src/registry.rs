//! # Deal Registry
//!
//! The keyed collection of all deals. The registry is the only place deals
//! are created, so every id it hands out is unique within it. Persisted as a
//! JSON object mapping deal id to deal record.

use std::collections::BTreeMap;

use rand::Rng;
use serde::{Deserialize, Serialize};

use castle_core::{DealId, DealIdGenerator, UserId};

use crate::deal::{Deal, DealError, DealTerms};

/// All deals, keyed by id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DealRegistry {
    deals: BTreeMap<DealId, Deal>,
}

impl DealRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new open deal under a fresh id.
    pub fn create<R: Rng>(
        &mut self,
        ids: &mut DealIdGenerator<R>,
        seller: UserId,
        seller_username: Option<String>,
        terms: DealTerms,
    ) -> &Deal {
        let id = ids.generate(|candidate| self.deals.contains_key(candidate));
        self.deals
            .entry(id.clone())
            .or_insert_with(|| Deal::open(id, seller, seller_username, terms))
    }

    pub fn get(&self, id: &DealId) -> Option<&Deal> {
        self.deals.get(id)
    }

    /// Look up a deal, failing with [`DealError::NotFound`].
    pub fn require(&self, id: &DealId) -> Result<&Deal, DealError> {
        self.deals
            .get(id)
            .ok_or_else(|| DealError::NotFound(id.clone()))
    }

    /// Mutable lookup, failing with [`DealError::NotFound`].
    pub fn require_mut(&mut self, id: &DealId) -> Result<&mut Deal, DealError> {
        self.deals
            .get_mut(id)
            .ok_or_else(|| DealError::NotFound(id.clone()))
    }

    pub fn contains(&self, id: &DealId) -> bool {
        self.deals.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.deals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.deals.is_empty()
    }

    /// All deals in id order.
    pub fn iter(&self) -> impl Iterator<Item = &Deal> {
        self.deals.values()
    }

    /// Deals in which `user` is the seller or the buyer.
    pub fn involving(&self, user: UserId) -> impl Iterator<Item = &Deal> {
        self.deals.values().filter(move |deal| deal.involves(user))
    }

    /// Check every stored deal: keys match ids and lifecycle invariants hold.
    pub fn validate(&self) -> Result<(), DealError> {
        for (key, deal) in &self.deals {
            if key != deal.id() {
                return Err(DealError::Corrupt {
                    deal_id: key.clone(),
                    reason: format!("stored under key {key} but carries id {}", deal.id()),
                });
            }
            deal.check_invariants()?;
        }
        Ok(())
    }
}
