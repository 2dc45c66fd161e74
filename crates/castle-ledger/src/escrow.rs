//! # Balance Ledger — Escrow Reserve and Release
//!
//! Pairs every escrow movement with the deal transition that causes it:
//!
//! - [`BalanceLedger::reserve`]: debit the buyer by the price and move the
//!   deal `Open → InProcess` with `escrow_amount = price`.
//! - [`BalanceLedger::release`]: move the deal `Transferred → Completed`,
//!   empty the escrow and credit the seller by the released amount.
//!
//! ## Atomicity
//!
//! Each pair is validated in full before either half is applied. If the
//! deal guard, the role check, the buyer's balance or the seller's credit
//! headroom fails, neither the account nor the deal is touched.

use castle_core::{Amount, UserId};
use castle_state::Deal;

use crate::account::{BalanceDelta, IdentityStore};
use crate::error::LedgerError;

/// Fund movements over an [`IdentityStore`].
#[derive(Debug)]
pub struct BalanceLedger<'a> {
    accounts: &'a mut IdentityStore,
}

impl<'a> BalanceLedger<'a> {
    pub fn new(accounts: &'a mut IdentityStore) -> Self {
        Self { accounts }
    }

    /// Credit `user` by `amount`, returning the new balance.
    pub fn credit(&mut self, user: UserId, amount: Amount) -> Result<Amount, LedgerError> {
        self.accounts
            .adjust_balance(user, BalanceDelta::Credit(amount))
    }

    /// Debit `user` by `amount`, returning the new balance.
    pub fn debit(&mut self, user: UserId, amount: Amount) -> Result<Amount, LedgerError> {
        self.accounts
            .adjust_balance(user, BalanceDelta::Debit(amount))
    }

    /// Escrow the deal's price from `buyer` and mark the deal in process.
    ///
    /// Returns the buyer's new balance.
    pub fn reserve(&mut self, deal: &mut Deal, buyer: UserId) -> Result<Amount, LedgerError> {
        deal.check_join(buyer)?;
        let price = deal.price();
        let balance = self.accounts.balance_of(buyer);
        if balance < price {
            return Err(LedgerError::InsufficientFunds {
                user: buyer,
                balance,
                required: price,
            });
        }

        let buyer_name = self.accounts.display_name(buyer).map(str::to_string);
        let remaining = self.debit(buyer, price)?;
        deal.begin_escrow(buyer, buyer_name)?;
        tracing::debug!(
            deal_id = %deal.id(),
            buyer = %buyer,
            escrowed = %price,
            remaining = %remaining,
            "escrow reserved"
        );
        Ok(remaining)
    }

    /// Complete the deal on the buyer's confirmation and pay the seller.
    ///
    /// Returns the amount released to the seller.
    pub fn release(&mut self, deal: &mut Deal, actor: UserId) -> Result<Amount, LedgerError> {
        let amount = deal.check_receipt(actor)?;
        let seller = deal.seller_id();
        let balance = self.accounts.balance_of(seller);
        if balance.checked_add(amount).is_none() {
            return Err(LedgerError::Overflow {
                user: seller,
                balance,
                credit: amount,
            });
        }

        let released = deal.confirm_received(actor)?;
        let seller_balance = self.credit(seller, released)?;
        tracing::debug!(
            deal_id = %deal.id(),
            seller = %seller,
            released = %released,
            seller_balance = %seller_balance,
            "escrow released"
        );
        Ok(released)
    }
}
