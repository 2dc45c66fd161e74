//! # castle-ledger — Balances and Escrow
//!
//! - **Accounts** (`account.rs`): the [`IdentityStore`] of per-user balances
//!   and display names. Accounts are created lazily and never go negative.
//! - **Escrow** (`escrow.rs`): the [`BalanceLedger`], which pairs each debit
//!   or credit with the deal transition that justifies it.
//!
//! ## Money Conservation
//!
//! Over a deal's life the buyer is debited exactly once (on join) and the
//! seller credited exactly once (on receipt), both by the price. The sum of
//! all balances plus all open escrows is therefore invariant under every
//! lifecycle operation; only the operator's credit changes it.

pub mod account;
pub mod error;
pub mod escrow;

pub use account::{Account, AccountRecord, BalanceDelta, IdentityStore};
pub use error::LedgerError;
pub use escrow::BalanceLedger;
