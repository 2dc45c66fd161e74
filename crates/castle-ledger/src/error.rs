//! # Ledger Errors

use thiserror::Error;

use castle_core::{Amount, UserId};
use castle_state::DealError;

/// Errors from balance adjustments and escrow movements.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// A debit would take the balance below zero.
    #[error("insufficient funds for user {user}: balance {balance}, required {required}")]
    InsufficientFunds {
        /// The account holder.
        user: UserId,
        /// Balance at the time of the attempt.
        balance: Amount,
        /// Amount that was requested.
        required: Amount,
    },

    /// A credit would exceed the representable range.
    #[error("balance overflow for user {user}: {balance} + {credit}")]
    Overflow {
        /// The account holder.
        user: UserId,
        /// Balance at the time of the attempt.
        balance: Amount,
        /// Amount that was to be credited.
        credit: Amount,
    },

    /// The paired deal transition was rejected.
    #[error(transparent)]
    Deal(#[from] DealError),
}
