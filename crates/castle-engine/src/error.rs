//! # Engine Errors
//!
//! Every failure of an engine operation is an [`EngineError`]. Callers that
//! only need to decide how to respond use [`EngineError::kind`], which maps
//! each error onto one of six outcomes. Every kind except
//! [`ErrorKind::Persistence`] is raised before anything is written; a
//! persistence failure discards the in-memory mutation.

use thiserror::Error;

use castle_core::{CoreError, UserId};
use castle_ledger::LedgerError;
use castle_state::DealError;
use castle_store::StoreError;

/// Coarse classification of an [`EngineError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Malformed input: deal id, amount, item fields.
    Validation,
    /// The deal does not exist.
    NotFound,
    /// The deal is not in the status the operation requires.
    InvalidState,
    /// The buyer cannot cover the price.
    InsufficientFunds,
    /// The actor lacks the seller, buyer or operator role.
    Unauthorized,
    /// The document could not be flushed, or the stored one is unusable.
    Persistence,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Validation => "validation",
            Self::NotFound => "not_found",
            Self::InvalidState => "invalid_state",
            Self::InsufficientFunds => "insufficient_funds",
            Self::Unauthorized => "unauthorized",
            Self::Persistence => "persistence",
        };
        f.write_str(s)
    }
}

/// Failure of an engine operation.
#[derive(Error, Debug)]
pub enum EngineError {
    /// Malformed identifier or amount.
    #[error(transparent)]
    Malformed(#[from] CoreError),

    /// Request rejected by input validation.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The actor may not perform this operation.
    #[error("user {actor} is not authorized to {operation}")]
    Unauthorized {
        /// Who attempted the operation.
        actor: UserId,
        /// What they attempted.
        operation: &'static str,
    },

    /// A deal transition or lookup failed.
    #[error(transparent)]
    Deal(#[from] DealError),

    /// A balance movement failed.
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    /// The document could not be loaded or saved.
    #[error("persistence failure: {0}")]
    Persistence(#[from] StoreError),
}

impl EngineError {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Malformed(_) | Self::InvalidRequest(_) => ErrorKind::Validation,
            Self::Unauthorized { .. } => ErrorKind::Unauthorized,
            Self::Deal(e) => deal_kind(e),
            Self::Ledger(LedgerError::InsufficientFunds { .. }) => ErrorKind::InsufficientFunds,
            Self::Ledger(LedgerError::Overflow { .. }) => ErrorKind::Validation,
            Self::Ledger(LedgerError::Deal(e)) => deal_kind(e),
            Self::Persistence(_) => ErrorKind::Persistence,
        }
    }
}

fn deal_kind(error: &DealError) -> ErrorKind {
    match error {
        DealError::NotFound(_) => ErrorKind::NotFound,
        DealError::InvalidTransition { .. } => ErrorKind::InvalidState,
        DealError::NotParticipant { .. } | DealError::SelfDealing { .. } => ErrorKind::Unauthorized,
        DealError::InvalidTerms(_) => ErrorKind::Validation,
        DealError::Corrupt { .. } => ErrorKind::Persistence,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use castle_core::{Amount, DealId};
    use castle_state::{DealAction, DealStatus};

    fn deal_id() -> DealId {
        DealId::parse("#A1").unwrap()
    }

    #[test]
    fn test_kind_classification() {
        let cases: Vec<(EngineError, ErrorKind)> = vec![
            (
                CoreError::MalformedDealId { input: "x".into() }.into(),
                ErrorKind::Validation,
            ),
            (DealError::NotFound(deal_id()).into(), ErrorKind::NotFound),
            (
                DealError::InvalidTransition {
                    deal_id: deal_id(),
                    status: DealStatus::Completed,
                    action: DealAction::ConfirmReceived,
                }
                .into(),
                ErrorKind::InvalidState,
            ),
            (
                DealError::SelfDealing {
                    deal_id: deal_id(),
                    seller: UserId::new(1),
                }
                .into(),
                ErrorKind::Unauthorized,
            ),
            (
                LedgerError::InsufficientFunds {
                    user: UserId::new(2),
                    balance: Amount::whole(50),
                    required: Amount::whole(100),
                }
                .into(),
                ErrorKind::InsufficientFunds,
            ),
            (
                LedgerError::Deal(DealError::NotFound(deal_id())).into(),
                ErrorKind::NotFound,
            ),
            (
                StoreError::Unavailable("down".into()).into(),
                ErrorKind::Persistence,
            ),
            (
                EngineError::Unauthorized {
                    actor: UserId::new(3),
                    operation: "credit accounts",
                },
                ErrorKind::Unauthorized,
            ),
        ];
        for (error, expected) in cases {
            assert_eq!(error.kind(), expected, "{error}");
        }
    }

    #[test]
    fn test_unauthorized_message() {
        let err = EngineError::Unauthorized {
            actor: UserId::new(7),
            operation: "cancel deal #A1",
        };
        assert_eq!(err.to_string(), "user 7 is not authorized to cancel deal #A1");
    }
}
