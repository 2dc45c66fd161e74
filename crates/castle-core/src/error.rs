//! # Error Types — Input Validation Failures
//!
//! Errors raised while parsing or constructing foundational values. All of
//! them describe malformed input: nothing in this crate touches shared state,
//! so every `CoreError` is local and recoverable by retrying with corrected
//! input.

use thiserror::Error;

/// Validation failure for a foundational value.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// Deal id does not match `#` + letter + 1 to 6 digits.
    #[error("malformed deal id {input:?}: expected '#', one letter A-Z and 1 to 6 digits (e.g. #A123)")]
    MalformedDealId {
        /// The rejected input.
        input: String,
    },

    /// Amount text could not be parsed as a non-negative decimal.
    #[error("malformed amount {input:?}: {reason}")]
    MalformedAmount {
        /// The rejected input.
        input: String,
        /// Why the input was rejected.
        reason: String,
    },

    /// User or chat id is not an integer.
    #[error("malformed id {0:?}: expected an integer")]
    MalformedId(String),

    /// Timestamp text is not a UTC RFC 3339 instant.
    #[error("invalid timestamp: {0}")]
    InvalidTimestamp(String),
}
