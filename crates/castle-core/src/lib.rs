//! # castle-core — Foundational Types for the Castle Escrow Stack
//!
//! Every other crate in the workspace depends on `castle-core`; it depends on
//! nothing internal.
//!
//! ## Key Design Principles
//!
//! 1. **Newtype wrappers for identifiers.** `UserId`, `ChatId` and `DealId`
//!    are distinct types. A `DealId` can only be obtained through its
//!    validating parser or the [`DealIdGenerator`], so every id in the system
//!    matches `#` + one uppercase letter + 1 to 6 digits.
//!
//! 2. **Fixed-point money.** [`Amount`] stores non-negative micro-units in a
//!    `u64`. Arithmetic is checked; there is no way to construct a negative
//!    balance or to lose precision through binary floats.
//!
//! 3. **UTC-only timestamps.** [`Timestamp`] is UTC with seconds precision.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `castle-*` crates (this is the leaf of the DAG).
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod amount;
pub mod error;
pub mod identity;
pub mod temporal;

pub use amount::Amount;
pub use error::CoreError;
pub use identity::{ChatId, DealId, DealIdGenerator, UserId};
pub use temporal::Timestamp;
