//! # castle-state — Deal Lifecycle State Machine
//!
//! Deals move through a small, monotonic lifecycle:
//!
//! ```text
//! Open → InProcess → Transferred → Completed
//!   └──→ Cancelled
//! ```
//!
//! - **Deal** (`deal.rs`): the record, its validated transitions and the
//!   audit log of status changes.
//! - **Registry** (`registry.rs`): the id-keyed collection of deals and the
//!   only place new deals are created.
//!
//! ## Design
//!
//! Status is a runtime enum, not a typestate: deals are loaded by id from a
//! persisted document. Every transition checks status before role and leaves
//! the deal untouched on error. Funds are not moved here; the ledger crate
//! pairs each escrow change with the matching balance change.

pub mod deal;
pub mod registry;

pub use deal::{
    Deal, DealAction, DealError, DealRole, DealStatus, DealTerms, DealTransitionRecord,
};
pub use registry::DealRegistry;
