//! # Deal Lifecycle State Machine
//!
//! Models a single escrowed trade between one seller and one buyer.
//!
//! ## States
//!
//! ```text
//! Open ──join──▶ InProcess ──confirm_shipped──▶ Transferred ──confirm_received──▶ Completed
//!  │
//!  └──cancel──▶ Cancelled
//! ```
//!
//! `Completed` and `Cancelled` are terminal. No transition ever returns to
//! `Open`.
//!
//! ## Design Decision
//!
//! The status is an enum with validated transitions rather than typestate
//! types: deals are loaded from a persisted document keyed by id, so their
//! state is only known at runtime. Each transition method checks the current
//! status first and the caller's role second, so an action attempted in the
//! wrong state always reports `InvalidTransition` regardless of who asked.
//!
//! ## Escrow Invariant
//!
//! `escrow_amount == price` while the status is `InProcess` or `Transferred`,
//! and zero otherwise. `buyer_id` is written exactly once, by
//! [`Deal::begin_escrow`].

use serde::{Deserialize, Serialize};
use thiserror::Error;

use castle_core::{Amount, DealId, Timestamp, UserId};

// ─── Status ──────────────────────────────────────────────────────────

/// Lifecycle status of a deal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DealStatus {
    /// Created by the seller, waiting for a buyer.
    Open,
    /// Buyer joined; the price is held in escrow.
    InProcess,
    /// Seller reports the item handed over.
    Transferred,
    /// Buyer confirmed receipt; escrow released to the seller (terminal).
    Completed,
    /// Withdrawn before any buyer joined (terminal).
    Cancelled,
}

impl DealStatus {
    /// Whether this status is terminal.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }

    /// Whether a deal in this status holds the buyer's funds.
    pub fn holds_escrow(&self) -> bool {
        matches!(self, Self::InProcess | Self::Transferred)
    }

    /// The persisted string name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::InProcess => "in_process",
            Self::Transferred => "transferred",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for DealStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The lifecycle actions a participant can attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DealAction {
    /// Buyer joins and funds the escrow.
    Join,
    /// Deal is withdrawn while still open.
    Cancel,
    /// Seller reports the handoff.
    ConfirmShipped,
    /// Buyer confirms receipt.
    ConfirmReceived,
}

impl std::fmt::Display for DealAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Join => "join",
            Self::Cancel => "cancel",
            Self::ConfirmShipped => "confirm shipped",
            Self::ConfirmReceived => "confirm received",
        };
        f.write_str(s)
    }
}

/// The role a participant must hold for an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DealRole {
    /// The user who created the deal.
    Seller,
    /// The user who joined the deal.
    Buyer,
}

impl std::fmt::Display for DealRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Seller => f.write_str("seller"),
            Self::Buyer => f.write_str("buyer"),
        }
    }
}

// ─── Errors ──────────────────────────────────────────────────────────

/// Errors raised by deal transitions and registry lookups.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DealError {
    /// No deal with this id exists.
    #[error("deal {0} not found")]
    NotFound(DealId),

    /// The action is not allowed from the deal's current status.
    #[error("deal {deal_id} cannot {action} while {status}")]
    InvalidTransition {
        /// The deal.
        deal_id: DealId,
        /// Its current status.
        status: DealStatus,
        /// The rejected action.
        action: DealAction,
    },

    /// The actor does not hold the role the action requires.
    #[error("user {actor} is not the {role} of deal {deal_id}")]
    NotParticipant {
        /// The deal.
        deal_id: DealId,
        /// Who attempted the action.
        actor: UserId,
        /// The role the action requires.
        role: DealRole,
    },

    /// The seller tried to join their own deal.
    #[error("seller {seller} cannot join own deal {deal_id}")]
    SelfDealing {
        /// The deal.
        deal_id: DealId,
        /// The seller.
        seller: UserId,
    },

    /// Item fields or price failed validation.
    #[error("invalid deal terms: {0}")]
    InvalidTerms(String),

    /// A stored deal breaks a lifecycle invariant.
    #[error("deal {deal_id} violates invariant: {reason}")]
    Corrupt {
        /// The deal.
        deal_id: DealId,
        /// The violated invariant.
        reason: String,
    },
}

// ─── Terms ───────────────────────────────────────────────────────────

/// Validated item description and price supplied by the seller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DealTerms {
    item_type: String,
    item_name: String,
    description: String,
    price: Amount,
}

impl DealTerms {
    /// Maximum length of the item type and name, in characters.
    pub const MAX_LABEL_CHARS: usize = 255;
    /// Maximum length of the description, in characters.
    pub const MAX_DESCRIPTION_CHARS: usize = 4096;

    /// Validate and trim the seller's input.
    pub fn new(
        item_type: &str,
        item_name: &str,
        description: &str,
        price: Amount,
    ) -> Result<Self, DealError> {
        let item_type = bounded_field("item type", item_type, Self::MAX_LABEL_CHARS)?;
        let item_name = bounded_field("item name", item_name, Self::MAX_LABEL_CHARS)?;
        let description =
            bounded_field("description", description, Self::MAX_DESCRIPTION_CHARS)?;
        if price.is_zero() {
            return Err(DealError::InvalidTerms("price must be greater than zero".to_string()));
        }
        Ok(Self {
            item_type,
            item_name,
            description,
            price,
        })
    }

    /// The asking price.
    pub fn price(&self) -> Amount {
        self.price
    }
}

fn bounded_field(label: &str, value: &str, max_chars: usize) -> Result<String, DealError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(DealError::InvalidTerms(format!("{label} must not be empty")));
    }
    if trimmed.chars().count() > max_chars {
        return Err(DealError::InvalidTerms(format!(
            "{label} must not exceed {max_chars} characters"
        )));
    }
    Ok(trimmed.to_string())
}

// ─── Transition Record ───────────────────────────────────────────────

/// Audit record of one status change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DealTransitionRecord {
    /// Status before the transition.
    pub from: DealStatus,
    /// Status after the transition.
    pub to: DealStatus,
    /// The action that caused it.
    pub action: DealAction,
    /// Who performed it.
    pub actor: UserId,
    /// When it happened.
    pub timestamp: Timestamp,
}

// ─── Deal ────────────────────────────────────────────────────────────

/// A single trade agreement and its escrow state.
///
/// Field names follow the persisted document (`type`, `name`, `seller_id`,
/// `escrow_amount`, ...). Fields are private: the only way to change a deal
/// is through its transition methods.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deal {
    id: DealId,
    #[serde(rename = "type")]
    item_type: String,
    #[serde(rename = "name")]
    item_name: String,
    description: String,
    price: Amount,
    seller_id: UserId,
    seller_username: Option<String>,
    buyer_id: Option<UserId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    buyer_username: Option<String>,
    status: DealStatus,
    #[serde(default)]
    escrow_amount: Amount,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    created_at: Option<Timestamp>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    transitions: Vec<DealTransitionRecord>,
}

impl Deal {
    /// A new open deal. Only the registry creates deals, so ids stay unique.
    pub(crate) fn open(
        id: DealId,
        seller: UserId,
        seller_username: Option<String>,
        terms: DealTerms,
    ) -> Self {
        Self {
            id,
            item_type: terms.item_type,
            item_name: terms.item_name,
            description: terms.description,
            price: terms.price,
            seller_id: seller,
            seller_username,
            buyer_id: None,
            buyer_username: None,
            status: DealStatus::Open,
            escrow_amount: Amount::ZERO,
            created_at: Some(Timestamp::now()),
            transitions: Vec::new(),
        }
    }

    pub fn id(&self) -> &DealId {
        &self.id
    }

    pub fn item_type(&self) -> &str {
        &self.item_type
    }

    pub fn item_name(&self) -> &str {
        &self.item_name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn price(&self) -> Amount {
        self.price
    }

    pub fn seller_id(&self) -> UserId {
        self.seller_id
    }

    pub fn seller_username(&self) -> Option<&str> {
        self.seller_username.as_deref()
    }

    pub fn buyer_id(&self) -> Option<UserId> {
        self.buyer_id
    }

    pub fn buyer_username(&self) -> Option<&str> {
        self.buyer_username.as_deref()
    }

    pub fn status(&self) -> DealStatus {
        self.status
    }

    pub fn escrow_amount(&self) -> Amount {
        self.escrow_amount
    }

    /// When the deal was created. `None` for deals written before creation
    /// times were recorded.
    pub fn created_at(&self) -> Option<Timestamp> {
        self.created_at
    }

    /// Ordered log of all status changes.
    pub fn transitions(&self) -> &[DealTransitionRecord] {
        &self.transitions
    }

    /// Whether the user is this deal's seller or buyer.
    pub fn involves(&self, user: UserId) -> bool {
        self.seller_id == user || self.buyer_id == Some(user)
    }

    /// Check that `buyer` may join, without changing anything.
    pub fn check_join(&self, buyer: UserId) -> Result<(), DealError> {
        self.require_status(DealStatus::Open, DealAction::Join)?;
        if buyer == self.seller_id {
            return Err(DealError::SelfDealing {
                deal_id: self.id.clone(),
                seller: self.seller_id,
            });
        }
        Ok(())
    }

    /// Record the buyer and move the price into escrow (OPEN → IN_PROCESS).
    ///
    /// Returns the escrowed amount. The caller is responsible for debiting
    /// the buyer by the same amount in the same unit of work.
    pub fn begin_escrow(
        &mut self,
        buyer: UserId,
        buyer_username: Option<String>,
    ) -> Result<Amount, DealError> {
        self.check_join(buyer)?;
        self.buyer_id = Some(buyer);
        self.buyer_username = buyer_username;
        self.escrow_amount = self.price;
        self.do_transition(DealStatus::InProcess, DealAction::Join, buyer);
        Ok(self.escrow_amount)
    }

    /// Withdraw the deal (OPEN → CANCELLED). No funds have moved yet.
    ///
    /// Who may cancel is decided by the caller; the deal only checks status.
    pub fn cancel(&mut self, actor: UserId) -> Result<(), DealError> {
        self.require_status(DealStatus::Open, DealAction::Cancel)?;
        self.do_transition(DealStatus::Cancelled, DealAction::Cancel, actor);
        Ok(())
    }

    /// Seller reports the handoff (IN_PROCESS → TRANSFERRED).
    pub fn confirm_shipped(&mut self, actor: UserId) -> Result<(), DealError> {
        self.require_status(DealStatus::InProcess, DealAction::ConfirmShipped)?;
        if actor != self.seller_id {
            return Err(self.not_participant(actor, DealRole::Seller));
        }
        self.do_transition(DealStatus::Transferred, DealAction::ConfirmShipped, actor);
        Ok(())
    }

    /// Check that `actor` may confirm receipt. Returns the escrow to release.
    pub fn check_receipt(&self, actor: UserId) -> Result<Amount, DealError> {
        self.require_status(DealStatus::Transferred, DealAction::ConfirmReceived)?;
        if self.buyer_id != Some(actor) {
            return Err(self.not_participant(actor, DealRole::Buyer));
        }
        Ok(self.escrow_amount)
    }

    /// Buyer confirms receipt (TRANSFERRED → COMPLETED), emptying the escrow.
    ///
    /// Returns the released amount. The caller is responsible for crediting
    /// the seller by the same amount in the same unit of work.
    pub fn confirm_received(&mut self, actor: UserId) -> Result<Amount, DealError> {
        let released = self.check_receipt(actor)?;
        self.escrow_amount = Amount::ZERO;
        self.do_transition(DealStatus::Completed, DealAction::ConfirmReceived, actor);
        Ok(released)
    }

    /// Verify the escrow and buyer invariants of a stored deal.
    pub fn check_invariants(&self) -> Result<(), DealError> {
        let corrupt = |reason: String| DealError::Corrupt {
            deal_id: self.id.clone(),
            reason,
        };
        if self.price.is_zero() {
            return Err(corrupt("price is zero".to_string()));
        }
        let expected_escrow = if self.status.holds_escrow() {
            self.price
        } else {
            Amount::ZERO
        };
        if self.escrow_amount != expected_escrow {
            return Err(corrupt(format!(
                "escrow {} while {} (expected {})",
                self.escrow_amount, self.status, expected_escrow
            )));
        }
        let needs_buyer = matches!(
            self.status,
            DealStatus::InProcess | DealStatus::Transferred | DealStatus::Completed
        );
        match (needs_buyer, self.buyer_id) {
            (true, None) => Err(corrupt(format!("no buyer while {}", self.status))),
            (false, Some(buyer)) => Err(corrupt(format!(
                "buyer {buyer} recorded while {}",
                self.status
            ))),
            (_, Some(buyer)) if buyer == self.seller_id => {
                Err(corrupt("buyer is the seller".to_string()))
            }
            _ => Ok(()),
        }
    }

    fn require_status(&self, expected: DealStatus, action: DealAction) -> Result<(), DealError> {
        if self.status != expected {
            return Err(DealError::InvalidTransition {
                deal_id: self.id.clone(),
                status: self.status,
                action,
            });
        }
        Ok(())
    }

    fn not_participant(&self, actor: UserId, role: DealRole) -> DealError {
        DealError::NotParticipant {
            deal_id: self.id.clone(),
            actor,
            role,
        }
    }

    fn do_transition(&mut self, to: DealStatus, action: DealAction, actor: UserId) {
        self.transitions.push(DealTransitionRecord {
            from: self.status,
            to,
            action,
            actor,
            timestamp: Timestamp::now(),
        });
        self.status = to;
    }
}

// ─── Tests ───────────────────────────────────────────────────────────
