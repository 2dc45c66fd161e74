//! # Persisted Document
//!
//! The complete durable state: accounts, deals and the presentation layer's
//! chat bookkeeping. Serialized as
//!
//! ```json
//! {
//!   "users": { "<userId>": { "balance": 0, "username": null } },
//!   "deals": { "<dealId>": { "id": "#A1", "type": "...", "status": "open", ... } },
//!   "chats": { "<chatId>": { "last_message_id": 42 } }
//! }
//! ```
//!
//! Missing top-level sections load as empty.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use castle_core::ChatId;
use castle_ledger::IdentityStore;
use castle_state::{DealError, DealRegistry};

/// Last message the presentation layer sent into a chat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatRecord {
    pub last_message_id: i64,
}

/// All persisted state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    #[serde(default)]
    pub users: IdentityStore,
    #[serde(default)]
    pub deals: DealRegistry,
    #[serde(default)]
    pub chats: BTreeMap<ChatId, ChatRecord>,
}

impl Document {
    /// An empty document.
    pub fn new() -> Self {
        Self::default()
    }

    /// Check the deal invariants of a loaded document.
    pub fn validate(&self) -> Result<(), DealError> {
        self.deals.validate()
    }
}
