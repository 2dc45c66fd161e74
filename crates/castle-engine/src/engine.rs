//! # Deal Lifecycle Engine
//!
//! One operation per lifecycle transition, plus the account and chat
//! bookkeeping a front-end needs. Every mutating operation:
//!
//! 1. parses and validates its input,
//! 2. runs the deal guard and role checks against a private copy of the
//!    committed document,
//! 3. applies the deal transition together with its fund movement,
//! 4. flushes the document and only then publishes it.
//!
//! A failure at any step returns a typed [`EngineError`] and leaves the
//! committed state unchanged.
//!
//! ## Identity
//!
//! Every operation receives the acting user's id. Confirmation operations
//! always name their deal explicitly; the engine never infers "the user's
//! current deal".

use parking_lot::Mutex;

use castle_core::{Amount, ChatId, DealId, DealIdGenerator, UserId};
use castle_ledger::{Account, BalanceLedger};
use castle_state::{Deal, DealStatus};
use castle_store::{ChatRecord, Document, JsonFileStore};

use crate::config::EngineConfig;
use crate::error::{EngineError, ErrorKind};
use crate::repository::Repository;
use crate::request::CreateDealRequest;

/// Maximum length of a display name, in characters.
pub const MAX_DISPLAY_NAME_CHARS: usize = 64;

/// Orchestrates deals, balances and persistence.
#[derive(Debug)]
pub struct DealLifecycleEngine {
    repo: Repository,
    operator: UserId,
    ids: Mutex<DealIdGenerator>,
}

impl DealLifecycleEngine {
    pub fn new(repo: Repository, operator: UserId) -> Self {
        Self::with_id_generator(repo, operator, DealIdGenerator::new())
    }

    /// An engine drawing deal ids from the given generator.
    pub fn with_id_generator(repo: Repository, operator: UserId, ids: DealIdGenerator) -> Self {
        Self {
            repo,
            operator,
            ids: Mutex::new(ids),
        }
    }

    /// Open the JSON document named by `config`.
    pub fn open(config: &EngineConfig) -> Result<Self, EngineError> {
        let repo = Repository::open(JsonFileStore::new(&config.data_file))?;
        tracing::info!(
            data_file = %config.data_file.display(),
            operator = %config.operator_id,
            "engine ready"
        );
        Ok(Self::new(repo, config.operator_id))
    }

    /// The privileged operator identity.
    pub fn operator(&self) -> UserId {
        self.operator
    }

    pub fn repository(&self) -> &Repository {
        &self.repo
    }

    // ─── Deal lifecycle ─────────────────────────────────────────────

    /// Open a new deal for the requesting seller.
    pub fn create_deal(&self, request: &CreateDealRequest) -> Result<Deal, EngineError> {
        let seller = request.seller;
        let terms = request
            .terms()
            .map_err(|e| rejected("create_deal", seller, e))?;

        let deal = self.commit("create_deal", seller, |doc| {
            doc.users.get_or_create(seller);
            let seller_name = doc.users.display_name(seller).map(str::to_string);
            let mut ids = self.ids.lock();
            Ok(doc.deals.create(&mut *ids, seller, seller_name, terms).clone())
        })?;

        tracing::info!(
            deal_id = %deal.id(),
            seller = %seller,
            price = %deal.price(),
            "deal created"
        );
        Ok(deal)
    }

    /// Run the join pre-checks without changing anything.
    ///
    /// Checks, in order: id format, existence, `open` status, and that the
    /// buyer is not the seller. Funds are checked only by [`join_deal`].
    ///
    /// [`join_deal`]: DealLifecycleEngine::join_deal
    pub fn preview_deal(&self, buyer: UserId, raw_id: &str) -> Result<Deal, EngineError> {
        self.joinable(buyer, raw_id)
            .map_err(|e| rejected("preview_deal", buyer, e))
    }

    /// Join an open deal: debit the buyer and hold the price in escrow.
    pub fn join_deal(&self, buyer: UserId, raw_id: &str) -> Result<Deal, EngineError> {
        let id = parse_id(raw_id).map_err(|e| rejected("join_deal", buyer, e))?;

        let (deal, remaining) = self.commit("join_deal", buyer, |doc| {
            let Document { users, deals, .. } = doc;
            let deal = deals.require_mut(&id)?;
            let remaining = BalanceLedger::new(users).reserve(deal, buyer)?;
            Ok((deal.clone(), remaining))
        })?;

        tracing::info!(
            deal_id = %deal.id(),
            buyer = %buyer,
            escrowed = %deal.escrow_amount(),
            buyer_balance = %remaining,
            "deal joined"
        );
        Ok(deal)
    }

    /// A prospective buyer declines a previewed deal. The deal stays open.
    pub fn decline_deal(&self, buyer: UserId, raw_id: &str) -> Result<Deal, EngineError> {
        let deal = self
            .joinable(buyer, raw_id)
            .map_err(|e| rejected("decline_deal", buyer, e))?;
        tracing::info!(deal_id = %deal.id(), buyer = %buyer, "deal declined");
        Ok(deal)
    }

    /// Withdraw an open deal. Only the seller or the operator may cancel.
    pub fn cancel_deal(&self, actor: UserId, raw_id: &str) -> Result<Deal, EngineError> {
        let id = parse_id(raw_id).map_err(|e| rejected("cancel_deal", actor, e))?;

        let deal = self.commit("cancel_deal", actor, |doc| {
            let deal = doc.deals.require_mut(&id)?;
            let permitted = actor == deal.seller_id() || actor == self.operator;
            if deal.status() == DealStatus::Open && !permitted {
                return Err(EngineError::Unauthorized {
                    actor,
                    operation: "cancel this deal",
                });
            }
            deal.cancel(actor)?;
            Ok(deal.clone())
        })?;

        tracing::info!(deal_id = %deal.id(), actor = %actor, "deal cancelled");
        Ok(deal)
    }

    /// The seller reports the item handed over.
    pub fn confirm_shipped(&self, actor: UserId, raw_id: &str) -> Result<Deal, EngineError> {
        let id = parse_id(raw_id).map_err(|e| rejected("confirm_shipped", actor, e))?;

        let deal = self.commit("confirm_shipped", actor, |doc| {
            let deal = doc.deals.require_mut(&id)?;
            deal.confirm_shipped(actor)?;
            Ok(deal.clone())
        })?;

        tracing::info!(deal_id = %deal.id(), seller = %actor, "deal marked transferred");
        Ok(deal)
    }

    /// The buyer confirms receipt; the escrow is released to the seller.
    pub fn confirm_received(&self, actor: UserId, raw_id: &str) -> Result<Deal, EngineError> {
        let id = parse_id(raw_id).map_err(|e| rejected("confirm_received", actor, e))?;

        let (deal, released) = self.commit("confirm_received", actor, |doc| {
            let Document { users, deals, .. } = doc;
            let deal = deals.require_mut(&id)?;
            let released = BalanceLedger::new(users).release(deal, actor)?;
            Ok((deal.clone(), released))
        })?;

        tracing::info!(
            deal_id = %deal.id(),
            buyer = %actor,
            seller = %deal.seller_id(),
            released = %released,
            "deal completed"
        );
        Ok(deal)
    }

    // ─── Accounts ───────────────────────────────────────────────────

    /// Add funds to a user's balance. Operator only.
    pub fn credit_account(
        &self,
        actor: UserId,
        user: UserId,
        amount: Amount,
    ) -> Result<Account, EngineError> {
        if actor != self.operator {
            return Err(rejected(
                "credit_account",
                actor,
                EngineError::Unauthorized {
                    actor,
                    operation: "credit accounts",
                },
            ));
        }
        if amount.is_zero() {
            return Err(rejected(
                "credit_account",
                actor,
                EngineError::InvalidRequest("credit amount must be greater than zero".to_string()),
            ));
        }

        let account = self.commit("credit_account", actor, |doc| {
            BalanceLedger::new(&mut doc.users).credit(user, amount)?;
            Ok(doc.users.get_or_create(user))
        })?;

        tracing::info!(
            user = %user,
            amount = %amount,
            balance = %account.balance,
            "account credited"
        );
        Ok(account)
    }

    /// The user's account, creating and persisting it if absent.
    pub fn get_or_create_account(&self, user: UserId) -> Result<Account, EngineError> {
        if let Some(account) = self.repo.snapshot().users.account(user) {
            return Ok(account);
        }
        let account = self.commit("get_or_create_account", user, |doc| {
            Ok(doc.users.get_or_create(user))
        })?;
        tracing::info!(user = %user, "account created");
        Ok(account)
    }

    /// Record the user's display name, creating the account if needed.
    pub fn register_user(&self, user: UserId, display_name: &str) -> Result<Account, EngineError> {
        let name = display_name.trim();
        let invalid = if name.is_empty() {
            Some("display name must not be empty".to_string())
        } else if name.chars().count() > MAX_DISPLAY_NAME_CHARS {
            Some(format!(
                "display name must not exceed {MAX_DISPLAY_NAME_CHARS} characters"
            ))
        } else {
            None
        };
        if let Some(reason) = invalid {
            return Err(rejected("register_user", user, EngineError::InvalidRequest(reason)));
        }

        let account = self.commit("register_user", user, |doc| {
            Ok(doc.users.set_display_name(user, name))
        })?;
        tracing::info!(user = %user, "user registered");
        Ok(account)
    }

    /// Current balance; zero for users without an account.
    pub fn balance_of(&self, user: UserId) -> Amount {
        self.repo.snapshot().users.balance_of(user)
    }

    /// The user's account, if it exists.
    pub fn account(&self, user: UserId) -> Option<Account> {
        self.repo.snapshot().users.account(user)
    }

    // ─── Queries ────────────────────────────────────────────────────

    /// Look up a deal by its textual id.
    pub fn deal(&self, raw_id: &str) -> Result<Deal, EngineError> {
        let id = parse_id(raw_id)?;
        Ok(self.repo.snapshot().deals.require(&id)?.clone())
    }

    /// Every deal where the user is seller or buyer, in id order.
    pub fn deals_for(&self, user: UserId) -> Vec<Deal> {
        self.repo.snapshot().deals.involving(user).cloned().collect()
    }

    /// All deals, in id order.
    pub fn deals(&self) -> Vec<Deal> {
        self.repo.snapshot().deals.iter().cloned().collect()
    }

    // ─── Chat bookkeeping ───────────────────────────────────────────

    /// Remember the last message the front-end sent into a chat.
    pub fn record_chat_message(&self, chat: ChatId, message_id: i64) -> Result<(), EngineError> {
        self.commit("record_chat_message", chat, |doc| {
            doc.chats.insert(
                chat,
                ChatRecord {
                    last_message_id: message_id,
                },
            );
            Ok(())
        })
    }

    /// The last message recorded for a chat.
    pub fn last_message_id(&self, chat: ChatId) -> Option<i64> {
        self.repo
            .snapshot()
            .chats
            .get(&chat)
            .map(|record| record.last_message_id)
    }

    // ─── Internals ──────────────────────────────────────────────────

    fn joinable(&self, buyer: UserId, raw_id: &str) -> Result<Deal, EngineError> {
        let id = parse_id(raw_id)?;
        let snapshot = self.repo.snapshot();
        let deal = snapshot.deals.require(&id)?;
        deal.check_join(buyer)?;
        Ok(deal.clone())
    }

    fn commit<R>(
        &self,
        operation: &'static str,
        actor: impl std::fmt::Display,
        mutate: impl FnOnce(&mut Document) -> Result<R, EngineError>,
    ) -> Result<R, EngineError> {
        self.repo
            .transact(mutate)
            .map_err(|e| rejected(operation, actor, e))
    }
}

fn parse_id(raw_id: &str) -> Result<DealId, EngineError> {
    Ok(DealId::parse(raw_id)?)
}

/// Log a failed operation: rejections at warn level, persistence failures
/// at error level.
fn rejected(
    operation: &'static str,
    actor: impl std::fmt::Display,
    error: EngineError,
) -> EngineError {
    let kind = error.kind();
    if kind == ErrorKind::Persistence {
        tracing::error!(operation, actor = %actor, error = %error, "operation not persisted");
    } else {
        tracing::warn!(operation, actor = %actor, kind = %kind, error = %error, "operation rejected");
    }
    error
}
