//! # Identity Store
//!
//! Per-user account records: a balance and an optional display name.
//! Accounts are created lazily on first reference with a zero balance and
//! are never deleted.
//!
//! Balances only change through [`IdentityStore::adjust_balance`], which
//! refuses any debit larger than the current balance, so no account can ever
//! hold a negative amount.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use castle_core::{Amount, UserId};

use crate::error::LedgerError;

/// Persisted form of one account.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountRecord {
    #[serde(default)]
    balance: Amount,
    #[serde(default)]
    username: Option<String>,
}

/// Read-only snapshot of an account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Account {
    pub id: UserId,
    pub balance: Amount,
    pub display_name: Option<String>,
}

/// A signed change to a balance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BalanceDelta {
    Credit(Amount),
    Debit(Amount),
}

/// All user accounts, keyed by user id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdentityStore {
    accounts: BTreeMap<UserId, AccountRecord>,
}

impl IdentityStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// The account for `user`, creating it with a zero balance if absent.
    pub fn get_or_create(&mut self, user: UserId) -> Account {
        let record = self.record_mut(user);
        snapshot(user, record)
    }

    /// The account for `user` if it exists.
    pub fn account(&self, user: UserId) -> Option<Account> {
        self.accounts.get(&user).map(|record| snapshot(user, record))
    }

    /// Whether an account exists for `user`.
    pub fn contains(&self, user: UserId) -> bool {
        self.accounts.contains_key(&user)
    }

    /// Current balance; zero for users without an account.
    pub fn balance_of(&self, user: UserId) -> Amount {
        self.accounts
            .get(&user)
            .map(|record| record.balance)
            .unwrap_or(Amount::ZERO)
    }

    /// Display name, if one was recorded.
    pub fn display_name(&self, user: UserId) -> Option<&str> {
        self.accounts
            .get(&user)
            .and_then(|record| record.username.as_deref())
    }

    /// Record the user's display name, creating the account if needed.
    pub fn set_display_name(&mut self, user: UserId, name: impl Into<String>) -> Account {
        let record = self.record_mut(user);
        record.username = Some(name.into());
        snapshot(user, record)
    }

    /// Apply `delta` to the user's balance and return the new balance.
    ///
    /// Creates the account if needed. A rejected delta leaves the balance
    /// unchanged but still creates the account, mirroring a lazy lookup.
    pub fn adjust_balance(
        &mut self,
        user: UserId,
        delta: BalanceDelta,
    ) -> Result<Amount, LedgerError> {
        let record = self.record_mut(user);
        let next = match delta {
            BalanceDelta::Credit(amount) => {
                record
                    .balance
                    .checked_add(amount)
                    .ok_or(LedgerError::Overflow {
                        user,
                        balance: record.balance,
                        credit: amount,
                    })?
            }
            BalanceDelta::Debit(amount) => {
                record
                    .balance
                    .checked_sub(amount)
                    .ok_or(LedgerError::InsufficientFunds {
                        user,
                        balance: record.balance,
                        required: amount,
                    })?
            }
        };
        record.balance = next;
        Ok(next)
    }

    /// Number of accounts.
    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }

    /// Snapshots of all accounts in user id order.
    pub fn iter(&self) -> impl Iterator<Item = Account> + '_ {
        self.accounts
            .iter()
            .map(|(user, record)| snapshot(*user, record))
    }

    /// Sum of all balances, or `None` if it does not fit in an [`Amount`].
    pub fn total_balance(&self) -> Option<Amount> {
        self.accounts
            .values()
            .try_fold(Amount::ZERO, |sum, record| sum.checked_add(record.balance))
    }

    fn record_mut(&mut self, user: UserId) -> &mut AccountRecord {
        self.accounts.entry(user).or_insert_with(|| {
            tracing::debug!(user = %user, "creating account");
            AccountRecord::default()
        })
    }
}

fn snapshot(user: UserId, record: &AccountRecord) -> Account {
    Account {
        id: user,
        balance: record.balance,
        display_name: record.username.clone(),
    }
}
