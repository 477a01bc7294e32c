//! Account-related types for the Rust Ledger Engine
//!
//! This module defines the Account structure and related functionality
//! for tracking an owner's balance in a single currency.

use super::currency::Currency;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Account identifier
///
/// Assigned sequentially from 1; ids are never reused.
pub type AccountId = u64;

/// How the no-overdraft rule applies to an account
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountKind {
    /// Regular account; its balance may never go below zero
    Customer,

    /// Source of funds for a currency
    ///
    /// An issuer's balance may go negative. Its negative balance equals the
    /// total amount it has issued into customer accounts.
    Issuer,
}

/// Account state
///
/// Everything but `balance` is fixed at creation. The balance is changed
/// only by the transfer engine, and always equals the sum of the account's
/// entries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// The account ID
    pub id: AccountId,

    /// Identity reference of the owner, as supplied by the authentication layer
    pub owner: String,

    /// Currency the account is denominated in
    pub currency: Currency,

    /// Current balance in the currency's smallest unit
    pub balance: i64,

    /// Overdraft policy
    pub kind: AccountKind,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

impl Account {
    /// Create a new customer account with a zero balance
    pub fn new(id: AccountId, owner: impl Into<String>, currency: Currency) -> Self {
        Self::with_kind(id, owner, currency, AccountKind::Customer)
    }

    /// Create a new account of the given kind with a zero balance
    pub fn with_kind(
        id: AccountId,
        owner: impl Into<String>,
        currency: Currency,
        kind: AccountKind,
    ) -> Self {
        Account {
            id,
            owner: owner.into(),
            currency,
            balance: 0,
            kind,
            created_at: Utc::now(),
        }
    }

    /// Whether the balance is allowed to drop below zero
    pub fn allows_overdraft(&self) -> bool {
        matches!(self.kind, AccountKind::Issuer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_account_starts_at_zero() {
        let account = Account::new(1, "alice", Currency::Usd);

        assert_eq!(account.id, 1);
        assert_eq!(account.owner, "alice");
        assert_eq!(account.currency, Currency::Usd);
        assert_eq!(account.balance, 0);
        assert_eq!(account.kind, AccountKind::Customer);
        assert!(!account.allows_overdraft());
    }

    #[test]
    fn test_issuer_allows_overdraft() {
        let account = Account::with_kind(2, "treasury", Currency::Eur, AccountKind::Issuer);

        assert_eq!(account.balance, 0);
        assert!(account.allows_overdraft());
    }
}
