//! Transfer-related types for the Rust Ledger Engine
//!
//! This module defines transfer requests, the recorded transfer itself, and
//! the receipt returned after a successful commit.

use super::account::{Account, AccountId};
use super::currency::Currency;
use super::entry::Entry;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Transfer identifier
pub type TransferId = u64;

/// A request to move `amount` from one account to another
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferRequest {
    /// Account to debit
    pub from_account_id: AccountId,

    /// Account to credit
    pub to_account_id: AccountId,

    /// Magnitude to move, in the currency's smallest unit
    ///
    /// Signed so that non-positive requests can be represented and rejected.
    pub amount: i64,

    /// Currency both accounts must be denominated in
    pub currency: Currency,
}

impl TransferRequest {
    pub fn new(
        from_account_id: AccountId,
        to_account_id: AccountId,
        amount: i64,
        currency: Currency,
    ) -> Self {
        Self {
            from_account_id,
            to_account_id,
            amount,
            currency,
        }
    }

    /// Both account ids, lower first
    ///
    /// This is the global lock acquisition order.
    pub fn lock_order(&self) -> (AccountId, AccountId) {
        if self.from_account_id < self.to_account_id {
            (self.from_account_id, self.to_account_id)
        } else {
            (self.to_account_id, self.from_account_id)
        }
    }
}

/// Recorded transfer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transfer {
    /// The transfer ID
    pub id: TransferId,

    /// Debited account
    pub from_account_id: AccountId,

    /// Credited account
    pub to_account_id: AccountId,

    /// Positive amount moved
    pub amount: i64,

    /// Currency of both accounts
    pub currency: Currency,

    /// Commit timestamp
    pub created_at: DateTime<Utc>,
}

impl Transfer {
    /// Whether the given account is either side of this transfer
    pub fn involves(&self, account_id: AccountId) -> bool {
        self.from_account_id == account_id || self.to_account_id == account_id
    }
}

/// Everything a committed transfer produced
///
/// The account snapshots reflect the balances immediately after commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransferReceipt {
    pub transfer: Transfer,
    pub from_account: Account,
    pub to_account: Account,
    pub from_entry: Entry,
    pub to_entry: Entry,
}
