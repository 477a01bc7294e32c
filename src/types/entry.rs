//! Entry types for the Rust Ledger Engine
//!
//! An entry is one signed balance delta on one account. Entries are only
//! produced by committed transfers and are never modified afterwards.

use super::account::AccountId;
use super::transfer::TransferId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Entry identifier
pub type EntryId = u64;

/// Immutable balance delta
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    /// The entry ID
    pub id: EntryId,

    /// Account whose balance this entry changed
    pub account_id: AccountId,

    /// Signed delta; negative for a debit, positive for a credit
    pub amount: i64,

    /// Transfer that produced this entry
    pub transfer_id: TransferId,

    /// Commit timestamp, shared with the producing transfer
    pub created_at: DateTime<Utc>,
}

impl Entry {
    /// Whether this entry moved money out of the account
    pub fn is_debit(&self) -> bool {
        self.amount < 0
    }
}
