//! Append-only entry ledger
//!
//! Every balance change is recorded here as an [`Entry`]. There is no update
//! or delete path: entries are written once and only read afterwards.
//!
//! Entries are indexed per account (in id order) for listings and globally
//! by id for point lookups. An account's entry list is only appended to while
//! that account's row is locked, which keeps it consistent with the balance
//! stored in [`AccountStore`].

use super::account_store::AccountStore;
use crate::types::{AccountId, Entry, EntryId, LedgerError, PageRequest, TransferId};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// An entry that has passed validation but is not yet recorded
///
/// Produced by [`EntryLedger::prepare`] and turned into an [`Entry`] by
/// [`EntryLedger::record`], which cannot fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingEntry {
    pub account_id: AccountId,
    pub amount: i64,
}

/// Thread-safe, append-only entry storage
#[derive(Debug)]
pub struct EntryLedger {
    /// Used to check that entries reference existing accounts
    accounts: Arc<AccountStore>,

    /// Entries per account, ascending by id
    by_account: DashMap<AccountId, Vec<Entry>>,

    /// Entries by id
    by_id: DashMap<EntryId, Entry>,

    next_id: AtomicU64,
}

impl EntryLedger {
    pub fn new(accounts: Arc<AccountStore>) -> Self {
        Self {
            accounts,
            by_account: DashMap::new(),
            by_id: DashMap::new(),
            next_id: AtomicU64::new(1),
        }
    }

    /// Validate an entry without recording it
    ///
    /// # Returns
    ///
    /// * `Err(LedgerError::AccountNotFound)` - If the account does not exist
    pub fn prepare(&self, account_id: AccountId, amount: i64) -> Result<PendingEntry, LedgerError> {
        if !self.accounts.contains(account_id) {
            return Err(LedgerError::account_not_found(account_id));
        }
        Ok(PendingEntry { account_id, amount })
    }

    /// Record a validated entry
    ///
    /// The caller must hold the account's row lock.
    pub fn record(
        &self,
        pending: PendingEntry,
        transfer_id: TransferId,
        created_at: DateTime<Utc>,
    ) -> Entry {
        let entry = Entry {
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            account_id: pending.account_id,
            amount: pending.amount,
            transfer_id,
            created_at,
        };

        self.by_account
            .entry(entry.account_id)
            .or_default()
            .push(entry.clone());
        self.by_id.insert(entry.id, entry.clone());

        entry
    }

    /// Validate and record an entry in one step
    ///
    /// The caller must hold the account's row lock.
    pub fn append_entry(
        &self,
        account_id: AccountId,
        amount: i64,
        transfer_id: TransferId,
        created_at: DateTime<Utc>,
    ) -> Result<Entry, LedgerError> {
        let pending = self.prepare(account_id, amount)?;
        Ok(self.record(pending, transfer_id, created_at))
    }

    /// Look up an entry by id
    pub fn get_entry(&self, id: EntryId) -> Result<Entry, LedgerError> {
        self.by_id
            .get(&id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| LedgerError::entry_not_found(id))
    }

    /// One page of an account's entries, ascending by id
    ///
    /// An unknown account, or one without entries, yields an empty page.
    pub fn list_entries(&self, account_id: AccountId, page: PageRequest) -> Vec<Entry> {
        self.by_account
            .get(&account_id)
            .map(|entries| page.slice(entries.value()))
            .unwrap_or_default()
    }

    /// Every entry of an account, ascending by id
    pub fn entries_for(&self, account_id: AccountId) -> Vec<Entry> {
        self.by_account
            .get(&account_id)
            .map(|entries| entries.value().clone())
            .unwrap_or_default()
    }

    /// Sum of an account's entry amounts, widened so it cannot overflow
    pub fn sum_for(&self, account_id: AccountId) -> i128 {
        self.by_account
            .get(&account_id)
            .map(|entries| entries.iter().map(|e| e.amount as i128).sum())
            .unwrap_or(0)
    }

    /// Total number of entries
    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}
