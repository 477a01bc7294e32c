//! Thread-safe account storage
//!
//! This module provides the `AccountStore` struct, which owns every account
//! record and its current balance.
//!
//! # Design
//!
//! Accounts live in a `DashMap` keyed by id. Each value is an
//! `Arc<Mutex<Account>>` row: the map's shard locks are only ever held long
//! enough to clone the `Arc`, and all reads and writes of an account go
//! through its row mutex. The row mutex is the account's row-level lock in
//! the sense of the transfer protocol:
//!
//! - balance changes, and the entry and transfer appends that accompany them,
//!   happen only while the row is locked;
//! - readers lock the row briefly, so they observe an account either before
//!   or after a transfer, never in between.
//!
//! Writers acquire rows with [`AccountStore::lock_for_write`], which gives up
//! after a deadline and reports a [`LedgerError::Conflict`] instead of
//! waiting forever.
//!
//! The fields fixed at creation (owner, currency, kind) are also kept in an
//! [`AccountProfile`] outside the row, so ownership and currency checks never
//! wait behind a transfer holding the row.
//!
//! An owner holds at most one account per currency.

use crate::types::{Account, AccountId, AccountKind, Currency, LedgerError, PageRequest};
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, TryLockError};
use std::thread;
use std::time::{Duration, Instant};
use tracing::debug;

/// Shared handle to one account row
pub type AccountRow = Arc<Mutex<Account>>;

/// First pause while waiting for a busy row; doubled up to `MAX_LOCK_POLL`
const MIN_LOCK_POLL: Duration = Duration::from_micros(20);
const MAX_LOCK_POLL: Duration = Duration::from_millis(1);

/// The immutable part of an account
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountProfile {
    pub owner: String,
    pub currency: Currency,
    pub kind: AccountKind,
}

impl AccountProfile {
    /// Fail with `NotOwner` unless `owner` holds this account
    pub fn check_owner(&self, account: AccountId, owner: &str) -> Result<(), LedgerError> {
        if self.owner == owner {
            Ok(())
        } else {
            Err(LedgerError::not_owner(account, owner))
        }
    }
}

/// Thread-safe account store
///
/// Accounts are never removed, so a row handle obtained from
/// [`AccountStore::row`] stays valid for the life of the store.
#[derive(Debug)]
pub struct AccountStore {
    /// Account rows by id
    rows: DashMap<AccountId, AccountRow>,

    /// Creation-time fields by id, readable without the row lock
    profiles: DashMap<AccountId, AccountProfile>,

    /// Account id by owner and currency
    by_owner: DashMap<(String, Currency), AccountId>,

    /// Next id to hand out; ids start at 1
    next_id: AtomicU64,
}

impl AccountStore {
    /// Create a new empty AccountStore
    pub fn new() -> Self {
        Self {
            rows: DashMap::new(),
            profiles: DashMap::new(),
            by_owner: DashMap::new(),
            next_id: AtomicU64::new(1),
        }
    }

    /// Create a customer account with a zero balance
    ///
    /// # Returns
    ///
    /// * `Ok(Account)` - The stored account
    /// * `Err(LedgerError::InvalidCurrency)` - If `currency` is not a supported code
    /// * `Err(LedgerError::DuplicateAccount)` - The owner already holds an
    ///   account in this currency
    pub fn create_account(&self, owner: &str, currency: &str) -> Result<Account, LedgerError> {
        let currency: Currency = currency.parse()?;
        self.insert(owner, currency, AccountKind::Customer)
    }

    /// Create an issuer account with a zero balance
    ///
    /// Issuers are the source of funds for their currency and may carry a
    /// negative balance.
    pub fn create_issuer_account(
        &self,
        owner: &str,
        currency: &str,
    ) -> Result<Account, LedgerError> {
        let currency: Currency = currency.parse()?;
        self.insert(owner, currency, AccountKind::Issuer)
    }

    /// Store an account of an already validated currency
    ///
    /// The owner/currency slot is claimed under the `by_owner` shard lock, so
    /// two racing creations for the same pair cannot both succeed. Ids are
    /// only consumed by accounts that are actually stored.
    pub fn insert(
        &self,
        owner: &str,
        currency: Currency,
        kind: AccountKind,
    ) -> Result<Account, LedgerError> {
        let mut created = None;
        let id = *self
            .by_owner
            .entry((owner.to_string(), currency))
            .or_insert_with(|| {
                let id = self.next_id.fetch_add(1, Ordering::Relaxed);
                let account = Account::with_kind(id, owner, currency, kind);
                self.profiles.insert(
                    id,
                    AccountProfile {
                        owner: owner.to_string(),
                        currency,
                        kind,
                    },
                );
                self.rows.insert(id, Arc::new(Mutex::new(account.clone())));
                created = Some(account);
                id
            });

        match created {
            Some(account) => {
                debug!(account = id, owner, %currency, ?kind, "account created");
                Ok(account)
            }
            None => Err(LedgerError::duplicate_account(owner, currency.code(), id)),
        }
    }

    /// Owner, currency and kind of an account, without touching its row
    pub fn profile(&self, id: AccountId) -> Result<AccountProfile, LedgerError> {
        self.profiles
            .get(&id)
            .map(|profile| profile.value().clone())
            .ok_or_else(|| LedgerError::account_not_found(id))
    }

    /// Get a snapshot of an account
    ///
    /// Waits for any transfer currently holding the row to finish.
    pub fn get_account(&self, id: AccountId) -> Result<Account, LedgerError> {
        let row = self.row(id)?;
        let account = lock_for_read(&row, id)?;
        Ok(account.clone())
    }

    /// List accounts in ascending id order
    ///
    /// `owner` restricts the listing to one owner's accounts. Pages past the
    /// end return an empty vector.
    pub fn list_accounts(
        &self,
        owner: Option<&str>,
        page: PageRequest,
    ) -> Result<Vec<Account>, LedgerError> {
        let mut matching = Vec::new();

        for (id, row) in self.rows_by_id() {
            let account = lock_for_read(&row, id)?;
            if owner.map_or(true, |owner| account.owner == owner) {
                matching.push(account.clone());
            }
        }

        Ok(page.slice(&matching))
    }

    /// Whether an account with this id exists
    pub fn contains(&self, id: AccountId) -> bool {
        self.rows.contains_key(&id)
    }

    /// Number of stored accounts
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Get the row handle for an account
    ///
    /// The map reference is released before returning, so the caller can
    /// block on the row without holding a shard lock.
    pub fn row(&self, id: AccountId) -> Result<AccountRow, LedgerError> {
        self.rows
            .get(&id)
            .map(|row| Arc::clone(row.value()))
            .ok_or_else(|| LedgerError::account_not_found(id))
    }

    /// Every row handle, sorted by id
    ///
    /// This is the global lock order; callers that lock several rows must
    /// lock them in the order returned.
    pub fn rows_by_id(&self) -> Vec<(AccountId, AccountRow)> {
        let mut rows: Vec<(AccountId, AccountRow)> = self
            .rows
            .iter()
            .map(|entry| (*entry.key(), Arc::clone(entry.value())))
            .collect();
        rows.sort_unstable_by_key(|(id, _)| *id);
        rows
    }

    /// Acquire a row for writing, giving up at `deadline`
    ///
    /// A busy row is polled with a pause that doubles from `MIN_LOCK_POLL`
    /// up to `MAX_LOCK_POLL`, never sleeping past the deadline.
    ///
    /// # Returns
    ///
    /// * `Ok(guard)` - The row is exclusively held
    /// * `Err(LedgerError::Conflict)` - The row stayed busy until the deadline
    /// * `Err(LedgerError::Internal)` - The row lock is poisoned
    pub fn lock_for_write<'a>(
        row: &'a Mutex<Account>,
        id: AccountId,
        deadline: Instant,
    ) -> Result<MutexGuard<'a, Account>, LedgerError> {
        let mut pause = MIN_LOCK_POLL;
        loop {
            match row.try_lock() {
                Ok(guard) => return Ok(guard),
                Err(TryLockError::Poisoned(_)) => return Err(poisoned(id)),
                Err(TryLockError::WouldBlock) => {
                    let remaining = deadline.saturating_duration_since(Instant::now());
                    if remaining.is_zero() {
                        return Err(LedgerError::conflict(id, 1));
                    }
                    thread::sleep(pause.min(remaining));
                    pause = (pause * 2).min(MAX_LOCK_POLL);
                }
            }
        }
    }
}

impl Default for AccountStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Acquire a row for reading, waiting as long as needed
pub fn lock_for_read(
    row: &Mutex<Account>,
    id: AccountId,
) -> Result<MutexGuard<'_, Account>, LedgerError> {
    row.lock().map_err(|_| poisoned(id))
}

/// Apply `delta` to an account's balance
///
/// Must only be called on an account row held for writing, or on a copy of
/// one that will be written back under the same lock.
///
/// # Returns
///
/// * `Ok(new_balance)` - The adjusted balance
/// * `Err(LedgerError::InsufficientFunds)` - A debit would take a customer
///   account below zero
/// * `Err(LedgerError::ArithmeticOverflow)` - The new balance does not fit in `i64`
pub fn adjust_balance(account: &mut Account, delta: i64) -> Result<i64, LedgerError> {
    let new_balance = account
        .balance
        .checked_add(delta)
        .ok_or_else(|| LedgerError::arithmetic_overflow(account.id, delta))?;

    if delta < 0 && new_balance < 0 && !account.allows_overdraft() {
        return Err(LedgerError::insufficient_funds(
            account.id,
            account.balance,
            delta.saturating_neg(),
        ));
    }

    account.balance = new_balance;
    Ok(new_balance)
}

fn poisoned(id: AccountId) -> LedgerError {
    LedgerError::internal(format!("row lock for account {} is poisoned", id))
}
