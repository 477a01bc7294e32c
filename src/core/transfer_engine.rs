//! Atomic transfer orchestration
//!
//! This module provides the `TransferEngine`, which moves money between two
//! accounts as one indivisible unit, and the `TransferLog` that records
//! committed transfers.
//!
//! # Protocol
//!
//! ```text
//! validate ──► lock rows (lower id first) ──► prepare plan ──► commit ──► unlock
//!                   │                              │
//!                   └─ Conflict: retry ◄───────────┘ business error: abort
//! ```
//!
//! 1. Requests are validated (distinct accounts, positive amount, both
//!    accounts exist, the caller owns the source when an owner is given,
//!    both currencies match) before any lock is taken. These checks read
//!    only the immutable account profiles, so a busy row cannot turn them
//!    into a conflict.
//! 2. Both account rows are locked in ascending id order. Every transfer uses
//!    the same order, so no cycle of waiting transfers can form.
//! 3. With both rows held, a [`TransferPlan`] re-reads both balances and runs
//!    every remaining fallible check on copies. A failure here drops the
//!    plan; nothing has been written.
//! 4. Committing the plan writes both balances, both entries and the transfer
//!    record. None of these steps can fail, so the unit is all-or-nothing.
//!
//! Lock acquisition is bounded by `lock_timeout`. A timeout is a transient
//! [`LedgerError::Conflict`]; the whole unit is retried from step 2 with a
//! fresh read, up to `max_attempts` times.

use super::account_store::{adjust_balance, lock_for_read, AccountProfile, AccountStore};
use super::entry_ledger::{EntryLedger, PendingEntry};
use crate::config::LedgerConfig;
use crate::types::{
    Account, AccountId, Currency, LedgerError, PageRequest, Transfer, TransferId, TransferReceipt,
    TransferRequest,
};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Instant;
use tracing::{debug, warn};

/// Append-only record of committed transfers
///
/// Each transfer is indexed under both of its accounts, ascending by id, and
/// globally by id.
#[derive(Debug)]
pub struct TransferLog {
    by_account: DashMap<AccountId, Vec<Transfer>>,
    by_id: DashMap<TransferId, Transfer>,
    next_id: AtomicU64,
}

impl TransferLog {
    pub fn new() -> Self {
        Self {
            by_account: DashMap::new(),
            by_id: DashMap::new(),
            next_id: AtomicU64::new(1),
        }
    }

    fn allocate_id(&self) -> TransferId {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    /// Record a transfer; the caller holds both account rows
    fn record(&self, transfer: Transfer) {
        for account_id in [transfer.from_account_id, transfer.to_account_id] {
            self.by_account
                .entry(account_id)
                .or_default()
                .push(transfer.clone());
        }
        self.by_id.insert(transfer.id, transfer);
    }

    /// Look up a transfer by id
    pub fn get(&self, id: TransferId) -> Result<Transfer, LedgerError> {
        self.by_id
            .get(&id)
            .map(|transfer| transfer.value().clone())
            .ok_or_else(|| LedgerError::transfer_not_found(id))
    }

    /// One page of the transfers touching an account, ascending by id
    pub fn list(&self, account_id: AccountId, page: PageRequest) -> Vec<Transfer> {
        self.by_account
            .get(&account_id)
            .map(|transfers| page.slice(transfers.value()))
            .unwrap_or_default()
    }

    /// Every recorded transfer, ascending by id
    pub fn all(&self) -> Vec<Transfer> {
        let mut transfers: Vec<Transfer> = self
            .by_id
            .iter()
            .map(|transfer| transfer.value().clone())
            .collect();
        transfers.sort_unstable_by_key(|transfer| transfer.id);
        transfers
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}

impl Default for TransferLog {
    fn default() -> Self {
        Self::new()
    }
}

/// A fully validated transfer waiting to be committed
///
/// Holds the post-transfer balances and both entries. Building one performs
/// every check that can fail; committing one cannot fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferPlan {
    request: TransferRequest,
    from_balance: i64,
    to_balance: i64,
    debit: PendingEntry,
    credit: PendingEntry,
    created_at: DateTime<Utc>,
}

impl TransferPlan {
    /// Re-read both locked accounts and stage the transfer
    ///
    /// Currencies were compared before locking and cannot change.
    ///
    /// # Returns
    ///
    /// * `Err(LedgerError::InsufficientFunds)` - The source cannot cover the debit
    /// * `Err(LedgerError::ArithmeticOverflow)` - The credit would overflow
    pub fn prepare(
        entries: &EntryLedger,
        request: TransferRequest,
        from: &Account,
        to: &Account,
    ) -> Result<Self, LedgerError> {
        let mut staged_from = from.clone();
        let mut staged_to = to.clone();

        let from_balance = adjust_balance(&mut staged_from, -request.amount)?;
        let to_balance = adjust_balance(&mut staged_to, request.amount)?;

        let debit = entries.prepare(from.id, -request.amount)?;
        let credit = entries.prepare(to.id, request.amount)?;

        Ok(Self {
            request,
            from_balance,
            to_balance,
            debit,
            credit,
            created_at: Utc::now(),
        })
    }

    /// Apply the staged changes to the locked rows
    pub fn commit(
        self,
        entries: &EntryLedger,
        transfers: &TransferLog,
        from: &mut Account,
        to: &mut Account,
    ) -> TransferReceipt {
        from.balance = self.from_balance;
        to.balance = self.to_balance;

        let transfer_id = transfers.allocate_id();
        let from_entry = entries.record(self.debit, transfer_id, self.created_at);
        let to_entry = entries.record(self.credit, transfer_id, self.created_at);

        let transfer = Transfer {
            id: transfer_id,
            from_account_id: self.request.from_account_id,
            to_account_id: self.request.to_account_id,
            amount: self.request.amount,
            currency: self.request.currency,
            created_at: self.created_at,
        };
        transfers.record(transfer.clone());

        TransferReceipt {
            transfer,
            from_account: from.clone(),
            to_account: to.clone(),
            from_entry,
            to_entry,
        }
    }
}

/// Transfer orchestrator
///
/// Cheap to clone; clones share the same underlying stores and can be used
/// from any number of threads.
#[derive(Debug, Clone)]
pub struct TransferEngine {
    accounts: Arc<AccountStore>,
    entries: Arc<EntryLedger>,
    transfers: Arc<TransferLog>,
    config: LedgerConfig,
}

impl TransferEngine {
    pub fn new(
        accounts: Arc<AccountStore>,
        entries: Arc<EntryLedger>,
        transfers: Arc<TransferLog>,
        config: LedgerConfig,
    ) -> Self {
        Self {
            accounts,
            entries,
            transfers,
            config,
        }
    }

    /// Execute a transfer and return the recorded transfer
    pub fn create_transfer(&self, request: TransferRequest) -> Result<Transfer, LedgerError> {
        self.execute_transfer(request)
            .map(|receipt| receipt.transfer)
    }

    /// Execute a transfer and return everything it produced
    ///
    /// # Returns
    ///
    /// * `Ok(TransferReceipt)` - Both balances, both entries and the transfer
    ///   were committed together
    /// * `Err(LedgerError::InvalidTransfer)` - Source and destination are the same account
    /// * `Err(LedgerError::InvalidAmount)` - Amount is zero or negative
    /// * `Err(LedgerError::AccountNotFound)` - Either account does not exist
    /// * `Err(LedgerError::CurrencyMismatch)` - Either account is in another currency
    /// * `Err(LedgerError::InsufficientFunds)` - The source cannot cover the debit
    /// * `Err(LedgerError::Conflict)` - Every attempt timed out waiting for a row
    /// * `Err(LedgerError::Internal)` - A row lock is poisoned
    ///
    /// On any error nothing has been written.
    pub fn execute_transfer(&self, request: TransferRequest) -> Result<TransferReceipt, LedgerError> {
        self.execute(request, None)
    }

    /// Execute a transfer on behalf of `owner`
    ///
    /// Same as [`TransferEngine::execute_transfer`], except that a source
    /// account held by anyone else fails with `LedgerError::NotOwner` after
    /// the existence checks and before the currency comparison.
    pub fn execute_transfer_as(
        &self,
        owner: &str,
        request: TransferRequest,
    ) -> Result<TransferReceipt, LedgerError> {
        self.execute(request, Some(owner))
    }

    /// Build a request from a currency code
    ///
    /// An unsupported code matches no account. Once the checks that come
    /// before the currency comparison pass, it is reported as a mismatch on
    /// the source account, the same as a supported code the accounts are
    /// not in.
    pub fn resolve_request(
        &self,
        from_account_id: AccountId,
        to_account_id: AccountId,
        amount: i64,
        currency: &str,
        owner: Option<&str>,
    ) -> Result<TransferRequest, LedgerError> {
        match currency.parse::<Currency>() {
            Ok(currency) => Ok(TransferRequest::new(
                from_account_id,
                to_account_id,
                amount,
                currency,
            )),
            Err(_) => {
                let (source, _) =
                    self.check_parties(from_account_id, to_account_id, amount, owner)?;
                Err(LedgerError::currency_mismatch(
                    from_account_id,
                    currency.trim(),
                    source.currency.code(),
                ))
            }
        }
    }

    fn execute(
        &self,
        request: TransferRequest,
        owner: Option<&str>,
    ) -> Result<TransferReceipt, LedgerError> {
        self.validate(&request, owner)?;

        let mut attempt = 1;
        loop {
            match self.attempt(request) {
                Err(err) if err.is_transient() && attempt < self.config.max_attempts => {
                    warn!(
                        attempt,
                        max_attempts = self.config.max_attempts,
                        from = request.from_account_id,
                        to = request.to_account_id,
                        error = %err,
                        "transfer conflicted, retrying"
                    );
                    thread::sleep(self.config.retry_backoff * attempt);
                    attempt += 1;
                }
                Err(LedgerError::Conflict { account, .. }) => {
                    return Err(LedgerError::conflict(account, attempt));
                }
                Ok(receipt) => {
                    debug!(
                        transfer = receipt.transfer.id,
                        from = request.from_account_id,
                        to = request.to_account_id,
                        amount = request.amount,
                        currency = %request.currency,
                        attempt,
                        "transfer committed"
                    );
                    return Ok(receipt);
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// Transfers touching an account, ascending by id
    ///
    /// Read under the account's row lock, so a transfer is listed only once
    /// its balance change is visible.
    pub fn list_transfers(
        &self,
        account_id: AccountId,
        page: PageRequest,
    ) -> Result<Vec<Transfer>, LedgerError> {
        let row = self.accounts.row(account_id)?;
        let _guard = lock_for_read(&row, account_id)?;
        Ok(self.transfers.list(account_id, page))
    }

    /// Look up a transfer by id
    pub fn get_transfer(&self, id: TransferId) -> Result<Transfer, LedgerError> {
        self.transfers.get(id)
    }

    /// Checks that come before the currency comparison, in order
    fn check_parties(
        &self,
        from_account_id: AccountId,
        to_account_id: AccountId,
        amount: i64,
        owner: Option<&str>,
    ) -> Result<(AccountProfile, AccountProfile), LedgerError> {
        if from_account_id == to_account_id {
            return Err(LedgerError::invalid_transfer(from_account_id));
        }
        if amount <= 0 {
            return Err(LedgerError::invalid_amount(amount));
        }
        let source = self.accounts.profile(from_account_id)?;
        let destination = self.accounts.profile(to_account_id)?;
        if let Some(owner) = owner {
            source.check_owner(from_account_id, owner)?;
        }
        Ok((source, destination))
    }

    /// Business-rule checks that need no lock
    fn validate(&self, request: &TransferRequest, owner: Option<&str>) -> Result<(), LedgerError> {
        let (source, destination) = self.check_parties(
            request.from_account_id,
            request.to_account_id,
            request.amount,
            owner,
        )?;
        for (account_id, profile) in [
            (request.from_account_id, &source),
            (request.to_account_id, &destination),
        ] {
            if profile.currency != request.currency {
                return Err(LedgerError::currency_mismatch(
                    account_id,
                    request.currency.code(),
                    profile.currency.code(),
                ));
            }
        }
        Ok(())
    }

    /// One locked attempt: lock, re-read, prepare, commit
    fn attempt(&self, request: TransferRequest) -> Result<TransferReceipt, LedgerError> {
        let (low_id, high_id) = request.lock_order();
        let low_row = self.accounts.row(low_id)?;
        let high_row = self.accounts.row(high_id)?;

        let deadline = Instant::now() + self.config.lock_timeout;
        let mut low = AccountStore::lock_for_write(&low_row, low_id, deadline)?;
        let mut high = AccountStore::lock_for_write(&high_row, high_id, deadline)?;

        let (from, to) = if request.from_account_id == low_id {
            (&mut *low, &mut *high)
        } else {
            (&mut *high, &mut *low)
        };

        let plan = TransferPlan::prepare(&self.entries, request, from, to)?;
        Ok(plan.commit(&self.entries, &self.transfers, from, to))
    }
}
