//! Ledger consistency audit
//!
//! Replays the invariants that every committed state must satisfy:
//!
//! - each account's balance equals the sum of its entries;
//! - each transfer has exactly one debit on its source and one credit on its
//!   destination, of the transfer's amount and timestamp;
//! - every entry belongs to a recorded transfer;
//! - balances in each currency sum to zero (issuers carry the negative side).
//!
//! The audit holds every account row, taken in ascending id order, while it
//! reads. That is the same order transfers use, so the audit cannot deadlock
//! with them and sees no transfer half-applied.

use super::account_store::{lock_for_read, AccountStore};
use super::entry_ledger::EntryLedger;
use super::transfer_engine::TransferLog;
use crate::types::{AccountId, Currency, Entry, LedgerError, TransferId};
use std::collections::{BTreeMap, HashMap, HashSet};
use thiserror::Error;
use tracing::{info, warn};

/// A single broken invariant
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuditViolation {
    #[error("account {account} balance {balance} differs from entry sum {entry_sum}")]
    BalanceMismatch {
        account: AccountId,
        balance: i64,
        entry_sum: i128,
    },

    #[error("transfer {transfer} has {entries} entries, expected 2")]
    UnpairedTransfer { transfer: TransferId, entries: usize },

    #[error("transfer {transfer} entries do not mirror its accounts, amount and timestamp")]
    MismatchedEntries { transfer: TransferId },

    #[error("entry {entry} references unknown transfer {transfer}")]
    OrphanEntry { entry: u64, transfer: TransferId },

    #[error("{currency} balances sum to {net}, expected 0")]
    CurrencyImbalance { currency: Currency, net: i128 },
}

/// Outcome of a ledger audit
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuditReport {
    pub accounts: usize,
    pub entries: usize,
    pub transfers: usize,
    pub violations: Vec<AuditViolation>,
}

impl AuditReport {
    pub fn is_consistent(&self) -> bool {
        self.violations.is_empty()
    }
}

/// Audit the ledger
///
/// Accounts created while the audit is taking its locks would be missed, so
/// the snapshot is retaken (up to `max_attempts` times) until the account set
/// is stable once every row is held.
pub fn audit(
    accounts: &AccountStore,
    entries: &EntryLedger,
    transfers: &TransferLog,
    max_attempts: u32,
) -> Result<AuditReport, LedgerError> {
    for _ in 0..max_attempts.max(1) {
        let rows = accounts.rows_by_id();
        let mut guards = Vec::with_capacity(rows.len());
        for (id, row) in &rows {
            guards.push((*id, lock_for_read(row, *id)?));
        }

        if accounts.len() != rows.len() {
            continue;
        }

        let mut report = AuditReport {
            accounts: guards.len(),
            ..AuditReport::default()
        };
        let audited: HashSet<AccountId> = guards.iter().map(|(id, _)| *id).collect();
        let mut net: BTreeMap<Currency, i128> = BTreeMap::new();
        let mut by_transfer: HashMap<TransferId, Vec<Entry>> = HashMap::new();

        for (id, account) in &guards {
            let entry_sum = entries.sum_for(*id);
            if entry_sum != account.balance as i128 {
                report.violations.push(AuditViolation::BalanceMismatch {
                    account: *id,
                    balance: account.balance,
                    entry_sum,
                });
            }
            *net.entry(account.currency).or_default() += account.balance as i128;

            for entry in entries.entries_for(*id) {
                report.entries += 1;
                by_transfer.entry(entry.transfer_id).or_default().push(entry);
            }
        }

        // Transfers between accounts outside the snapshot are not covered
        let recorded = transfers.all();
        let mut known: HashSet<TransferId> = HashSet::with_capacity(recorded.len());
        for transfer in recorded
            .iter()
            .filter(|t| audited.contains(&t.from_account_id) && audited.contains(&t.to_account_id))
        {
            report.transfers += 1;
            known.insert(transfer.id);

            let pair = by_transfer.get(&transfer.id).map(Vec::as_slice).unwrap_or(&[]);
            if pair.len() != 2 {
                report.violations.push(AuditViolation::UnpairedTransfer {
                    transfer: transfer.id,
                    entries: pair.len(),
                });
                continue;
            }

            let mirrored = |account_id: AccountId, amount: i64| {
                pair.iter().any(|e| {
                    e.account_id == account_id
                        && e.amount == amount
                        && e.created_at == transfer.created_at
                })
            };
            if !mirrored(transfer.from_account_id, -transfer.amount)
                || !mirrored(transfer.to_account_id, transfer.amount)
            {
                report.violations.push(AuditViolation::MismatchedEntries {
                    transfer: transfer.id,
                });
            }
        }

        for (transfer, orphans) in by_transfer.iter().filter(|(id, _)| !known.contains(id)) {
            for entry in orphans {
                report.violations.push(AuditViolation::OrphanEntry {
                    entry: entry.id,
                    transfer: *transfer,
                });
            }
        }

        for (currency, net) in net.into_iter().filter(|(_, net)| *net != 0) {
            report
                .violations
                .push(AuditViolation::CurrencyImbalance { currency, net });
        }

        if report.is_consistent() {
            info!(
                accounts = report.accounts,
                entries = report.entries,
                transfers = report.transfers,
                "ledger audit passed"
            );
        } else {
            for violation in &report.violations {
                warn!(%violation, "ledger audit violation");
            }
        }
        return Ok(report);
    }

    Err(LedgerError::internal(
        "account set kept changing while the audit took its snapshot",
    ))
}
