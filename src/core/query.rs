//! Read-only query surface
//!
//! Composes the account store, the entry ledger and the transfer engine's
//! listings behind `page_id`/`page_size` parameters. Nothing here mutates
//! state. Per-account listings are read under the account's row lock, so a
//! page never shows an entry whose balance change is not yet visible (or the
//! reverse).

use super::account_store::{lock_for_read, AccountStore};
use super::entry_ledger::EntryLedger;
use super::transfer_engine::TransferEngine;
use crate::types::{
    Account, AccountId, Entry, EntryId, LedgerError, PageRequest, Transfer, TransferId,
};
use std::sync::Arc;

/// Paginated read access to accounts, entries and transfers
#[derive(Debug, Clone)]
pub struct LedgerQueries {
    accounts: Arc<AccountStore>,
    entries: Arc<EntryLedger>,
    transfers: TransferEngine,
    max_page_size: u32,
}

impl LedgerQueries {
    pub fn new(
        accounts: Arc<AccountStore>,
        entries: Arc<EntryLedger>,
        transfers: TransferEngine,
        max_page_size: u32,
    ) -> Self {
        Self {
            accounts,
            entries,
            transfers,
            max_page_size,
        }
    }

    fn page(&self, page_id: u32, page_size: u32) -> Result<PageRequest, LedgerError> {
        PageRequest::new(page_id, page_size, self.max_page_size)
    }

    pub fn get_account(&self, id: AccountId) -> Result<Account, LedgerError> {
        self.accounts.get_account(id)
    }

    /// Accounts in ascending id order, optionally restricted to one owner
    pub fn list_accounts(
        &self,
        owner: Option<&str>,
        page_id: u32,
        page_size: u32,
    ) -> Result<Vec<Account>, LedgerError> {
        let page = self.page(page_id, page_size)?;
        self.accounts.list_accounts(owner, page)
    }

    /// An account's entries in ascending id order
    ///
    /// # Returns
    ///
    /// * `Err(LedgerError::AccountNotFound)` - The account does not exist
    /// * `Err(LedgerError::InvalidPage)` - The page parameters are out of range
    pub fn list_entries(
        &self,
        account_id: AccountId,
        page_id: u32,
        page_size: u32,
    ) -> Result<Vec<Entry>, LedgerError> {
        let page = self.page(page_id, page_size)?;
        let row = self.accounts.row(account_id)?;
        let _guard = lock_for_read(&row, account_id)?;
        Ok(self.entries.list_entries(account_id, page))
    }

    /// Transfers with the account on either side, ascending by id
    pub fn list_transfers(
        &self,
        account_id: AccountId,
        page_id: u32,
        page_size: u32,
    ) -> Result<Vec<Transfer>, LedgerError> {
        let page = self.page(page_id, page_size)?;
        self.transfers.list_transfers(account_id, page)
    }

    pub fn get_entry(&self, id: EntryId) -> Result<Entry, LedgerError> {
        self.entries.get_entry(id)
    }

    pub fn get_transfer(&self, id: TransferId) -> Result<Transfer, LedgerError> {
        self.transfers.get_transfer(id)
    }
}
