//! Owner-scoped access to the ledger
//!
//! Every request reaching the ledger carries the owner identity the
//! authentication layer attached to it. `OwnerLedger` binds that identity
//! and refuses to act on accounts held by anyone else:
//!
//! - transfers must debit an account the owner holds; crediting any account
//!   of the same currency is allowed;
//! - account lookups and the entry and transfer listings only cover the
//!   owner's accounts;
//! - account listings only show the owner's accounts.
//!
//! Ownership is checked against the immutable account profile before any
//! lock is taken or anything is written, and fails with
//! [`LedgerError::NotOwner`].

use super::ledger::Ledger;
use crate::types::{Account, AccountId, Entry, LedgerError, Transfer, TransferReceipt, TransferRequest};

/// A [`Ledger`] handle acting for one owner
#[derive(Debug, Clone)]
pub struct OwnerLedger {
    ledger: Ledger,
    owner: String,
}

impl OwnerLedger {
    pub fn new(ledger: Ledger, owner: impl Into<String>) -> Self {
        Self {
            ledger,
            owner: owner.into(),
        }
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// Open a customer account held by this owner
    ///
    /// # Returns
    ///
    /// * `Err(LedgerError::InvalidCurrency)` - `currency` is not a supported code
    /// * `Err(LedgerError::DuplicateAccount)` - The owner already holds an
    ///   account in this currency
    pub fn create_account(&self, currency: &str) -> Result<Account, LedgerError> {
        self.ledger.create_account(&self.owner, currency)
    }

    pub fn get_account(&self, id: AccountId) -> Result<Account, LedgerError> {
        self.ledger.check_owner(id, &self.owner)?;
        self.ledger.get_account(id)
    }

    /// This owner's accounts, ascending by id
    pub fn list_accounts(&self, page_id: u32, page_size: u32) -> Result<Vec<Account>, LedgerError> {
        self.ledger
            .list_accounts(Some(&self.owner), page_id, page_size)
    }

    /// Move `amount` out of one of this owner's accounts
    ///
    /// Checks run in the same order as for [`Ledger::create_transfer`], with
    /// the ownership check between the existence checks and the currency
    /// comparison.
    pub fn create_transfer(
        &self,
        from_account_id: AccountId,
        to_account_id: AccountId,
        amount: i64,
        currency: &str,
    ) -> Result<Transfer, LedgerError> {
        let engine = self.ledger.engine();
        let request = engine.resolve_request(
            from_account_id,
            to_account_id,
            amount,
            currency,
            Some(&self.owner),
        )?;
        engine
            .execute_transfer_as(&self.owner, request)
            .map(|receipt| receipt.transfer)
    }

    pub fn execute_transfer(&self, request: TransferRequest) -> Result<TransferReceipt, LedgerError> {
        self.ledger.engine().execute_transfer_as(&self.owner, request)
    }

    pub fn list_entries(
        &self,
        account_id: AccountId,
        page_id: u32,
        page_size: u32,
    ) -> Result<Vec<Entry>, LedgerError> {
        self.ledger.check_owner(account_id, &self.owner)?;
        self.ledger.list_entries(account_id, page_id, page_size)
    }

    pub fn list_transfers(
        &self,
        account_id: AccountId,
        page_id: u32,
        page_size: u32,
    ) -> Result<Vec<Transfer>, LedgerError> {
        self.ledger.check_owner(account_id, &self.owner)?;
        self.ledger.list_transfers(account_id, page_id, page_size)
    }
}
