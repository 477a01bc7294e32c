//! Ledger facade
//!
//! `Ledger` wires the account store, entry ledger, transfer log, transfer
//! engine and query surface together from one [`LedgerConfig`] and exposes
//! the public operations.
//!
//! # Architecture
//!
//! ```text
//! Ledger
//!     ├── Arc<AccountStore>   (account rows, row locks)
//!     ├── Arc<EntryLedger>    (append-only entries)
//!     ├── Arc<TransferLog>    (append-only transfers)
//!     ├── TransferEngine      (atomic two-account mutation)
//!     └── LedgerQueries       (paginated reads)
//! ```
//!
//! Operations here act with full authority. [`Ledger::for_owner`] returns
//! an [`OwnerLedger`] that performs them for one authenticated owner.
//!
//! `Ledger` is cheap to clone and every clone shares the same state, so it
//! can be handed to as many threads or tasks as needed.

use super::account_store::{lock_for_read, AccountStore};
use super::audit::{self, AuditReport};
use super::entry_ledger::EntryLedger;
use super::owner_scope::OwnerLedger;
use super::query::LedgerQueries;
use super::transfer_engine::{TransferEngine, TransferLog};
use crate::config::LedgerConfig;
use crate::types::{
    Account, AccountId, Entry, EntryId, LedgerCommand, LedgerError, Transfer, TransferId,
    TransferReceipt, TransferRequest,
};
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct Ledger {
    accounts: Arc<AccountStore>,
    entries: Arc<EntryLedger>,
    transfers: Arc<TransferLog>,
    engine: TransferEngine,
    queries: LedgerQueries,
    config: LedgerConfig,
}

impl Ledger {
    pub fn new(config: LedgerConfig) -> Self {
        let accounts = Arc::new(AccountStore::new());
        let entries = Arc::new(EntryLedger::new(Arc::clone(&accounts)));
        let transfers = Arc::new(TransferLog::new());
        let engine = TransferEngine::new(
            Arc::clone(&accounts),
            Arc::clone(&entries),
            Arc::clone(&transfers),
            config.clone(),
        );
        let queries = LedgerQueries::new(
            Arc::clone(&accounts),
            Arc::clone(&entries),
            engine.clone(),
            config.max_page_size,
        );

        Self {
            accounts,
            entries,
            transfers,
            engine,
            queries,
            config,
        }
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    /// Open a customer account with a zero balance
    ///
    /// # Returns
    ///
    /// * `Err(LedgerError::InvalidCurrency)` - `currency` is not a supported code
    /// * `Err(LedgerError::DuplicateAccount)` - `owner` already holds an
    ///   account in this currency
    pub fn create_account(&self, owner: &str, currency: &str) -> Result<Account, LedgerError> {
        self.accounts.create_account(owner, currency)
    }

    /// Open an issuer account, which may go negative to fund customers
    pub fn create_issuer_account(
        &self,
        owner: &str,
        currency: &str,
    ) -> Result<Account, LedgerError> {
        self.accounts.create_issuer_account(owner, currency)
    }

    pub fn get_account(&self, id: AccountId) -> Result<Account, LedgerError> {
        self.queries.get_account(id)
    }

    pub fn list_accounts(
        &self,
        owner: Option<&str>,
        page_id: u32,
        page_size: u32,
    ) -> Result<Vec<Account>, LedgerError> {
        self.queries.list_accounts(owner, page_id, page_size)
    }

    /// Move `amount` from one account to another
    ///
    /// Either both balances, both entries and the transfer record are
    /// committed, or nothing is. A currency code neither account is in,
    /// supported or not, is a `CurrencyMismatch`.
    pub fn create_transfer(
        &self,
        from_account_id: AccountId,
        to_account_id: AccountId,
        amount: i64,
        currency: &str,
    ) -> Result<Transfer, LedgerError> {
        let request = self.engine.resolve_request(
            from_account_id,
            to_account_id,
            amount,
            currency,
            None,
        )?;
        self.engine.create_transfer(request)
    }

    /// Like [`Ledger::create_transfer`], returning the updated accounts and entries too
    pub fn execute_transfer(&self, request: TransferRequest) -> Result<TransferReceipt, LedgerError> {
        self.engine.execute_transfer(request)
    }

    pub fn list_transfers(
        &self,
        account_id: AccountId,
        page_id: u32,
        page_size: u32,
    ) -> Result<Vec<Transfer>, LedgerError> {
        self.queries.list_transfers(account_id, page_id, page_size)
    }

    pub fn list_entries(
        &self,
        account_id: AccountId,
        page_id: u32,
        page_size: u32,
    ) -> Result<Vec<Entry>, LedgerError> {
        self.queries.list_entries(account_id, page_id, page_size)
    }

    pub fn get_entry(&self, id: EntryId) -> Result<Entry, LedgerError> {
        self.queries.get_entry(id)
    }

    pub fn get_transfer(&self, id: TransferId) -> Result<Transfer, LedgerError> {
        self.queries.get_transfer(id)
    }

    /// Apply one replayed command
    ///
    /// Returns the account id a command opened, or `None` for a transfer.
    pub fn apply(&self, command: &LedgerCommand) -> Result<Option<AccountId>, LedgerError> {
        match command {
            LedgerCommand::OpenAccount {
                owner,
                currency,
                kind,
            } => Ok(Some(self.accounts.insert(owner, *currency, *kind)?.id)),
            LedgerCommand::Transfer(request) => {
                self.engine.execute_transfer(*request)?;
                Ok(None)
            }
        }
    }

    /// Snapshot of every account, ascending by id
    pub fn accounts(&self) -> Result<Vec<Account>, LedgerError> {
        let mut accounts = Vec::with_capacity(self.accounts.len());
        for (id, row) in self.accounts.rows_by_id() {
            accounts.push(lock_for_read(&row, id)?.clone());
        }
        Ok(accounts)
    }

    /// Check every ledger invariant against a consistent snapshot
    pub fn audit(&self) -> Result<AuditReport, LedgerError> {
        audit::audit(
            &self.accounts,
            &self.entries,
            &self.transfers,
            self.config.max_attempts,
        )
    }

    /// A view of the ledger restricted to one authenticated owner
    pub fn for_owner(&self, owner: impl Into<String>) -> OwnerLedger {
        OwnerLedger::new(self.clone(), owner)
    }

    /// Fail unless `owner` holds the account; never waits on the row
    pub(super) fn check_owner(&self, account_id: AccountId, owner: &str) -> Result<(), LedgerError> {
        self.accounts
            .profile(account_id)?
            .check_owner(account_id, owner)
    }

    pub fn queries(&self) -> &LedgerQueries {
        &self.queries
    }

    pub fn engine(&self) -> &TransferEngine {
        &self.engine
    }
}

impl Default for Ledger {
    fn default() -> Self {
        Self::new(LedgerConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::audit::AuditViolation;
    use crate::types::{AccountKind, Currency};
    use rstest::rstest;
    use std::thread;

    /// Ledger with a USD issuer (id 1) and customers A (id 2) and B (id 3)
    fn ledger_with_customers() -> (Ledger, AccountId, AccountId) {
        let ledger = Ledger::default();
        let issuer = ledger.create_issuer_account("treasury", "USD").unwrap();
        let a = ledger.create_account("alice", "USD").unwrap();
        let b = ledger.create_account("bob", "USD").unwrap();
        assert_eq!((issuer.id, a.id, b.id), (1, 2, 3));
        (ledger, a.id, b.id)
    }

    #[test]
    fn test_create_account_starts_at_zero() {
        let ledger = Ledger::default();

        let account = ledger.create_account("alice", "EUR").unwrap();

        assert_eq!(account.balance, 0);
        assert_eq!(account.currency, Currency::Eur);
        assert_eq!(ledger.get_account(account.id).unwrap(), account);
    }

    #[rstest]
    #[case("usd")]
    #[case("GBP")]
    #[case("")]
    fn test_create_account_rejects_unsupported_currency(#[case] currency: &str) {
        let ledger = Ledger::default();

        let result = ledger.create_account("alice", currency);

        assert_eq!(result.unwrap_err(), LedgerError::invalid_currency(currency));
        assert!(ledger.accounts().unwrap().is_empty());
    }

    #[test]
    fn test_two_deposits_into_a_from_funded_b() {
        let (ledger, a, b) = ledger_with_customers();
        ledger.create_transfer(1, b, 500, "USD").unwrap();

        ledger.create_transfer(b, a, 100, "USD").unwrap();
        ledger.create_transfer(b, a, 100, "USD").unwrap();

        assert_eq!(ledger.get_account(a).unwrap().balance, 200);
        assert_eq!(ledger.get_account(b).unwrap().balance, 300);

        let entries = ledger.list_entries(a, 1, 10).unwrap();
        assert_eq!(entries.len(), 2);
        assert!(entries.iter().all(|e| e.amount == 100));
        assert_eq!(ledger.list_transfers(a, 1, 10).unwrap().len(), 2);
    }

    #[test]
    fn test_overdraft_is_rejected_without_side_effects() {
        let (ledger, a, b) = ledger_with_customers();
        ledger.create_transfer(1, a, 30, "USD").unwrap();

        let result = ledger.create_transfer(a, b, 50, "USD");

        assert_eq!(
            result.unwrap_err(),
            LedgerError::insufficient_funds(a, 30, 50)
        );
        assert_eq!(ledger.get_account(a).unwrap().balance, 30);
        assert_eq!(ledger.list_entries(a, 1, 10).unwrap().len(), 1);
        assert!(ledger.list_entries(b, 1, 10).unwrap().is_empty());
    }

    #[test]
    fn test_usd_to_eur_transfer_is_a_currency_mismatch() {
        let ledger = Ledger::default();
        let usd_issuer = ledger.create_issuer_account("treasury", "USD").unwrap();
        let usd = ledger.create_account("alice", "USD").unwrap();
        let eur = ledger.create_account("carol", "EUR").unwrap();
        ledger.create_transfer(usd_issuer.id, usd.id, 100, "USD").unwrap();

        let result = ledger.create_transfer(usd.id, eur.id, 10, "USD");

        assert!(matches!(
            result.unwrap_err(),
            LedgerError::CurrencyMismatch { account, .. } if account == eur.id
        ));
        assert_eq!(ledger.get_account(usd.id).unwrap().balance, 100);
        assert_eq!(ledger.get_account(eur.id).unwrap().balance, 0);
    }

    #[rstest]
    #[case::same_account(2, 2, 10, LedgerError::invalid_transfer(2))]
    #[case::zero_amount(2, 3, 0, LedgerError::invalid_amount(0))]
    #[case::unknown_source(99, 3, 10, LedgerError::account_not_found(99))]
    #[case::unknown_destination(2, 99, 10, LedgerError::account_not_found(99))]
    #[case::existing_accounts(2, 3, 10, LedgerError::currency_mismatch(2, "GBP", "USD"))]
    fn test_unsupported_currency_code_keeps_check_order(
        #[case] from: AccountId,
        #[case] to: AccountId,
        #[case] amount: i64,
        #[case] expected: LedgerError,
    ) {
        let (ledger, a, _) = ledger_with_customers();
        ledger.create_transfer(1, a, 100, "USD").unwrap();

        assert_eq!(
            ledger.create_transfer(from, to, amount, "GBP").unwrap_err(),
            expected
        );
        assert_eq!(ledger.get_account(a).unwrap().balance, 100);
        assert_eq!(ledger.audit().unwrap().transfers, 1);
    }

    #[test]
    fn test_opposite_transfers_net_to_zero() {
        let (ledger, a, b) = ledger_with_customers();
        ledger.create_transfer(1, a, 50, "USD").unwrap();
        ledger.create_transfer(1, b, 50, "USD").unwrap();

        let forward = {
            let ledger = ledger.clone();
            thread::spawn(move || ledger.create_transfer(a, b, 10, "USD"))
        };
        let backward = {
            let ledger = ledger.clone();
            thread::spawn(move || ledger.create_transfer(b, a, 10, "USD"))
        };
        forward.join().unwrap().unwrap();
        backward.join().unwrap().unwrap();

        assert_eq!(ledger.get_account(a).unwrap().balance, 50);
        assert_eq!(ledger.get_account(b).unwrap().balance, 50);

        // One funding entry each plus the two mirrored pairs
        assert_eq!(ledger.list_entries(a, 1, 10).unwrap().len(), 3);
        assert_eq!(ledger.list_entries(b, 1, 10).unwrap().len(), 3);
        assert!(ledger.audit().unwrap().is_consistent());
    }

    #[test]
    fn test_point_lookups_follow_listings() {
        let (ledger, a, b) = ledger_with_customers();
        let funding = ledger.create_transfer(1, a, 40, "USD").unwrap();
        let moved = ledger.create_transfer(a, b, 15, "USD").unwrap();

        assert_eq!(ledger.get_transfer(funding.id).unwrap(), funding);
        for entry in ledger.list_entries(b, 1, 10).unwrap() {
            assert_eq!(ledger.get_entry(entry.id).unwrap(), entry);
            assert_eq!(entry.transfer_id, moved.id);
        }
        assert_eq!(
            ledger.get_transfer(99).unwrap_err(),
            LedgerError::transfer_not_found(99)
        );
        assert_eq!(ledger.get_entry(99).unwrap_err(), LedgerError::entry_not_found(99));
    }

    #[test]
    fn test_list_accounts_by_owner_and_page() {
        let ledger = Ledger::default();
        for currency in ["USD", "EUR", "INR"] {
            ledger.create_account("alice", currency).unwrap();
            ledger.create_account("bob", currency).unwrap();
        }

        let alice = ledger.list_accounts(Some("alice"), 1, 10).unwrap();
        assert_eq!(alice.iter().map(|a| a.id).collect::<Vec<_>>(), vec![1, 3, 5]);

        let second_page = ledger.list_accounts(None, 2, 4).unwrap();
        assert_eq!(second_page.iter().map(|a| a.id).collect::<Vec<_>>(), vec![5, 6]);

        assert!(ledger.list_accounts(None, 3, 4).unwrap().is_empty());
    }

    #[rstest]
    #[case::zero_page(0, 10)]
    #[case::zero_size(1, 0)]
    #[case::oversized(1, 101)]
    fn test_listings_reject_invalid_pages(#[case] page_id: u32, #[case] page_size: u32) {
        let (ledger, a, _) = ledger_with_customers();
        let expected = LedgerError::invalid_page(page_id, page_size, 100);

        assert_eq!(ledger.list_accounts(None, page_id, page_size).unwrap_err(), expected);
        assert_eq!(ledger.list_entries(a, page_id, page_size).unwrap_err(), expected);
        assert_eq!(ledger.list_transfers(a, page_id, page_size).unwrap_err(), expected);
    }

    #[test]
    fn test_listing_unknown_account_is_not_found() {
        let ledger = Ledger::default();

        assert_eq!(
            ledger.list_entries(7, 1, 10).unwrap_err(),
            LedgerError::account_not_found(7)
        );
        assert_eq!(
            ledger.list_transfers(7, 1, 10).unwrap_err(),
            LedgerError::account_not_found(7)
        );
    }

    #[test]
    fn test_listing_is_idempotent() {
        let (ledger, a, b) = ledger_with_customers();
        ledger.create_transfer(1, a, 100, "USD").unwrap();
        ledger.create_transfer(a, b, 10, "USD").unwrap();

        assert_eq!(
            ledger.list_entries(a, 1, 10).unwrap(),
            ledger.list_entries(a, 1, 10).unwrap()
        );
        assert_eq!(
            ledger.list_transfers(b, 1, 10).unwrap(),
            ledger.list_transfers(b, 1, 10).unwrap()
        );
    }

    #[test]
    fn test_apply_replays_commands() {
        let ledger = Ledger::default();

        let issuer = ledger
            .apply(&LedgerCommand::open("treasury", Currency::Cad, AccountKind::Issuer))
            .unwrap();
        let customer = ledger
            .apply(&LedgerCommand::open("dave", Currency::Cad, AccountKind::Customer))
            .unwrap();
        let transfer = ledger
            .apply(&LedgerCommand::Transfer(TransferRequest::new(
                1,
                2,
                75,
                Currency::Cad,
            )))
            .unwrap();

        assert_eq!((issuer, customer, transfer), (Some(1), Some(2), None));
        assert_eq!(ledger.get_account(1).unwrap().balance, -75);
        assert_eq!(ledger.get_account(2).unwrap().balance, 75);
    }

    #[test]
    fn test_audit_of_fresh_and_busy_ledgers() {
        let ledger = Ledger::default();
        assert_eq!(ledger.audit().unwrap(), AuditReport::default());

        let (ledger, a, b) = ledger_with_customers();
        ledger.create_transfer(1, a, 100, "USD").unwrap();
        ledger.create_transfer(a, b, 60, "USD").unwrap();
        let eur_issuer = ledger.create_issuer_account("central", "EUR").unwrap();
        let eur = ledger.create_account("carol", "EUR").unwrap();
        ledger.create_transfer(eur_issuer.id, eur.id, 5, "EUR").unwrap();

        let report = ledger.audit().unwrap();
        assert_eq!(report.accounts, 5);
        assert_eq!(report.entries, 6);
        assert_eq!(report.transfers, 3);
        assert!(report.is_consistent(), "{:?}", report.violations);
    }

    #[test]
    fn test_audit_detects_balance_drift() {
        let (ledger, a, _) = ledger_with_customers();
        ledger.create_transfer(1, a, 100, "USD").unwrap();

        // Corrupt a balance behind the engine's back
        let row = ledger.accounts.row(a).unwrap();
        row.lock().unwrap().balance = 90;

        let report = ledger.audit().unwrap();
        assert!(report.violations.contains(&AuditViolation::BalanceMismatch {
            account: a,
            balance: 90,
            entry_sum: 100,
        }));
        assert!(report.violations.iter().any(|v| matches!(
            v,
            AuditViolation::CurrencyImbalance { currency: Currency::Usd, net: -10 }
        )));
    }
}
