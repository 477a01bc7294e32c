//! Error types for the Rust Ledger Engine
//!
//! This module defines all error types that can occur while operating the ledger.
//! Errors are designed to be descriptive and user-friendly for CLI output.
//!
//! # Error Categories
//!
//! - **Business Rule Errors**: Unknown accounts, unsupported currencies, invalid
//!   transfers, insufficient funds, acting on another owner's account,
//!   duplicate accounts. Always detected before any mutation.
//! - **Storage Errors**: Transient lock conflicts (retried by the orchestrator)
//!   and internal failures (never retried).
//! - **File I/O Errors**: File not found, permission denied, malformed CSV.

use super::account::AccountId;
use super::entry::EntryId;
use super::transfer::TransferId;
use thiserror::Error;

/// Main error type for the ledger engine
///
/// Each variant includes enough context to diagnose the rejected operation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    /// Referenced account does not exist
    #[error("Account {account} not found")]
    AccountNotFound {
        /// The account ID that was looked up
        account: AccountId,
    },

    /// Referenced entry does not exist
    #[error("Entry {entry} not found")]
    EntryNotFound {
        /// The entry ID that was looked up
        entry: EntryId,
    },

    /// Referenced transfer does not exist
    #[error("Transfer {transfer} not found")]
    TransferNotFound {
        /// The transfer ID that was looked up
        transfer: TransferId,
    },

    /// Currency code is not in the supported set
    #[error("Unsupported currency '{code}'")]
    InvalidCurrency {
        /// The rejected currency code
        code: String,
    },

    /// Transfer references the same account on both sides
    #[error("Invalid transfer: account {account} cannot transfer to itself")]
    InvalidTransfer {
        /// The account used on both sides
        account: AccountId,
    },

    /// Transfer amount is zero or negative
    #[error("Invalid amount {amount}: transfer amount must be positive")]
    InvalidAmount {
        /// The rejected amount
        amount: i64,
    },

    /// Account currency disagrees with the requested transfer currency
    #[error("Currency mismatch on account {account}: expected {expected}, account holds {actual}")]
    CurrencyMismatch {
        /// Account whose currency disagrees
        account: AccountId,
        /// Currency requested by the transfer
        expected: String,
        /// Currency the account is denominated in
        actual: String,
    },

    /// Source balance cannot cover the debit
    #[error("Insufficient funds on account {account}: balance {balance}, requested {requested}")]
    InsufficientFunds {
        /// Source account
        account: AccountId,
        /// Balance at the time of the check
        balance: i64,
        /// Requested debit
        requested: i64,
    },

    /// Applying a delta would overflow the balance representation
    #[error("Arithmetic overflow adjusting account {account} by {delta}")]
    ArithmeticOverflow {
        /// Account being adjusted
        account: AccountId,
        /// Delta that would overflow
        delta: i64,
    },

    /// The caller does not own the account it acted on
    #[error("Account {account} does not belong to '{owner}'")]
    NotOwner {
        /// Account the caller tried to use
        account: AccountId,
        /// Authenticated owner making the request
        owner: String,
    },

    /// The owner already holds an account in this currency
    #[error("Owner '{owner}' already holds {currency} account {existing}")]
    DuplicateAccount {
        /// Owner of both accounts
        owner: String,
        /// Currency code of both accounts
        currency: String,
        /// Id of the account already open
        existing: AccountId,
    },

    /// Pagination parameters are outside the accepted range
    #[error("Invalid page: page_id {page_id}, page_size {page_size} (page_id >= 1, 1 <= page_size <= {max_page_size})")]
    InvalidPage {
        /// Requested 1-based page
        page_id: u32,
        /// Requested page size
        page_size: u32,
        /// Largest accepted page size
        max_page_size: u32,
    },

    /// Storage detected a write conflict; the whole transfer may be retried
    #[error("Conflict on account {account} after {attempts} attempt(s)")]
    Conflict {
        /// Account whose row lock could not be acquired
        account: AccountId,
        /// Attempts made before giving up
        attempts: u32,
    },

    /// Storage failure unrelated to business rules
    #[error("Internal storage error: {message}")]
    Internal {
        /// Description of the failure
        message: String,
    },

    /// File not found at the specified path
    #[error("File not found: {path}")]
    FileNotFound {
        /// The path that was not found
        path: String,
    },

    /// I/O error occurred while reading or writing files
    #[error("I/O error: {message}")]
    IoError {
        /// Description of the I/O error
        message: String,
    },

    /// CSV parsing error occurred
    ///
    /// Recoverable: the malformed record is skipped.
    #[error("CSV parse error{}: {message}", line.map(|l| format!(" at line {}", l)).unwrap_or_default())]
    ParseError {
        /// Line number where the error occurred (if available)
        line: Option<u64>,
        /// Description of the parsing error
        message: String,
    },
}

impl From<std::io::Error> for LedgerError {
    fn from(error: std::io::Error) -> Self {
        LedgerError::IoError {
            message: error.to_string(),
        }
    }
}

impl From<csv::Error> for LedgerError {
    fn from(error: csv::Error) -> Self {
        let line = error.position().map(|pos| pos.line());

        LedgerError::ParseError {
            line,
            message: error.to_string(),
        }
    }
}

impl LedgerError {
    /// Whether retrying the whole operation may succeed
    pub fn is_transient(&self) -> bool {
        matches!(self, LedgerError::Conflict { .. })
    }

    /// Create an AccountNotFound error
    pub fn account_not_found(account: AccountId) -> Self {
        LedgerError::AccountNotFound { account }
    }

    /// Create an EntryNotFound error
    pub fn entry_not_found(entry: EntryId) -> Self {
        LedgerError::EntryNotFound { entry }
    }

    /// Create a TransferNotFound error
    pub fn transfer_not_found(transfer: TransferId) -> Self {
        LedgerError::TransferNotFound { transfer }
    }

    /// Create an InvalidCurrency error
    pub fn invalid_currency(code: &str) -> Self {
        LedgerError::InvalidCurrency {
            code: code.to_string(),
        }
    }

    /// Create an InvalidTransfer error
    pub fn invalid_transfer(account: AccountId) -> Self {
        LedgerError::InvalidTransfer { account }
    }

    /// Create an InvalidAmount error
    pub fn invalid_amount(amount: i64) -> Self {
        LedgerError::InvalidAmount { amount }
    }

    /// Create a CurrencyMismatch error
    pub fn currency_mismatch(account: AccountId, expected: &str, actual: &str) -> Self {
        LedgerError::CurrencyMismatch {
            account,
            expected: expected.to_string(),
            actual: actual.to_string(),
        }
    }

    /// Create an InsufficientFunds error
    pub fn insufficient_funds(account: AccountId, balance: i64, requested: i64) -> Self {
        LedgerError::InsufficientFunds {
            account,
            balance,
            requested,
        }
    }

    /// Create an ArithmeticOverflow error
    pub fn arithmetic_overflow(account: AccountId, delta: i64) -> Self {
        LedgerError::ArithmeticOverflow { account, delta }
    }

    /// Create a NotOwner error
    pub fn not_owner(account: AccountId, owner: &str) -> Self {
        LedgerError::NotOwner {
            account,
            owner: owner.to_string(),
        }
    }

    /// Create a DuplicateAccount error
    pub fn duplicate_account(owner: &str, currency: &str, existing: AccountId) -> Self {
        LedgerError::DuplicateAccount {
            owner: owner.to_string(),
            currency: currency.to_string(),
            existing,
        }
    }

    /// Create an InvalidPage error
    pub fn invalid_page(page_id: u32, page_size: u32, max_page_size: u32) -> Self {
        LedgerError::InvalidPage {
            page_id,
            page_size,
            max_page_size,
        }
    }

    /// Create a Conflict error
    pub fn conflict(account: AccountId, attempts: u32) -> Self {
        LedgerError::Conflict { account, attempts }
    }

    /// Create an Internal error
    pub fn internal(message: impl Into<String>) -> Self {
        LedgerError::Internal {
            message: message.into(),
        }
    }
}
