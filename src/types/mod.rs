//! Types module
//!
//! Contains core data structures used throughout the application.
//! This module organizes types into logical submodules:
//! - `account`: Account records and overdraft policy
//! - `currency`: Supported currency codes
//! - `entry`: Append-only balance deltas
//! - `transfer`: Transfer requests, records and receipts
//! - `page`: Pagination parameters
//! - `command`: Replayable ledger commands read by the CLI
//! - `error`: Error types for the ledger engine

pub mod account;
pub mod command;
pub mod currency;
pub mod entry;
pub mod error;
pub mod page;
pub mod transfer;

pub use account::{Account, AccountId, AccountKind};
pub use command::LedgerCommand;
pub use currency::Currency;
pub use entry::{Entry, EntryId};
pub use error::LedgerError;
pub use page::{PageRequest, DEFAULT_MAX_PAGE_SIZE};
pub use transfer::{Transfer, TransferId, TransferReceipt, TransferRequest};
