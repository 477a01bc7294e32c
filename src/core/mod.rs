//! Core ledger module
//!
//! This module contains the ledger components:
//! - `account_store` - Account rows, balances and row-level locking
//! - `entry_ledger` - Append-only balance change records
//! - `transfer_engine` - Atomic transfers and the transfer log
//! - `query` - Paginated read-only access
//! - `ledger` - Facade wiring the components together
//! - `owner_scope` - Ledger access on behalf of one authenticated owner
//! - `audit` - Invariant checks over a consistent snapshot
//! - `batch_processor` - Concurrent command replay

pub mod account_store;
pub mod audit;
pub mod batch_processor;
pub mod entry_ledger;
pub mod ledger;
pub mod owner_scope;
pub mod query;
pub mod transfer_engine;

pub use account_store::{AccountProfile, AccountStore};
pub use audit::{AuditReport, AuditViolation};
pub use batch_processor::{BatchProcessor, ProcessingResult};
pub use entry_ledger::EntryLedger;
pub use ledger::Ledger;
pub use owner_scope::OwnerLedger;
pub use query::LedgerQueries;
pub use transfer_engine::{TransferEngine, TransferLog, TransferPlan};
