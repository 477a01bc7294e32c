//! Rust Ledger Engine Library
//! # Overview
//!
//! This library provides an in-memory account ledger with atomic two-account
//! transfers, plus a CSV command replay pipeline with a sync and an async
//! strategy.
//!
//! # Architecture
//!
//! - [`types`] - Core data types (Account, Entry, Transfer, errors, pages)
//! - [`config`] - Ledger tunables (retries, lock timeout, page size cap)
//! - [`core`] - Ledger components:
//!   - [`core::account_store`] - Accounts, balances and row-level locks
//!   - [`core::entry_ledger`] - Append-only balance change records
//!   - [`core::transfer_engine`] - Atomic transfers and the transfer log
//!   - [`core::query`] - Paginated reads
//!   - [`core::ledger`] - The [`Ledger`] facade
//!   - [`core::owner_scope`] - [`OwnerLedger`], access on behalf of one owner
//!   - [`core::audit`] - Invariant checks
//! - [`io`] - CSV command input and account output
//! - [`strategy`] - Replay pipelines
//! - [`cli`] - CLI arguments parsing
//! - [`observability`] - Tracing setup
//!
//! # Invariants
//!
//! - An account's balance always equals the sum of its entries.
//! - Every transfer has exactly two entries: a debit of `-amount` on the
//!   source and a credit of `+amount` on the destination, with the
//!   transfer's timestamp.
//! - Customer balances never go negative. Issuer accounts may, and fund the
//!   ledger in their currency.
//! - Transfers never cross currencies.
//! - An owner holds at most one account per currency.
//!
//! # Example
//!
//! ```
//! use rust_ledger_engine::Ledger;
//!
//! let ledger = Ledger::default();
//! let issuer = ledger.create_issuer_account("treasury", "USD").unwrap();
//! let alice = ledger.create_account("alice", "USD").unwrap();
//!
//! ledger.create_transfer(issuer.id, alice.id, 500, "USD").unwrap();
//!
//! assert_eq!(ledger.get_account(alice.id).unwrap().balance, 500);
//! assert_eq!(ledger.list_entries(alice.id, 1, 10).unwrap().len(), 1);
//! ```

// Module declarations
pub mod cli;
pub mod config;
pub mod core;
pub mod io;
pub mod observability;
pub mod strategy;
pub mod types;

pub use config::LedgerConfig;
pub use core::{AuditReport, Ledger, OwnerLedger};
pub use io::write_accounts_csv;
pub use types::{
    Account, AccountId, AccountKind, Currency, Entry, EntryId, LedgerCommand, LedgerError,
    PageRequest, Transfer, TransferId, TransferReceipt, TransferRequest,
};
