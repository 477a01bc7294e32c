//! Ledger commands replayed by the CLI
//!
//! Each row of the input CSV becomes one `LedgerCommand`. Account creation
//! commands take effect in file order so later rows can reference the ids
//! they produce.

use super::account::{AccountId, AccountKind};
use super::currency::Currency;
use super::transfer::TransferRequest;

/// A single replayable ledger operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerCommand {
    /// Open a new account with a zero balance
    OpenAccount {
        owner: String,
        currency: Currency,
        kind: AccountKind,
    },

    /// Move funds between two existing accounts
    Transfer(TransferRequest),
}

impl LedgerCommand {
    pub fn open(owner: impl Into<String>, currency: Currency, kind: AccountKind) -> Self {
        LedgerCommand::OpenAccount {
            owner: owner.into(),
            currency,
            kind,
        }
    }

    /// Accounts the command touches, if it touches existing accounts at all
    pub fn accounts(&self) -> Option<(AccountId, AccountId)> {
        match self {
            LedgerCommand::OpenAccount { .. } => None,
            LedgerCommand::Transfer(request) => {
                Some((request.from_account_id, request.to_account_id))
            }
        }
    }
}
