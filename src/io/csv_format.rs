//! CSV format handling for ledger commands and account output
//!
//! This module centralizes all CSV format concerns, providing:
//! - CsvRecord structure for deserialization
//! - Conversion from CSV records to ledger commands
//! - Account output serialization
//!
//! All functions are pure (no I/O) for easy testing.
//!
//! # Input format
//!
//! ```text
//! type,owner,currency,from,to,amount
//! issuer,treasury,USD,,,
//! open,alice,USD,,,
//! transfer,,USD,1,2,500
//! ```

use crate::types::{
    Account, AccountId, AccountKind, Currency, LedgerCommand, TransferRequest,
};
use serde::Deserialize;
use std::io::Write;

/// CSV record structure for deserialization
///
/// Matches the input CSV format with columns: type, owner, currency, from,
/// to, amount. Openings leave `from`, `to` and `amount` empty; transfers
/// leave `owner` empty.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct CsvRecord {
    #[serde(rename = "type")]
    pub command: String,
    pub owner: Option<String>,
    pub currency: String,
    pub from: Option<AccountId>,
    pub to: Option<AccountId>,
    pub amount: Option<String>,
}

/// Convert a CsvRecord to a LedgerCommand
///
/// Only the shape of the row is checked here. Business rules (positive
/// amount, distinct and existing accounts, matching currencies) are left to
/// the ledger so that rejections are reported the same way as for any other
/// caller.
///
/// # Returns
///
/// * `Ok(LedgerCommand)` - Successfully converted record
/// * `Err(String)` - Description of the conversion failure
pub fn convert_csv_record(csv_record: CsvRecord) -> Result<LedgerCommand, String> {
    let currency = csv_record
        .currency
        .parse::<Currency>()
        .map_err(|e| e.to_string())?;

    let kind = match csv_record.command.to_lowercase().as_str() {
        "open" => AccountKind::Customer,
        "issuer" => AccountKind::Issuer,
        "transfer" => return convert_transfer(csv_record, currency),
        _ => return Err(format!("Invalid command type: '{}'", csv_record.command)),
    };

    match csv_record.owner {
        Some(owner) if !owner.trim().is_empty() => {
            Ok(LedgerCommand::open(owner.trim(), currency, kind))
        }
        _ => Err(format!("'{}' command requires an owner", csv_record.command)),
    }
}

fn convert_transfer(csv_record: CsvRecord, currency: Currency) -> Result<LedgerCommand, String> {
    let (Some(from), Some(to)) = (csv_record.from, csv_record.to) else {
        return Err("transfer command requires 'from' and 'to' accounts".to_string());
    };

    let amount = match csv_record.amount {
        Some(amount_str) if !amount_str.trim().is_empty() => amount_str
            .trim()
            .parse::<i64>()
            .map_err(|_| format!("Invalid amount '{}' for transfer {} -> {}", amount_str, from, to))?,
        _ => return Err(format!("transfer {} -> {} requires an amount", from, to)),
    };

    Ok(LedgerCommand::Transfer(TransferRequest::new(
        from, to, amount, currency,
    )))
}

/// Write account states to CSV format
///
/// Writes accounts in CSV format with columns: id, owner, currency, balance.
/// Accounts are sorted by id for deterministic output.
pub fn write_accounts_csv(accounts: &[Account], output: &mut dyn Write) -> Result<(), String> {
    use csv::Writer;

    let mut writer = Writer::from_writer(output);

    writer
        .write_record(["id", "owner", "currency", "balance"])
        .map_err(|e| format!("Failed to write CSV header: {}", e))?;

    let mut sorted_accounts = accounts.to_vec();
    sorted_accounts.sort_by_key(|account| account.id);

    for account in sorted_accounts {
        writer
            .write_record(&[
                account.id.to_string(),
                account.owner,
                account.currency.to_string(),
                account.balance.to_string(),
            ])
            .map_err(|e| format!("Failed to write account record: {}", e))?;
    }

    writer
        .flush()
        .map_err(|e| format!("Failed to flush output: {}", e))?;

    Ok(())
}
