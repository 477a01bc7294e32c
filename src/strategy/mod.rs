//! Processing strategy module for command replay
//!
//! This module defines the Strategy pattern for complete replay pipelines,
//! encompassing both CSV parsing and ledger processing. This allows different
//! processing implementations (sequential, batched parallel) to be selected
//! at runtime.

use crate::cli::StrategyType;
use crate::config::LedgerConfig;
use crate::core::Ledger;
use crate::io::csv_format::write_accounts_csv;
use crate::types::{LedgerCommand, LedgerError};
use std::io::Write;
use std::path::Path;
use tracing::{info, warn};

pub mod r#async;
pub mod sync;

pub use self::r#async::{AsyncProcessingStrategy, BatchConfig};
pub use sync::SyncProcessingStrategy;

/// Processing strategy trait for complete replay pipelines
pub trait ProcessingStrategy: Send + Sync {
    /// Replay commands from input file and write the final accounts to output
    ///
    /// # Returns
    ///
    /// * `Ok(())` if replay completed (rejected commands included)
    /// * `Err(String)` if a fatal error occurred
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The input file cannot be opened (file not found, permission denied)
    /// - Output cannot be written
    /// - An audit was requested and found a broken invariant
    ///
    /// Malformed rows and rejected commands are logged and skipped; they do
    /// not end the replay.
    fn process(&self, input_path: &Path, output: &mut dyn Write) -> Result<(), String>;
}

/// Options shared by every strategy
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ReplayOptions {
    pub ledger: LedgerConfig,
    /// Audit the ledger after replay; a failing audit is fatal
    pub audit: bool,
}

/// Counts reported at the end of a replay
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ReplaySummary {
    pub applied: usize,
    pub rejected: usize,
    pub skipped: usize,
}

/// Create a processing strategy based on the specified strategy type
///
/// `config` is ignored by the sync strategy.
pub fn create_strategy(
    strategy_type: StrategyType,
    config: Option<BatchConfig>,
    options: ReplayOptions,
) -> Box<dyn ProcessingStrategy> {
    match strategy_type {
        StrategyType::Sync => Box::new(SyncProcessingStrategy::new(options)),
        StrategyType::Async => {
            let config = config.unwrap_or_default();
            Box::new(AsyncProcessingStrategy::new(config, options))
        }
    }
}

/// Common tail of every strategy: optional audit, then the account table
fn finish(
    ledger: &Ledger,
    summary: ReplaySummary,
    audit: bool,
    output: &mut dyn Write,
) -> Result<(), String> {
    info!(
        applied = summary.applied,
        rejected = summary.rejected,
        skipped = summary.skipped,
        "replay finished"
    );

    if audit {
        let report = ledger.audit().map_err(|e| format!("Audit failed: {}", e))?;
        if !report.is_consistent() {
            return Err(format!(
                "Audit found {} violation(s), first: {}",
                report.violations.len(),
                report.violations[0]
            ));
        }
    }

    let accounts = ledger.accounts().map_err(|e| e.to_string())?;
    write_accounts_csv(&accounts, output)
}

/// Log a rejected command and count it
fn record_outcome<T>(
    summary: &mut ReplaySummary,
    command: &LedgerCommand,
    result: &Result<T, LedgerError>,
) {
    match result {
        Ok(_) => summary.applied += 1,
        Err(error) => {
            warn!(%error, ?command, "command rejected");
            summary.rejected += 1;
        }
    }
}
