//! Synchronous processing strategy
//!
//! Replays commands one at a time on the calling thread. It orchestrates the
//! flow between the `SyncReader` (CSV input), the [`Ledger`] (business
//! logic) and `csv_format::write_accounts_csv` (output).
//!
//! Records are streamed, so memory grows with the ledger's contents and not
//! with the size of the input file.

use super::{finish, record_outcome, ProcessingStrategy, ReplayOptions, ReplaySummary};
use crate::core::Ledger;
use crate::io::sync_reader::SyncReader;
use std::io::Write;
use std::path::Path;
use tracing::warn;

/// Synchronous processing strategy
///
/// # Examples
///
/// ```no_run
/// use rust_ledger_engine::strategy::{ProcessingStrategy, ReplayOptions, SyncProcessingStrategy};
/// use std::path::Path;
/// use std::io;
///
/// let strategy = SyncProcessingStrategy::new(ReplayOptions::default());
/// let mut output = io::stdout();
///
/// strategy.process(Path::new("commands.csv"), &mut output)
///     .expect("Processing failed");
/// ```
#[derive(Debug, Clone, Default)]
pub struct SyncProcessingStrategy {
    options: ReplayOptions,
}

impl SyncProcessingStrategy {
    pub fn new(options: ReplayOptions) -> Self {
        Self { options }
    }
}

impl ProcessingStrategy for SyncProcessingStrategy {
    fn process(&self, input_path: &Path, output: &mut dyn Write) -> Result<(), String> {
        let ledger = Ledger::new(self.options.ledger.clone());
        let reader = SyncReader::new(input_path).map_err(|e| e.to_string())?;
        let mut summary = ReplaySummary::default();

        for result in reader {
            match result {
                Ok(command) => {
                    let outcome = ledger.apply(&command);
                    record_outcome(&mut summary, &command, &outcome);
                }
                Err(error) => {
                    warn!(%error, "skipping record");
                    summary.skipped += 1;
                }
            }
        }

        finish(&ledger, summary, self.options.audit, output)
    }
}
