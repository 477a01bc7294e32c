//! Asynchronous batch processing strategy
//!
//! Replays commands in batches on a tokio multi-threaded runtime.
//!
//! # Architecture
//!
//! ```text
//! AsyncProcessingStrategy
//!     ├── BatchConfig (batch_size, max_concurrent_batches)
//!     ├── AsyncReader (batch CSV reading)
//!     ├── BatchProcessor (account partitioning + parallel groups)
//!     └── Ledger (thread-safe account, entry and transfer state)
//! ```
//!
//! Batches are processed one after another. Within a batch, transfers that
//! share no account run in parallel and account openings act as barriers,
//! so the final balances match the sync strategy exactly.

use super::{finish, record_outcome, ProcessingStrategy, ReplayOptions, ReplaySummary};
use crate::core::{BatchProcessor, Ledger};
use crate::io::async_reader::AsyncReader;
use crate::io::open_error;
use std::io::Write;
use std::path::Path;
use tracing::warn;

/// Configuration for batch processing
#[derive(Clone, Debug)]
pub struct BatchConfig {
    /// Number of commands per batch
    pub batch_size: usize,
    /// Worker threads available to the runtime
    pub max_concurrent_batches: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            batch_size: 1000,
            max_concurrent_batches: num_cpus::get(),
        }
    }
}

impl BatchConfig {
    /// Create a new BatchConfig with custom values
    ///
    /// Zero values fall back to the defaults.
    pub fn new(batch_size: usize, max_concurrent_batches: usize) -> Self {
        let default = Self::default();

        let batch_size = if batch_size == 0 {
            warn!(
                batch_size,
                fallback = default.batch_size,
                "Invalid batch_size, using default"
            );
            default.batch_size
        } else {
            batch_size
        };

        let max_concurrent_batches = if max_concurrent_batches == 0 {
            warn!(
                max_concurrent_batches,
                fallback = default.max_concurrent_batches,
                "Invalid max_concurrent_batches, using default"
            );
            default.max_concurrent_batches
        } else {
            max_concurrent_batches
        };

        Self {
            batch_size,
            max_concurrent_batches,
        }
    }
}

/// Asynchronous batch processing strategy
#[derive(Debug, Clone)]
pub struct AsyncProcessingStrategy {
    config: BatchConfig,
    options: ReplayOptions,
}

impl AsyncProcessingStrategy {
    pub fn new(config: BatchConfig, options: ReplayOptions) -> Self {
        Self { config, options }
    }
}

impl ProcessingStrategy for AsyncProcessingStrategy {
    fn process(&self, input_path: &Path, output: &mut dyn Write) -> Result<(), String> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(self.config.max_concurrent_batches)
            .max_blocking_threads(self.config.max_concurrent_batches)
            .build()
            .map_err(|e| format!("Failed to create tokio runtime: {}", e))?;

        runtime.block_on(async {
            let ledger = Ledger::new(self.options.ledger.clone());
            let processor = BatchProcessor::new(ledger.clone());

            let file = tokio::fs::File::open(input_path)
                .await
                .map_err(|e| open_error(input_path, e).to_string())?;

            // Wrap tokio file in a compatibility layer for csv-async
            let compat_file = tokio_util::compat::TokioAsyncReadCompatExt::compat(file);
            let mut reader = AsyncReader::new(compat_file);
            let mut summary = ReplaySummary::default();

            // A batch must finish before the next is read so that commands
            // spanning batches keep their file order
            loop {
                let batch = reader.read_batch(self.config.batch_size).await;
                if batch.is_empty() {
                    break;
                }

                for processed in processor.process_batch(batch).await {
                    record_outcome(&mut summary, &processed.command, &processed.result);
                }
            }
            summary.skipped = reader.skipped();

            finish(&ledger, summary, self.options.audit, output)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategy::SyncProcessingStrategy;
    use std::io::Write;
    use tempfile::NamedTempFile;

    /// Helper function to create a temporary CSV file for testing
    fn create_temp_csv(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().expect("Failed to create temp file");
        file.write_all(content.as_bytes())
            .expect("Failed to write to temp file");
        file.flush().expect("Failed to flush temp file");
        file
    }

    fn run(strategy: &dyn ProcessingStrategy, file: &NamedTempFile) -> String {
        let mut output = Vec::new();
        strategy.process(file.path(), &mut output).unwrap();
        String::from_utf8(output).unwrap()
    }

    #[test]
    fn test_async_strategy_replays_commands() {
        let file = create_temp_csv(
            "type,owner,currency,from,to,amount\n\
             issuer,treasury,USD,,,\n\
             open,alice,USD,,,\n\
             transfer,,USD,1,2,100\n",
        );
        let strategy = AsyncProcessingStrategy::new(BatchConfig::default(), ReplayOptions::default());

        assert_eq!(
            run(&strategy, &file),
            "id,owner,currency,balance\n1,treasury,USD,-100\n2,alice,USD,100\n"
        );
    }

    #[test]
    fn test_async_strategy_handles_missing_file() {
        let strategy = AsyncProcessingStrategy::new(BatchConfig::default(), ReplayOptions::default());
        let mut output = Vec::new();

        let result = strategy.process(Path::new("nonexistent.csv"), &mut output);

        assert_eq!(result.unwrap_err(), "File not found: nonexistent.csv");
    }

    #[test]
    fn test_async_strategy_matches_sync_across_batches() {
        let mut content = String::from(
            "type,owner,currency,from,to,amount\n\
             issuer,treasury,USD,,,\n",
        );
        for i in 0..6 {
            content.push_str(&format!("open,customer-{},USD,,,\n", i));
        }
        for round in 1..=10 {
            content.push_str(&format!("transfer,,USD,1,{},{}\n", 2 + round % 6, round * 3));
            content.push_str(&format!("transfer,,USD,{},{},{}\n", 2 + round % 6, 2 + (round + 1) % 6, round * 2));
            content.push_str(&format!("transfer,,USD,{},{},{}\n", 2 + (round + 3) % 6, 2 + (round + 4) % 6, round));
        }
        let file = create_temp_csv(&content);

        // A small batch size forces ordering to hold across batch boundaries
        let strategy = AsyncProcessingStrategy::new(BatchConfig::new(4, 4), ReplayOptions::default());
        let sync = SyncProcessingStrategy::default();

        assert_eq!(run(&strategy, &file), run(&sync, &file));
    }

    #[test]
    fn test_async_strategy_with_audit() {
        let file = create_temp_csv(
            "type,owner,currency,from,to,amount\n\
             issuer,bank,BDT,,,\n\
             open,erin,BDT,,,\n\
             open,frank,BDT,,,\n\
             transfer,,BDT,1,2,50\n\
             transfer,,BDT,1,3,50\n\
             transfer,,BDT,2,3,25\n",
        );
        let options = ReplayOptions {
            audit: true,
            ..ReplayOptions::default()
        };
        let strategy = AsyncProcessingStrategy::new(BatchConfig::new(2, 2), options);

        assert!(run(&strategy, &file).ends_with("2,erin,BDT,25\n3,frank,BDT,75\n"));
    }
}
