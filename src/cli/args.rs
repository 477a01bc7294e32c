use crate::config::LedgerConfig;
use crate::strategy::BatchConfig;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use std::time::Duration;

/// Replay ledger commands and print the resulting accounts
#[derive(Parser, Debug)]
#[command(name = "ledger-engine")]
#[command(about = "Replay account and transfer commands through the ledger", long_about = None)]
pub struct CliArgs {
    /// Input CSV file path containing ledger commands
    #[arg(value_name = "INPUT", help = "Path to the input CSV file")]
    pub input_file: PathBuf,

    /// Processing strategy to use for replaying commands
    #[arg(
        long = "strategy",
        value_name = "STRATEGY",
        default_value = "async",
        help = "Processing strategy: 'sync' for sequential or 'async' for batched parallel replay"
    )]
    pub strategy: StrategyType,

    /// Number of commands per batch (async mode only)
    #[arg(
        long = "batch-size",
        value_name = "SIZE",
        help = "Number of commands per batch (default: 1000)"
    )]
    pub batch_size: Option<usize>,

    /// Worker threads for the async runtime (async mode only)
    #[arg(
        long = "max-concurrent",
        value_name = "COUNT",
        help = "Maximum number of transfer groups processing concurrently (default: CPU cores)"
    )]
    pub max_concurrent_batches: Option<usize>,

    /// Attempts a transfer gets when its accounts are contended
    #[arg(
        long = "max-attempts",
        value_name = "COUNT",
        help = "Attempts per transfer before a lock conflict is reported (default: 3)"
    )]
    pub max_attempts: Option<u32>,

    /// How long a transfer waits for an account lock, in milliseconds
    #[arg(
        long = "lock-timeout-ms",
        value_name = "MILLIS",
        help = "Account lock wait before an attempt conflicts (default: 250)"
    )]
    pub lock_timeout_ms: Option<u64>,

    /// Audit the ledger after replay and fail if any invariant is broken
    #[arg(long = "audit")]
    pub audit: bool,
}

/// Available processing strategies
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum StrategyType {
    Sync,
    Async,
}

impl CliArgs {
    /// Create a BatchConfig from CLI arguments, falling back to defaults
    pub fn to_batch_config(&self) -> BatchConfig {
        if self.batch_size.is_some() || self.max_concurrent_batches.is_some() {
            let default = BatchConfig::default();
            BatchConfig::new(
                self.batch_size.unwrap_or(default.batch_size),
                self.max_concurrent_batches
                    .unwrap_or(default.max_concurrent_batches),
            )
        } else {
            BatchConfig::default()
        }
    }

    /// Create a LedgerConfig from CLI arguments, falling back to defaults
    pub fn to_ledger_config(&self) -> LedgerConfig {
        if self.max_attempts.is_some() || self.lock_timeout_ms.is_some() {
            let default = LedgerConfig::default();
            LedgerConfig::new(
                self.max_attempts.unwrap_or(default.max_attempts),
                self.lock_timeout_ms
                    .map(Duration::from_millis)
                    .unwrap_or(default.lock_timeout),
            )
        } else {
            LedgerConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::default_strategy(&["program", "input.csv"], StrategyType::Async)]
    #[case::explicit_sync(&["program", "--strategy", "sync", "input.csv"], StrategyType::Sync)]
    #[case::explicit_async(&["program", "--strategy", "async", "input.csv"], StrategyType::Async)]
    fn test_strategy_parsing(#[case] args: &[&str], #[case] expected: StrategyType) {
        let parsed = CliArgs::try_parse_from(args).unwrap();
        assert_eq!(parsed.strategy, expected);
    }

    #[rstest]
    #[case::all_defaults(&["program", "input.csv"], 1000, num_cpus::get())]
    #[case::custom_batch_size(&["program", "--batch-size", "2000", "input.csv"], 2000, num_cpus::get())]
    #[case::custom_max_concurrent(&["program", "--max-concurrent", "8", "input.csv"], 1000, 8)]
    #[case::zero_batch_size(&["program", "--batch-size", "0", "input.csv"], 1000, num_cpus::get())]
    #[case::zero_max_concurrent(&["program", "--max-concurrent", "0", "input.csv"], 1000, num_cpus::get())]
    fn test_batch_config_conversion(
        #[case] args: &[&str],
        #[case] expected_batch_size: usize,
        #[case] expected_max_concurrent: usize,
    ) {
        let config = CliArgs::try_parse_from(args).unwrap().to_batch_config();

        assert_eq!(config.batch_size, expected_batch_size);
        assert_eq!(config.max_concurrent_batches, expected_max_concurrent);
    }

    #[rstest]
    #[case::all_defaults(&["program", "input.csv"], 3, 250)]
    #[case::custom_attempts(&["program", "--max-attempts", "7", "input.csv"], 7, 250)]
    #[case::custom_timeout(&["program", "--lock-timeout-ms", "40", "input.csv"], 3, 40)]
    #[case::zero_values(
        &["program", "--max-attempts", "0", "--lock-timeout-ms", "0", "input.csv"],
        3,
        250
    )]
    fn test_ledger_config_conversion(
        #[case] args: &[&str],
        #[case] expected_attempts: u32,
        #[case] expected_timeout_ms: u64,
    ) {
        let config = CliArgs::try_parse_from(args).unwrap().to_ledger_config();

        assert_eq!(config.max_attempts, expected_attempts);
        assert_eq!(config.lock_timeout, Duration::from_millis(expected_timeout_ms));
    }

    #[rstest]
    #[case::absent(&["program", "input.csv"], false)]
    #[case::present(&["program", "--audit", "input.csv"], true)]
    fn test_audit_flag(#[case] args: &[&str], #[case] expected: bool) {
        assert_eq!(CliArgs::try_parse_from(args).unwrap().audit, expected);
    }

    #[rstest]
    #[case::missing_input(&["program"])]
    #[case::invalid_strategy(&["program", "--strategy", "invalid", "input.csv"])]
    #[case::negative_attempts(&["program", "--max-attempts", "-1", "input.csv"])]
    fn test_parsing_errors(#[case] args: &[&str]) {
        assert!(CliArgs::try_parse_from(args).is_err());
    }
}
