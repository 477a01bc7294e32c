//! Rust Ledger Engine CLI
//!
//! Replays ledger commands from a CSV file and prints the final accounts.
//!
//! # Usage
//!
//! ```bash
//! cargo run -- commands.csv > accounts.csv
//! cargo run -- --strategy sync commands.csv > accounts.csv
//! cargo run -- --strategy async --batch-size 2000 --max-concurrent 8 commands.csv > accounts.csv
//! cargo run -- --audit --max-attempts 5 --lock-timeout-ms 100 commands.csv > accounts.csv
//! ```
//!
//! Diagnostics go to stderr; set `RUST_LOG=debug` to see every commit.
//!
//! # Exit Codes
//!
//! - 0: Success
//! - 1: Error (missing arguments, file not found, failed audit, etc.)

use rust_ledger_engine::cli;
use rust_ledger_engine::observability;
use rust_ledger_engine::strategy::{self, ReplayOptions};
use std::process;
use tracing::error;

fn main() {
    observability::init();
    let args = cli::parse_args();

    let strategy = {
        let config = if matches!(args.strategy, cli::StrategyType::Async) {
            Some(args.to_batch_config())
        } else {
            None
        };
        let options = ReplayOptions {
            ledger: args.to_ledger_config(),
            audit: args.audit,
        };
        strategy::create_strategy(args.strategy, config, options)
    };

    let mut output = std::io::stdout();
    if let Err(e) = strategy.process(&args.input_file, &mut output) {
        error!("{}", e);
        process::exit(1);
    }
}
