//! Batch processing with account-based partitioning
//!
//! This module provides the `BatchProcessor` struct, which replays a batch of
//! ledger commands concurrently while producing the same balances as a
//! sequential replay.
//!
//! # Design
//!
//! A batch is cut into runs of consecutive transfers separated by account
//! openings. Openings assign ids, so they act as barriers and are applied in
//! file order. Within a run, transfers are grouped into connected components:
//! two transfers land in the same group when they share an account, directly
//! or through a chain of other transfers. Groups touch disjoint accounts, so
//! they run in parallel; each group runs its transfers in file order.
//!
//! ```text
//! open, t(1→2), t(3→4), t(2→5), open, t(4→6)
//! └┬─┘  └────────┬─────────────┘  └┬─┘  └─┬──┘
//! barrier   {t(1→2), t(2→5)}     barrier  run
//!           {t(3→4)}  (parallel)
//! ```
//!
//! # Thread Safety
//!
//! The processor is cloneable; clones share the same [`Ledger`]. Transfers
//! block on row locks, so groups run on tokio's blocking pool.

use std::collections::HashMap;

use super::ledger::Ledger;
use crate::types::{AccountId, LedgerCommand, LedgerError};
use tracing::error;

/// Result of replaying a single command
#[derive(Debug, Clone)]
pub struct ProcessingResult {
    /// The command that was replayed
    pub command: LedgerCommand,

    /// The id of an opened account, `None` for a transfer, or the rejection
    pub result: Result<Option<AccountId>, LedgerError>,
}

/// Batch processor with account-based partitioning
#[derive(Debug, Clone)]
pub struct BatchProcessor {
    ledger: Ledger,
}

impl BatchProcessor {
    pub fn new(ledger: Ledger) -> Self {
        Self { ledger }
    }

    /// Group commands into sets that share no account
    ///
    /// Groups are returned in order of their first command and keep the
    /// input order internally. Commands that touch no existing account each
    /// form their own group.
    pub fn partition_by_accounts(&self, commands: Vec<LedgerCommand>) -> Vec<Vec<LedgerCommand>> {
        let mut parent: HashMap<AccountId, AccountId> = HashMap::new();
        for (from, to) in commands.iter().filter_map(LedgerCommand::accounts) {
            let from_root = find(&mut parent, from);
            let to_root = find(&mut parent, to);
            if from_root != to_root {
                parent.insert(from_root, to_root);
            }
        }

        let mut groups: Vec<Vec<LedgerCommand>> = Vec::new();
        let mut group_of_root: HashMap<AccountId, usize> = HashMap::new();
        for command in commands {
            let Some((from, _)) = command.accounts() else {
                groups.push(vec![command]);
                continue;
            };
            let root = find(&mut parent, from);
            let index = *group_of_root.entry(root).or_insert_with(|| {
                groups.push(Vec::new());
                groups.len() - 1
            });
            groups[index].push(command);
        }

        groups
    }

    /// Replay one group of commands in order
    ///
    /// Every command is attempted; a rejection is recorded and the next
    /// command still runs.
    pub fn process_group(&self, commands: Vec<LedgerCommand>) -> Vec<ProcessingResult> {
        commands
            .into_iter()
            .map(|command| {
                let result = self.ledger.apply(&command);
                ProcessingResult { command, result }
            })
            .collect()
    }

    /// Replay a run of transfers, independent groups in parallel
    async fn process_run(&self, run: Vec<LedgerCommand>) -> Vec<ProcessingResult> {
        let mut tasks = Vec::new();
        for group in self.partition_by_accounts(run) {
            let processor = self.clone();
            tasks.push(tokio::task::spawn_blocking(move || {
                processor.process_group(group)
            }));
        }

        let mut results = Vec::new();
        for task in tasks {
            match task.await {
                Ok(group_results) => results.extend(group_results),
                Err(e) => error!(error = %e, "transfer group task failed"),
            }
        }
        results
    }

    /// Replay a batch of commands
    ///
    /// Account openings are applied in order between runs of transfers.
    /// Results of one run are grouped by partition, so their order can
    /// differ from the input.
    pub async fn process_batch(&self, batch: Vec<LedgerCommand>) -> Vec<ProcessingResult> {
        let mut results = Vec::with_capacity(batch.len());
        let mut run = Vec::new();

        for command in batch {
            if command.accounts().is_some() {
                run.push(command);
                continue;
            }
            if !run.is_empty() {
                results.extend(self.process_run(std::mem::take(&mut run)).await);
            }
            results.extend(self.process_group(vec![command]));
        }
        if !run.is_empty() {
            results.extend(self.process_run(run).await);
        }

        results
    }
}

/// Union-find root lookup with path compression
fn find(parent: &mut HashMap<AccountId, AccountId>, id: AccountId) -> AccountId {
    let mut root = *parent.entry(id).or_insert(id);
    while let Some(&next) = parent.get(&root) {
        if next == root {
            break;
        }
        root = next;
    }

    let mut node = id;
    while node != root {
        let next = parent[&node];
        parent.insert(node, root);
        node = next;
    }
    root
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AccountKind, Currency, TransferRequest};

    fn transfer(from: AccountId, to: AccountId, amount: i64) -> LedgerCommand {
        LedgerCommand::Transfer(TransferRequest::new(from, to, amount, Currency::Usd))
    }

    fn open(owner: &str, kind: AccountKind) -> LedgerCommand {
        LedgerCommand::open(owner, Currency::Usd, kind)
    }

    fn pairs(group: &[LedgerCommand]) -> Vec<(AccountId, AccountId)> {
        group.iter().filter_map(LedgerCommand::accounts).collect()
    }

    #[test]
    fn test_partition_empty_batch() {
        let processor = BatchProcessor::new(Ledger::default());
        assert!(processor.partition_by_accounts(vec![]).is_empty());
    }

    #[test]
    fn test_partition_disjoint_transfers() {
        let processor = BatchProcessor::new(Ledger::default());

        let groups = processor.partition_by_accounts(vec![
            transfer(1, 2, 10),
            transfer(3, 4, 20),
            transfer(5, 6, 30),
        ]);

        assert_eq!(groups.len(), 3);
        assert_eq!(pairs(&groups[0]), vec![(1, 2)]);
        assert_eq!(pairs(&groups[1]), vec![(3, 4)]);
        assert_eq!(pairs(&groups[2]), vec![(5, 6)]);
    }

    #[test]
    fn test_partition_follows_chains_of_shared_accounts() {
        let processor = BatchProcessor::new(Ledger::default());

        // 1-2 and 3-4 only join once 2-3 is seen
        let groups = processor.partition_by_accounts(vec![
            transfer(1, 2, 10),
            transfer(3, 4, 20),
            transfer(7, 8, 5),
            transfer(2, 3, 30),
            transfer(4, 1, 40),
        ]);

        assert_eq!(groups.len(), 2);
        assert_eq!(pairs(&groups[0]), vec![(1, 2), (3, 4), (2, 3), (4, 1)]);
        assert_eq!(pairs(&groups[1]), vec![(7, 8)]);
    }

    #[test]
    fn test_partition_keeps_every_command_once() {
        let processor = BatchProcessor::new(Ledger::default());
        let commands: Vec<LedgerCommand> = (1..=20)
            .map(|i| transfer(i % 7 + 1, (i * 3) % 11 + 20, i as i64))
            .collect();

        let groups = processor.partition_by_accounts(commands.clone());

        let mut flattened: Vec<LedgerCommand> = groups.into_iter().flatten().collect();
        assert_eq!(flattened.len(), commands.len());
        flattened.sort_by_key(|c| match c {
            LedgerCommand::Transfer(r) => r.amount,
            LedgerCommand::OpenAccount { .. } => 0,
        });
        assert_eq!(flattened, commands);
    }

    #[tokio::test]
    async fn test_process_batch_treats_openings_as_barriers() {
        let ledger = Ledger::default();
        let processor = BatchProcessor::new(ledger.clone());

        let results = processor
            .process_batch(vec![
                open("treasury", AccountKind::Issuer),
                open("alice", AccountKind::Customer),
                transfer(1, 2, 100),
                // Account 3 does not exist until the next opening
                transfer(2, 3, 10),
                open("bob", AccountKind::Customer),
                transfer(2, 3, 25),
            ])
            .await;

        assert_eq!(results.len(), 6);
        assert_eq!(
            results[3].result.clone().unwrap_err(),
            LedgerError::account_not_found(3)
        );
        assert_eq!(ledger.get_account(1).unwrap().balance, -100);
        assert_eq!(ledger.get_account(2).unwrap().balance, 75);
        assert_eq!(ledger.get_account(3).unwrap().balance, 25);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_process_batch_matches_sequential_replay() {
        let mut batch = vec![open("treasury", AccountKind::Issuer)];
        for i in 0..8 {
            batch.push(open(&format!("customer-{i}"), AccountKind::Customer));
        }
        for round in 0..25 {
            for i in 0..8u64 {
                let from = if round == 0 { 1 } else { 2 + i };
                let to = 2 + (i + 1 + round % 3) % 8;
                if from != to {
                    batch.push(transfer(from, to, 7 + round as i64));
                }
            }
        }

        let sequential = Ledger::default();
        for command in &batch {
            let _ = sequential.apply(command);
        }

        let concurrent = Ledger::default();
        let results = BatchProcessor::new(concurrent.clone())
            .process_batch(batch.clone())
            .await;

        assert_eq!(results.len(), batch.len());
        let balances = |ledger: &Ledger| -> Vec<i64> {
            ledger.accounts().unwrap().iter().map(|a| a.balance).collect()
        };
        assert_eq!(balances(&concurrent), balances(&sequential));
        assert!(concurrent.audit().unwrap().is_consistent());
    }

    #[tokio::test]
    async fn test_rejected_command_does_not_stop_group() {
        let ledger = Ledger::default();
        ledger.create_issuer_account("treasury", "USD").unwrap();
        ledger.create_account("alice", "USD").unwrap();
        let processor = BatchProcessor::new(ledger.clone());

        let results = processor
            .process_batch(vec![transfer(2, 1, 5), transfer(1, 2, 5), transfer(2, 2, 1)])
            .await;

        assert!(matches!(
            results[0].result,
            Err(LedgerError::InsufficientFunds { .. })
        ));
        assert_eq!(results[1].result, Ok(None));
        assert_eq!(results[2].result, Err(LedgerError::invalid_transfer(2)));
        assert_eq!(ledger.get_account(2).unwrap().balance, 5);
    }
}
