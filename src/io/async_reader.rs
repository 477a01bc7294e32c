//! Asynchronous CSV reader with batch interface
//!
//! Provides a streaming interface over ledger commands from a CSV file.
//! Supports batch reading for the batch processor.
//!
//! # Architecture
//!
//! ```text
//! CSV Reader → AsyncReader → Batches of LedgerCommands
//!                  ↓
//!           csv_format module
//!           (CsvRecord, convert_csv_record)
//! ```
//!
//! Rows that fail to parse are logged and skipped; they never end a batch
//! early.

use crate::io::csv_format::{convert_csv_record, CsvRecord};
use crate::types::{LedgerCommand, LedgerError};
use csv_async::AsyncReaderBuilder;
use futures::io::AsyncRead;
use futures::stream::StreamExt;
use tracing::warn;

/// Asynchronous CSV reader
pub struct AsyncReader<R: AsyncRead + Unpin> {
    csv_reader: csv_async::AsyncDeserializer<R>,
    line_num: u64,
    skipped: usize,
}

impl<R: AsyncRead + Unpin + Send + 'static> AsyncReader<R> {
    pub fn new(reader: R) -> Self {
        let csv_reader = AsyncReaderBuilder::new()
            .flexible(true)
            .trim(csv_async::Trim::All)
            .create_deserializer(reader);

        Self {
            csv_reader,
            line_num: 1,
            skipped: 0,
        }
    }

    /// Read up to `batch_size` commands
    ///
    /// Returns an empty vector once the end of the file is reached.
    pub async fn read_batch(&mut self, batch_size: usize) -> Vec<LedgerCommand> {
        let mut batch = Vec::with_capacity(batch_size);
        let mut records = self.csv_reader.deserialize::<CsvRecord>();

        while batch.len() < batch_size {
            let Some(next) = records.next().await else {
                break;
            };
            self.line_num += 1;

            let converted = next
                .map_err(|e| e.to_string())
                .and_then(convert_csv_record);
            match converted {
                Ok(command) => batch.push(command),
                Err(message) => {
                    let error = LedgerError::ParseError {
                        line: Some(self.line_num),
                        message,
                    };
                    warn!(%error, "skipping record");
                    self.skipped += 1;
                }
            }
        }

        batch
    }

    /// Number of rows skipped so far because they could not be parsed
    pub fn skipped(&self) -> usize {
        self.skipped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AccountKind, Currency, TransferRequest};
    use futures::io::Cursor;

    fn reader(rows: &str) -> AsyncReader<Cursor<Vec<u8>>> {
        let csv_content = format!("type,owner,currency,from,to,amount\n{}", rows);
        AsyncReader::new(Cursor::new(csv_content.into_bytes()))
    }

    fn transfer(from: u64, to: u64, amount: i64) -> LedgerCommand {
        LedgerCommand::Transfer(TransferRequest::new(from, to, amount, Currency::Usd))
    }

    #[tokio::test]
    async fn test_async_reader_read_batch() {
        let mut async_reader = reader(
            "issuer,treasury,USD,,,\n\
             open,alice,USD,,,\n\
             transfer,,USD,1,2,100\n",
        );

        let batch = async_reader.read_batch(2).await;
        assert_eq!(
            batch,
            vec![
                LedgerCommand::open("treasury", Currency::Usd, AccountKind::Issuer),
                LedgerCommand::open("alice", Currency::Usd, AccountKind::Customer),
            ]
        );

        let batch = async_reader.read_batch(2).await;
        assert_eq!(batch, vec![transfer(1, 2, 100)]);

        assert!(async_reader.read_batch(2).await.is_empty());
    }

    #[tokio::test]
    async fn test_async_reader_empty_csv() {
        let mut async_reader = reader("");

        assert!(async_reader.read_batch(10).await.is_empty());
    }

    #[tokio::test]
    async fn test_async_reader_skips_invalid_records() {
        let mut async_reader = reader(
            "refund,,USD,1,2,5\n\
             transfer,,USD,1,2,5\n\
             transfer,,GBP,1,2,5\n\
             transfer,,USD,x,2,5\n\
             transfer,,USD,2,1,6\n",
        );

        let batch = async_reader.read_batch(10).await;

        assert_eq!(batch, vec![transfer(1, 2, 5), transfer(2, 1, 6)]);
        assert_eq!(async_reader.skipped(), 3);
    }

    #[tokio::test]
    async fn test_async_reader_multiple_batches() {
        let rows: String = (1..=5)
            .map(|amount| format!("transfer,,USD,1,2,{}\n", amount))
            .collect();
        let mut async_reader = reader(&rows);

        let batch1 = async_reader.read_batch(2).await;
        assert_eq!(batch1, vec![transfer(1, 2, 1), transfer(1, 2, 2)]);

        let batch2 = async_reader.read_batch(2).await;
        assert_eq!(batch2, vec![transfer(1, 2, 3), transfer(1, 2, 4)]);

        let batch3 = async_reader.read_batch(2).await;
        assert_eq!(batch3, vec![transfer(1, 2, 5)]);

        assert!(async_reader.read_batch(2).await.is_empty());
    }

    #[tokio::test]
    async fn test_async_reader_whitespace_and_case() {
        let mut async_reader = reader("  OPEN  ,  dave  ,  BRL  ,,,\n");

        let batch = async_reader.read_batch(10).await;

        assert_eq!(
            batch,
            vec![LedgerCommand::open("dave", Currency::Brl, AccountKind::Customer)]
        );
    }
}
