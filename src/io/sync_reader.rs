//! Synchronous CSV reader with iterator interface
//!
//! Provides a streaming iterator over ledger commands from a CSV file.
//! Delegates CSV format concerns to the csv_format module.
//!
//! # Iterator Interface
//!
//! SyncReader implements the Iterator trait, yielding
//! `Result<LedgerCommand, LedgerError>` for each CSV row:
//!
//! ```no_run
//! use rust_ledger_engine::io::sync_reader::SyncReader;
//! use std::path::Path;
//!
//! let reader = SyncReader::new(Path::new("commands.csv")).unwrap();
//! for result in reader {
//!     match result {
//!         Ok(command) => println!("Replaying: {:?}", command),
//!         Err(e) => eprintln!("Error: {}", e),
//!     }
//! }
//! ```
//!
//! # Error Handling
//!
//! - Fatal errors (file not found, I/O errors) are returned from `new()`
//! - Individual record errors are yielded as `LedgerError::ParseError` with
//!   the line number, and iteration continues with the next row
//!
//! Records are read one at a time; the file is never loaded whole.

use crate::io::csv_format::{convert_csv_record, CsvRecord};
use crate::io::open_error;
use crate::types::{LedgerCommand, LedgerError};
use csv::{ReaderBuilder, Trim};
use std::fs::File;
use std::path::Path;

/// Synchronous CSV reader
#[derive(Debug)]
pub struct SyncReader {
    reader: csv::Reader<File>,
    line_num: u64,
}

impl SyncReader {
    /// Create a new SyncReader from a file path
    ///
    /// The CSV reader trims whitespace from all fields and accepts short
    /// rows, since openings and transfers leave different columns empty.
    ///
    /// # Returns
    ///
    /// * `Ok(SyncReader)` - The file is open and positioned after the header
    /// * `Err(LedgerError::FileNotFound)` - Nothing exists at `path`
    /// * `Err(LedgerError::IoError)` - The file exists but could not be opened
    pub fn new(path: &Path) -> Result<Self, LedgerError> {
        let file = File::open(path).map_err(|e| open_error(path, e))?;

        let reader = ReaderBuilder::new()
            .trim(Trim::All)
            .flexible(true)
            .buffer_capacity(8 * 1024)
            .from_reader(file);

        Ok(Self {
            reader,
            line_num: 1,
        })
    }
}

impl Iterator for SyncReader {
    type Item = Result<LedgerCommand, LedgerError>;

    fn next(&mut self) -> Option<Self::Item> {
        let mut deserializer = self.reader.deserialize::<CsvRecord>();
        let next = deserializer.next()?;
        self.line_num += 1;

        Some(match next {
            Ok(csv_record) => {
                convert_csv_record(csv_record).map_err(|message| LedgerError::ParseError {
                    line: Some(self.line_num),
                    message,
                })
            }
            Err(e) => Err(LedgerError::from(e)),
        })
    }
}
