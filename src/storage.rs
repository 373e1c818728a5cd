//! Record persistence.
//!
//! Records are appended to a CSV file one at a time and flushed
//! immediately, so an interrupted run keeps everything already extracted.

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

use crate::models::{BusinessRecord, COLUMNS};

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("failed to open {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write record: {0}")]
    Csv(#[from] csv::Error),
    #[error("failed to flush output: {0}")]
    Io(#[from] std::io::Error),
}

/// Destination for extracted records.
pub trait RecordSink {
    /// Persist one record. Must be durable before returning.
    fn write_record(&mut self, record: &BusinessRecord) -> Result<(), StorageError>;
}

/// In-memory sink, handy for dry runs and tests.
impl RecordSink for Vec<BusinessRecord> {
    fn write_record(&mut self, record: &BusinessRecord) -> Result<(), StorageError> {
        self.push(record.clone());
        Ok(())
    }
}

/// Append-mode CSV writer with a single header row.
pub struct CsvSink {
    writer: csv::Writer<File>,
    written: usize,
}

impl CsvSink {
    /// Open `path` for appending. The header is written only when the file
    /// does not exist yet or is empty.
    pub fn open(path: &Path) -> Result<Self, StorageError> {
        let needs_header = std::fs::metadata(path)
            .map(|meta| meta.len() == 0)
            .unwrap_or(true);

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|source| StorageError::Open {
                path: path.to_path_buf(),
                source,
            })?;

        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);

        if needs_header {
            debug!("Writing CSV header to {}", path.display());
            writer.write_record(COLUMNS)?;
            writer.flush()?;
        }

        Ok(Self {
            writer,
            written: 0,
        })
    }

    /// Records appended through this sink.
    pub fn written(&self) -> usize {
        self.written
    }
}

impl RecordSink for CsvSink {
    fn write_record(&mut self, record: &BusinessRecord) -> Result<(), StorageError> {
        self.writer.serialize(record)?;
        self.writer.flush()?;
        self.written += 1;
        Ok(())
    }
}
