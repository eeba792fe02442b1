//! Durable CSV sink
//!
//! Appends every record of a session to a CSV file, in arrival order, exactly
//! once. The header row is written when the file is created and, under the
//! default [`FlushPolicy::Sync`], each row reaches stable storage before
//! [`CsvSink::append`] returns, so an abrupt exit or power loss loses at most
//! the record being written.

use crate::error::{LoggerError, Result};
use crate::types::{ParsedRecord, ParserMode};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// How hard each appended row is pushed towards the disk
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum FlushPolicy {
    /// Hand each row to the OS (survives a process crash)
    Flush,
    /// Also `sync_data` after each row (survives power loss)
    #[default]
    Sync,
}

/// Exclusive writer of a session's log file
pub struct CsvSink {
    writer: csv::Writer<BufWriter<File>>,
    path: PathBuf,
    mode: ParserMode,
    policy: FlushPolicy,
    rows_written: u64,
}

impl std::fmt::Debug for CsvSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CsvSink")
            .field("path", &self.path)
            .field("mode", &self.mode)
            .field("rows_written", &self.rows_written)
            .finish()
    }
}

impl CsvSink {
    /// Create (or truncate) the log file and write the header row
    pub fn create(path: impl AsRef<Path>, mode: ParserMode, policy: FlushPolicy) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::create(&path).map_err(|e| {
            LoggerError::Config(format!("Failed to create log file {:?}: {}", path, e))
        })?;

        let writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(BufWriter::new(file));

        let mut sink = Self {
            writer,
            path,
            mode,
            policy,
            rows_written: 0,
        };
        sink.write_row(mode.columns().iter().copied())
            .map_err(|e| e.with_context("Writing log header"))?;

        tracing::info!("Opened log file {:?} ({} mode)", sink.path, mode);
        Ok(sink)
    }

    /// Append one record as a row and flush it
    pub fn append(&mut self, record: &ParsedRecord) -> Result<()> {
        if record.log_fields.len() != self.mode.columns().len() {
            tracing::warn!(
                "Record has {} fields, log layout has {} columns",
                record.log_fields.len(),
                self.mode.columns().len()
            );
        }
        self.write_row(record.row())?;
        self.rows_written += 1;
        Ok(())
    }

    /// Flush, sync and close the file, returning the number of data rows written
    pub fn close(mut self) -> Result<u64> {
        self.writer.flush().map_err(|e| self.persistence(e))?;
        self.writer
            .get_ref()
            .get_ref()
            .sync_all()
            .map_err(|e| self.persistence(e))?;
        tracing::info!(
            "Closed log file {:?} after {} rows",
            self.path,
            self.rows_written
        );
        Ok(self.rows_written)
    }

    /// Data rows written so far (header excluded)
    pub fn rows_written(&self) -> u64 {
        self.rows_written
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn mode(&self) -> ParserMode {
        self.mode
    }

    fn write_row<'a>(&mut self, fields: impl IntoIterator<Item = &'a str>) -> Result<()> {
        self.writer
            .write_record(fields)
            .map_err(|e| self.persistence(e.into()))?;
        self.writer.flush().map_err(|e| self.persistence(e))?;
        if self.policy == FlushPolicy::Sync {
            self.writer
                .get_ref()
                .get_ref()
                .sync_data()
                .map_err(|e| self.persistence(e))?;
        }
        Ok(())
    }

    fn persistence(&self, source: std::io::Error) -> LoggerError {
        LoggerError::Persistence {
            path: self.path.clone(),
            source,
        }
    }
}
