//! CSV record sink
//!
//! Writes the 36-column header once, then one row per record in schema
//! order. Unknown values are written as empty cells.

use crate::normalize::{Field, NormalizedRecord};
use crate::output::traits::{OutputResult, RecordSink};
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Sink writing records as CSV rows
pub struct CsvSink<W: Write> {
    writer: csv::Writer<W>,
    rows: u64,
}

impl CsvSink<File> {
    /// Creates (or truncates) the CSV file at `path` and writes the header
    ///
    /// # Arguments
    ///
    /// * `path` - Output file; parent directories are created as needed
    ///
    /// # Returns
    ///
    /// * `Ok(CsvSink)` - Sink ready for rows
    /// * `Err(OutputError)` - The file could not be created
    pub fn create(path: &Path) -> OutputResult<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let file = File::create(path)?;
        tracing::debug!("Writing CSV output to {}", path.display());
        Self::from_writer(file)
    }
}

impl<W: Write> CsvSink<W> {
    /// Wraps any writer and writes the header
    pub fn from_writer(inner: W) -> OutputResult<Self> {
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(inner);
        writer.write_record(Field::header())?;
        Ok(Self { writer, rows: 0 })
    }

    /// Number of data rows written
    pub fn rows(&self) -> u64 {
        self.rows
    }

    /// Flushes and returns the underlying writer
    pub fn into_inner(self) -> OutputResult<W> {
        self.writer
            .into_inner()
            .map_err(|e| crate::output::OutputError::Io(e.into_error()))
    }
}

impl<W: Write + Send> RecordSink for CsvSink<W> {
    fn write(&mut self, record: &NormalizedRecord) -> OutputResult<()> {
        self.writer.write_record(record.to_row())?;
        self.rows += 1;
        Ok(())
    }

    fn finish(&mut self) -> OutputResult<()> {
        self.writer.flush()?;
        tracing::debug!("CSV output flushed ({} rows)", self.rows);
        Ok(())
    }
}
