//! Record sink trait and output errors
//!
//! A sink receives normalized records one at a time from the aggregator and
//! persists them. Only the aggregator task writes to a sink, so sinks need
//! no internal locking of their own.

use crate::normalize::NormalizedRecord;
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors that can occur during output operations
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("Failed to write output: {0}")]
    Write(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// Destination for normalized records
pub trait RecordSink: Send {
    /// Appends one record
    ///
    /// # Arguments
    ///
    /// * `record` - The record to persist, columns in schema order
    fn write(&mut self, record: &NormalizedRecord) -> OutputResult<()>;

    /// Flushes everything written so far
    ///
    /// Called exactly once at the end of a run, including failed and
    /// interrupted runs, so partial output is kept.
    fn finish(&mut self) -> OutputResult<()>;
}

/// Sink keeping records in memory
///
/// Clones share the same buffer, so a handle kept by the caller sees what
/// the run wrote.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    records: Arc<Mutex<Vec<NormalizedRecord>>>,
    finished: Arc<Mutex<bool>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the records written so far
    pub fn records(&self) -> Vec<NormalizedRecord> {
        self.records
            .lock()
            .map(|records| records.clone())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.records.lock().map(|r| r.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_finished(&self) -> bool {
        self.finished.lock().map(|f| *f).unwrap_or(false)
    }
}

impl RecordSink for MemorySink {
    fn write(&mut self, record: &NormalizedRecord) -> OutputResult<()> {
        self.records
            .lock()
            .map_err(|_| OutputError::Write("record buffer poisoned".to_string()))?
            .push(record.clone());
        Ok(())
    }

    fn finish(&mut self) -> OutputResult<()> {
        *self
            .finished
            .lock()
            .map_err(|_| OutputError::Write("record buffer poisoned".to_string()))? = true;
        Ok(())
    }
}
