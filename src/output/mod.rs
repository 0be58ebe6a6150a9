//! Output module for persisting records and reporting on a run
//!
//! This module handles:
//! - The [`RecordSink`] seam the aggregator writes through
//! - CSV output with a fixed 36-column header
//! - An in-memory sink for embedding and tests
//! - End-of-run statistics

mod csv_output;
pub mod stats;
mod traits;

pub use csv_output::CsvSink;
pub use stats::{print_report, render_report};
pub use traits::{MemorySink, OutputError, OutputResult, RecordSink};
