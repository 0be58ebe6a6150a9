//! End-of-run statistics
//!
//! Renders a [`RunReport`] for the terminal so that even a failed run
//! states how much of it succeeded.

use crate::crawler::RunReport;
use std::fmt::Write;

/// Renders the run report as plain text
///
/// # Arguments
///
/// * `report` - The report returned by the coordinator
///
/// # Returns
///
/// The multi-line statistics block, without a trailing newline
pub fn render_report(report: &RunReport) -> String {
    let counters = &report.counters;
    let mut out = String::new();

    let _ = writeln!(out, "=== Scrape Statistics ===");
    let _ = writeln!(out);

    let _ = writeln!(out, "Search pages:");
    let _ = writeln!(out, "  Fetched: {}", counters.pages_fetched);
    if counters.pages_skipped > 0 {
        let _ = writeln!(out, "  Skipped: {}", counters.pages_skipped);
    }
    let _ = writeln!(
        out,
        "  Stopped: {}",
        report
            .exhaust_reason
            .map(|r| r.to_string())
            .unwrap_or_else(|| "unknown".to_string())
    );
    let _ = writeln!(out);

    let _ = writeln!(out, "Listings:");
    let _ = writeln!(out, "  Found: {}", counters.summaries_found);
    let _ = writeln!(out, "  Repeated on later pages: {}", counters.duplicate_summaries);
    let _ = writeln!(out, "  Details fetched: {}", counters.details_fetched);
    let _ = writeln!(out, "  Details failed: {}", counters.details_failed);
    if counters.details_cancelled > 0 {
        let _ = writeln!(out, "  Details cancelled: {}", counters.details_cancelled);
    }
    let _ = writeln!(out, "  Duplicates dropped: {}", counters.duplicate_records);
    let _ = writeln!(out, "  Records written: {}", counters.records_written);
    let _ = writeln!(out);

    let _ = write!(out, "Elapsed: {:.1}s", report.elapsed.as_secs_f64());

    if report.cancelled {
        let _ = write!(out, "\n\nRun interrupted; output contains the records written so far");
    }
    if let Some(failure) = &report.failure {
        let _ = write!(out, "\n\nRun failed: {}", failure);
    }

    out
}

/// Prints the run report to stdout
pub fn print_report(report: &RunReport) {
    println!("\n{}\n", render_report(report));
}
