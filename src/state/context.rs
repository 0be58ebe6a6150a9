use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;

/// Per-run progress counters
///
/// Updated from the paginator, the enrichment workers and the aggregator;
/// every counter is an independent atomic so no lock is held across awaits.
#[derive(Debug, Default)]
pub struct RunCounters {
    pages_fetched: AtomicU64,
    pages_skipped: AtomicU64,
    summaries_found: AtomicU64,
    duplicate_summaries: AtomicU64,
    details_fetched: AtomicU64,
    details_failed: AtomicU64,
    details_cancelled: AtomicU64,
    details_in_flight: AtomicU64,
    peak_details_in_flight: AtomicU64,
    records_written: AtomicU64,
    duplicate_records: AtomicU64,
}

/// Point-in-time copy of [`RunCounters`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CounterSnapshot {
    pub pages_fetched: u64,
    pub pages_skipped: u64,
    pub summaries_found: u64,
    pub duplicate_summaries: u64,
    pub details_fetched: u64,
    pub details_failed: u64,
    pub details_cancelled: u64,
    pub peak_details_in_flight: u64,
    pub records_written: u64,
    pub duplicate_records: u64,
}

impl RunCounters {
    pub fn record_page_fetched(&self) {
        self.pages_fetched.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_page_skipped(&self) {
        self.pages_skipped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_summaries(&self, count: u64) {
        self.summaries_found.fetch_add(count, Ordering::Relaxed);
    }

    pub fn record_duplicate_summaries(&self, count: u64) {
        self.duplicate_summaries.fetch_add(count, Ordering::Relaxed);
    }

    /// Marks the start of a detail fetch and tracks the concurrency peak
    pub fn detail_started(&self) {
        let now = self.details_in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_details_in_flight.fetch_max(now, Ordering::SeqCst);
    }

    /// Marks the end of a detail fetch
    pub fn detail_finished(&self, success: bool) {
        self.details_in_flight.fetch_sub(1, Ordering::SeqCst);
        if success {
            self.details_fetched.fetch_add(1, Ordering::Relaxed);
        } else {
            self.details_failed.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Marks a detail fetch abandoned because the run was cancelled
    pub fn detail_cancelled(&self) {
        self.details_in_flight.fetch_sub(1, Ordering::SeqCst);
        self.details_cancelled.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_written(&self) {
        self.records_written.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_duplicate_record(&self) {
        self.duplicate_records.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> CounterSnapshot {
        CounterSnapshot {
            pages_fetched: self.pages_fetched.load(Ordering::Relaxed),
            pages_skipped: self.pages_skipped.load(Ordering::Relaxed),
            summaries_found: self.summaries_found.load(Ordering::Relaxed),
            duplicate_summaries: self.duplicate_summaries.load(Ordering::Relaxed),
            details_fetched: self.details_fetched.load(Ordering::Relaxed),
            details_failed: self.details_failed.load(Ordering::Relaxed),
            details_cancelled: self.details_cancelled.load(Ordering::Relaxed),
            peak_details_in_flight: self.peak_details_in_flight.load(Ordering::SeqCst),
            records_written: self.records_written.load(Ordering::Relaxed),
            duplicate_records: self.duplicate_records.load(Ordering::Relaxed),
        }
    }
}

/// State owned by a single scrape run
///
/// Created per run and handed to every component, so two runs in the same
/// process never share a cancellation signal or counters.
#[derive(Debug, Clone)]
pub struct RunContext {
    /// Cooperative stop signal: no new page or detail fetch starts once set
    pub cancel: CancellationToken,

    pub counters: Arc<RunCounters>,

    pub started_at: Instant,
}

impl RunContext {
    pub fn new() -> Self {
        Self::with_cancel(CancellationToken::new())
    }

    /// Creates a context driven by an external token (e.g. Ctrl-C handler)
    pub fn with_cancel(cancel: CancellationToken) -> Self {
        Self {
            cancel,
            counters: Arc::new(RunCounters::default()),
            started_at: Instant::now(),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

impl Default for RunContext {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_snapshot() {
        let counters = RunCounters::default();
        counters.record_page_fetched();
        counters.record_page_fetched();
        counters.record_summaries(5);
        counters.record_duplicate_summaries(1);
        counters.record_written();

        let snap = counters.snapshot();
        assert_eq!(snap.pages_fetched, 2);
        assert_eq!(snap.summaries_found, 5);
        assert_eq!(snap.duplicate_summaries, 1);
        assert_eq!(snap.records_written, 1);
    }

    #[test]
    fn test_in_flight_peak() {
        let counters = RunCounters::default();
        counters.detail_started();
        counters.detail_started();
        counters.detail_finished(true);
        counters.detail_started();
        counters.detail_finished(false);
        counters.detail_finished(true);

        let snap = counters.snapshot();
        assert_eq!(snap.peak_details_in_flight, 2);
        assert_eq!(snap.details_fetched, 2);
        assert_eq!(snap.details_failed, 1);
    }

    #[test]
    fn test_cancelled_detail_is_not_a_failure() {
        let counters = RunCounters::default();
        counters.detail_started();
        counters.detail_started();
        counters.detail_cancelled();
        counters.detail_finished(true);

        let snap = counters.snapshot();
        assert_eq!(snap.details_fetched, 1);
        assert_eq!(snap.details_failed, 0);
        assert_eq!(snap.details_cancelled, 1);
    }

    #[test]
    fn test_contexts_are_independent() {
        let a = RunContext::new();
        let b = RunContext::new();
        a.cancel.cancel();

        assert!(a.is_cancelled());
        assert!(!b.is_cancelled());
    }
}
