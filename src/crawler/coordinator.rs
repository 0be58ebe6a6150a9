//! Run orchestration
//!
//! The coordinator wires one scrape run together:
//! - A producer task walks the search pages and feeds a bounded queue
//! - The enrichment pool (or a pass-through when details are disabled)
//!   drains that queue
//! - The coordinator itself is the single aggregator: it deduplicates,
//!   normalizes and writes every result to the sink
//!
//! Whatever happens, the sink is finished before the report is returned, so
//! a failed or interrupted run keeps the records it already wrote.

use super::enricher::{summaries_only, EnrichmentPool};
use super::fetcher::{FetchOptions, PageFetcher, ScrapingAntClient};
use super::paginator::{PageLimits, Paginator};
use super::parser::{BieniciExtractor, ListingExtractor};
use super::retry::RetryPolicy;
use crate::config::Config;
use crate::normalize::{Deduplicator, ListingSummary, Normalizer};
use crate::output::RecordSink;
use crate::state::{CounterSnapshot, ExhaustReason, RunContext};
use crate::url::{BieniciUrls, SearchQuery, UrlTemplate};
use crate::ScrapeError;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

/// Outcome of a run
#[derive(Debug)]
pub struct RunReport {
    pub counters: CounterSnapshot,

    /// Why pagination stopped; `None` if the producer never finished
    pub exhaust_reason: Option<ExhaustReason>,

    pub elapsed: Duration,

    /// First fatal error (page failure or output failure)
    pub failure: Option<ScrapeError>,

    /// Whether the run was interrupted through its cancellation token
    pub cancelled: bool,
}

impl RunReport {
    /// True when the run finished without a fatal error
    ///
    /// An interrupted run is still successful if nothing failed.
    pub fn is_success(&self) -> bool {
        self.failure.is_none() && self.exhaust_reason != Some(ExhaustReason::Failed)
    }
}

/// Main scrape coordinator
pub struct Coordinator {
    config: Config,
    fetcher: Arc<dyn PageFetcher>,
    extractor: Arc<dyn ListingExtractor>,
    urls: Arc<dyn UrlTemplate>,
    sink: Box<dyn RecordSink>,
    ctx: RunContext,
}

impl Coordinator {
    /// Creates a coordinator from explicit collaborators
    ///
    /// # Arguments
    ///
    /// * `config` - Validated run configuration
    /// * `fetcher` - Fetches search and detail pages
    /// * `extractor` - Parses fetched pages
    /// * `urls` - Builds search and detail URLs
    /// * `sink` - Receives normalized records
    /// * `ctx` - Cancellation token and counters for this run
    pub fn new(
        config: Config,
        fetcher: Arc<dyn PageFetcher>,
        extractor: Arc<dyn ListingExtractor>,
        urls: Arc<dyn UrlTemplate>,
        sink: Box<dyn RecordSink>,
        ctx: RunContext,
    ) -> Self {
        Self {
            config,
            fetcher,
            extractor,
            urls,
            sink,
            ctx,
        }
    }

    /// Creates a coordinator talking to ScrapingAnt and parsing Bien'ici
    ///
    /// # Returns
    ///
    /// * `Ok(Coordinator)` - Ready to run
    /// * `Err(ScrapeError)` - The HTTP client or the site root is invalid
    pub fn from_config(
        config: Config,
        sink: Box<dyn RecordSink>,
        ctx: RunContext,
    ) -> Result<Self, ScrapeError> {
        let fetcher = Arc::new(ScrapingAntClient::new(&config.fetch)?);
        let extractor = Arc::new(BieniciExtractor::from_base(&config.search.base_url)?);
        let urls = Arc::new(BieniciUrls::new(config.search.base_url.clone()));
        Ok(Self::new(config, fetcher, extractor, urls, sink, ctx))
    }

    /// Runs the scrape to completion
    ///
    /// Never returns early: every outcome, including failures, is described
    /// by the returned [`RunReport`].
    pub async fn run(mut self) -> RunReport {
        let query = SearchQuery::from(&self.config.search);
        let retry = RetryPolicy::from_config(&self.config.fetch);
        let options = FetchOptions::from(&self.config.fetch);
        let workers = self.config.enrichment.max_workers.max(1);

        tracing::info!(
            "Starting scrape: {} {} in {} ({} workers, details {})",
            query.contract_type,
            query.property_type,
            query.location,
            workers,
            if self.config.enrichment.fetch_details {
                "on"
            } else {
                "off"
            }
        );

        let paginator = Paginator::new(
            self.fetcher.clone(),
            self.extractor.clone(),
            self.urls.clone(),
            query,
            retry,
            PageLimits::from(&self.config),
            self.ctx.clone(),
        )
        .with_fetch_options(options.clone());

        let (summary_tx, summary_rx) = mpsc::channel(workers * 2);
        let producer = tokio::spawn(produce(paginator, summary_tx));

        let mut results = if self.config.enrichment.fetch_details {
            EnrichmentPool::new(
                self.fetcher.clone(),
                self.extractor.clone(),
                self.urls.clone(),
                retry,
                options,
                workers,
                self.ctx.clone(),
            )
            .spawn(summary_rx)
        } else {
            summaries_only(summary_rx)
        };

        let mut failure = None;
        let mut dedup = Deduplicator::new();
        let normalizer = Normalizer::new();

        while let Some(enriched) = results.recv().await {
            match dedup.admit(&enriched.summary.id) {
                Ok(true) => {}
                Ok(false) => {
                    tracing::debug!("Skipping duplicate listing {}", enriched.summary.id);
                    self.ctx.counters.record_duplicate_record();
                    continue;
                }
                Err(e) => {
                    tracing::warn!("Dropping listing: {}", e);
                    continue;
                }
            }

            let record = normalizer.normalize(&enriched.summary, enriched.detail.as_ref());
            if let Err(e) = self.sink.write(&record) {
                tracing::error!("Failed to write record {}: {}", enriched.summary.id, e);
                failure = Some(ScrapeError::Output(e));
                self.ctx.cancel.cancel();
                break;
            }
            self.ctx.counters.record_written();
        }
        // Closing the results unblocks workers and, through them, the producer
        drop(results);

        let exhaust_reason = match producer.await {
            Ok((reason, Ok(()))) => reason,
            Ok((reason, Err(e))) => {
                failure.get_or_insert(e);
                reason
            }
            Err(e) => {
                tracing::error!("Pagination task terminated abnormally: {}", e);
                Some(ExhaustReason::Failed)
            }
        };

        if let Err(e) = self.sink.finish() {
            tracing::error!("Failed to finish output: {}", e);
            failure.get_or_insert(ScrapeError::Output(e));
        }

        let report = RunReport {
            counters: self.ctx.counters.snapshot(),
            exhaust_reason,
            elapsed: self.ctx.started_at.elapsed(),
            failure,
            cancelled: self.ctx.is_cancelled(),
        };

        tracing::info!(
            "Scrape finished: {} records written, {} pages fetched in {:.1}s",
            report.counters.records_written,
            report.counters.pages_fetched,
            report.elapsed.as_secs_f64()
        );

        report
    }
}

/// Producer task: pushes every new summary into the queue
async fn produce(
    mut paginator: Paginator,
    queue: mpsc::Sender<ListingSummary>,
) -> (Option<ExhaustReason>, Result<(), ScrapeError>) {
    let result = 'pages: loop {
        match paginator.next_page().await {
            Ok(Some(batch)) => {
                for summary in batch {
                    if queue.send(summary).await.is_err() {
                        tracing::debug!("Summary queue closed, stopping pagination");
                        break 'pages Ok(());
                    }
                }
            }
            Ok(None) => break Ok(()),
            Err(e) => break Err(e),
        }
    };

    (paginator.exhaust_reason(), result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PageErrorPolicy;
    use crate::crawler::testing::{
        detail_html, listing_url, search_html, ScriptedFetcher, BASE_URL,
    };
    use crate::normalize::{Field, NormalizedRecord};
    use crate::output::{MemorySink, OutputError, OutputResult};

    fn page_url(page: u32) -> String {
        let query = SearchQuery::from(&crate::config::SearchConfig::default());
        BieniciUrls::new(BASE_URL).search_url(&query, page)
    }

    fn config(fetch_details: bool) -> Config {
        let mut config = Config::default();
        config.fetch.api_key = "test".to_string();
        config.fetch.max_retries = 2;
        config.fetch.base_delay_ms = 1;
        config.fetch.max_delay_ms = 2;
        config.enrichment.max_workers = 2;
        config.enrichment.fetch_details = fetch_details;
        config
    }

    fn coordinator(
        config: Config,
        fetcher: Arc<ScriptedFetcher>,
        sink: Box<dyn RecordSink>,
        ctx: RunContext,
    ) -> Coordinator {
        Coordinator::new(
            config,
            fetcher,
            Arc::new(BieniciExtractor::from_base(BASE_URL).unwrap()),
            Arc::new(BieniciUrls::new(BASE_URL)),
            sink,
            ctx,
        )
    }

    fn ids(sink: &MemorySink) -> Vec<String> {
        let mut ids: Vec<String> = sink
            .records()
            .iter()
            .filter_map(|r| r.listing_id().map(str::to_string))
            .collect();
        ids.sort();
        ids
    }

    #[tokio::test]
    async fn test_run_enriches_and_deduplicates() {
        let fetcher = Arc::new(
            ScriptedFetcher::new()
                .respond(&page_url(1), search_html(&["a", "b"], true))
                .respond(&page_url(2), search_html(&["b", "c"], false))
                .respond(&listing_url("a"), detail_html("A"))
                .respond(&listing_url("b"), detail_html("B"))
                .respond(&listing_url("c"), detail_html("C")),
        );
        let sink = MemorySink::new();
        let report = coordinator(
            config(true),
            fetcher,
            Box::new(sink.clone()),
            RunContext::new(),
        )
        .run()
        .await;

        assert!(report.is_success());
        assert_eq!(report.exhaust_reason, Some(ExhaustReason::NoMorePages));
        assert_eq!(ids(&sink), vec!["a", "b", "c"]);
        assert!(sink.is_finished());
        assert_eq!(report.counters.records_written, 3);
        assert_eq!(report.counters.pages_fetched, 2);
        assert_eq!(report.counters.details_fetched, 3);

        let described = sink
            .records()
            .iter()
            .filter(|r| r.get(Field::Description).is_some())
            .count();
        assert_eq!(described, 3);
    }

    #[tokio::test]
    async fn test_run_without_details_skips_detail_fetches() {
        let fetcher = Arc::new(
            ScriptedFetcher::new().respond(&page_url(1), search_html(&["a", "b"], false)),
        );
        let sink = MemorySink::new();
        let report = coordinator(
            config(false),
            fetcher.clone(),
            Box::new(sink.clone()),
            RunContext::new(),
        )
        .run()
        .await;

        assert!(report.is_success());
        assert_eq!(sink.len(), 2);
        assert_eq!(fetcher.total_calls(), 1);
        assert!(sink.records()[0].get(Field::Description).is_none());
    }

    #[tokio::test]
    async fn test_item_limit_still_enriches_kept_listings() {
        let fetcher = Arc::new(
            ScriptedFetcher::new()
                .respond(&page_url(1), search_html(&["a", "b", "c"], true))
                .respond(&listing_url("a"), detail_html("A"))
                .respond(&listing_url("b"), detail_html("B")),
        );
        let mut config = config(true);
        config.limits.item_limit = Some(2);

        let sink = MemorySink::new();
        let report = coordinator(config, fetcher.clone(), Box::new(sink.clone()), RunContext::new())
            .run()
            .await;

        assert!(report.is_success());
        assert_eq!(report.exhaust_reason, Some(ExhaustReason::ItemLimit));
        assert_eq!(ids(&sink), vec!["a", "b"]);
        assert_eq!(report.counters.details_fetched, 2);
        assert_eq!(fetcher.calls_to(&page_url(2)), 0);
        assert_eq!(fetcher.calls_to(&listing_url("c")), 0);
    }

    #[tokio::test]
    async fn test_page_failure_keeps_earlier_records() {
        let fetcher = Arc::new(
            ScriptedFetcher::new().respond(&page_url(1), search_html(&["a"], true)),
        );
        let sink = MemorySink::new();
        let report = coordinator(
            config(false),
            fetcher,
            Box::new(sink.clone()),
            RunContext::new(),
        )
        .run()
        .await;

        assert!(!report.is_success());
        assert!(matches!(
            report.failure,
            Some(ScrapeError::PageFailed { page: 2, .. })
        ));
        assert_eq!(report.exhaust_reason, Some(ExhaustReason::Failed));
        assert_eq!(ids(&sink), vec!["a"]);
        assert!(sink.is_finished());
    }

    #[tokio::test]
    async fn test_skip_policy_continues_past_failed_page() {
        let fetcher = Arc::new(
            ScriptedFetcher::new()
                .respond(&page_url(1), search_html(&["a"], true))
                .respond(&page_url(3), search_html(&["c"], false)),
        );
        let mut config = config(false);
        config.on_page_error = PageErrorPolicy::Skip;

        let sink = MemorySink::new();
        let report = coordinator(config, fetcher, Box::new(sink.clone()), RunContext::new())
            .run()
            .await;

        assert!(report.is_success());
        assert_eq!(report.counters.pages_skipped, 1);
        assert_eq!(ids(&sink), vec!["a", "c"]);
    }

    #[tokio::test]
    async fn test_cancelled_run_fetches_nothing() {
        let fetcher = Arc::new(ScriptedFetcher::new());
        let ctx = RunContext::new();
        ctx.cancel.cancel();

        let sink = MemorySink::new();
        let report = coordinator(config(true), fetcher.clone(), Box::new(sink.clone()), ctx)
            .run()
            .await;

        assert!(report.cancelled);
        assert!(report.is_success());
        assert_eq!(report.exhaust_reason, Some(ExhaustReason::Cancelled));
        assert_eq!(fetcher.total_calls(), 0);
        assert!(sink.is_empty());
        assert!(sink.is_finished());
    }

    struct FailingSink;

    impl RecordSink for FailingSink {
        fn write(&mut self, _record: &NormalizedRecord) -> OutputResult<()> {
            Err(OutputError::Write("disk full".to_string()))
        }

        fn finish(&mut self) -> OutputResult<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_output_failure_aborts_run() {
        let fetcher = Arc::new(
            ScriptedFetcher::new().respond(&page_url(1), search_html(&["a", "b"], false)),
        );
        let ctx = RunContext::new();
        let report = coordinator(config(false), fetcher, Box::new(FailingSink), ctx.clone())
            .run()
            .await;

        assert!(!report.is_success());
        assert!(matches!(report.failure, Some(ScrapeError::Output(_))));
        assert!(ctx.is_cancelled());
        assert_eq!(report.counters.records_written, 0);
    }
}
