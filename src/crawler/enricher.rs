//! Detail-page enrichment pool
//!
//! A fixed number of worker tasks pull summaries from one shared queue,
//! fetch each listing's own page and hand the result to the aggregator.
//! - At most `workers` detail fetches are in flight at any time
//! - A failed listing is logged and passed on without a detail; it never
//!   stops the pool or a sibling worker
//! - Completion order is not preserved
//!
//! The pool drains once the summary queue is closed and every worker has
//! finished its current listing.

use super::fetcher::{FetchOptions, PageFetcher};
use super::parser::ListingExtractor;
use super::retry::RetryPolicy;
use crate::normalize::{ListingDetail, ListingSummary};
use crate::state::RunContext;
use crate::url::UrlTemplate;
use crate::ScrapeError;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinSet;

/// A summary together with its detail, if enrichment succeeded
#[derive(Debug, Clone, PartialEq)]
pub struct Enriched {
    pub summary: ListingSummary,
    pub detail: Option<ListingDetail>,
}

impl Enriched {
    /// A summary passed on without enrichment
    pub fn summary_only(summary: ListingSummary) -> Self {
        Self {
            summary,
            detail: None,
        }
    }
}

/// Bounded pool of detail-page workers
pub struct EnrichmentPool {
    fetcher: Arc<dyn PageFetcher>,
    extractor: Arc<dyn ListingExtractor>,
    urls: Arc<dyn UrlTemplate>,
    retry: RetryPolicy,
    options: FetchOptions,
    workers: usize,
    ctx: RunContext,
}

impl EnrichmentPool {
    /// Creates a pool; `workers` is clamped to at least 1
    pub fn new(
        fetcher: Arc<dyn PageFetcher>,
        extractor: Arc<dyn ListingExtractor>,
        urls: Arc<dyn UrlTemplate>,
        retry: RetryPolicy,
        options: FetchOptions,
        workers: usize,
        ctx: RunContext,
    ) -> Self {
        Self {
            fetcher,
            extractor,
            urls,
            retry,
            options,
            workers: workers.max(1),
            ctx,
        }
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Starts the workers on `summaries`
    ///
    /// # Returns
    ///
    /// The receiving end of the results. It yields one [`Enriched`] per
    /// summary taken off the queue and closes once every worker has exited.
    pub fn spawn(self, summaries: mpsc::Receiver<ListingSummary>) -> mpsc::Receiver<Enriched> {
        let (results_tx, results_rx) = mpsc::channel(self.workers * 2);
        let queue = Arc::new(Mutex::new(summaries));
        let workers = self.workers;
        let pool = Arc::new(self);

        let mut set = JoinSet::new();
        for worker_id in 0..workers {
            let pool = pool.clone();
            let queue = queue.clone();
            let results = results_tx.clone();
            set.spawn(async move { pool.work(worker_id, queue, results).await });
        }
        drop(results_tx);

        tokio::spawn(async move {
            while let Some(joined) = set.join_next().await {
                if let Err(e) = joined {
                    tracing::error!("Enrichment worker terminated abnormally: {}", e);
                }
            }
            tracing::debug!("Enrichment pool drained");
        });

        results_rx
    }

    /// Worker loop: take a summary, enrich it, pass it on
    async fn work(
        &self,
        worker_id: usize,
        queue: Arc<Mutex<mpsc::Receiver<ListingSummary>>>,
        results: mpsc::Sender<Enriched>,
    ) {
        loop {
            let next = {
                let mut queue = queue.lock().await;
                tokio::select! {
                    biased;
                    _ = self.ctx.cancel.cancelled() => None,
                    summary = queue.recv() => summary,
                }
            };

            let Some(summary) = next else {
                break;
            };

            let detail = self.enrich(&summary).await;
            if results.send(Enriched { summary, detail }).await.is_err() {
                tracing::debug!("Worker {}: result channel closed", worker_id);
                break;
            }
        }

        tracing::trace!("Worker {} finished", worker_id);
    }

    /// Fetches and extracts one detail page; failures degrade to `None`
    async fn enrich(&self, summary: &ListingSummary) -> Option<ListingDetail> {
        let url = self.urls.detail_url(summary);
        self.ctx.counters.detail_started();

        let result = self
            .retry
            .run(&url, &self.ctx.cancel, || self.fetcher.fetch(&url, &self.options))
            .await
            .and_then(|body| self.extractor.extract_detail_page(&body, &url));

        match result {
            Ok(detail) => {
                self.ctx.counters.detail_finished(true);
                Some(detail)
            }
            Err(ScrapeError::Cancelled) => {
                self.ctx.counters.detail_cancelled();
                tracing::debug!("Detail fetch for {} cancelled", summary.id);
                None
            }
            Err(e) => {
                self.ctx.counters.detail_finished(false);
                tracing::warn!("Keeping {} without details: {}", summary.id, e);
                None
            }
        }
    }
}

/// Passes summaries straight through when enrichment is disabled
pub fn summaries_only(mut summaries: mpsc::Receiver<ListingSummary>) -> mpsc::Receiver<Enriched> {
    let (tx, rx) = mpsc::channel(64);
    tokio::spawn(async move {
        while let Some(summary) = summaries.recv().await {
            if tx.send(Enriched::summary_only(summary)).await.is_err() {
                break;
            }
        }
    });
    rx
}
