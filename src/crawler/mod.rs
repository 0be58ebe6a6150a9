//! Crawler module for fetching and processing Bien'ici pages
//!
//! This module contains the core scraping logic, including:
//! - Remote fetching through ScrapingAnt with retry and backoff
//! - Search and detail page extraction
//! - Sequential pagination and bounded detail enrichment
//! - Overall run coordination

mod coordinator;
mod enricher;
mod fetcher;
mod paginator;
mod parser;
mod retry;

#[cfg(test)]
pub(crate) mod testing;

pub use coordinator::{Coordinator, RunReport};
pub use enricher::{summaries_only, Enriched, EnrichmentPool};
pub use fetcher::{
    build_http_client, classify_status, FetchOptions, PageFetcher, ScrapingAntClient,
};
pub use paginator::{PageLimits, Paginator, MAX_CONSECUTIVE_PAGE_FAILURES};
pub use parser::{
    parse_title_text, parse_total_count, BieniciExtractor, ListingExtractor, SearchPage,
    MAX_DESCRIPTION_CHARS,
};
pub use retry::RetryPolicy;

use crate::config::Config;
use crate::output::RecordSink;
use crate::state::RunContext;
use crate::ScrapeError;

/// Runs a complete scrape against Bien'ici
///
/// This is the main entry point for a run. It will:
/// 1. Build the ScrapingAnt client and the Bien'ici extractor
/// 2. Walk the search pages in order
/// 3. Enrich listings from their detail pages, if enabled
/// 4. Deduplicate, normalize and write every listing to `sink`
///
/// # Arguments
///
/// * `config` - The validated run configuration
/// * `sink` - Destination for normalized records
/// * `ctx` - Cancellation token and counters for this run
///
/// # Returns
///
/// * `Ok(RunReport)` - The run took place; check [`RunReport::is_success`]
/// * `Err(ScrapeError)` - The run could not be set up
pub async fn scrape(
    config: Config,
    sink: Box<dyn RecordSink>,
    ctx: RunContext,
) -> Result<RunReport, ScrapeError> {
    let coordinator = Coordinator::from_config(config, sink, ctx)?;
    Ok(coordinator.run().await)
}
