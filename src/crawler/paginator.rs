//! Sequential walk over search-result pages
//!
//! The paginator requests page 1, 2, 3, … strictly in order, one page at a
//! time, and hands out the listings it has not seen before. It stops when:
//! - A page has no listings, or the site reports no further page
//! - The advertised result count has been enumerated
//! - The page or item limit is reached
//! - The run is cancelled, or a page fails for good
//!
//! A paginator is single-use; starting over means building a new one.

use super::fetcher::{FetchOptions, PageFetcher};
use super::parser::{ListingExtractor, SearchPage};
use super::retry::RetryPolicy;
use crate::config::{Config, PageErrorPolicy};
use crate::normalize::ListingSummary;
use crate::state::{ExhaustReason, PaginationState, RunContext};
use crate::url::{SearchQuery, UrlTemplate};
use crate::ScrapeError;
use futures::stream::{self, Stream, TryStreamExt};
use std::collections::HashSet;
use std::sync::Arc;

/// Consecutive failed pages tolerated under [`PageErrorPolicy::Skip`]
pub const MAX_CONSECUTIVE_PAGE_FAILURES: u32 = 3;

/// Bounds on a pagination walk
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PageLimits {
    /// Stop after this many unique listings
    pub item_limit: Option<usize>,

    /// Never request a page beyond this number
    pub max_pages: Option<u32>,

    pub on_page_error: PageErrorPolicy,
}

impl From<&Config> for PageLimits {
    fn from(config: &Config) -> Self {
        Self {
            item_limit: config.limits.item_limit,
            max_pages: config.limits.max_pages,
            on_page_error: config.on_page_error,
        }
    }
}

/// Lazy, forward-only producer of listing summaries
pub struct Paginator {
    fetcher: Arc<dyn PageFetcher>,
    extractor: Arc<dyn ListingExtractor>,
    urls: Arc<dyn UrlTemplate>,
    query: SearchQuery,
    retry: RetryPolicy,
    options: FetchOptions,
    limits: PageLimits,
    ctx: RunContext,

    state: PaginationState,
    seen: HashSet<String>,
    yielded: usize,
    total_count: Option<u64>,
    consecutive_failures: u32,
}

impl Paginator {
    /// Creates a paginator positioned before page 1
    ///
    /// # Arguments
    ///
    /// * `fetcher` - Performs single fetch attempts
    /// * `extractor` - Parses search pages
    /// * `urls` - Builds the URL of page N
    /// * `query` - What is being searched
    /// * `retry` - Retry schedule applied to every page fetch
    /// * `limits` - Page/item limits and the page failure policy
    /// * `ctx` - The run's cancellation token and counters
    pub fn new(
        fetcher: Arc<dyn PageFetcher>,
        extractor: Arc<dyn ListingExtractor>,
        urls: Arc<dyn UrlTemplate>,
        query: SearchQuery,
        retry: RetryPolicy,
        limits: PageLimits,
        ctx: RunContext,
    ) -> Self {
        Self {
            fetcher,
            extractor,
            urls,
            query,
            retry,
            options: FetchOptions::default(),
            limits,
            ctx,
            state: PaginationState::start(),
            seen: HashSet::new(),
            yielded: 0,
            total_count: None,
            consecutive_failures: 0,
        }
    }

    pub fn with_fetch_options(mut self, options: FetchOptions) -> Self {
        self.options = options;
        self
    }

    pub fn state(&self) -> PaginationState {
        self.state
    }

    /// Why pagination stopped, once it has
    pub fn exhaust_reason(&self) -> Option<ExhaustReason> {
        match self.state {
            PaginationState::Exhausted(reason) => Some(reason),
            _ => None,
        }
    }

    /// Number of unique summaries handed out so far
    pub fn yielded(&self) -> usize {
        self.yielded
    }

    /// Result count advertised by the site, once a page showed it
    pub fn total_count(&self) -> Option<u64> {
        self.total_count
    }

    /// Fetches pages until one yields new listings
    ///
    /// # Returns
    ///
    /// * `Ok(Some(summaries))` - New, non-empty batch in page order
    /// * `Ok(None)` - Pagination is exhausted (see [`Paginator::exhaust_reason`])
    /// * `Err(ScrapeError::PageFailed)` - A page failed after retries; the
    ///   paginator is exhausted from then on
    pub async fn next_page(&mut self) -> Result<Option<Vec<ListingSummary>>, ScrapeError> {
        loop {
            let page = match self.state {
                PaginationState::Exhausted(_) => return Ok(None),
                PaginationState::AwaitingPage(page) => page,
                other => {
                    return Err(ScrapeError::InvalidTransition {
                        from: other.to_string(),
                        to: "next page".to_string(),
                    })
                }
            };

            if self.ctx.is_cancelled() {
                self.finish(ExhaustReason::Cancelled)?;
                return Ok(None);
            }

            if self.limits.max_pages.map_or(false, |max| page > max) {
                self.finish(ExhaustReason::PageLimit)?;
                return Ok(None);
            }

            let url = self.urls.search_url(&self.query, page);
            tracing::info!("Fetching search page {}: {}", page, url);

            let fetched = self
                .retry
                .run(&url, &self.ctx.cancel, || self.fetcher.fetch(&url, &self.options))
                .await;

            let body = match fetched {
                Ok(body) => body,
                Err(ScrapeError::Cancelled) => {
                    self.finish(ExhaustReason::Cancelled)?;
                    return Ok(None);
                }
                Err(err) => {
                    self.page_failed(page, err)?;
                    continue;
                }
            };

            self.transition(PaginationState::PageFetched(page))?;
            self.ctx.counters.record_page_fetched();

            let search = match self.extractor.extract_search_page(&body, &url) {
                Ok(search) => search,
                Err(err) => {
                    self.page_failed(page, err)?;
                    continue;
                }
            };
            self.consecutive_failures = 0;

            let fresh = self.accept_page(page, search)?;

            if !fresh.is_empty() {
                return Ok(Some(fresh));
            }
            if self.state.is_terminal() {
                return Ok(None);
            }
        }
    }

    /// Consumes the paginator into a stream of individual summaries
    ///
    /// The stream ends when pagination is exhausted; a failed page surfaces
    /// as one final `Err` item.
    pub fn into_stream(self) -> impl Stream<Item = Result<ListingSummary, ScrapeError>> {
        stream::try_unfold(self, |mut paginator| async move {
            let page = paginator.next_page().await?;
            Ok::<_, ScrapeError>(page.map(|summaries| (summaries, paginator)))
        })
        .map_ok(|summaries| stream::iter(summaries.into_iter().map(Ok)))
        .try_flatten()
    }

    /// Filters an extracted page and decides where to go next
    fn accept_page(
        &mut self,
        page: u32,
        search: SearchPage,
    ) -> Result<Vec<ListingSummary>, ScrapeError> {
        let found = search.summaries.len();
        self.transition(PaginationState::Extracted {
            page,
            found,
            has_more: search.has_more,
        })?;
        self.ctx.counters.record_summaries(found as u64);

        if self.total_count.is_none() {
            if let Some(total) = search.total_count {
                tracing::info!("Search reports {} listings", total);
                self.total_count = Some(total);
            }
        }

        let mut fresh = Vec::with_capacity(found);
        let mut duplicates = 0u64;

        for summary in search.summaries {
            if self.limit_reached(fresh.len()) {
                tracing::debug!("Item limit reached, truncating page {}", page);
                break;
            }
            if summary.id.is_empty() {
                tracing::warn!("Dropping listing without identifier: {}", summary.url);
                continue;
            }
            if !self.seen.insert(summary.id.clone()) {
                duplicates += 1;
                continue;
            }
            fresh.push(summary);
        }

        self.yielded += fresh.len();
        if duplicates > 0 {
            tracing::debug!("Page {} repeated {} listings", page, duplicates);
            self.ctx.counters.record_duplicate_summaries(duplicates);
        }

        tracing::info!(
            "Page {}: {} listings, {} new ({} total)",
            page,
            found,
            fresh.len(),
            self.yielded
        );

        let total_reached = self
            .total_count
            .map_or(false, |total| total > 0 && self.seen.len() as u64 >= total);

        let next = if found == 0 {
            PaginationState::Exhausted(ExhaustReason::EndOfResults)
        } else if self.limit_reached(0) {
            PaginationState::Exhausted(ExhaustReason::ItemLimit)
        } else if fresh.is_empty() {
            // The site serves its last page again for out-of-range page numbers
            PaginationState::Exhausted(ExhaustReason::NoNewListings)
        } else if !search.has_more {
            PaginationState::Exhausted(ExhaustReason::NoMorePages)
        } else if total_reached {
            PaginationState::Exhausted(ExhaustReason::TotalReached)
        } else if self.limits.max_pages.map_or(false, |max| page >= max) {
            PaginationState::Exhausted(ExhaustReason::PageLimit)
        } else {
            PaginationState::AwaitingPage(page + 1)
        };

        if let PaginationState::Exhausted(reason) = next {
            tracing::info!("Pagination finished after page {}: {}", page, reason);
        }
        self.transition(next)?;

        Ok(fresh)
    }

    /// Applies the page failure policy
    ///
    /// Returns `Ok` when the page is skipped, the tagged error otherwise.
    fn page_failed(&mut self, page: u32, err: ScrapeError) -> Result<(), ScrapeError> {
        self.consecutive_failures += 1;

        let skip = self.limits.on_page_error == PageErrorPolicy::Skip
            && self.consecutive_failures < MAX_CONSECUTIVE_PAGE_FAILURES;

        if skip {
            tracing::warn!("Skipping search page {}: {}", page, err);
            self.ctx.counters.record_page_skipped();
            self.transition(PaginationState::AwaitingPage(page + 1))?;
            return Ok(());
        }

        tracing::error!("Search page {} failed, stopping pagination: {}", page, err);
        self.transition(PaginationState::Exhausted(ExhaustReason::Failed))?;
        Err(ScrapeError::PageFailed {
            page,
            source: Box::new(err),
        })
    }

    fn limit_reached(&self, pending: usize) -> bool {
        self.limits
            .item_limit
            .map_or(false, |limit| self.yielded + pending >= limit)
    }

    fn finish(&mut self, reason: ExhaustReason) -> Result<(), ScrapeError> {
        tracing::info!("Pagination stopped: {}", reason);
        self.transition(PaginationState::Exhausted(reason))
    }

    fn transition(&mut self, next: PaginationState) -> Result<(), ScrapeError> {
        if !self.state.can_transition_to(&next) {
            return Err(ScrapeError::InvalidTransition {
                from: self.state.to_string(),
                to: next.to_string(),
            });
        }
        tracing::trace!("Pagination {} -> {}", self.state, next);
        self.state = next;
        Ok(())
    }
}
