//! Scripted collaborators for crawler unit tests

use super::fetcher::{FetchOptions, PageFetcher};
use crate::ScrapeError;
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

pub const BASE_URL: &str = "https://www.bienici.com";

/// Fetcher answering from per-URL response queues
///
/// Unscripted URLs (or exhausted queues) answer 404.
#[derive(Default)]
pub struct ScriptedFetcher {
    responses: Mutex<HashMap<String, VecDeque<Result<String, ScrapeError>>>>,
    calls: Mutex<Vec<String>>,
    delay: Duration,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

impl ScriptedFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn respond(self, url: &str, body: impl Into<String>) -> Self {
        self.push(url, Ok(body.into()));
        self
    }

    pub fn fail(self, url: &str, error: ScrapeError) -> Self {
        self.push(url, Err(error));
        self
    }

    fn push(&self, url: &str, response: Result<String, ScrapeError>) {
        self.responses
            .lock()
            .unwrap()
            .entry(url.to_string())
            .or_default()
            .push_back(response);
    }

    pub fn calls_to(&self, url: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|u| *u == url).count()
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn peak_in_flight(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PageFetcher for ScriptedFetcher {
    async fn fetch(&self, url: &str, _options: &FetchOptions) -> Result<String, ScrapeError> {
        self.calls.lock().unwrap().push(url.to_string());
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let response = self
            .responses
            .lock()
            .unwrap()
            .get_mut(url)
            .and_then(VecDeque::pop_front);

        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        response.unwrap_or_else(|| {
            Err(ScrapeError::Upstream {
                url: url.to_string(),
                status: 404,
            })
        })
    }
}

pub fn listing_url(id: &str) -> String {
    format!("{}/annonce/vente/paris/appartement/2pieces/{}", BASE_URL, id)
}

/// Search page with one card per id
pub fn search_html(ids: &[&str], has_more: bool) -> String {
    let cards: String = ids
        .iter()
        .map(|id| {
            format!(
                r#"<article><a href="/annonce/vente/paris/appartement/2pieces/{}">
                   <h3>Appartement 2 pièces 40 m² 75011 Paris 11e</h3></a>
                   <div>320 000 €</div></article>"#,
                id
            )
        })
        .collect();

    let paging = if has_more {
        r#"<nav aria-label="Pagination"><a rel="next" href="?page=next">Suivante</a></nav>"#
    } else {
        r#"<nav aria-label="Pagination"></nav>"#
    };

    format!("<html><body>{}{}</body></html>", cards, paging)
}

pub fn detail_html(description: &str) -> String {
    format!(
        r#"<html><body><h1>Appartement 2 pièces 40 m²</h1>
           <div>Chauffage : collectif</div>
           <div><h2>Descriptif de ce bien</h2></div><div>{}</div></body></html>"#,
        description
    )
}
