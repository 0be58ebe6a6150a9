//! Bienici-Scraper: a listing harvester for the Bien'ici real-estate portal
//!
//! This crate pages through search results via the ScrapingAnt proxy, enriches
//! each listing from its own page with a bounded worker pool, deduplicates by
//! listing identifier and normalizes everything into a fixed tabular schema.

pub mod config;
pub mod crawler;
pub mod normalize;
pub mod output;
pub mod state;
pub mod url;

use std::time::Duration;
use thiserror::Error;

/// Main error type for scraping operations
#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Network error for {url}: {message}")]
    Network { url: String, message: String },

    #[error("Rate limited by upstream for {url} (HTTP {status})")]
    RateLimited {
        url: String,
        status: u16,
        retry_after: Option<Duration>,
    },

    #[error("Upstream returned HTTP {status} for {url}")]
    Upstream { url: String, status: u16 },

    #[error("Extraction error for {url}: {message}")]
    Extraction { url: String, message: String },

    #[error("Retries exhausted after {attempts} attempts: {source}")]
    RetriesExhausted {
        attempts: u32,
        source: Box<ScrapeError>,
    },

    #[error("Search page {page} failed: {source}")]
    PageFailed {
        page: u32,
        source: Box<ScrapeError>,
    },

    #[error("Invalid pagination transition from {from} to {to}")]
    InvalidTransition { from: String, to: String },

    #[error("Invalid listing: {0}")]
    InvalidListing(String),

    #[error("Operation cancelled")]
    Cancelled,

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Output error: {0}")]
    Output(#[from] output::OutputError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ScrapeError {
    /// Returns true if a fresh attempt of the same request may succeed
    ///
    /// Network failures, throttling and server-side hiccups (408, 423, 5xx)
    /// are transient. Client errors such as 404 and extraction failures are
    /// permanent: the same page will not become valid on a second look.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Network { .. } | Self::RateLimited { .. } => true,
            Self::Upstream { status, .. } => {
                *status == 408 || *status == 423 || (500..600).contains(status)
            }
            _ => false,
        }
    }

    /// Returns the innermost error, unwrapping retry and page tags
    pub fn root_cause(&self) -> &ScrapeError {
        match self {
            Self::RetriesExhausted { source, .. } | Self::PageFailed { source, .. } => {
                source.root_cause()
            }
            other => other,
        }
    }
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("ScrapingAnt API key is required (set SCRAPINGANT_API_KEY or pass --api-key)")]
    MissingApiKey,

    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },
}

/// Result type alias for scraping operations
pub type Result<T> = std::result::Result<T, ScrapeError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{Coordinator, RunReport};
pub use normalize::{ListingDetail, ListingSummary, NormalizedRecord};
pub use state::{PaginationState, RunContext};
