//! Configuration module for Bienici-Scraper
//!
//! This module handles loading, parsing, and validating run configuration.
//! Settings come from an optional TOML file, then command-line overrides, and
//! are validated once before any network activity.
//!
//! # Example
//!
//! ```no_run
//! use bienici_scraper::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("scrape.toml")).unwrap();
//! println!("Searching in: {}", config.search.location);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    mask_key, Config, ContractType, EnrichmentConfig, FetchConfig, LimitsConfig, OutputConfig,
    PageErrorPolicy, PropertyType, SearchConfig, DEFAULT_API_URL, DEFAULT_BASE_URL,
};

// Re-export parser functions
pub use parser::{
    compute_config_hash, load_config, load_config_with_hash, parse_config_file, resolve_config,
    ConfigOverrides,
};
pub use validation::validate;
