//! Bienici-Scraper main entry point
//!
//! This is the command-line interface for the Bien'ici listing harvester.

use anyhow::Context;
use bienici_scraper::config::{
    mask_key, resolve_config, Config, ConfigOverrides, ContractType, PageErrorPolicy,
    PropertyType,
};
use bienici_scraper::crawler::Coordinator;
use bienici_scraper::output::{print_report, CsvSink};
use bienici_scraper::state::RunContext;
use bienici_scraper::url::{BieniciUrls, SearchQuery, UrlTemplate};
use clap::Parser;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

/// Bienici-Scraper: a Bien'ici listing harvester
///
/// Pages through search results via the ScrapingAnt proxy, enriches each
/// listing from its own page and writes one CSV row per unique listing.
#[derive(Parser, Debug)]
#[command(name = "bienici-scraper")]
#[command(version = "1.0.0")]
#[command(about = "Scrape Bien'ici listings into CSV", long_about = None)]
struct Cli {
    /// City name or Bien'ici location code
    #[arg(short, long)]
    location: Option<String>,

    /// Contract type
    #[arg(short, long = "contract", value_enum)]
    contract_type: Option<ContractType>,

    /// Property type filter
    #[arg(short, long = "property", value_enum)]
    property_type: Option<PropertyType>,

    /// Output CSV path
    #[arg(short, long)]
    output: Option<String>,

    /// Stop after this many unique listings
    #[arg(long)]
    limit: Option<usize>,

    /// Stop after this many search pages
    #[arg(long)]
    max_pages: Option<u32>,

    /// Concurrent detail-page fetches
    #[arg(short = 'w', long)]
    max_workers: Option<usize>,

    /// Only scrape search pages, skip listing pages
    #[arg(long)]
    no_details: bool,

    /// ScrapingAnt API key
    #[arg(short = 'k', long, env = "SCRAPINGANT_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Per-request timeout in seconds
    #[arg(long)]
    timeout: Option<u64>,

    /// Attempts per request, including the first one
    #[arg(long)]
    max_retries: Option<u32>,

    /// What to do when a search page fails after all retries
    #[arg(long, value_enum)]
    on_page_error: Option<PageErrorPolicy>,

    /// Path to TOML configuration file
    #[arg(long, value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Validate config and show what would be scraped without fetching anything
    #[arg(long)]
    dry_run: bool,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

impl Cli {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            location: self.location.clone(),
            contract_type: self.contract_type,
            property_type: self.property_type,
            output_path: self.output.clone(),
            item_limit: self.limit,
            max_pages: self.max_pages,
            max_workers: self.max_workers,
            no_details: self.no_details,
            api_key: self.api_key.clone(),
            timeout_seconds: self.timeout,
            max_retries: self.max_retries,
            on_page_error: self.on_page_error,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    if let Some(path) = &cli.config {
        tracing::info!("Loading configuration from: {}", path.display());
    }
    let config = match resolve_config(cli.config.as_deref(), cli.overrides()) {
        Ok((config, hash)) => {
            if let Some(hash) = hash {
                tracing::info!("Configuration loaded successfully (hash: {})", hash);
            }
            config
        }
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            eprintln!("Error: {}", e);
            return ExitCode::from(2);
        }
    };

    if cli.dry_run {
        handle_dry_run(&config);
        return ExitCode::SUCCESS;
    }

    match handle_scrape(config).await {
        Ok(code) => code,
        Err(e) => {
            tracing::error!("Scrape failed: {:#}", e);
            eprintln!("Error: {:#}", e);
            ExitCode::from(1)
        }
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("bienici_scraper=info,warn"),
            1 => EnvFilter::new("bienici_scraper=debug,info"),
            2 => EnvFilter::new("bienici_scraper=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the --dry-run mode: shows the resolved configuration
fn handle_dry_run(config: &Config) {
    println!("=== Bienici-Scraper Dry Run ===\n");

    println!("Search:");
    println!("  Location: {}", config.search.location);
    println!("  Contract: {}", config.search.contract_type);
    println!("  Property: {}", config.search.property_type);
    let urls = BieniciUrls::new(config.search.base_url.clone());
    println!(
        "  First page: {}",
        urls.search_url(&SearchQuery::from(&config.search), 1)
    );

    println!("\nLimits:");
    match config.limits.item_limit {
        Some(limit) => println!("  Listings: {}", limit),
        None => println!("  Listings: unlimited"),
    }
    match config.limits.max_pages {
        Some(pages) => println!("  Pages: {}", pages),
        None => println!("  Pages: unlimited"),
    }
    println!("  On page error: {}", config.on_page_error);

    println!("\nFetching:");
    println!("  Endpoint: {}", config.fetch.api_url);
    println!("  API key: {}", mask_key(&config.fetch.api_key));
    println!("  Timeout: {}s", config.fetch.timeout_seconds);
    println!("  Attempts: {}", config.fetch.max_retries);
    println!(
        "  Backoff: {}ms doubling up to {}ms",
        config.fetch.base_delay_ms, config.fetch.max_delay_ms
    );

    println!("\nEnrichment:");
    println!("  Detail pages: {}", config.enrichment.fetch_details);
    println!("  Workers: {}", config.enrichment.max_workers);

    println!("\nOutput:");
    println!("  CSV: {}", config.output.output_path);

    println!("\n✓ Configuration is valid");
}

/// Handles the main scrape operation
///
/// # Returns
///
/// The process exit code: 0 on success, 1 on a failed run, 130 when
/// interrupted
async fn handle_scrape(config: Config) -> anyhow::Result<ExitCode> {
    let output_path = config.output.output_path.clone();
    let sink = CsvSink::create(Path::new(&output_path))
        .with_context(|| format!("Failed to create output file {}", output_path))?;

    let cancel = CancellationToken::new();
    spawn_interrupt_handler(cancel.clone());

    let ctx = RunContext::with_cancel(cancel);
    let coordinator = Coordinator::from_config(config, Box::new(sink), ctx)
        .context("Failed to set up the scraper")?;

    let report = coordinator.run().await;
    print_report(&report);
    println!("Output: {}", output_path);

    if !report.is_success() {
        if let Some(failure) = &report.failure {
            tracing::error!("Scrape failed: {}", failure);
        }
        return Ok(ExitCode::from(1));
    }
    if report.cancelled {
        tracing::warn!("Scrape interrupted");
        return Ok(ExitCode::from(130));
    }

    tracing::info!("Scrape completed successfully");
    Ok(ExitCode::SUCCESS)
}

/// Cancels the run on the first Ctrl-C
fn spawn_interrupt_handler(cancel: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, finishing in-flight requests...");
            cancel.cancel();
        }
    });
}
