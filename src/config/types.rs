use serde::Deserialize;
use std::fmt;

/// Default ScrapingAnt endpoint
pub const DEFAULT_API_URL: &str = "https://api.scrapingant.com/v2/general";

/// Default Bien'ici site root
pub const DEFAULT_BASE_URL: &str = "https://www.bienici.com";

/// Main configuration structure for a scrape run
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Config {
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub limits: LimitsConfig,
    #[serde(default)]
    pub fetch: FetchConfig,
    #[serde(default)]
    pub enrichment: EnrichmentConfig,
    #[serde(default)]
    pub output: OutputConfig,

    /// What to do when a search page still fails after retries
    #[serde(default)]
    pub on_page_error: PageErrorPolicy,
}

/// What to search for
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct SearchConfig {
    /// City name (e.g. "paris") or a raw Bien'ici location code
    pub location: String,

    pub contract_type: ContractType,

    pub property_type: PropertyType,

    /// Site root used when templating search URLs
    pub base_url: String,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            location: "paris".to_string(),
            contract_type: ContractType::Buy,
            property_type: PropertyType::All,
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }
}

/// Bounds on how much is enumerated
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct LimitsConfig {
    /// Maximum number of unique listings to collect
    #[serde(rename = "limit")]
    pub item_limit: Option<usize>,

    /// Maximum number of search pages to fetch
    pub max_pages: Option<u32>,
}

/// Remote fetch and retry settings
#[derive(Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct FetchConfig {
    /// ScrapingAnt API key
    pub api_key: String,

    /// ScrapingAnt endpoint
    pub api_url: String,

    /// Per-request timeout in seconds
    pub timeout_seconds: u64,

    /// Attempts per request, including the first one
    pub max_retries: u32,

    /// First backoff delay in milliseconds (doubles per attempt)
    pub base_delay_ms: u64,

    /// Backoff ceiling in milliseconds
    pub max_delay_ms: u64,

    /// Ask the proxy to render JavaScript with a headless browser
    pub render_js: bool,

    pub proxy_country: String,

    pub proxy_type: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            api_url: DEFAULT_API_URL.to_string(),
            timeout_seconds: 120,
            max_retries: 3,
            base_delay_ms: 5_000,
            max_delay_ms: 30_000,
            render_js: true,
            proxy_country: "FR".to_string(),
            proxy_type: "residential".to_string(),
        }
    }
}

// The API key never shows up in logs or --dry-run output.
impl fmt::Debug for FetchConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FetchConfig")
            .field("api_key", &mask_key(&self.api_key))
            .field("api_url", &self.api_url)
            .field("timeout_seconds", &self.timeout_seconds)
            .field("max_retries", &self.max_retries)
            .field("base_delay_ms", &self.base_delay_ms)
            .field("max_delay_ms", &self.max_delay_ms)
            .field("render_js", &self.render_js)
            .field("proxy_country", &self.proxy_country)
            .field("proxy_type", &self.proxy_type)
            .finish()
    }
}

/// Masks all but the last four characters of a secret
pub fn mask_key(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() <= 4 {
        return "*".repeat(chars.len());
    }
    let visible: String = chars[chars.len() - 4..].iter().collect();
    format!("{}{}", "*".repeat(chars.len() - 4), visible)
}

/// Detail-page enrichment settings
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct EnrichmentConfig {
    /// Number of concurrent detail-page workers
    pub max_workers: usize,

    /// Whether to fetch detail pages at all
    pub fetch_details: bool,
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        Self {
            max_workers: 10,
            fetch_details: true,
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct OutputConfig {
    /// Path to the CSV file
    pub output_path: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            output_path: "properties.csv".to_string(),
        }
    }
}

/// Contract type of the searched listings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ContractType {
    Buy,
    Rent,
}

impl ContractType {
    /// Path segment used by Bien'ici search URLs
    pub fn site_segment(&self) -> &'static str {
        match self {
            Self::Buy => "achat",
            Self::Rent => "location",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Buy => "buy",
            Self::Rent => "rent",
        }
    }
}

impl fmt::Display for ContractType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Property type filter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum PropertyType {
    All,
    Apartment,
    House,
    Land,
    Parking,
    Commercial,
    Office,
}

impl PropertyType {
    /// Path segment used by Bien'ici search URLs (`None` means no filter)
    pub fn site_segment(&self) -> Option<&'static str> {
        match self {
            Self::All => None,
            Self::Apartment => Some("appartement"),
            Self::House => Some("maisonvilla"),
            Self::Land => Some("terrain"),
            Self::Parking => Some("parking"),
            Self::Commercial => Some("commerce"),
            Self::Office => Some("bureaux"),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Apartment => "apartment",
            Self::House => "house",
            Self::Land => "land",
            Self::Parking => "parking",
            Self::Commercial => "commercial",
            Self::Office => "office",
        }
    }
}

impl fmt::Display for PropertyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Policy applied when a search page fails after all retries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum PageErrorPolicy {
    /// Stop enumeration and report the failure; records already written are kept
    #[default]
    Abort,
    /// Log the failure and move on to the next page
    Skip,
}

impl fmt::Display for PageErrorPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Abort => f.write_str("abort"),
            Self::Skip => f.write_str("skip"),
        }
    }
}
