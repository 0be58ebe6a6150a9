use crate::config::types::{Config, ContractType, PageErrorPolicy, PropertyType};
use crate::config::validation::validate;
use crate::ConfigError;
use sha2::{Digest, Sha256};
use std::path::Path;

/// Values supplied on the command line (or via environment) that take
/// precedence over the configuration file
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub location: Option<String>,
    pub contract_type: Option<ContractType>,
    pub property_type: Option<PropertyType>,
    pub output_path: Option<String>,
    pub item_limit: Option<usize>,
    pub max_pages: Option<u32>,
    pub max_workers: Option<usize>,
    pub no_details: bool,
    pub api_key: Option<String>,
    pub timeout_seconds: Option<u64>,
    pub max_retries: Option<u32>,
    pub on_page_error: Option<PageErrorPolicy>,
}

impl ConfigOverrides {
    /// Applies every set override onto the configuration
    pub fn apply(self, config: &mut Config) {
        if let Some(location) = self.location {
            config.search.location = location;
        }
        if let Some(contract_type) = self.contract_type {
            config.search.contract_type = contract_type;
        }
        if let Some(property_type) = self.property_type {
            config.search.property_type = property_type;
        }
        if let Some(output_path) = self.output_path {
            config.output.output_path = output_path;
        }
        if self.item_limit.is_some() {
            config.limits.item_limit = self.item_limit;
        }
        if self.max_pages.is_some() {
            config.limits.max_pages = self.max_pages;
        }
        if let Some(max_workers) = self.max_workers {
            config.enrichment.max_workers = max_workers;
        }
        if self.no_details {
            config.enrichment.fetch_details = false;
        }
        if let Some(api_key) = self.api_key {
            config.fetch.api_key = api_key;
        }
        if let Some(timeout_seconds) = self.timeout_seconds {
            config.fetch.timeout_seconds = timeout_seconds;
        }
        if let Some(max_retries) = self.max_retries {
            config.fetch.max_retries = max_retries;
        }
        if let Some(policy) = self.on_page_error {
            config.on_page_error = policy;
        }
    }
}

/// Parses a configuration file without validating it
///
/// Every section is optional; missing values fall back to defaults.
pub fn parse_config_file(path: &Path) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let config: Config = toml::from_str(&content)?;
    Ok(config)
}

/// Loads and parses a configuration file from the given path
///
/// # Arguments
///
/// * `path` - Path to the TOML configuration file
///
/// # Returns
///
/// * `Ok(Config)` - Successfully loaded and validated configuration
/// * `Err(ConfigError)` - Failed to load, parse, or validate the configuration
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let config = parse_config_file(path)?;
    validate(&config)?;
    Ok(config)
}

/// Computes a SHA-256 hash of the configuration file content
///
/// Logged at startup so that a CSV can be traced back to the settings that
/// produced it.
///
/// # Returns
///
/// * `Ok(String)` - Hex-encoded SHA-256 hash of the file content
/// * `Err(ConfigError)` - Failed to read the file
pub fn compute_config_hash(path: &Path) -> Result<String, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    let result = hasher.finalize();
    Ok(hex::encode(result))
}

/// Loads a configuration and returns both the config and its hash
pub fn load_config_with_hash(path: &Path) -> Result<(Config, String), ConfigError> {
    let config = load_config(path)?;
    let hash = compute_config_hash(path)?;
    Ok((config, hash))
}

/// Builds the effective configuration for a run
///
/// Starts from the file (if any) or defaults, layers the overrides on top and
/// validates the result. The file hash is returned when a file was used.
pub fn resolve_config(
    path: Option<&Path>,
    overrides: ConfigOverrides,
) -> Result<(Config, Option<String>), ConfigError> {
    let (mut config, hash) = match path {
        Some(path) => (parse_config_file(path)?, Some(compute_config_hash(path)?)),
        None => (Config::default(), None),
    };

    overrides.apply(&mut config);
    validate(&config)?;

    Ok((config, hash))
}
