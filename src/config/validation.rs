use crate::config::types::{
    Config, EnrichmentConfig, FetchConfig, LimitsConfig, OutputConfig, SearchConfig,
};
use crate::ConfigError;
use url::Url;

/// Upper bound on detail workers; the proxy plan caps concurrency well below this
const MAX_WORKERS: usize = 100;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_fetch_config(&config.fetch)?;
    validate_search_config(&config.search)?;
    validate_limits_config(&config.limits)?;
    validate_enrichment_config(&config.enrichment)?;
    validate_output_config(&config.output)?;
    Ok(())
}

/// Validates fetch configuration
///
/// The API key is checked first: without it nothing else matters.
fn validate_fetch_config(config: &FetchConfig) -> Result<(), ConfigError> {
    if config.api_key.trim().is_empty() {
        return Err(ConfigError::MissingApiKey);
    }

    let api_url = Url::parse(&config.api_url).map_err(|e| ConfigError::InvalidValue {
        field: "api_url".to_string(),
        message: e.to_string(),
    })?;
    if api_url.scheme() != "http" && api_url.scheme() != "https" {
        return Err(ConfigError::InvalidValue {
            field: "api_url".to_string(),
            message: format!("unsupported scheme '{}'", api_url.scheme()),
        });
    }

    if config.timeout_seconds < 1 {
        return Err(ConfigError::Validation(format!(
            "timeout_seconds must be >= 1, got {}",
            config.timeout_seconds
        )));
    }

    if config.max_retries < 1 {
        return Err(ConfigError::Validation(format!(
            "max_retries must be >= 1, got {}",
            config.max_retries
        )));
    }

    if config.max_delay_ms < config.base_delay_ms {
        return Err(ConfigError::Validation(format!(
            "max_delay_ms ({}) must be >= base_delay_ms ({})",
            config.max_delay_ms, config.base_delay_ms
        )));
    }

    Ok(())
}

/// Validates search configuration
fn validate_search_config(config: &SearchConfig) -> Result<(), ConfigError> {
    let location = config.location.trim();
    if location.is_empty() {
        return Err(ConfigError::Validation(
            "location cannot be empty".to_string(),
        ));
    }

    if !location
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ConfigError::InvalidValue {
            field: "location".to_string(),
            message: format!(
                "'{}' must contain only letters, digits, hyphens and underscores",
                location
            ),
        });
    }

    Url::parse(&config.base_url).map_err(|e| ConfigError::InvalidValue {
        field: "base_url".to_string(),
        message: e.to_string(),
    })?;

    Ok(())
}

/// Validates limits configuration
fn validate_limits_config(config: &LimitsConfig) -> Result<(), ConfigError> {
    if config.item_limit == Some(0) {
        return Err(ConfigError::Validation(
            "limit must be >= 1 when set".to_string(),
        ));
    }

    if config.max_pages == Some(0) {
        return Err(ConfigError::Validation(
            "max_pages must be >= 1 when set".to_string(),
        ));
    }

    Ok(())
}

/// Validates enrichment configuration
fn validate_enrichment_config(config: &EnrichmentConfig) -> Result<(), ConfigError> {
    if config.max_workers < 1 || config.max_workers > MAX_WORKERS {
        return Err(ConfigError::Validation(format!(
            "max_workers must be between 1 and {}, got {}",
            MAX_WORKERS, config.max_workers
        )));
    }

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.output_path.trim().is_empty() {
        return Err(ConfigError::Validation(
            "output_path cannot be empty".to_string(),
        ));
    }

    Ok(())
}
