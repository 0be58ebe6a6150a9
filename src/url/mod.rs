//! URL templating for Bien'ici
//!
//! This module builds search-page and detail-page URLs and canonicalizes
//! listing links found on search pages. The pipeline only sees the
//! [`UrlTemplate`] trait, so another portal can be plugged in without
//! touching pagination or enrichment.

mod locations;
mod normalize;

use crate::config::{ContractType, PropertyType, SearchConfig};
use crate::normalize::ListingSummary;

// Re-export main functions
pub use locations::{known_locations, location_code};
pub use normalize::{listing_id_from_url, normalize_listing_url, LISTING_PATH_MARKER};

/// Parameters of one search
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    pub location: String,
    pub contract_type: ContractType,
    pub property_type: PropertyType,
}

impl SearchQuery {
    pub fn new(
        location: impl Into<String>,
        contract_type: ContractType,
        property_type: PropertyType,
    ) -> Self {
        Self {
            location: location.into(),
            contract_type,
            property_type,
        }
    }
}

impl From<&SearchConfig> for SearchQuery {
    fn from(config: &SearchConfig) -> Self {
        Self::new(
            config.location.clone(),
            config.contract_type,
            config.property_type,
        )
    }
}

/// Builds the URLs the pipeline fetches
pub trait UrlTemplate: Send + Sync {
    /// URL of search-results page `page` (1-based)
    fn search_url(&self, query: &SearchQuery, page: u32) -> String;

    /// URL of the listing's own page
    fn detail_url(&self, summary: &ListingSummary) -> String;
}

/// Bien'ici URL scheme
///
/// Search pages follow `{base}/recherche/{contract}/{location}[/{type}]` with
/// `?page=N` appended from page 2 on.
#[derive(Debug, Clone)]
pub struct BieniciUrls {
    base_url: String,
}

impl BieniciUrls {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { base_url }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

impl Default for BieniciUrls {
    fn default() -> Self {
        Self::new(crate::config::DEFAULT_BASE_URL)
    }
}

impl UrlTemplate for BieniciUrls {
    fn search_url(&self, query: &SearchQuery, page: u32) -> String {
        let mut parts = vec![
            format!("{}/recherche", self.base_url),
            query.contract_type.site_segment().to_string(),
            location_code(&query.location),
        ];

        if let Some(segment) = query.property_type.site_segment() {
            parts.push(segment.to_string());
        }

        let mut url = parts.join("/");
        if page > 1 {
            url.push_str(&format!("?page={}", page));
        }
        url
    }

    fn detail_url(&self, summary: &ListingSummary) -> String {
        summary.url.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(property_type: PropertyType) -> SearchQuery {
        SearchQuery::new("paris", ContractType::Buy, property_type)
    }

    #[test]
    fn test_first_page_has_no_page_param() {
        let urls = BieniciUrls::default();
        assert_eq!(
            urls.search_url(&query(PropertyType::All), 1),
            "https://www.bienici.com/recherche/achat/paris-75000"
        );
    }

    #[test]
    fn test_property_type_and_page() {
        let urls = BieniciUrls::default();
        assert_eq!(
            urls.search_url(&query(PropertyType::Apartment), 3),
            "https://www.bienici.com/recherche/achat/paris-75000/appartement?page=3"
        );
    }

    #[test]
    fn test_rent_and_custom_base() {
        let urls = BieniciUrls::new("http://127.0.0.1:8080/");
        let query = SearchQuery::new("lille", ContractType::Rent, PropertyType::House);
        assert_eq!(
            urls.search_url(&query, 2),
            "http://127.0.0.1:8080/recherche/location/lille-59000/maisonvilla?page=2"
        );
    }

    #[test]
    fn test_detail_url_is_listing_url() {
        let urls = BieniciUrls::default();
        let summary = ListingSummary::new("ag-1", "https://www.bienici.com/annonce/vente/paris/ag-1");
        assert_eq!(urls.detail_url(&summary), summary.url);
    }

    #[test]
    fn test_query_from_config() {
        let config = SearchConfig::default();
        let query = SearchQuery::from(&config);
        assert_eq!(query.location, "paris");
        assert_eq!(query.contract_type, ContractType::Buy);
    }
}
