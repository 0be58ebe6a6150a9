//! Listing data as it comes out of the extractor
//!
//! Values here are raw strings exactly as found on the page (`"430 000 €"`,
//! `"78 m²"`). Coercion into typed columns happens in the normalizer.

use std::collections::BTreeMap;

/// Raw extracted values keyed by source key
pub type RawFields = BTreeMap<String, String>;

/// Source keys emitted by extractors
pub mod keys {
    pub const TITLE: &str = "title";
    pub const PROPERTY_TYPE: &str = "property_type";
    pub const CONTRACT_TYPE: &str = "contract_type";
    pub const PRICE: &str = "price";
    pub const PRICE_WITHOUT_FEES: &str = "price_without_fees";
    pub const AGENCY_FEES: &str = "agency_fees";
    pub const CITY: &str = "city";
    pub const DISTRICT: &str = "district";
    pub const POSTAL_CODE: &str = "postal_code";
    pub const ADDRESS: &str = "address";
    pub const AREA: &str = "area";
    pub const ROOMS: &str = "rooms";
    pub const BEDROOMS: &str = "bedrooms";
    pub const FLOOR: &str = "floor";
    pub const EXPOSURE: &str = "exposure";
    pub const HEATING: &str = "heating";
    pub const ENERGY_RATING: &str = "energy_rating";
    pub const ENERGY_CONSUMPTION: &str = "energy_consumption";
    pub const GES_RATING: &str = "ges_rating";
    pub const GES_EMISSION: &str = "ges_emission";
    pub const ENERGY_BILL_MIN: &str = "energy_bill_min";
    pub const ENERGY_BILL_MAX: &str = "energy_bill_max";
    pub const VIDEO_MARKER: &str = "video_marker";
    pub const EXCLUSIVE_MARKER: &str = "exclusive_marker";
    pub const PRICE_DROP_MARKER: &str = "price_drop_marker";
    pub const AGENCY_NAME: &str = "agency_name";
    pub const AGENCY_ADDRESS: &str = "agency_address";
    pub const MANDATE_TYPE: &str = "mandate_type";
    pub const REFERENCE: &str = "reference";
    pub const DESCRIPTION: &str = "description";
    pub const PUBLISHED_DATE: &str = "published_date";
    pub const MODIFIED_DATE: &str = "modified_date";
}

/// Keys whose detail-page value replaces the search-card value
///
/// For every other key the card value wins and the detail page only fills
/// gaps.
pub const DETAIL_AUTHORITATIVE_KEYS: &[&str] = &[
    keys::DESCRIPTION,
    keys::AGENCY_NAME,
    keys::AGENCY_ADDRESS,
    keys::ENERGY_RATING,
    keys::GES_RATING,
    keys::FLOOR,
    keys::EXPOSURE,
    keys::HEATING,
    keys::PUBLISHED_DATE,
    keys::MODIFIED_DATE,
    keys::REFERENCE,
    keys::MANDATE_TYPE,
    keys::ENERGY_CONSUMPTION,
    keys::GES_EMISSION,
    keys::ENERGY_BILL_MIN,
    keys::ENERGY_BILL_MAX,
    keys::PRICE_WITHOUT_FEES,
    keys::AGENCY_FEES,
];

/// Lightweight listing from a search-results page
#[derive(Debug, Clone, PartialEq)]
pub struct ListingSummary {
    /// Listing identifier, stable across pages
    pub id: String,

    /// Absolute URL of the listing's own page
    pub url: String,

    /// Values visible on the search card
    pub fields: RawFields,
}

impl ListingSummary {
    pub fn new(id: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            url: url.into(),
            fields: RawFields::new(),
        }
    }

    /// Builder-style setter for a raw field
    pub fn with_field(mut self, key: &str, value: impl Into<String>) -> Self {
        self.fields.insert(key.to_string(), value.into());
        self
    }

    pub fn field(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(String::as_str)
    }
}

/// Values only available on the listing's own page
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListingDetail {
    pub fields: RawFields,
}

impl ListingDetail {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_field(mut self, key: &str, value: impl Into<String>) -> Self {
        self.fields.insert(key.to_string(), value.into());
        self
    }

    pub fn field(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(String::as_str)
    }
}

/// Merges detail values into the summary's fields
///
/// A non-empty detail value is taken when the card has no (or an empty)
/// value for that key, or when the key is detail-authoritative. Empty detail
/// values never replace anything.
pub fn merge_fields(summary: &ListingSummary, detail: Option<&ListingDetail>) -> RawFields {
    let mut merged = summary.fields.clone();

    let Some(detail) = detail else {
        return merged;
    };

    for (key, value) in &detail.fields {
        if value.trim().is_empty() {
            continue;
        }

        let card_missing = merged
            .get(key)
            .map(|existing| existing.trim().is_empty())
            .unwrap_or(true);

        if card_missing || DETAIL_AUTHORITATIVE_KEYS.contains(&key.as_str()) {
            merged.insert(key.clone(), value.clone());
        }
    }

    merged
}
