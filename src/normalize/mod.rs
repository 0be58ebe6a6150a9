//! Deduplication and normalization of extracted listings
//!
//! This module turns raw extractor output into [`NormalizedRecord`]s:
//! - Merging search-card and detail-page values
//! - Coercing raw strings through the [`FIELD_MAPPINGS`] table
//! - Deriving `price_per_sqm` and stamping `date_scraped`
//! - Guaranteeing one record per listing identifier

mod dedup;
mod mapping;
mod model;
mod record;

pub use dedup::Deduplicator;
pub use mapping::{Coercion, FieldMapping, FIELD_MAPPINGS};
pub use model::{
    keys, merge_fields, ListingDetail, ListingSummary, RawFields, DETAIL_AUTHORITATIVE_KEYS,
};
pub use record::{Field, NormalizedRecord, Value, FIELD_COUNT};

use chrono::{DateTime, SecondsFormat, Utc};

/// Builds normalized records from summaries and optional details
#[derive(Debug, Clone, Copy)]
pub struct Normalizer {
    mappings: &'static [FieldMapping],
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Normalizer {
    pub fn new() -> Self {
        Self {
            mappings: FIELD_MAPPINGS,
        }
    }

    /// Uses a custom mapping table
    pub fn with_mappings(mappings: &'static [FieldMapping]) -> Self {
        Self { mappings }
    }

    /// Normalizes a listing, stamping the current time
    pub fn normalize(
        &self,
        summary: &ListingSummary,
        detail: Option<&ListingDetail>,
    ) -> NormalizedRecord {
        self.normalize_at(summary, detail, Utc::now())
    }

    /// Normalizes a listing with an explicit scrape timestamp
    pub fn normalize_at(
        &self,
        summary: &ListingSummary,
        detail: Option<&ListingDetail>,
        scraped_at: DateTime<Utc>,
    ) -> NormalizedRecord {
        let merged = merge_fields(summary, detail);
        let mut record = NormalizedRecord::empty();

        record.set(Field::Url, Coercion::Text.apply(&summary.url));
        record.set(Field::ListingId, Coercion::Text.apply(&summary.id));

        for mapping in self.mappings {
            if let Some(raw) = merged.get(mapping.source) {
                record.set(mapping.target, mapping.coercion.apply(raw));
            }
        }

        let price_per_sqm = price_per_sqm(
            record.get(Field::Price).and_then(Value::as_f64),
            record.get(Field::LivingArea).and_then(Value::as_f64),
        );
        record.set(Field::PricePerSqm, price_per_sqm.map(Value::Decimal));

        record.set(
            Field::DateScraped,
            Some(Value::Text(
                scraped_at.to_rfc3339_opts(SecondsFormat::Secs, true),
            )),
        );

        record
    }
}

/// Price per square meter, rounded to cents
///
/// Unknown unless both inputs are known and the area is strictly positive.
pub fn price_per_sqm(price: Option<f64>, living_area: Option<f64>) -> Option<f64> {
    match (price, living_area) {
        (Some(price), Some(area)) if area > 0.0 && price.is_finite() && area.is_finite() => {
            let value = (price / area * 100.0).round() / 100.0;
            Some(value).filter(|v| v.is_finite())
        }
        _ => None,
    }
}
