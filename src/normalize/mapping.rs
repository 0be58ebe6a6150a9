//! Declarative source-key to column mapping
//!
//! Each entry names a raw extractor key, the output column it feeds and the
//! coercion applied on the way. Columns not listed here (`url`, `listing_id`,
//! `price_per_sqm`, `date_scraped`) are filled by the normalizer itself.

use crate::normalize::model::keys;
use crate::normalize::record::{Field, Value};

/// How a raw string becomes a typed value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Coercion {
    /// Trimmed text with internal whitespace collapsed
    Text,
    /// All digits in the value, e.g. `"430 000 €"` → 430000
    Integer,
    /// First number, comma or dot decimal separator, e.g. `"78,5 m²"` → 78.5
    Decimal,
    /// First run of digits, e.g. `"3 pièces"` → 3
    Count,
    /// Single energy class letter A–G
    Grade,
    /// Presence marker: non-empty → true, empty → false
    Marker,
}

/// One row of the mapping table
#[derive(Debug, Clone, Copy)]
pub struct FieldMapping {
    pub source: &'static str,
    pub target: Field,
    pub coercion: Coercion,
}

const fn map(source: &'static str, target: Field, coercion: Coercion) -> FieldMapping {
    FieldMapping {
        source,
        target,
        coercion,
    }
}

/// The mapping table
pub const FIELD_MAPPINGS: &[FieldMapping] = &[
    map(keys::TITLE, Field::Title, Coercion::Text),
    map(keys::PROPERTY_TYPE, Field::PropertyType, Coercion::Text),
    map(keys::CONTRACT_TYPE, Field::ContractType, Coercion::Text),
    map(keys::PRICE, Field::Price, Coercion::Integer),
    map(keys::PRICE_WITHOUT_FEES, Field::PriceWithoutFees, Coercion::Integer),
    map(keys::AGENCY_FEES, Field::AgencyFeesPercent, Coercion::Decimal),
    map(keys::CITY, Field::City, Coercion::Text),
    map(keys::DISTRICT, Field::District, Coercion::Text),
    map(keys::POSTAL_CODE, Field::PostalCode, Coercion::Text),
    map(keys::ADDRESS, Field::FullAddress, Coercion::Text),
    map(keys::AREA, Field::LivingArea, Coercion::Decimal),
    map(keys::ROOMS, Field::Rooms, Coercion::Count),
    map(keys::BEDROOMS, Field::Bedrooms, Coercion::Count),
    map(keys::FLOOR, Field::Floor, Coercion::Text),
    map(keys::EXPOSURE, Field::Exposure, Coercion::Text),
    map(keys::HEATING, Field::HeatingType, Coercion::Text),
    map(keys::ENERGY_RATING, Field::EnergyRating, Coercion::Grade),
    map(keys::ENERGY_CONSUMPTION, Field::EnergyConsumption, Coercion::Integer),
    map(keys::GES_RATING, Field::GesRating, Coercion::Grade),
    map(keys::GES_EMISSION, Field::GesEmission, Coercion::Integer),
    map(keys::ENERGY_BILL_MIN, Field::EnergyBillMin, Coercion::Integer),
    map(keys::ENERGY_BILL_MAX, Field::EnergyBillMax, Coercion::Integer),
    map(keys::VIDEO_MARKER, Field::HasVideo, Coercion::Marker),
    map(keys::EXCLUSIVE_MARKER, Field::IsExclusive, Coercion::Marker),
    map(keys::PRICE_DROP_MARKER, Field::PriceDrop, Coercion::Marker),
    map(keys::AGENCY_NAME, Field::AgencyName, Coercion::Text),
    map(keys::AGENCY_ADDRESS, Field::AgencyAddress, Coercion::Text),
    map(keys::MANDATE_TYPE, Field::MandateType, Coercion::Text),
    map(keys::REFERENCE, Field::Reference, Coercion::Text),
    map(keys::DESCRIPTION, Field::Description, Coercion::Text),
    map(keys::PUBLISHED_DATE, Field::PublishedDate, Coercion::Text),
    map(keys::MODIFIED_DATE, Field::ModifiedDate, Coercion::Text),
];

impl Coercion {
    /// Applies the coercion; `None` when nothing usable is in the input
    pub fn apply(self, raw: &str) -> Option<Value> {
        match self {
            Self::Text => coerce_text(raw).map(Value::Text),
            Self::Integer => coerce_integer(raw).map(Value::Integer),
            Self::Decimal => coerce_decimal(raw).map(Value::Decimal),
            Self::Count => coerce_count(raw).map(Value::Integer),
            Self::Grade => coerce_grade(raw).map(Value::Text),
            Self::Marker => Some(Value::Flag(!raw.trim().is_empty())),
        }
    }
}

fn coerce_text(raw: &str) -> Option<String> {
    let collapsed = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.is_empty() {
        None
    } else {
        Some(collapsed)
    }
}

fn coerce_integer(raw: &str) -> Option<i64> {
    let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return None;
    }
    digits.parse().ok()
}

fn coerce_decimal(raw: &str) -> Option<f64> {
    let mut number = String::new();
    let mut seen_separator = false;

    for c in raw.chars() {
        if c.is_ascii_digit() {
            number.push(c);
        } else if (c == ',' || c == '.') && !number.is_empty() && !seen_separator {
            number.push('.');
            seen_separator = true;
        } else if !number.is_empty() {
            break;
        }
    }

    let number = number.trim_end_matches('.');
    if number.is_empty() {
        return None;
    }
    number.parse::<f64>().ok().filter(|v| v.is_finite())
}

fn coerce_count(raw: &str) -> Option<i64> {
    let digits: String = raw
        .chars()
        .skip_while(|c| !c.is_ascii_digit())
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().ok()
}

fn coerce_grade(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    let mut chars = trimmed.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) if ('A'..='G').contains(&c.to_ascii_uppercase()) => {
            Some(c.to_ascii_uppercase().to_string())
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_source_key_mapped_once() {
        let mut sources: Vec<_> = FIELD_MAPPINGS.iter().map(|m| m.source).collect();
        sources.sort();
        let before = sources.len();
        sources.dedup();
        assert_eq!(before, sources.len());
    }

    #[test]
    fn test_computed_columns_not_in_table() {
        for mapping in FIELD_MAPPINGS {
            assert!(!matches!(
                mapping.target,
                Field::Url | Field::ListingId | Field::PricePerSqm | Field::DateScraped
            ));
        }
    }

    #[test]
    fn test_text() {
        assert_eq!(
            Coercion::Text.apply("  Appartement \n 3 pièces "),
            Some(Value::Text("Appartement 3 pièces".to_string()))
        );
        assert_eq!(Coercion::Text.apply("   "), None);
    }

    #[test]
    fn test_integer() {
        assert_eq!(
            Coercion::Integer.apply("430 000 €"),
            Some(Value::Integer(430_000))
        );
        assert_eq!(
            Coercion::Integer.apply("1\u{a0}250\u{202f}000 €"),
            Some(Value::Integer(1_250_000))
        );
        assert_eq!(Coercion::Integer.apply("Prix sur demande"), None);
    }

    #[test]
    fn test_decimal() {
        assert_eq!(Coercion::Decimal.apply("78,5 m²"), Some(Value::Decimal(78.5)));
        assert_eq!(Coercion::Decimal.apply("4.17 %"), Some(Value::Decimal(4.17)));
        assert_eq!(Coercion::Decimal.apply("120 m²"), Some(Value::Decimal(120.0)));
        assert_eq!(Coercion::Decimal.apply("m²"), None);
        assert_eq!(Coercion::Decimal.apply(", 5"), Some(Value::Decimal(5.0)));
    }

    #[test]
    fn test_count() {
        assert_eq!(Coercion::Count.apply("3 pièces"), Some(Value::Integer(3)));
        assert_eq!(Coercion::Count.apply("T4 - 2 chambres"), Some(Value::Integer(4)));
        assert_eq!(Coercion::Count.apply("studio"), None);
    }

    #[test]
    fn test_grade() {
        assert_eq!(Coercion::Grade.apply(" d "), Some(Value::Text("D".to_string())));
        assert_eq!(Coercion::Grade.apply("H"), None);
        assert_eq!(Coercion::Grade.apply("AB"), None);
        assert_eq!(Coercion::Grade.apply(""), None);
    }

    #[test]
    fn test_marker() {
        assert_eq!(Coercion::Marker.apply("Vidéo"), Some(Value::Flag(true)));
        assert_eq!(Coercion::Marker.apply(""), Some(Value::Flag(false)));
    }
}
