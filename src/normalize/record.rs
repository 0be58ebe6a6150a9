//! The canonical output row

use std::fmt;

/// Output columns, in output order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Field {
    Url,
    ListingId,
    Title,
    PropertyType,
    ContractType,
    Price,
    PricePerSqm,
    PriceWithoutFees,
    AgencyFeesPercent,
    City,
    District,
    PostalCode,
    FullAddress,
    LivingArea,
    Rooms,
    Bedrooms,
    Floor,
    Exposure,
    HeatingType,
    EnergyRating,
    EnergyConsumption,
    GesRating,
    GesEmission,
    EnergyBillMin,
    EnergyBillMax,
    HasVideo,
    IsExclusive,
    PriceDrop,
    AgencyName,
    AgencyAddress,
    MandateType,
    Reference,
    Description,
    PublishedDate,
    ModifiedDate,
    DateScraped,
}

/// Number of output columns
pub const FIELD_COUNT: usize = 36;

impl Field {
    /// All columns in output order
    pub const ALL: [Field; FIELD_COUNT] = [
        Field::Url,
        Field::ListingId,
        Field::Title,
        Field::PropertyType,
        Field::ContractType,
        Field::Price,
        Field::PricePerSqm,
        Field::PriceWithoutFees,
        Field::AgencyFeesPercent,
        Field::City,
        Field::District,
        Field::PostalCode,
        Field::FullAddress,
        Field::LivingArea,
        Field::Rooms,
        Field::Bedrooms,
        Field::Floor,
        Field::Exposure,
        Field::HeatingType,
        Field::EnergyRating,
        Field::EnergyConsumption,
        Field::GesRating,
        Field::GesEmission,
        Field::EnergyBillMin,
        Field::EnergyBillMax,
        Field::HasVideo,
        Field::IsExclusive,
        Field::PriceDrop,
        Field::AgencyName,
        Field::AgencyAddress,
        Field::MandateType,
        Field::Reference,
        Field::Description,
        Field::PublishedDate,
        Field::ModifiedDate,
        Field::DateScraped,
    ];

    /// Column index in the output row
    pub fn index(self) -> usize {
        self as usize
    }

    /// Column header name
    pub fn name(self) -> &'static str {
        match self {
            Self::Url => "url",
            Self::ListingId => "listing_id",
            Self::Title => "title",
            Self::PropertyType => "property_type",
            Self::ContractType => "contract_type",
            Self::Price => "price",
            Self::PricePerSqm => "price_per_sqm",
            Self::PriceWithoutFees => "price_without_fees",
            Self::AgencyFeesPercent => "agency_fees_percent",
            Self::City => "city",
            Self::District => "district",
            Self::PostalCode => "postal_code",
            Self::FullAddress => "full_address",
            Self::LivingArea => "living_area",
            Self::Rooms => "rooms",
            Self::Bedrooms => "bedrooms",
            Self::Floor => "floor",
            Self::Exposure => "exposure",
            Self::HeatingType => "heating_type",
            Self::EnergyRating => "energy_rating",
            Self::EnergyConsumption => "energy_consumption",
            Self::GesRating => "ges_rating",
            Self::GesEmission => "ges_emission",
            Self::EnergyBillMin => "energy_bill_min",
            Self::EnergyBillMax => "energy_bill_max",
            Self::HasVideo => "has_video",
            Self::IsExclusive => "is_exclusive",
            Self::PriceDrop => "price_drop",
            Self::AgencyName => "agency_name",
            Self::AgencyAddress => "agency_address",
            Self::MandateType => "mandate_type",
            Self::Reference => "reference",
            Self::Description => "description",
            Self::PublishedDate => "published_date",
            Self::ModifiedDate => "modified_date",
            Self::DateScraped => "date_scraped",
        }
    }

    /// Header row
    pub fn header() -> Vec<&'static str> {
        Self::ALL.iter().map(|f| f.name()).collect()
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A typed cell value
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Text(String),
    Integer(i64),
    Decimal(f64),
    Flag(bool),
}

impl Value {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Self::Integer(n) => Some(*n),
            _ => None,
        }
    }

    /// Numeric view of integers and decimals
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Integer(n) => Some(*n as f64),
            Self::Decimal(d) => Some(*d),
            _ => None,
        }
    }

    pub fn as_flag(&self) -> Option<bool> {
        match self {
            Self::Flag(b) => Some(*b),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(s) => f.write_str(s),
            Self::Integer(n) => write!(f, "{}", n),
            Self::Decimal(d) => write!(f, "{}", d),
            Self::Flag(b) => write!(f, "{}", b),
        }
    }
}

/// One normalized listing
///
/// Every column is independently nullable; `None` means the value was not
/// extracted. Records are built once by the normalizer and never mutated
/// afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedRecord {
    values: Vec<Option<Value>>,
}

impl NormalizedRecord {
    pub(crate) fn empty() -> Self {
        Self {
            values: vec![None; FIELD_COUNT],
        }
    }

    pub(crate) fn set(&mut self, field: Field, value: Option<Value>) {
        self.values[field.index()] = value;
    }

    pub fn get(&self, field: Field) -> Option<&Value> {
        self.values[field.index()].as_ref()
    }

    pub fn listing_id(&self) -> Option<&str> {
        self.get(Field::ListingId).and_then(Value::as_text)
    }

    /// Cells in column order, `None` for unknown values
    pub fn values(&self) -> impl Iterator<Item = Option<&Value>> {
        self.values.iter().map(Option::as_ref)
    }

    /// Renders the row as strings; unknown values become empty cells
    pub fn to_row(&self) -> Vec<String> {
        self.values()
            .map(|v| v.map(|v| v.to_string()).unwrap_or_default())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_order_matches_index() {
        for (i, field) in Field::ALL.iter().enumerate() {
            assert_eq!(field.index(), i, "Field {} out of order", field);
        }
    }

    #[test]
    fn test_header_is_unique() {
        let header = Field::header();
        assert_eq!(header.len(), FIELD_COUNT);
        assert_eq!(header[0], "url");
        assert_eq!(header[FIELD_COUNT - 1], "date_scraped");

        let mut sorted = header.clone();
        sorted.sort();
        sorted.dedup();
        assert_eq!(sorted.len(), FIELD_COUNT);
    }

    #[test]
    fn test_to_row_renders_unknown_as_empty() {
        let mut record = NormalizedRecord::empty();
        record.set(Field::ListingId, Some(Value::Text("abc".to_string())));
        record.set(Field::Price, Some(Value::Integer(250_000)));
        record.set(Field::HasVideo, Some(Value::Flag(false)));

        let row = record.to_row();
        assert_eq!(row.len(), FIELD_COUNT);
        assert_eq!(row[Field::ListingId.index()], "abc");
        assert_eq!(row[Field::Price.index()], "250000");
        assert_eq!(row[Field::HasVideo.index()], "false");
        assert_eq!(row[Field::PricePerSqm.index()], "");
        assert_eq!(record.listing_id(), Some("abc"));
    }
}
