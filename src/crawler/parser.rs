//! HTML extraction for Bien'ici pages
//!
//! This module turns raw page bodies into listing data:
//! - Search pages: one [`ListingSummary`] per listing card, plus paging hints
//! - Detail pages: a [`ListingDetail`] with the fields only shown there
//!
//! Values are kept as the raw strings found on the page; typing them is the
//! normalizer's job.

use crate::normalize::{keys, ListingDetail, ListingSummary};
use crate::url::{listing_id_from_url, normalize_listing_url};
use crate::{ConfigError, ScrapeError};
use lazy_static::lazy_static;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use url::Url;

/// Maximum length (in characters) kept from a listing description
pub const MAX_DESCRIPTION_CHARS: usize = 2000;

/// Number with thousands separators as printed on the site ("430 000")
const NUMBER: &str = r"\d[\d \x{a0}\x{202f}]*";

lazy_static! {
    // Listing titles: "Appartement 3 pièces 62 m² 75018 Paris 18e (Grandes Carrières)"
    static ref ROOMS_RE: Regex = Regex::new(r"(\d+)\s*pièces?").unwrap();
    static ref AREA_RE: Regex = Regex::new(r"(\d+(?:[,.]\d+)?)\s*m²").unwrap();
    static ref LOCATION_RE: Regex = Regex::new(r"(\d{5})\s+([^(]+?)(?:\s*\(|$)").unwrap();
    static ref DISTRICT_RE: Regex = Regex::new(r"\(([^)]+)\)").unwrap();
    static ref POSTAL_CODE_RE: Regex = Regex::new(r"\d{5}").unwrap();

    // Search pages
    static ref TOTAL_COUNT_RE: Regex =
        Regex::new(&format!(r"({})\s*biens?\s+à\s+(?:vendre|louer)", NUMBER)).unwrap();
    static ref CARD_PRICE_RE: Regex = Regex::new(&format!(r"{}€", NUMBER)).unwrap();

    // Detail pages
    static ref PRICE_RE: Regex = Regex::new(&format!(r"({})€(\s*/\s*m)?", NUMBER)).unwrap();
    static ref FEES_RE: Regex = Regex::new(r"Honoraires\s*:\s*([\d,.]+)\s*%").unwrap();
    static ref PRICE_WITHOUT_FEES_RE: Regex =
        Regex::new(&format!(r"\(({})\s*€\s*hors\s*honoraires\)", NUMBER)).unwrap();
    static ref BEDROOMS_RE: Regex = Regex::new(r"(\d+)\s*chambres?").unwrap();
    static ref FLOOR_RE: Regex =
        Regex::new(r"(\d+)(?:er|ème|e)?\s*étage|Rez-de-chaussée").unwrap();
    static ref EXPOSURE_RE: Regex =
        Regex::new(r"(?m)Exposée?\s+([\w \-]+?)\s*(?:\.|$)").unwrap();
    static ref HEATING_RE: Regex =
        Regex::new(r"(?m)Chauffage\s*:\s*([^.\n]+?)\s*(?:\.|$)").unwrap();
    static ref GES_RE: Regex =
        Regex::new(r"(?s)(?i:émissions).*?\b([A-G])\s*(\d+)\s*(?i:kg)\s*CO").unwrap();
    static ref ENERGY_BILL_RE: Regex = Regex::new(&format!(
        r"Entre\s*({n})\s*€\s*et\s*({n})\s*€\s*par\s*an",
        n = NUMBER
    ))
    .unwrap();
    static ref ENERGY_RE: Regex = Regex::new(r"(?s)\b([A-G])\b.*?(\d+)\s*kWh").unwrap();
    static ref REFERENCE_RE: Regex =
        Regex::new(r"Réf\.\s*(?:de l'annonce\s*)?:\s*(\S+)").unwrap();
    static ref PUBLISHED_RE: Regex =
        Regex::new(r"Publiée?\s+le\s+(\d+\s+\w+\.?\s+\d+)").unwrap();
    static ref MODIFIED_RE: Regex =
        Regex::new(r"Modifiée?\s+le\s+(\d+\s+\w+\.?\s+\d+)").unwrap();
}

/// French property words found in titles, in match order
const PROPERTY_TYPES: &[(&str, &str)] = &[
    ("appartement", "apartment"),
    ("maison", "house"),
    ("studio", "studio"),
    ("duplex", "duplex"),
    ("loft", "loft"),
    ("terrain", "land"),
    ("parking", "parking"),
    ("commerce", "commercial"),
    ("bureaux", "office"),
    ("villa", "house"),
    ("immeuble", "building"),
];

/// Card markers: (source key, text shown on the card)
const MARKERS: &[(&str, &str)] = &[
    (keys::VIDEO_MARKER, "Vidéo"),
    (keys::EXCLUSIVE_MARKER, "Exclusivité"),
    (keys::PRICE_DROP_MARKER, "Baisse de prix"),
];

/// Everything extracted from one search-results page
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchPage {
    /// Listings in page order
    pub summaries: Vec<ListingSummary>,

    /// Whether the site offers a further page
    pub has_more: bool,

    /// Result count advertised by the site, if shown
    pub total_count: Option<u64>,
}

/// Turns page bodies into listing data
///
/// Extraction is synchronous and CPU-only; implementations are shared
/// between the paginator and every enrichment worker.
pub trait ListingExtractor: Send + Sync {
    /// Parses a search-results page
    ///
    /// # Returns
    ///
    /// * `Ok(SearchPage)` - Possibly empty when the results are exhausted
    /// * `Err(ScrapeError::Extraction)` - The body is not a usable page
    fn extract_search_page(&self, body: &str, url: &str) -> Result<SearchPage, ScrapeError>;

    /// Parses a listing's own page
    fn extract_detail_page(&self, body: &str, url: &str) -> Result<ListingDetail, ScrapeError>;
}

/// Extractor for the Bien'ici markup
#[derive(Debug, Clone)]
pub struct BieniciExtractor {
    base_url: Url,
}

impl BieniciExtractor {
    /// Creates an extractor resolving relative links against `base_url`
    pub fn new(base_url: Url) -> Self {
        Self { base_url }
    }

    /// Creates an extractor from a site root string
    pub fn from_base(base_url: &str) -> Result<Self, ScrapeError> {
        let url = Url::parse(base_url).map_err(|e| ConfigError::InvalidValue {
            field: "base-url".to_string(),
            message: e.to_string(),
        })?;
        Ok(Self::new(url))
    }

    /// Parses one listing card
    ///
    /// Returns None for cards without a usable listing link (ads, banners).
    fn parse_card(&self, article: ElementRef) -> Option<ListingSummary> {
        let href = select_first(article, "a[href*='/annonce/']")?
            .value()
            .attr("href")?;
        let url = normalize_listing_url(href, &self.base_url)?;
        let id = listing_id_from_url(&url)?;

        let mut summary = ListingSummary::new(id, url.as_str());

        if let Some(heading) = select_first(article, "h3") {
            let title = element_text(heading);
            if !title.is_empty() {
                for (key, value) in parse_title_text(&title) {
                    summary.fields.insert(key.to_string(), value);
                }
                summary.fields.insert(keys::TITLE.to_string(), title);
            }
        }

        if let Some(price) = card_price(article) {
            summary.fields.insert(keys::PRICE.to_string(), price);
        }

        let text = article.text().collect::<String>();
        for (key, marker) in MARKERS {
            let value = if text.contains(marker) { *marker } else { "" };
            summary.fields.insert(key.to_string(), value.to_string());
        }

        if let Some(contract) = contract_from_path(url.path()) {
            summary
                .fields
                .insert(keys::CONTRACT_TYPE.to_string(), contract.to_string());
        }

        Some(summary)
    }
}

impl ListingExtractor for BieniciExtractor {
    fn extract_search_page(&self, body: &str, url: &str) -> Result<SearchPage, ScrapeError> {
        if body.trim().is_empty() {
            return Err(ScrapeError::Extraction {
                url: url.to_string(),
                message: "empty response body".to_string(),
            });
        }

        let document = Html::parse_document(body);
        let root = document.root_element();

        let mut summaries = Vec::new();
        for article in select_all(root, "article") {
            match self.parse_card(article) {
                Some(summary) => summaries.push(summary),
                None => tracing::debug!("Skipping card without listing link on {}", url),
            }
        }

        let has_more = if select_first(root, "a[rel='next'], link[rel='next'], a[aria-label*='suivante']")
            .is_some()
        {
            true
        } else if select_first(root, "nav[aria-label*='agination'], .pagination").is_some() {
            false
        } else {
            !summaries.is_empty()
        };

        let total_count = select_all(root, "h2")
            .into_iter()
            .find_map(|heading| parse_total_count(&element_text(heading)));

        Ok(SearchPage {
            summaries,
            has_more,
            total_count,
        })
    }

    fn extract_detail_page(&self, body: &str, url: &str) -> Result<ListingDetail, ScrapeError> {
        if body.trim().is_empty() {
            return Err(ScrapeError::Extraction {
                url: url.to_string(),
                message: "empty response body".to_string(),
            });
        }

        let document = Html::parse_document(body);
        let root = document.root_element();
        let page_text = visible_text(&document);
        let mut detail = ListingDetail::new();

        if let Some(heading) = select_first(root, "h1") {
            let title = element_text(heading);
            if !title.is_empty() {
                for (key, value) in parse_title_text(&title) {
                    detail.fields.insert(key.to_string(), value);
                }
                detail.fields.insert(keys::TITLE.to_string(), title);
            }
        }

        for (key, value) in parse_detail_text(&page_text) {
            detail.fields.insert(key.to_string(), value);
        }

        if let Some((rating, consumption)) = energy_rating(&document) {
            detail.fields.insert(keys::ENERGY_RATING.to_string(), rating);
            if let Some(consumption) = consumption {
                detail
                    .fields
                    .insert(keys::ENERGY_CONSUMPTION.to_string(), consumption);
            }
        }

        if let Some(address) = select_first(root, "address").map(element_text) {
            if !address.is_empty() {
                detail.fields.insert(keys::ADDRESS.to_string(), address);
            }
        }

        const AGENCY_HEADING: &str = "propos de l'agence";
        if let Some(section) = parent_of_text(&document, AGENCY_HEADING).map(enclosing_block) {
            let name = select_all(section, "h1, h2, h3, h4")
                .into_iter()
                .map(element_text)
                .find(|text| !text.is_empty() && !text.contains(AGENCY_HEADING));
            if let Some(name) = name {
                detail.fields.insert(keys::AGENCY_NAME.to_string(), name);
            }
            let address = select_all(section, "div, span, p")
                .into_iter()
                .map(element_text)
                .filter(|text| !text.contains(AGENCY_HEADING))
                .find(|text| text.len() < 100 && POSTAL_CODE_RE.is_match(text));
            if let Some(address) = address {
                detail.fields.insert(keys::AGENCY_ADDRESS.to_string(), address);
            }
        }

        if let Some(description) = description(&document) {
            detail
                .fields
                .insert(keys::DESCRIPTION.to_string(), description);
        }

        for (key, marker) in MARKERS {
            if page_text.contains(marker) {
                detail.fields.insert(key.to_string(), marker.to_string());
            }
        }

        if let Some(contract) = Url::parse(url)
            .ok()
            .and_then(|u| contract_from_path(u.path()))
        {
            detail
                .fields
                .insert(keys::CONTRACT_TYPE.to_string(), contract.to_string());
        }

        if detail.fields.is_empty() {
            return Err(ScrapeError::Extraction {
                url: url.to_string(),
                message: "no listing content found".to_string(),
            });
        }

        Ok(detail)
    }
}

/// Parses type, rooms, area and location out of a listing title
///
/// # Examples
///
/// ```
/// use bienici_scraper::crawler::parse_title_text;
///
/// let fields = parse_title_text("Appartement 3 pièces 78 m² 75018 Paris 18e (Grandes Carrières)");
/// assert!(fields.contains(&("property_type", "apartment".to_string())));
/// assert!(fields.contains(&("postal_code", "75018".to_string())));
/// assert!(fields.contains(&("district", "Grandes Carrières".to_string())));
/// ```
pub fn parse_title_text(title: &str) -> Vec<(&'static str, String)> {
    let mut fields = Vec::new();

    let lower = title.to_lowercase();
    if let Some((_, property_type)) = PROPERTY_TYPES.iter().find(|(fr, _)| lower.contains(fr)) {
        fields.push((keys::PROPERTY_TYPE, property_type.to_string()));
    }

    if let Some(caps) = ROOMS_RE.captures(title) {
        fields.push((keys::ROOMS, caps[1].to_string()));
    }

    if let Some(caps) = AREA_RE.captures(title) {
        fields.push((keys::AREA, caps[1].to_string()));
    }

    if let Some(caps) = LOCATION_RE.captures(title) {
        fields.push((keys::POSTAL_CODE, caps[1].to_string()));
        fields.push((keys::CITY, caps[2].trim().to_string()));
    }

    if let Some(caps) = DISTRICT_RE.captures(title) {
        fields.push((keys::DISTRICT, caps[1].to_string()));
    }

    fields
}

/// Reads the advertised result count from a heading like "1 234 biens à vendre"
pub fn parse_total_count(heading: &str) -> Option<u64> {
    let caps = TOTAL_COUNT_RE.captures(heading)?;
    digits(&caps[1]).parse().ok()
}

/// Regex-driven fields of a detail page's visible text
fn parse_detail_text(text: &str) -> Vec<(&'static str, String)> {
    let mut fields = Vec::new();

    let price = PRICE_RE
        .captures_iter(text)
        .find(|caps| caps.get(2).is_none())
        .map(|caps| format!("{}€", &caps[1]));
    if let Some(price) = price {
        fields.push((keys::PRICE, price.trim().to_string()));
    }

    if let Some(caps) = FEES_RE.captures(text) {
        fields.push((keys::AGENCY_FEES, caps[1].to_string()));
    }

    if let Some(caps) = PRICE_WITHOUT_FEES_RE.captures(text) {
        fields.push((keys::PRICE_WITHOUT_FEES, caps[1].trim().to_string()));
    }

    if let Some(caps) = BEDROOMS_RE.captures(text) {
        fields.push((keys::BEDROOMS, caps[1].to_string()));
    }

    if let Some(caps) = FLOOR_RE.captures(text) {
        let floor = match caps.get(1) {
            Some(level) => level.as_str().to_string(),
            None => "0".to_string(),
        };
        fields.push((keys::FLOOR, floor));
    }

    if let Some(caps) = EXPOSURE_RE.captures(text) {
        fields.push((keys::EXPOSURE, caps[1].trim().to_string()));
    }

    if let Some(caps) = HEATING_RE.captures(text) {
        fields.push((keys::HEATING, caps[1].trim().to_string()));
    }

    if let Some(caps) = GES_RE.captures(text) {
        fields.push((keys::GES_RATING, caps[1].to_string()));
        fields.push((keys::GES_EMISSION, caps[2].to_string()));
    }

    if let Some(caps) = ENERGY_BILL_RE.captures(text) {
        fields.push((keys::ENERGY_BILL_MIN, caps[1].trim().to_string()));
        fields.push((keys::ENERGY_BILL_MAX, caps[2].trim().to_string()));
    }

    if text.to_lowercase().contains("exclusivité") {
        fields.push((keys::MANDATE_TYPE, "exclusive".to_string()));
    }

    if let Some(caps) = REFERENCE_RE.captures(text) {
        fields.push((keys::REFERENCE, caps[1].to_string()));
    }

    if let Some(caps) = PUBLISHED_RE.captures(text) {
        fields.push((keys::PUBLISHED_DATE, caps[1].to_string()));
    }

    if let Some(caps) = MODIFIED_RE.captures(text) {
        fields.push((keys::MODIFIED_DATE, caps[1].to_string()));
    }

    fields
}

/// Energy class and consumption from the DPE block
fn energy_rating(document: &Html) -> Option<(String, Option<String>)> {
    if let Some(section) = parent_of_text(document, "Performance énergétique").map(enclosing_block) {
        let text = section.text().collect::<Vec<_>>().join(" ");
        if let Some(caps) = ENERGY_RE.captures(&text) {
            return Some((caps[1].to_string(), Some(caps[2].to_string())));
        }
    }

    select_all(document.root_element(), "[class*='dpe'], [class*='Dpe']")
        .into_iter()
        .map(element_text)
        .find(|text| text.len() == 1 && matches!(text.as_bytes()[0], b'A'..=b'G'))
        .map(|rating| (rating, None))
}

/// Description block following the "Descriptif de ce …" heading
///
/// The block is the first element after the heading, looking up to three
/// levels out when the heading is wrapped.
fn description(document: &Html) -> Option<String> {
    let mut current = parent_of_text(document, "Descriptif de ce")?;
    let mut block = None;
    for _ in 0..3 {
        if let Some(sibling) = current.next_siblings().find_map(ElementRef::wrap) {
            block = Some(sibling);
            break;
        }
        match current.parent().and_then(ElementRef::wrap) {
            Some(parent) => current = parent,
            None => break,
        }
    }
    let block = block?;

    let text = element_text(block);
    if text.is_empty() {
        return None;
    }
    Some(text.chars().take(MAX_DESCRIPTION_CHARS).collect())
}

/// Price text of a search card ("430 000 €"), skipping per-m² prices
fn card_price(article: ElementRef) -> Option<String> {
    article
        .text()
        .filter(|text| !text.contains("/m"))
        .find_map(|text| CARD_PRICE_RE.find(text).map(|m| m.as_str().trim().to_string()))
}

fn contract_from_path(path: &str) -> Option<&'static str> {
    if path.contains("/vente/") {
        Some("buy")
    } else if path.contains("/location/") {
        Some("rent")
    } else {
        None
    }
}

fn digits(text: &str) -> String {
    text.chars().filter(char::is_ascii_digit).collect()
}

fn select_all<'a>(scope: ElementRef<'a>, css: &str) -> Vec<ElementRef<'a>> {
    match Selector::parse(css) {
        Ok(selector) => scope.select(&selector).collect(),
        Err(_) => Vec::new(),
    }
}

fn select_first<'a>(scope: ElementRef<'a>, css: &str) -> Option<ElementRef<'a>> {
    let selector = Selector::parse(css).ok()?;
    scope.select(&selector).next()
}

/// Trimmed text of an element, pieces joined by single spaces
fn element_text(element: ElementRef) -> String {
    element
        .text()
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Climbs from a leaf (a heading, a label) to the block that contains it
fn enclosing_block(element: ElementRef) -> ElementRef {
    let mut current = element;
    while current.children().find_map(ElementRef::wrap).is_none() {
        match current.parent().and_then(ElementRef::wrap) {
            Some(parent) => current = parent,
            None => break,
        }
    }
    current
}

fn is_script_text(parent: Option<ElementRef>) -> bool {
    parent
        .map(|parent| matches!(parent.value().name(), "script" | "style" | "noscript"))
        .unwrap_or(false)
}

/// Visible text of the document, one line per text node
fn visible_text(document: &Html) -> String {
    document
        .tree
        .nodes()
        .filter(|node| !is_script_text(node.parent().and_then(ElementRef::wrap)))
        .filter_map(|node| node.value().as_text().map(|text| text.trim().to_string()))
        .filter(|text| !text.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Element directly holding the first visible text node containing `needle`
fn parent_of_text<'a>(document: &'a Html, needle: &str) -> Option<ElementRef<'a>> {
    document
        .tree
        .nodes()
        .filter(|node| !is_script_text(node.parent().and_then(ElementRef::wrap)))
        .find(|node| {
            node.value()
                .as_text()
                .map(|text| text.contains(needle))
                .unwrap_or(false)
        })
        .and_then(|node| node.parent())
        .and_then(ElementRef::wrap)
}
