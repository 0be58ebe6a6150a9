use url::Url;

/// Path marker shared by every Bien'ici listing page
pub const LISTING_PATH_MARKER: &str = "/annonce/";

/// Normalizes a listing link found on a search page
///
/// # Normalization Steps
///
/// 1. Resolve relative links against the site root
/// 2. Reject anything that is not HTTP(S) or not a listing page
/// 3. Drop the query string and fragment (tracking and search context)
/// 4. Drop a trailing slash
///
/// # Arguments
///
/// * `href` - The raw `href` attribute value
/// * `base` - The site root used to resolve relative links
///
/// # Returns
///
/// * `Some(Url)` - Canonical listing URL
/// * `None` - The link is not a listing page
///
/// # Examples
///
/// ```
/// use bienici_scraper::url::normalize_listing_url;
/// use url::Url;
///
/// let base = Url::parse("https://www.bienici.com").unwrap();
/// let url = normalize_listing_url("/annonce/vente/paris/appartement/3pieces/ag-42?q=1", &base).unwrap();
/// assert_eq!(url.as_str(), "https://www.bienici.com/annonce/vente/paris/appartement/3pieces/ag-42");
/// ```
pub fn normalize_listing_url(href: &str, base: &Url) -> Option<Url> {
    let href = href.trim();
    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    let mut url = base.join(href).ok()?;
    if url.scheme() != "http" && url.scheme() != "https" {
        return None;
    }
    if !url.path().contains(LISTING_PATH_MARKER) {
        return None;
    }

    url.set_query(None);
    url.set_fragment(None);

    let trimmed = url.path().trim_end_matches('/').to_string();
    if trimmed.is_empty() {
        return None;
    }
    url.set_path(&trimmed);

    Some(url)
}

/// Extracts the listing identifier: the last path segment of a listing URL
///
/// # Examples
///
/// ```
/// use bienici_scraper::url::listing_id_from_url;
/// use url::Url;
///
/// let url = Url::parse("https://www.bienici.com/annonce/location/lyon/maison/5pieces/ag-7").unwrap();
/// assert_eq!(listing_id_from_url(&url), Some("ag-7".to_string()));
/// ```
pub fn listing_id_from_url(url: &Url) -> Option<String> {
    url.path_segments()?
        .filter(|segment| !segment.is_empty())
        .last()
        .filter(|segment| *segment != "annonce")
        .map(|segment| segment.to_string())
}
