// fields.rs
//
// One small extractor per listing field. Each works on a single card and
// returns an Option, so a broken field never takes the rest of the card with it.

use crate::domain::listing::ListingId;
use scraper::{ElementRef, Selector};
use url::Url;

const STREET_WORDS: [&str; 8] = [
    "street", "avenue", "road", "place", "drive", "boulevard", "lane", "terrace",
];

/// Whitespace-collapsed text content of an element.
pub fn text_of(el: ElementRef<'_>) -> String {
    el.text().flat_map(str::split_whitespace).collect::<Vec<_>>().join(" ")
}

/// First element matching any selector, in order.
pub fn first_match<'a>(card: ElementRef<'a>, selectors: &[Selector]) -> Option<ElementRef<'a>> {
    selectors.iter().find_map(|s| card.select(s).next())
}

/// First non-empty text among the selectors, in order.
pub fn first_text(card: ElementRef<'_>, selectors: &[Selector]) -> Option<String> {
    selectors
        .iter()
        .flat_map(|s| card.select(s))
        .map(text_of)
        .find(|t| !t.is_empty())
}

/// Whole-currency price from display text such as `"$2,950/month"`.
///
/// Takes the first run of digits (commas allowed inside it) and drops the
/// formatting. Text without any digit gives `None`, so an explicit `"$0"` is
/// the only way to get a zero price.
pub fn extract_price(raw: &str) -> Option<i64> {
    let start = raw.find(|c: char| c.is_ascii_digit())?;
    let digits: String = raw[start..]
        .chars()
        .take_while(|c| c.is_ascii_digit() || *c == ',')
        .filter(char::is_ascii_digit)
        .collect();

    digits.parse::<i64>().ok()
}

/// Resolve `href` against `base` and strip everything but scheme, host and path.
pub fn normalize_detail_url(base: &Url, href: &str) -> Option<Url> {
    let href = href.trim();
    if href.is_empty() || href.starts_with('#') || href.starts_with("javascript:") {
        return None;
    }

    let mut url = base.join(href).ok()?;
    if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
        return None;
    }

    url.set_query(None);
    url.set_fragment(None);
    let _ = url.set_username("");
    let _ = url.set_password(None);

    let trimmed = url.path().trim_end_matches('/').to_string();
    if trimmed.is_empty() {
        url.set_path("/");
    } else {
        url.set_path(&trimmed);
    }

    Some(url)
}

/// Numeric id embedded in paths like `/rental/4567890`.
pub fn site_id_from_path(url: &Url) -> Option<String> {
    let segments: Vec<&str> = url.path_segments()?.collect();
    segments.windows(2).find_map(|pair| {
        let is_listing_segment = matches!(pair[0], "rental" | "rentals" | "listing" | "listings");
        let is_id = !pair[1].is_empty() && pair[1].chars().all(|c| c.is_ascii_digit());
        (is_listing_segment && is_id).then(|| pair[1].to_string())
    })
}

fn host_scope(url: &Url) -> String {
    let host = url.host_str().unwrap_or("unknown").to_lowercase();
    host.strip_prefix("www.").map(str::to_string).unwrap_or(host)
}

/// Prefix ids with the host so ids can't collide across sites.
/// Example: `"streeteasy.com:4567890"`.
pub fn derive_identity(card_id: Option<&str>, detail_url: &Url) -> ListingId {
    let scope = host_scope(detail_url);

    if let Some(id) = card_id.map(str::trim).filter(|id| !id.is_empty()) {
        return ListingId::new(format!("{scope}:{id}"));
    }

    if let Some(id) = site_id_from_path(detail_url) {
        return ListingId::new(format!("{scope}:{id}"));
    }

    ListingId::new(format!("{scope}:{}", detail_url.path()))
}

/// Alt text looks like `"528 East 13th Street #1D image 1 of 23"`.
pub fn title_from_alt(alt: &str) -> Option<String> {
    // ASCII-only lowering keeps byte offsets aligned with `alt`.
    let cut = alt.to_ascii_lowercase().find(" image").unwrap_or(alt.len());
    let title = alt[..cut].trim();
    (!title.is_empty()).then(|| title.to_string())
}

/// Street-like titles lose their trailing unit token; anything else is left alone.
pub fn address_from_title(title: &str) -> Option<String> {
    let lower = title.to_lowercase();
    if !STREET_WORDS.iter().any(|w| lower.contains(w)) {
        return None;
    }

    let parts: Vec<&str> = title.split_whitespace().collect();
    if parts.len() < 3 {
        return Some(parts.join(" "));
    }

    let last = parts[parts.len() - 1].to_lowercase();
    if STREET_WORDS.iter().any(|w| last.starts_with(w)) {
        return Some(parts.join(" "));
    }

    Some(parts[..parts.len() - 1].join(" "))
}

/// Absolute image url from `src` or lazy-loaded `data-src`.
pub fn image_url(img: ElementRef<'_>, base: &Url) -> Option<String> {
    let el = img.value();
    let raw = el
        .attr("src")
        .filter(|s| !s.trim().is_empty() && !s.starts_with("data:"))
        .or_else(|| el.attr("data-src"))?;

    base.join(raw.trim()).ok().map(String::from)
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct UnitDetails {
    pub bedrooms: Option<String>,
    pub bathrooms: Option<String>,
    pub sqft: Option<String>,
}

/// Sort "2 beds", "1 bath", "750 ft²" style snippets into their slots.
pub fn unit_details<I>(items: I) -> UnitDetails
where
    I: IntoIterator<Item = String>,
{
    let mut details = UnitDetails::default();

    for text in items {
        let lower = text.to_lowercase();
        if lower.contains("bed") || lower == "studio" {
            details.bedrooms.get_or_insert(text);
        } else if lower.contains("bath") {
            details.bathrooms.get_or_insert(text);
        } else if lower.contains("ft²") || lower.contains("sq") {
            details.sqft.get_or_insert(text);
        }
    }

    details
}
