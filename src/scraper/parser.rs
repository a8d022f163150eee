// parser.rs
use crate::domain::listing::Listing;
use crate::errors::{ConfigError, ParseError};
use crate::scraper::fields;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, info};
use url::Url;

/// CSS selector lists for one search-results layout. Every list is tried in order.
#[derive(Debug, Clone)]
pub struct SelectorSet {
    pub card: Vec<&'static str>,
    pub link: Vec<&'static str>,
    pub image: Vec<&'static str>,
    pub title: Vec<&'static str>,
    pub price: Vec<&'static str>,
    pub address: Vec<&'static str>,
    pub details: Vec<&'static str>,
    pub results_container: Vec<&'static str>,
    pub no_results: Vec<&'static str>,
}

impl SelectorSet {
    /// Markup used by StreetEasy rental searches.
    pub fn streeteasy() -> Self {
        Self {
            card: vec![r#"[data-testid="listing-card"]"#],
            link: vec![
                r#"a[class*="listingLink"]"#,
                r#"a[href*="/rental/"]"#,
                r#"a[href*="/building/"]"#,
                "a[href]",
            ],
            image: vec![r#"img[class*="cardImage"]"#, r#"[data-testid="listing-image"] img"#, "img"],
            title: vec![r#"[data-testid="listing-title"]"#, "h3", "h2", r#"[class*="title"]"#],
            price: vec![
                r#"[data-testid="price"]"#,
                r#"[class*="priceText"]"#,
                ".price",
                r#"[class*="price"]"#,
                r#"[class*="Price"]"#,
            ],
            address: vec![r#"[data-testid="listing-address"]"#, "address", r#"[class*="address"]"#],
            details: vec![
                r#"[class*="BedsBathsSqft-module__text"]"#,
                r#"[data-testid="beds-baths-sqft"] span"#,
            ],
            results_container: vec![
                r#"[data-testid="search-results"]"#,
                r#"[data-testid="listing-cards"]"#,
                r#"[class*="searchCardList"]"#,
            ],
            no_results: vec![r#"[data-testid="no-results"]"#, r#"[class*="NoResults"]"#],
        }
    }
}

struct Compiled {
    card: Vec<Selector>,
    link: Vec<Selector>,
    image: Vec<Selector>,
    title: Vec<Selector>,
    price: Vec<Selector>,
    address: Vec<Selector>,
    details: Vec<Selector>,
    results_container: Vec<Selector>,
    no_results: Vec<Selector>,
}

fn compile(list: &[&'static str]) -> Result<Vec<Selector>, ConfigError> {
    list.iter()
        .map(|s| {
            Selector::parse(s).map_err(|e| ConfigError::InvalidSelector {
                selector: s.to_string(),
                reason: e.to_string(),
            })
        })
        .collect()
}

/// Turns a search-results document into listing records.
pub struct ListingParser {
    base: Url,
    sel: Compiled,
}

impl ListingParser {
    /// `base` resolves relative links; normally the search url itself.
    pub fn new(base: Url, set: &SelectorSet) -> Result<Self, ConfigError> {
        let sel = Compiled {
            card: compile(&set.card)?,
            link: compile(&set.link)?,
            image: compile(&set.image)?,
            title: compile(&set.title)?,
            price: compile(&set.price)?,
            address: compile(&set.address)?,
            details: compile(&set.details)?,
            results_container: compile(&set.results_container)?,
            no_results: compile(&set.no_results)?,
        };

        Ok(Self { base, sel })
    }

    pub fn streeteasy(base: Url) -> Result<Self, ConfigError> {
        Self::new(base, &SelectorSet::streeteasy())
    }

    /// Parse every card on the page.
    ///
    /// Returns `Ok(vec![])` for a genuine zero-match search. Errors only when the
    /// page itself is not recognisable as a results page.
    pub fn parse(&self, html: &str) -> Result<Vec<Listing>, ParseError> {
        let document = Html::parse_document(html);

        let cards: Vec<ElementRef<'_>> = self
            .sel
            .card
            .iter()
            .flat_map(|s| document.select(s))
            .collect();

        if cards.is_empty() {
            return self.classify_empty(&document);
        }

        debug!("found {} listing cards", cards.len());

        let listings: Vec<Listing> = cards
            .iter()
            .enumerate()
            .filter_map(|(i, card)| {
                let parsed = self.parse_card(*card);
                if parsed.is_none() {
                    debug!("skipping card #{i}: no usable detail link");
                }
                parsed
            })
            .collect();

        if listings.is_empty() {
            return Err(ParseError::structure_changed(format!(
                "{} cards found but none had a detail link",
                cards.len()
            )));
        }

        info!("parsed {} of {} cards", listings.len(), cards.len());
        Ok(listings)
    }

    fn classify_empty(&self, document: &Html) -> Result<Vec<Listing>, ParseError> {
        let has_any = |list: &[Selector]| list.iter().any(|s| document.select(s).next().is_some());

        if has_any(&self.sel.no_results) {
            info!("search returned no matching listings");
            return Ok(Vec::new());
        }

        if has_any(&self.sel.results_container) {
            return Err(ParseError::empty_result(
                "results container present but holds no listing cards",
            ));
        }

        Err(ParseError::structure_changed(
            "no listing cards and no results container found",
        ))
    }

    /// A card without a resolvable detail link has no identity and is dropped.
    /// Every other missing field just degrades the record.
    fn parse_card(&self, card: ElementRef<'_>) -> Option<Listing> {
        // First anchor, in selector priority order, whose href resolves.
        let detail_url = self
            .sel
            .link
            .iter()
            .flat_map(|s| card.select(s))
            .filter_map(|a| a.value().attr("href"))
            .find_map(|href| fields::normalize_detail_url(&self.base, href))?;
        let id = fields::derive_identity(card.value().attr("data-listing-id"), &detail_url);

        let img = fields::first_match(card, &self.sel.image);

        let title = img
            .and_then(|i| i.value().attr("alt"))
            .and_then(fields::title_from_alt)
            .or_else(|| fields::first_text(card, &self.sel.title))
            .unwrap_or_default();

        let price_text = fields::first_text(card, &self.sel.price);
        let price = price_text.as_deref().and_then(fields::extract_price);
        if price.is_none() {
            debug!("{id}: no price in {:?}", price_text);
        }

        let address = fields::first_text(card, &self.sel.address)
            .or_else(|| fields::address_from_title(&title))
            .unwrap_or_default();

        let image_url = img.and_then(|i| fields::image_url(i, &self.base));

        let details = fields::unit_details(
            self.sel
                .details
                .iter()
                .flat_map(|s| card.select(s))
                .map(fields::text_of),
        );

        Some(Listing {
            id,
            title,
            price,
            address,
            image_url,
            detail_url: detail_url.to_string(),
            bedrooms: details.bedrooms,
            bathrooms: details.bathrooms,
            sqft: details.sqft,
        })
    }
}
