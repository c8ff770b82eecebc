//! Listing extraction from search result pages.
//!
//! The extraction contract: given a results page, return every (title, price)
//! pair in page order, or fail when the page does not look like a results
//! page at all. Markup knowledge lives only in the selectors, so a layout
//! change means swapping a [`SelectorSet`], not touching the adapter.

use lazy_static::lazy_static;
use scraper::{ElementRef, Html, Selector};
use thiserror::Error;

lazy_static! {
    static ref DEFAULT_SELECTORS: SelectorSet = SelectorSet {
        container: Selector::parse("ul.srp-results").unwrap(),
        item: Selector::parse("li.s-item").unwrap(),
        title: Selector::parse(".s-item__title").unwrap(),
        price: Selector::parse(".s-item__price").unwrap(),
        link: Selector::parse("a.s-item__link").unwrap(),
    };
}

/// Title prefixes eBay injects into the title element.
const TITLE_BADGES: &[&str] = &["New Listing", "NEW LISTING"];

/// Placeholder row eBay renders at the top of every result list.
const PLACEHOLDER_TITLE: &str = "Shop on eBay";

/// The page did not match the expected structure.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct ExtractionError(pub String);

/// One (title, price) pair as it appeared on the page.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExtractedListing {
    pub title: String,
    pub price: String,
    pub url: Option<String>,
}

/// Pulls listings out of a results page.
pub trait ListingExtractor: Send + Sync {
    fn extract(&self, html: &str) -> Result<Vec<ExtractedListing>, ExtractionError>;
}

/// CSS selectors describing a results page layout.
#[derive(Clone, Debug)]
pub struct SelectorSet {
    pub container: Selector,
    pub item: Selector,
    pub title: Selector,
    pub price: Selector,
    pub link: Selector,
}

impl SelectorSet {
    /// Build a selector set from CSS strings.
    pub fn parse(
        container: &str,
        item: &str,
        title: &str,
        price: &str,
        link: &str,
    ) -> Result<Self, ExtractionError> {
        let parse = |css: &str| {
            Selector::parse(css)
                .map_err(|e| ExtractionError(format!("Invalid selector '{}': {}", css, e)))
        };
        Ok(Self {
            container: parse(container)?,
            item: parse(item)?,
            title: parse(title)?,
            price: parse(price)?,
            link: parse(link)?,
        })
    }
}

impl Default for SelectorSet {
    fn default() -> Self {
        DEFAULT_SELECTORS.clone()
    }
}

/// Selector-driven extractor. The default selectors match eBay's
/// completed-listings search page.
#[derive(Clone, Debug, Default)]
pub struct SelectorExtractor {
    selectors: SelectorSet,
}

impl SelectorExtractor {
    pub fn new(selectors: SelectorSet) -> Self {
        Self { selectors }
    }

    fn text(element: ElementRef<'_>) -> String {
        element
            .text()
            .collect::<Vec<_>>()
            .join(" ")
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn clean_title(raw: String) -> String {
        TITLE_BADGES
            .iter()
            .find_map(|badge| raw.strip_prefix(badge))
            .map(|rest| rest.trim().to_string())
            .unwrap_or(raw)
    }
}

impl ListingExtractor for SelectorExtractor {
    fn extract(&self, html: &str) -> Result<Vec<ExtractedListing>, ExtractionError> {
        let document = Html::parse_document(html);
        let container = document
            .select(&self.selectors.container)
            .next()
            .ok_or_else(|| ExtractionError("Results container not found".to_string()))?;

        let mut listings = Vec::new();
        for item in container.select(&self.selectors.item) {
            let title = item
                .select(&self.selectors.title)
                .next()
                .map(Self::text)
                .map(Self::clean_title)
                .filter(|t| !t.is_empty());
            let price = item
                .select(&self.selectors.price)
                .next()
                .map(Self::text)
                .filter(|p| !p.is_empty());

            let (Some(title), Some(price)) = (title, price) else {
                continue;
            };
            if title.eq_ignore_ascii_case(PLACEHOLDER_TITLE) {
                continue;
            }

            let url = item
                .select(&self.selectors.link)
                .next()
                .and_then(|a| a.value().attr("href"))
                .map(str::to_string);

            listings.push(ExtractedListing { title, price, url });
        }
        Ok(listings)
    }
}
