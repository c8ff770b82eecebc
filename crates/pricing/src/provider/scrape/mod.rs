//! Page-scraping listing source.
//!
//! Fetches eBay's completed-listings search page and hands the HTML to a
//! [`ListingExtractor`]. A page that does not match the extractor's pattern
//! is a `SourceParse` error, never an empty result.

mod extractor;

pub use extractor::{
    ExtractedListing, ExtractionError, ListingExtractor, SelectorExtractor, SelectorSet,
};

use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use reqwest::Client;

use crate::errors::PricingError;
use crate::models::{Condition, Listing, QueryTier};
use crate::provider::SourceAdapter;

const PROVIDER_ID: &str = "EBAY_SCRAPE";

const SEARCH_PATH: &str = "/sch/i.html";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(20);

const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36";

/// Settings for the scraping source.
#[derive(Clone, Debug)]
pub struct ScrapingConfig {
    pub base_url: String,
    pub user_agent: String,
    /// Results per page requested from the site.
    pub page_size: u32,
    pub timeout: Duration,
}

impl Default for ScrapingConfig {
    fn default() -> Self {
        Self {
            base_url: "https://www.ebay.com".to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            page_size: 60,
            timeout: REQUEST_TIMEOUT,
        }
    }
}

/// Listing source that scrapes the marketplace's sold-items search page.
pub struct ScrapingAdapter {
    client: Client,
    config: ScrapingConfig,
    extractor: Box<dyn ListingExtractor>,
}

impl ScrapingAdapter {
    /// Scraping adapter using the default eBay selectors.
    pub fn new(config: ScrapingConfig) -> Self {
        Self::with_extractor(config, Box::new(SelectorExtractor::default()))
    }

    pub fn with_extractor(config: ScrapingConfig, extractor: Box<dyn ListingExtractor>) -> Self {
        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.clone())
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            client,
            config: ScrapingConfig {
                base_url: config.base_url.trim_end_matches('/').to_string(),
                ..config
            },
            extractor,
        }
    }

    /// Search-page query parameters for a tier.
    fn query_params(&self, tier: &QueryTier) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("_nkw", tier.keywords()),
            ("LH_Sold", "1".to_string()),
            ("LH_Complete", "1".to_string()),
            ("_ipg", self.config.page_size.to_string()),
        ];
        if let Some(condition) = tier.filters.condition {
            let code = match condition {
                Condition::New => "1000",
                Condition::Used => "3000",
            };
            params.push(("LH_ItemCondition", code.to_string()));
        }
        if tier.filters.location.is_some() {
            // The site only distinguishes domestic from worldwide sellers.
            params.push(("LH_PrefLoc", "1".to_string()));
        }
        params
    }
}

#[async_trait]
impl SourceAdapter for ScrapingAdapter {
    fn id(&self) -> &'static str {
        PROVIDER_ID
    }

    async fn search(&self, tier: &QueryTier) -> Result<Vec<Listing>, PricingError> {
        let url = format!("{}{}", self.config.base_url, SEARCH_PATH);
        debug!("Scraping '{}' ({})", tier.keywords(), tier.label);

        let response = self
            .client
            .get(&url)
            .query(&self.query_params(tier))
            .send()
            .await
            .map_err(|e| PricingError::unavailable(PROVIDER_ID, format!("Request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(PricingError::unavailable(
                PROVIDER_ID,
                format!("HTTP {}", status),
            ));
        }

        let html = response
            .text()
            .await
            .map_err(|e| PricingError::unavailable(PROVIDER_ID, format!("Body read failed: {}", e)))?;

        let extracted = self
            .extractor
            .extract(&html)
            .map_err(|e| PricingError::parse(PROVIDER_ID, e.to_string()))?;

        Ok(extracted
            .into_iter()
            .map(|item| Listing {
                title: item.title,
                price: item.price,
                currency: None,
                source_id: PROVIDER_ID.to_string(),
                url: item.url,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SearchRequest;
    use crate::query::QueryBuilder;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn adapter(server: &MockServer) -> ScrapingAdapter {
        ScrapingAdapter::new(ScrapingConfig {
            base_url: server.uri(),
            ..Default::default()
        })
    }

    fn tier() -> QueryTier {
        let mut request = SearchRequest::new("Charizard", "Base Set");
        request.condition = Some(Condition::New);
        request.seller_location = Some("US".to_string());
        QueryBuilder::tiers(&request).remove(0)
    }

    #[tokio::test]
    async fn test_scrapes_sold_listings() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(SEARCH_PATH))
            .and(query_param("_nkw", "Charizard Base Set sold"))
            .and(query_param("LH_Sold", "1"))
            .and(query_param("LH_ItemCondition", "1000"))
            .and(query_param("LH_PrefLoc", "1"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"<ul class="srp-results">
                     <li class="s-item">
                       <div class="s-item__title">Charizard Base Set Near Mint</div>
                       <span class="s-item__price">$310.00</span>
                     </li>
                   </ul>"#,
            ))
            .mount(&server)
            .await;

        let listings = adapter(&server).search(&tier()).await.unwrap();
        assert_eq!(listings.len(), 1);
        assert_eq!(listings[0].price, "$310.00");
        assert_eq!(listings[0].source_id, PROVIDER_ID);
    }

    #[tokio::test]
    async fn test_pattern_mismatch_is_parse_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(SEARCH_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>captcha</html>"))
            .mount(&server)
            .await;

        let err = adapter(&server).search(&tier()).await.unwrap_err();
        assert!(matches!(err, PricingError::SourceParse { .. }));
    }

    #[tokio::test]
    async fn test_server_error_is_unavailable() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(SEARCH_PATH))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let err = adapter(&server).search(&tier()).await.unwrap_err();
        assert!(matches!(err, PricingError::SourceUnavailable { .. }));
    }

    #[tokio::test]
    async fn test_time_window_not_supported() {
        let server = MockServer::start().await;
        let adapter = adapter(&server);
        assert!(!adapter.supports_time_window());
        let window = crate::models::TimeWindow::last_days(7, chrono::Utc::now());
        let err = adapter.search_window(&tier(), &window).await.unwrap_err();
        assert!(matches!(err, PricingError::NotSupported { .. }));
    }
}
