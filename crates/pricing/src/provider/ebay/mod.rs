//! eBay Buy API listing source.
//!
//! Searches the Browse API with the tier keywords and encodes condition and
//! seller location as native `filter` expressions. Time-windowed searches go
//! to the Marketplace Insights sold-items endpoint with a `lastSoldDate`
//! range.

mod models;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use log::debug;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;

use crate::errors::PricingError;
use crate::models::{Condition, Listing, QueryTier, TimeWindow};
use crate::provider::{SourceAdapter, TokenProvider};

use models::{Amount, BrowseSearchResponse, SalesSearchResponse};

const PROVIDER_ID: &str = "EBAY_BROWSE";

const BROWSE_PATH: &str = "/buy/browse/v1/item_summary/search";
const SALES_PATH: &str = "/buy/marketplace_insights/v1_beta/item_sales/search";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(20);

/// Connection settings for the eBay API.
#[derive(Clone, Debug)]
pub struct EbayApiConfig {
    pub base_url: String,
    pub marketplace_id: String,
    /// Maximum listings requested per query.
    pub limit: u32,
    pub timeout: Duration,
}

impl Default for EbayApiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.ebay.com".to_string(),
            marketplace_id: "EBAY_US".to_string(),
            limit: 50,
            timeout: REQUEST_TIMEOUT,
        }
    }
}

/// Structured API listing source backed by eBay's Buy APIs.
pub struct EbayBrowseAdapter {
    client: Client,
    tokens: Arc<dyn TokenProvider>,
    config: EbayApiConfig,
}

impl EbayBrowseAdapter {
    pub fn new(tokens: Arc<dyn TokenProvider>, config: EbayApiConfig) -> Self {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            client,
            tokens,
            config: EbayApiConfig {
                base_url: config.base_url.trim_end_matches('/').to_string(),
                ..config
            },
        }
    }

    /// Native filter expressions for the tier's structured filters.
    fn filter_expressions(tier: &QueryTier) -> Vec<String> {
        let mut filters = Vec::new();
        if let Some(condition) = tier.filters.condition {
            let code = match condition {
                Condition::New => "NEW",
                Condition::Used => "USED",
            };
            filters.push(format!("conditions:{{{}}}", code));
        }
        if let Some(location) = &tier.filters.location {
            filters.push(format!("itemLocationCountry:{}", location.to_uppercase()));
        }
        filters
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        tier: &QueryTier,
        filters: Vec<String>,
    ) -> Result<T, PricingError> {
        let token = self.tokens.access_token().await?;
        let url = format!("{}{}", self.config.base_url, path);

        let mut params = vec![
            ("q", tier.keywords()),
            ("limit", self.config.limit.to_string()),
        ];
        if !filters.is_empty() {
            params.push(("filter", filters.join(",")));
        }

        debug!("eBay request: {} q='{}' ({})", path, tier.keywords(), tier.label);

        let response = self
            .client
            .get(&url)
            .bearer_auth(token)
            .header("X-EBAY-C-MARKETPLACE-ID", &self.config.marketplace_id)
            .query(&params)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    PricingError::unavailable(PROVIDER_ID, "Request timed out")
                } else {
                    PricingError::unavailable(PROVIDER_ID, format!("Request failed: {}", e))
                }
            })?;

        let status = response.status();
        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                return Err(PricingError::unavailable(
                    PROVIDER_ID,
                    format!("Authorization rejected: HTTP {}", status),
                ));
            }
            StatusCode::TOO_MANY_REQUESTS => {
                return Err(PricingError::unavailable(PROVIDER_ID, "Rate limited"));
            }
            s if !s.is_success() => {
                let body = response.text().await.unwrap_or_default();
                return Err(PricingError::unavailable(
                    PROVIDER_ID,
                    format!("HTTP {} - {}", status, body),
                ));
            }
            _ => {}
        }

        let body = response
            .text()
            .await
            .map_err(|e| PricingError::unavailable(PROVIDER_ID, format!("Body read failed: {}", e)))?;
        serde_json::from_str(&body)
            .map_err(|e| PricingError::parse(PROVIDER_ID, format!("Undecodable payload: {}", e)))
    }

    fn listing(title: String, amount: Option<Amount>, url: Option<String>) -> Listing {
        let (price, currency) = match amount {
            Some(a) => (a.value, a.currency),
            None => (String::new(), None),
        };
        Listing {
            title,
            price,
            currency,
            source_id: PROVIDER_ID.to_string(),
            url,
        }
    }
}

/// `lastSoldDate:[start..end]` with millisecond UTC timestamps.
fn sold_date_filter(window: &TimeWindow) -> String {
    fn ts(t: &DateTime<Utc>) -> String {
        t.to_rfc3339_opts(SecondsFormat::Millis, true)
    }
    format!("lastSoldDate:[{}..{}]", ts(&window.start), ts(&window.end))
}

#[async_trait]
impl SourceAdapter for EbayBrowseAdapter {
    fn id(&self) -> &'static str {
        PROVIDER_ID
    }

    fn supports_time_window(&self) -> bool {
        true
    }

    async fn search(&self, tier: &QueryTier) -> Result<Vec<Listing>, PricingError> {
        let response: BrowseSearchResponse = self
            .get_json(BROWSE_PATH, tier, Self::filter_expressions(tier))
            .await?;

        Ok(response
            .item_summaries
            .into_iter()
            .map(|item| Self::listing(item.title, item.price, item.item_web_url))
            .collect())
    }

    async fn search_window(
        &self,
        tier: &QueryTier,
        window: &TimeWindow,
    ) -> Result<Vec<Listing>, PricingError> {
        let mut filters = Self::filter_expressions(tier);
        filters.push(sold_date_filter(window));

        let response: SalesSearchResponse = self.get_json(SALES_PATH, tier, filters).await?;

        Ok(response
            .item_sales
            .into_iter()
            .map(|sale| Self::listing(sale.title, sale.last_sold_price, sale.item_web_url))
            .collect())
    }
}
