//! eBay Buy API response models.
//!
//! Only the fields we map into listings are declared; everything else in the
//! payload is ignored.

use serde::Deserialize;

/// `item_summary/search` response (Browse API).
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BrowseSearchResponse {
    /// Absent when nothing matched.
    #[serde(default)]
    pub item_summaries: Vec<ItemSummary>,
}

/// One active or sold item in a Browse result.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemSummary {
    #[serde(default)]
    pub title: String,
    pub price: Option<Amount>,
    pub item_web_url: Option<String>,
}

/// `item_sales/search` response (Marketplace Insights API).
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SalesSearchResponse {
    #[serde(default)]
    pub item_sales: Vec<ItemSale>,
}

/// One completed sale.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemSale {
    #[serde(default)]
    pub title: String,
    pub last_sold_price: Option<Amount>,
    pub item_web_url: Option<String>,
}

/// eBay money amount; `value` is a decimal string.
#[derive(Debug, Deserialize)]
pub struct Amount {
    pub value: String,
    pub currency: Option<String>,
}
