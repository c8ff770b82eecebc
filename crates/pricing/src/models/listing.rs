use std::str::FromStr;

use lazy_static::lazy_static;
use regex::Regex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

lazy_static! {
    /// A single amount with an optional non-numeric prefix ("$", "US $", "GBP").
    /// Ranges ("$10.00 to $20.00") and trailing text do not match.
    static ref PRICE_PATTERN: Regex =
        Regex::new(r"^[^0-9\-]*?([0-9][0-9,]*(?:\.[0-9]+)?)\s*$").unwrap();
}

/// One raw sale/offer record as returned by a source adapter.
///
/// Untrusted: the price is kept as the source rendered it and only the
/// listing filter decides whether it is a usable number.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Listing {
    pub title: String,
    pub price: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
    pub source_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl Listing {
    pub fn new(
        title: impl Into<String>,
        price: impl Into<String>,
        source_id: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            price: price.into(),
            currency: None,
            source_id: source_id.into(),
            url: None,
        }
    }
}

/// A listing that survived filtering, with its price parsed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PricedListing {
    #[serde(flatten)]
    pub listing: Listing,
    #[serde(rename = "parsedPrice")]
    pub price: Decimal,
}

/// Parse a marketplace price string into cents-precision decimal.
///
/// Returns `None` for anything that is not a single non-negative amount.
pub fn parse_price(raw: &str) -> Option<Decimal> {
    let captures = PRICE_PATTERN.captures(raw.trim())?;
    let digits = captures.get(1)?.as_str().replace(',', "");
    Decimal::from_str(&digits).ok().map(|d| d.round_dp(2))
}
