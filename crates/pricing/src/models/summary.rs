use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Statistical summary of the filtered prices for one request.
///
/// This is both the unit of caching and the unit returned to callers.
/// All numeric fields are zero when `count == 0`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceSummary {
    pub count: usize,
    pub avg_price: Decimal,
    pub median: Decimal,
    pub min: Decimal,
    pub max: Decimal,
    pub std_dev: Decimal,

    /// Label of the query tier that produced this summary.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tier: Option<String>,

    /// Row-level failure note; set only when no source could be reached.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PriceSummary {
    /// The all-zero summary.
    pub fn empty() -> Self {
        Self::default()
    }

    /// A zero summary carrying a failure note.
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            error: Some(message.into()),
            ..Self::default()
        }
    }

    pub fn with_tier(mut self, label: impl Into<String>) -> Self {
        self.tier = Some(label.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }
}
