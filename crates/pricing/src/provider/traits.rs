//! Listing source trait definition.

use async_trait::async_trait;

use crate::errors::PricingError;
use crate::models::{Listing, QueryTier, TimeWindow};

/// A single external listing source.
///
/// Implementations are stateless per call apart from credential retrieval.
/// They must not drop listings for relevance or price reasons; that is the
/// listing filter's job.
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    /// Unique identifier, e.g. "EBAY_BROWSE". Used for logging and
    /// stamped on every returned listing.
    fn id(&self) -> &'static str;

    /// Whether [`search_window`](Self::search_window) restricts results
    /// server-side by transaction time.
    fn supports_time_window(&self) -> bool {
        false
    }

    /// Run one query tier and return the listings in source order.
    ///
    /// Fails with `SourceUnavailable` on transport or auth failure and with
    /// `SourceParse` when the response cannot be decoded.
    async fn search(&self, tier: &QueryTier) -> Result<Vec<Listing>, PricingError>;

    /// Run one query tier restricted to items sold inside `window`.
    ///
    /// Default implementation returns `NotSupported`.
    async fn search_window(
        &self,
        tier: &QueryTier,
        window: &TimeWindow,
    ) -> Result<Vec<Listing>, PricingError> {
        let _ = (tier, window);
        Err(PricingError::NotSupported {
            operation: "time-windowed search".to_string(),
            provider: self.id().to_string(),
        })
    }
}
