//! CardCatch Pricing Crate
//!
//! Estimates the market value of a collectible trading card from recent
//! sold listings.
//!
//! # Overview
//!
//! A request names a card (name, set, optional number) plus optional
//! filters: condition, seller location, rarity, language, grading, and
//! free-form include/exclude terms. The pipeline searches one or more
//! listing sources, filters the results, and summarizes their prices. When
//! the strict query finds nothing usable, filters are relaxed one at a time.
//!
//! # Architecture
//!
//! ```text
//! SearchRequest
//!      |
//!      v
//! +--------------+   tiers    +----------------------+
//! | QueryBuilder | ---------> | FallbackOrchestrator | <--> ResultCache
//! +--------------+            +----------------------+
//!                                  |            ^
//!                        search(tier)           | PriceSummary
//!                                  v            |
//!                          +---------------+    |
//!                          | SourceAdapter |    |
//!                          +---------------+    |
//!                                  |            |
//!                                  v            |
//!                          +---------------+  +-----------------+
//!                          | ListingFilter |->| PriceSummarizer |
//!                          +---------------+  +-----------------+
//! ```
//!
//! # Core Types
//!
//! - [`SearchRequest`] - One card to price
//! - [`QueryTier`] - One generated variant of the search query
//! - [`Listing`] - A raw sold listing from a source
//! - [`PriceSummary`] - count, mean, median, range and standard deviation
//! - [`FallbackOrchestrator`] - Resolves single requests and batches

pub mod cache;
pub mod config;
pub mod errors;
pub mod filter;
pub mod models;
pub mod orchestrator;
pub mod provider;
pub mod query;
pub mod summarizer;

pub use cache::{CacheConfig, MokaResultCache, ResultCache};
pub use config::PricingConfig;
pub use errors::{PricingError, RetryClass};
pub use filter::{FilterConfig, ListingFilter};
pub use models::{
    Condition, GradingPolicy, Listing, PriceSummary, PricedListing, QueryTier, SearchRequest,
    TierLabel, TimeWindow,
};
pub use orchestrator::{FallbackOrchestrator, OrchestratorConfig, Resolution};
pub use provider::ebay::{EbayApiConfig, EbayBrowseAdapter};
pub use provider::scrape::{ScrapingAdapter, ScrapingConfig};
pub use provider::{EbayOAuthTokenProvider, SourceAdapter, StaticTokenProvider, TokenProvider};
pub use query::QueryBuilder;
pub use summarizer::PriceSummarizer;
