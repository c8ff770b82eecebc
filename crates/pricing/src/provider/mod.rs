//! Listing source abstractions and implementations.
//!
//! This module contains:
//! - The `SourceAdapter` trait that every listing source implements
//! - The `TokenProvider` capability used by credential-backed sources
//! - `EbayBrowseAdapter`, the structured API source
//! - `ScrapingAdapter`, the page-scraping source with a pluggable extractor
//!
//! Adapters only encode queries in their source's native syntax and decode
//! responses into [`Listing`](crate::models::Listing)s. Relevance and price
//! filtering live in [`crate::filter`].

mod token;
mod traits;

pub mod ebay;
pub mod scrape;

pub use token::{EbayOAuthTokenProvider, StaticTokenProvider, TokenProvider};
pub use traits::SourceAdapter;
