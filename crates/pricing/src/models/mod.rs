//! Pricing models
//!
//! This module contains the core data types for price aggregation:
//! - `request` - The caller's search request (SearchRequest, Condition, GradingPolicy, TimeWindow)
//! - `tier` - One generated variant of the search query (QueryTier, TierLabel, TierFilters)
//! - `listing` - Raw marketplace listings and their parsed prices
//! - `summary` - The statistical summary returned and cached per request

mod listing;
mod request;
mod summary;
mod tier;

pub use listing::{parse_price, Listing, PricedListing};
pub use request::{Condition, GradingPolicy, SearchRequest, TimeWindow};
pub use summary::PriceSummary;
pub use tier::{GradingFilter, QueryTier, TierFilters, TierLabel};
