//! Listing filter.
//!
//! One shared pipeline applied to listings from every source. Each listing is
//! judged on its own, in this order:
//!
//! 1. noise terms (bulk lots, proxies, accessories)
//! 2. identity terms the active tier still carries
//! 3. grading policy
//! 4. condition policy
//! 5. must-include / must-exclude terms
//! 6. plausible price band
//!
//! Survivors keep their relative order.

mod markers;

use std::collections::HashMap;

use log::debug;
use regex::Regex;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::models::{
    parse_price, Condition, GradingPolicy, Listing, PricedListing, QueryTier, SearchRequest,
};

use markers::{grade_pattern, word_pattern, GRADING_MARKER, MINT_MARKER, SEALED_MARKER};

/// Default noise terms: titles that are not a single genuine card.
const DEFAULT_NOISE_TERMS: &[&str] = &[
    "lot", "lots", "bundle", "bulk", "proxy", "reprint", "replica", "custom", "fake", "orica",
    "digital", "playmat", "sleeve", "sleeves", "binder", "empty",
];

/// Filter thresholds and term lists.
#[derive(Clone, Debug)]
pub struct FilterConfig {
    /// Lowest plausible price, inclusive.
    pub min_price: Decimal,
    /// Highest plausible price, inclusive.
    pub max_price: Decimal,
    pub noise_terms: Vec<String>,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            min_price: dec!(1.00),
            max_price: dec!(100000),
            noise_terms: DEFAULT_NOISE_TERMS.iter().map(|t| t.to_string()).collect(),
        }
    }
}

/// Why a listing was dropped.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Rejection {
    Noise,
    Identity,
    Grading,
    Condition,
    MissingInclude,
    Excluded,
    MalformedPrice,
    PriceOutOfRange,
}

/// Relevance and plausibility filter for raw listings.
pub struct ListingFilter {
    config: FilterConfig,
    noise: Option<Regex>,
}

impl ListingFilter {
    pub fn new(config: FilterConfig) -> Self {
        let noise = word_pattern(&config.noise_terms);
        Self { config, noise }
    }

    pub fn config(&self) -> &FilterConfig {
        &self.config
    }

    /// Filter `listings` for `request` as searched by `tier`.
    pub fn apply(
        &self,
        listings: Vec<Listing>,
        request: &SearchRequest,
        tier: &QueryTier,
    ) -> Vec<PricedListing> {
        let total = listings.len();
        let grade = Self::grade_requirement(request);
        let mut rejected: HashMap<Rejection, usize> = HashMap::new();

        let survivors: Vec<PricedListing> = listings
            .into_iter()
            .filter_map(|listing| match self.judge(&listing, request, tier, grade.as_ref()) {
                Ok(price) => Some(PricedListing { listing, price }),
                Err(reason) => {
                    *rejected.entry(reason).or_default() += 1;
                    None
                }
            })
            .collect();

        if !rejected.is_empty() {
            debug!(
                "Filter kept {}/{} listings for tier '{}', rejected {:?}",
                survivors.len(),
                total,
                tier.label,
                rejected
            );
        }
        survivors
    }

    /// Judge one listing. Returns its parsed price when it survives.
    pub fn judge(
        &self,
        listing: &Listing,
        request: &SearchRequest,
        tier: &QueryTier,
        grade: Option<&Regex>,
    ) -> Result<Decimal, Rejection> {
        let title = listing.title.as_str();
        let lower = title.to_lowercase();

        if self.noise.as_ref().is_some_and(|n| n.is_match(title)) {
            return Err(Rejection::Noise);
        }

        if !tier
            .identity
            .iter()
            .all(|term| lower.contains(&term.to_lowercase()))
        {
            return Err(Rejection::Identity);
        }

        match request.grading_policy() {
            GradingPolicy::Any => {}
            GradingPolicy::Ungraded => {
                if GRADING_MARKER.is_match(title) {
                    return Err(Rejection::Grading);
                }
            }
            GradingPolicy::Graded { .. } => {
                if !GRADING_MARKER.is_match(title) || grade.is_some_and(|g| !g.is_match(title)) {
                    return Err(Rejection::Grading);
                }
            }
        }

        if let Some(condition) = request.condition {
            // Card and set names may contain marker words ("New Capenna").
            let residual = strip_terms(&lower, &request.identity_terms());
            let ok = match condition {
                Condition::New => MINT_MARKER.is_match(&residual),
                Condition::Used => !SEALED_MARKER.is_match(&residual),
            };
            if !ok {
                return Err(Rejection::Condition);
            }
        }

        let includes: Vec<String> = non_blank_lower(&request.must_include);
        if !includes.is_empty() && !includes.iter().any(|term| lower.contains(term)) {
            return Err(Rejection::MissingInclude);
        }
        if non_blank_lower(&request.must_exclude)
            .iter()
            .any(|term| lower.contains(term))
        {
            return Err(Rejection::Excluded);
        }

        let price = parse_price(&listing.price).ok_or(Rejection::MalformedPrice)?;
        if price < self.config.min_price || price > self.config.max_price {
            return Err(Rejection::PriceOutOfRange);
        }
        Ok(price)
    }

    /// Company/grade token pattern, only when the request pins one.
    fn grade_requirement(request: &SearchRequest) -> Option<Regex> {
        match request.grading_policy() {
            GradingPolicy::Graded { company, grade } if company.is_some() || grade.is_some() => {
                grade_pattern(company.as_deref(), grade.as_deref())
            }
            _ => None,
        }
    }
}

impl Default for ListingFilter {
    fn default() -> Self {
        Self::new(FilterConfig::default())
    }
}

fn strip_terms(lower_title: &str, terms: &[String]) -> String {
    terms.iter().fold(lower_title.to_string(), |acc, term| {
        acc.replace(&term.to_lowercase(), " ")
    })
}

fn non_blank_lower(terms: &[String]) -> Vec<String> {
    terms
        .iter()
        .map(|t| t.trim().to_lowercase())
        .filter(|t| !t.is_empty())
        .collect()
}
