//! Query tier generation.
//!
//! Turns a [`SearchRequest`] into the fallback ladder: the strictest query
//! first, then one tier per relaxed optional filter, then (on request) the
//! global identity-only tier. Generation is deterministic; the same request
//! always yields byte-identical tiers.

use chrono::{DateTime, Utc};

use crate::models::{
    GradingFilter, GradingPolicy, QueryTier, SearchRequest, TierFilters, TierLabel, TimeWindow,
};

/// Order in which optional filters are relaxed.
const RELAXATION_ORDER: [TierLabel; 4] = [
    TierLabel::DropCondition,
    TierLabel::DropLocation,
    TierLabel::DropRarity,
    TierLabel::DropLanguage,
];

/// Builds the ordered query tiers for a request.
pub struct QueryBuilder;

impl QueryBuilder {
    /// The fallback ladder, strictest first. Never empty.
    pub fn tiers(request: &SearchRequest) -> Vec<QueryTier> {
        let identity = request.identity_terms();
        let mut filters = Self::strict_filters(request);

        let mut tiers = vec![QueryTier {
            label: TierLabel::Strict,
            identity: identity.clone(),
            filters: filters.clone(),
            window: None,
        }];

        for label in RELAXATION_ORDER {
            if !Self::relax(&mut filters, label) {
                continue;
            }
            tiers.push(QueryTier {
                label,
                identity: identity.clone(),
                filters: filters.clone(),
                window: None,
            });
        }

        let last_has_filters = tiers.last().is_some_and(|t| !t.filters.is_empty());
        if request.global_fallback && last_has_filters {
            tiers.push(QueryTier {
                label: TierLabel::Global,
                identity,
                filters: TierFilters::default(),
                window: None,
            });
        }

        tiers
    }

    /// The dedicated recency tier, tried before the ladder when the request
    /// carries a recency window.
    pub fn window_tier(request: &SearchRequest, now: DateTime<Utc>) -> Option<QueryTier> {
        let days = request.recency_window_days.filter(|d| *d > 0)?;
        Some(QueryTier {
            label: TierLabel::RecentWindow,
            identity: request.identity_terms(),
            filters: Self::strict_filters(request),
            window: Some(TimeWindow::last_days(days, now)),
        })
    }

    /// The strictest tier a request can be answered from: the recency tier
    /// when a window is set, otherwise the head of the ladder. Its cache key
    /// identifies the request's final answer.
    pub fn strict_tier(request: &SearchRequest, now: DateTime<Utc>) -> QueryTier {
        Self::window_tier(request, now).unwrap_or_else(|| QueryTier {
            label: TierLabel::Strict,
            identity: request.identity_terms(),
            filters: Self::strict_filters(request),
            window: None,
        })
    }

    fn strict_filters(request: &SearchRequest) -> TierFilters {
        let grading = match request.grading_policy() {
            GradingPolicy::Graded { company, grade } => Some(GradingFilter { company, grade }),
            GradingPolicy::Any | GradingPolicy::Ungraded => None,
        };
        TierFilters {
            condition: request.condition,
            location: request.seller_location().map(str::to_string),
            rarity: request.rarity().map(str::to_string),
            language: request.language().map(str::to_string),
            grading,
        }
    }

    /// Drop the filter named by `label`. Returns false when it was not set.
    fn relax(filters: &mut TierFilters, label: TierLabel) -> bool {
        match label {
            TierLabel::DropCondition => filters.condition.take().is_some(),
            TierLabel::DropLocation => filters.location.take().is_some(),
            TierLabel::DropRarity => filters.rarity.take().is_some(),
            TierLabel::DropLanguage => filters.language.take().is_some(),
            _ => false,
        }
    }
}
