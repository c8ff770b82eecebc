use std::fmt;

use super::request::{Condition, TimeWindow};

/// Which relaxation produced a tier, relative to the strictest one.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TierLabel {
    Strict,
    DropCondition,
    DropLocation,
    DropRarity,
    DropLanguage,
    Global,
    RecentWindow,
}

impl TierLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            TierLabel::Strict => "strict",
            TierLabel::DropCondition => "drop condition",
            TierLabel::DropLocation => "drop location",
            TierLabel::DropRarity => "drop rarity",
            TierLabel::DropLanguage => "drop language",
            TierLabel::Global => "global",
            TierLabel::RecentWindow => "recent window",
        }
    }
}

impl fmt::Display for TierLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Grading constraint carried into the query text.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GradingFilter {
    pub company: Option<String>,
    pub grade: Option<String>,
}

impl GradingFilter {
    /// Keyword rendering: `PSA 10`, `PSA`, `graded 10` or `graded`.
    pub fn token(&self) -> String {
        match (&self.company, &self.grade) {
            (Some(company), Some(grade)) => format!("{} {}", company, grade),
            (Some(company), None) => company.clone(),
            (None, Some(grade)) => format!("graded {}", grade),
            (None, None) => "graded".to_string(),
        }
    }
}

/// Optional filters still active in a tier.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TierFilters {
    pub condition: Option<Condition>,
    pub location: Option<String>,
    pub rarity: Option<String>,
    pub language: Option<String>,
    pub grading: Option<GradingFilter>,
}

impl TierFilters {
    pub fn is_empty(&self) -> bool {
        self.condition.is_none()
            && self.location.is_none()
            && self.rarity.is_none()
            && self.language.is_none()
            && self.grading.is_none()
    }
}

/// One generated variant of the search query.
///
/// Identity terms are never relaxed; `filters` shrinks as the ladder
/// descends. Tiers are built by the query builder and never mutated.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QueryTier {
    pub label: TierLabel,
    pub identity: Vec<String>,
    pub filters: TierFilters,
    pub window: Option<TimeWindow>,
}

impl QueryTier {
    /// Free-text query: identity terms, the sold marker, then the filters
    /// that have no structured encoding on any source.
    ///
    /// Condition and location are left out; adapters encode those natively.
    pub fn keywords(&self) -> String {
        let mut parts: Vec<String> = self.identity.clone();
        parts.push("sold".to_string());
        if let Some(rarity) = &self.filters.rarity {
            parts.push(rarity.clone());
        }
        if let Some(language) = &self.filters.language {
            parts.push(language.clone());
        }
        if let Some(grading) = &self.filters.grading {
            parts.push(grading.token());
        }
        collapse_whitespace(&parts.join(" "))
    }

    /// Normalized, field-order-stable fingerprint used as the cache key.
    pub fn cache_key(&self) -> String {
        let mut key = format!("q={}", self.keywords());
        let f = &self.filters;
        let fields: [(&str, Option<String>); 7] = [
            ("condition", f.condition.map(|c| c.as_str().to_string())),
            ("location", f.location.clone()),
            ("rarity", f.rarity.clone()),
            ("language", f.language.clone()),
            ("graded", f.grading.as_ref().map(|_| "true".to_string())),
            ("company", f.grading.as_ref().and_then(|g| g.company.clone())),
            ("grade", f.grading.as_ref().and_then(|g| g.grade.clone())),
        ];
        for (name, value) in fields {
            if let Some(value) = value {
                key.push_str(&format!("|{}={}", name, collapse_whitespace(&value)));
            }
        }
        if let Some(window) = &self.window {
            key.push_str(&format!("|window={}d", window.days));
        }
        key.to_lowercase()
    }
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}
