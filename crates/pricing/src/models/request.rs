use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::errors::PricingError;

/// Requested card condition.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Condition {
    New,
    Used,
}

impl Condition {
    pub fn as_str(&self) -> &'static str {
        match self {
            Condition::New => "new",
            Condition::Used => "used",
        }
    }
}

impl FromStr for Condition {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "new" => Ok(Condition::New),
            "used" => Ok(Condition::Used),
            _ => Err(format!("Unknown condition: {}", s)),
        }
    }
}

impl TryFrom<String> for Condition {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Condition> for String {
    fn from(value: Condition) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One row of a price request.
///
/// Immutable once submitted: the query builder and the listing filter only
/// read it.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchRequest {
    #[serde(default)]
    pub card_name: String,
    #[serde(default)]
    pub set_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub card_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<Condition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rarity: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seller_location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub graded: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grading_company: Option<String>,
    #[serde(
        default,
        deserialize_with = "string_or_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub grade: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub must_include: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub must_exclude: Vec<String>,
    #[serde(default)]
    pub global_fallback: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recency_window_days: Option<u32>,
}

/// What the request says about professionally graded cards.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GradingPolicy {
    /// No preference; graded and raw listings both count.
    Any,
    /// Only raw cards; any grading marker disqualifies a listing.
    Ungraded,
    /// Only graded cards, optionally pinned to a company and/or grade.
    Graded {
        company: Option<String>,
        grade: Option<String>,
    },
}

impl SearchRequest {
    /// Convenience constructor for the two required identity fields.
    pub fn new(card_name: impl Into<String>, set_name: impl Into<String>) -> Self {
        Self {
            card_name: card_name.into(),
            set_name: set_name.into(),
            ..Default::default()
        }
    }

    /// Reject requests that cannot be priced.
    pub fn validate(&self) -> Result<(), PricingError> {
        if self.card_name.trim().is_empty() {
            return Err(PricingError::InvalidRequest(
                "cardName is required".to_string(),
            ));
        }
        if self.set_name.trim().is_empty() {
            return Err(PricingError::InvalidRequest(
                "setName is required".to_string(),
            ));
        }
        if self.recency_window_days == Some(0) {
            return Err(PricingError::InvalidRequest(
                "recencyWindowDays must be at least 1".to_string(),
            ));
        }
        if self.graded == Some(false)
            && (non_blank(&self.grading_company).is_some() || non_blank(&self.grade).is_some())
        {
            return Err(PricingError::InvalidRequest(
                "gradingCompany and grade require graded to be true".to_string(),
            ));
        }
        Ok(())
    }

    pub fn card_number(&self) -> Option<&str> {
        non_blank(&self.card_number)
    }

    pub fn rarity(&self) -> Option<&str> {
        non_blank(&self.rarity)
    }

    pub fn language(&self) -> Option<&str> {
        non_blank(&self.language)
    }

    pub fn seller_location(&self) -> Option<&str> {
        non_blank(&self.seller_location)
    }

    /// Card name, set name and card number (when present), trimmed.
    pub fn identity_terms(&self) -> Vec<String> {
        let mut terms = vec![
            self.card_name.trim().to_string(),
            self.set_name.trim().to_string(),
        ];
        if let Some(number) = self.card_number() {
            terms.push(number.to_string());
        }
        terms
    }

    pub fn grading_policy(&self) -> GradingPolicy {
        let company = non_blank(&self.grading_company).map(str::to_string);
        let grade = non_blank(&self.grade).map(str::to_string);
        match self.graded {
            Some(false) => GradingPolicy::Ungraded,
            Some(true) => GradingPolicy::Graded { company, grade },
            None if company.is_some() || grade.is_some() => {
                GradingPolicy::Graded { company, grade }
            }
            None => GradingPolicy::Any,
        }
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

/// Grades arrive as `"9.5"` or `9.5`; keep them as text.
fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Grade {
        Text(String),
        Number(serde_json::Number),
    }

    Ok(Option::<Grade>::deserialize(deserializer)?.map(|g| match g {
        Grade::Text(s) => s,
        Grade::Number(n) => n.to_string(),
    }))
}

/// Inclusive transaction-time window for time-windowed searches.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub days: u32,
}

impl TimeWindow {
    /// The `days` days ending at `now`.
    pub fn last_days(days: u32, now: DateTime<Utc>) -> Self {
        Self {
            start: now - Duration::days(i64::from(days)),
            end: now,
            days,
        }
    }
}
