//! Result cache.
//!
//! Maps a normalized query fingerprint to a previously computed
//! [`PriceSummary`]. The orchestrator receives the cache as an injected
//! [`ResultCache`], so tests and deployments can substitute their own.
//!
//! Two kinds of keys share the cache:
//! - `tier:` keys hold the summary a specific query tier produced. Only
//!   non-empty summaries are stored there.
//! - `req:` keys hold the final answer for a request's strictest tier,
//!   including zero results, so a repeated request is answered without
//!   walking the ladder again.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use moka::future::Cache;
use moka::Expiry;

use crate::errors::PricingError;
use crate::models::{GradingPolicy, PriceSummary, QueryTier, SearchRequest};

/// Cache capability used by the orchestrator.
#[async_trait]
pub trait ResultCache: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<PriceSummary>, PricingError>;

    /// Insert or replace. Entries are never mutated in place.
    async fn put(&self, key: &str, summary: PriceSummary) -> Result<(), PricingError>;

    async fn invalidate_all(&self) -> Result<(), PricingError>;

    /// Approximate number of live entries.
    fn entry_count(&self) -> u64;
}

/// Cache sizing and lifetimes.
#[derive(Clone, Debug)]
pub struct CacheConfig {
    /// Lifetime of non-empty summaries.
    pub ttl: Duration,
    /// Lifetime of zero-count summaries. Shorter, so a transient outage
    /// that looked like "no listings" heals quickly.
    pub zero_result_ttl: Duration,
    pub max_capacity: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(3600),
            zero_result_ttl: Duration::from_secs(300),
            max_capacity: 10_000,
        }
    }
}

/// Per-entry TTL chosen by whether the summary is empty.
struct SummaryExpiry {
    ttl: Duration,
    zero_result_ttl: Duration,
}

impl SummaryExpiry {
    fn lifetime(&self, summary: &PriceSummary) -> Duration {
        if summary.is_empty() {
            self.zero_result_ttl
        } else {
            self.ttl
        }
    }
}

impl Expiry<String, PriceSummary> for SummaryExpiry {
    fn expire_after_create(
        &self,
        _key: &String,
        value: &PriceSummary,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(self.lifetime(value))
    }

    fn expire_after_update(
        &self,
        _key: &String,
        value: &PriceSummary,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(self.lifetime(value))
    }
}

/// In-process TTL cache backed by moka. Expired entries are never returned
/// and are evicted lazily.
pub struct MokaResultCache {
    cache: Cache<String, PriceSummary>,
}

impl MokaResultCache {
    pub fn new(config: &CacheConfig) -> Self {
        let cache = Cache::builder()
            .max_capacity(config.max_capacity)
            .expire_after(SummaryExpiry {
                ttl: config.ttl,
                zero_result_ttl: config.zero_result_ttl,
            })
            .build();
        Self { cache }
    }
}

impl Default for MokaResultCache {
    fn default() -> Self {
        Self::new(&CacheConfig::default())
    }
}

#[async_trait]
impl ResultCache for MokaResultCache {
    async fn get(&self, key: &str) -> Result<Option<PriceSummary>, PricingError> {
        Ok(self.cache.get(key).await)
    }

    async fn put(&self, key: &str, summary: PriceSummary) -> Result<(), PricingError> {
        self.cache.insert(key.to_string(), summary).await;
        Ok(())
    }

    async fn invalidate_all(&self) -> Result<(), PricingError> {
        self.cache.invalidate_all();
        Ok(())
    }

    fn entry_count(&self) -> u64 {
        self.cache.entry_count()
    }
}

/// Key for the summary a specific tier produced.
pub fn tier_key(tier: &QueryTier, request: &SearchRequest) -> String {
    format!("tier:{}{}", tier.cache_key(), policy_suffix(request))
}

/// Key for the final answer to a request, derived from its strictest tier.
pub fn request_key(strict: &QueryTier, request: &SearchRequest) -> String {
    let mut key = format!("req:{}{}", strict.cache_key(), policy_suffix(request));
    if request.global_fallback {
        key.push_str("|global");
    }
    key
}

/// Request-level filter policies that change which listings survive but are
/// not part of the query text. Fixed field order, lowercased.
fn policy_suffix(request: &SearchRequest) -> String {
    let mut suffix = String::new();
    if let Some(condition) = request.condition {
        suffix.push_str(&format!("|p.condition={}", condition.as_str()));
    }
    match request.grading_policy() {
        GradingPolicy::Any => {}
        GradingPolicy::Ungraded => suffix.push_str("|p.graded=false"),
        GradingPolicy::Graded { company, grade } => suffix.push_str(&format!(
            "|p.graded={}:{}",
            company.unwrap_or_default(),
            grade.unwrap_or_default()
        )),
    }
    for (name, terms) in [
        ("include", &request.must_include),
        ("exclude", &request.must_exclude),
    ] {
        let mut terms: Vec<String> = terms
            .iter()
            .map(|t| t.trim().to_lowercase())
            .filter(|t| !t.is_empty())
            .collect();
        if terms.is_empty() {
            continue;
        }
        terms.sort();
        terms.dedup();
        suffix.push_str(&format!("|p.{}={}", name, terms.join(",")));
    }
    suffix.to_lowercase()
}
