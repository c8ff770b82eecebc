//! Fallback orchestrator.
//!
//! Resolves one request by walking its query tiers until a tier yields a
//! non-empty filtered price set or the ladder is exhausted:
//!
//! 1. Check the cache under the request key (strictest tier).
//! 2. If a recency window is set, try the windowed tier first. Any failure
//!    there falls through to the ladder.
//! 3. For each ladder tier: check the tier key, search every source, filter,
//!    summarize, and stop on the first non-empty summary.
//! 4. Store the outcome. Source failures become row data, never row errors.
//!
//! Only terminal errors (invalid requests, cache failures) surface as `Err`.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures::future::join_all;
use log::{debug, info, warn};

use super::single_flight::KeyedLocks;
use crate::cache::{request_key, tier_key, ResultCache};
use crate::errors::{PricingError, RetryClass};
use crate::filter::ListingFilter;
use crate::models::{Listing, PriceSummary, PricedListing, QueryTier, SearchRequest, TimeWindow};
use crate::provider::SourceAdapter;
use crate::query::QueryBuilder;
use crate::summarizer::PriceSummarizer;

/// Orchestrator tuning.
#[derive(Clone, Debug)]
pub struct OrchestratorConfig {
    /// Pause before the single retry of an unavailable source.
    pub retry_backoff: Duration,
    /// Upper bound on one batch row. `None` waits indefinitely.
    pub row_timeout: Option<Duration>,
    /// Serialize concurrent misses for the same request key. When disabled,
    /// identical concurrent requests may each search the sources and the
    /// last write to the cache wins.
    pub single_flight: bool,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            retry_backoff: Duration::from_millis(250),
            row_timeout: None,
            single_flight: true,
        }
    }
}

/// Outcome of resolving one request.
#[derive(Clone, Debug, PartialEq)]
pub struct Resolution {
    pub summary: PriceSummary,
    /// Listings that produced the summary. Empty on a cache hit.
    pub listings: Vec<PricedListing>,
    pub cache_hit: bool,
}

impl Resolution {
    fn cached(summary: PriceSummary) -> Self {
        Self {
            summary,
            listings: Vec::new(),
            cache_hit: true,
        }
    }

    fn fresh(summary: PriceSummary, listings: Vec<PricedListing>) -> Self {
        Self {
            summary,
            listings,
            cache_hit: false,
        }
    }
}

/// What one tier's search produced across all sources.
enum TierSearch {
    /// At least one source answered (possibly with nothing).
    Answered(Vec<Listing>),
    /// No source answered.
    Unavailable(String),
}

/// Drives query tiers through sources, filter and summarizer.
pub struct FallbackOrchestrator {
    sources: Vec<Arc<dyn SourceAdapter>>,
    cache: Arc<dyn ResultCache>,
    filter: ListingFilter,
    config: OrchestratorConfig,
    flights: KeyedLocks,
}

impl FallbackOrchestrator {
    /// Create an orchestrator. Sources are searched in the given order and
    /// their listings concatenated per tier.
    pub fn new(
        sources: Vec<Arc<dyn SourceAdapter>>,
        cache: Arc<dyn ResultCache>,
        filter: ListingFilter,
        config: OrchestratorConfig,
    ) -> Self {
        Self {
            sources,
            cache,
            filter,
            config,
            flights: KeyedLocks::new(),
        }
    }

    pub fn source_ids(&self) -> Vec<&'static str> {
        self.sources.iter().map(|s| s.id()).collect()
    }

    /// Resolve one request to its summary.
    pub async fn resolve(&self, request: &SearchRequest) -> Result<PriceSummary, PricingError> {
        Ok(self.resolve_detailed(request).await?.summary)
    }

    /// Resolve one request, keeping the listings that produced the summary.
    pub async fn resolve_detailed(
        &self,
        request: &SearchRequest,
    ) -> Result<Resolution, PricingError> {
        request.validate()?;

        let now = Utc::now();
        let strict = QueryBuilder::strict_tier(request, now);
        let key = request_key(&strict, request);

        if let Some(hit) = self.cache.get(&key).await? {
            debug!("Cache hit for '{}'", key);
            return Ok(Resolution::cached(hit));
        }

        if !self.config.single_flight {
            return self.walk(request, &key).await;
        }

        let _flight = self.flights.acquire(&key).await;
        // Another caller may have finished this key while we waited.
        if let Some(hit) = self.cache.get(&key).await? {
            debug!("Cache hit for '{}' after waiting on in-flight search", key);
            return Ok(Resolution::cached(hit));
        }
        self.walk(request, &key).await
    }

    /// Resolve every row concurrently. The result has one summary per
    /// request, in input order.
    ///
    /// Every row is validated before any work starts. A cache failure fails
    /// the whole batch; source failures, terminal source errors and row
    /// timeouts are reported on the affected row only.
    pub async fn resolve_batch(
        &self,
        requests: &[SearchRequest],
    ) -> Result<Vec<PriceSummary>, PricingError> {
        for (index, request) in requests.iter().enumerate() {
            request.validate().map_err(|e| match e {
                PricingError::InvalidRequest(message) => {
                    PricingError::InvalidRequest(format!("row {}: {}", index, message))
                }
                other => other,
            })?;
        }

        info!("Resolving batch of {} requests", requests.len());
        let rows = requests
            .iter()
            .enumerate()
            .map(|(index, request)| self.resolve_row(index, request));

        join_all(rows).await.into_iter().collect()
    }

    async fn resolve_row(
        &self,
        index: usize,
        request: &SearchRequest,
    ) -> Result<PriceSummary, PricingError> {
        let outcome = match self.config.row_timeout {
            None => self.resolve(request).await,
            Some(limit) => match tokio::time::timeout(limit, self.resolve(request)).await {
                Ok(result) => result,
                Err(_) => {
                    warn!(
                        "Row {} ('{}') timed out after {:?}",
                        index, request.card_name, limit
                    );
                    return Ok(PriceSummary::failed(format!(
                        "Timed out after {} ms",
                        limit.as_millis()
                    )));
                }
            },
        };

        match outcome {
            Err(PricingError::Cache(message)) => Err(PricingError::Cache(message)),
            Err(e) => {
                warn!("Row {} ('{}') failed: {}", index, request.card_name, e);
                Ok(PriceSummary::failed(e.to_string()))
            }
            Ok(summary) => Ok(summary),
        }
    }

    async fn walk(
        &self,
        request: &SearchRequest,
        answer_key: &str,
    ) -> Result<Resolution, PricingError> {
        if let Some(window_tier) = QueryBuilder::window_tier(request, Utc::now()) {
            if let Some(found) = self.try_window(request, &window_tier).await? {
                self.cache.put(answer_key, found.summary.clone()).await?;
                return Ok(found);
            }
        }

        let tiers = QueryBuilder::tiers(request);
        let mut answered = false;
        let mut last_failure = String::new();

        for tier in &tiers {
            let key = tier_key(tier, request);
            if let Some(hit) = self.cache.get(&key).await? {
                debug!("Tier '{}' cache hit for '{}'", tier.label, key);
                let hit = hit.with_tier(tier.label.as_str());
                self.cache.put(answer_key, hit.clone()).await?;
                return Ok(Resolution::cached(hit));
            }

            let listings = match self.search_tier(tier, None).await? {
                TierSearch::Answered(listings) => listings,
                TierSearch::Unavailable(message) => {
                    warn!(
                        "No source answered tier '{}': {}, trying next tier",
                        tier.label, message
                    );
                    last_failure = message;
                    continue;
                }
            };
            answered = true;

            let (summary, kept) = self.summarize(request, tier, listings);
            if !summary.is_empty() {
                info!(
                    "Tier '{}' produced {} prices for '{}'",
                    tier.label, summary.count, request.card_name
                );
                self.cache.put(&key, summary.clone()).await?;
                self.cache.put(answer_key, summary.clone()).await?;
                return Ok(Resolution::fresh(summary, kept));
            }
            debug!("Tier '{}' yielded no usable prices", tier.label);
        }

        if !answered {
            warn!(
                "All sources unavailable for '{}' on every tier",
                request.card_name
            );
            return Ok(Resolution::fresh(
                PriceSummary::failed(format!("All listing sources unavailable: {}", last_failure)),
                Vec::new(),
            ));
        }

        let mut summary = PriceSummary::empty();
        if let Some(last) = tiers.last() {
            summary = summary.with_tier(last.label.as_str());
        }
        info!(
            "Exhausted {} tiers for '{}' with no usable prices",
            tiers.len(),
            request.card_name
        );
        self.cache.put(answer_key, summary.clone()).await?;
        Ok(Resolution::fresh(summary, Vec::new()))
    }

    /// Windowed tier. `None` means fall through to the ladder.
    async fn try_window(
        &self,
        request: &SearchRequest,
        tier: &QueryTier,
    ) -> Result<Option<Resolution>, PricingError> {
        let Some(window) = tier.window.as_ref() else {
            return Ok(None);
        };
        if !self.sources.iter().any(|s| s.supports_time_window()) {
            debug!("No source supports time-windowed search, skipping window tier");
            return Ok(None);
        }

        let key = tier_key(tier, request);
        if let Some(hit) = self.cache.get(&key).await? {
            return Ok(Some(Resolution::cached(hit.with_tier(tier.label.as_str()))));
        }

        let listings = match self.search_tier(tier, Some(window)).await? {
            TierSearch::Answered(listings) => listings,
            TierSearch::Unavailable(message) => {
                warn!(
                    "Window tier unavailable: {}, falling back to standard tiers",
                    message
                );
                return Ok(None);
            }
        };

        let (summary, kept) = self.summarize(request, tier, listings);
        if summary.is_empty() {
            debug!("Window of {} days yielded no usable prices", window.days);
            return Ok(None);
        }
        self.cache.put(&key, summary.clone()).await?;
        Ok(Some(Resolution::fresh(summary, kept)))
    }

    fn summarize(
        &self,
        request: &SearchRequest,
        tier: &QueryTier,
        listings: Vec<Listing>,
    ) -> (PriceSummary, Vec<PricedListing>) {
        let kept = self.filter.apply(listings, request, tier);
        let prices: Vec<_> = kept.iter().map(|p| p.price).collect();
        let summary = PriceSummarizer::summarize(&prices).with_tier(tier.label.as_str());
        (summary, kept)
    }

    /// Search every eligible source for one tier and concatenate results.
    /// Only a terminal error from a source is returned as `Err`.
    async fn search_tier(
        &self,
        tier: &QueryTier,
        window: Option<&TimeWindow>,
    ) -> Result<TierSearch, PricingError> {
        let mut listings = Vec::new();
        let mut answered = false;
        let mut failures = Vec::new();

        for source in &self.sources {
            if window.is_some() && !source.supports_time_window() {
                continue;
            }
            match self.search_source(source.as_ref(), tier, window).await {
                Ok(found) => {
                    debug!(
                        "Source '{}' returned {} listings for tier '{}'",
                        source.id(),
                        found.len(),
                        tier.label
                    );
                    answered = true;
                    listings.extend(found);
                }
                Err(e) => match e.retry_class() {
                    RetryClass::TreatAsEmpty => {
                        warn!(
                            "Source '{}' failed on tier '{}': {}, treating as no listings",
                            source.id(),
                            tier.label,
                            e
                        );
                        answered = true;
                    }
                    RetryClass::Never => {
                        info!(
                            "Terminal error from '{}': {}, not continuing",
                            source.id(),
                            e
                        );
                        return Err(e);
                    }
                    RetryClass::RetryOnce => {
                        warn!(
                            "Source '{}' unavailable for tier '{}': {}",
                            source.id(),
                            tier.label,
                            e
                        );
                        failures.push(e.to_string());
                    }
                },
            }
        }

        Ok(if answered {
            TierSearch::Answered(listings)
        } else if failures.is_empty() {
            TierSearch::Unavailable("no listing sources configured".to_string())
        } else {
            TierSearch::Unavailable(failures.join("; "))
        })
    }

    /// One source call, retried once when the source is unavailable.
    async fn search_source(
        &self,
        source: &dyn SourceAdapter,
        tier: &QueryTier,
        window: Option<&TimeWindow>,
    ) -> Result<Vec<Listing>, PricingError> {
        match dispatch(source, tier, window).await {
            Err(e) if e.retry_class() == RetryClass::RetryOnce => {
                info!(
                    "Source '{}' failed with {}, retrying in {:?}",
                    source.id(),
                    e,
                    self.config.retry_backoff
                );
                tokio::time::sleep(self.config.retry_backoff).await;
                dispatch(source, tier, window).await
            }
            other => other,
        }
    }
}

async fn dispatch(
    source: &dyn SourceAdapter,
    tier: &QueryTier,
    window: Option<&TimeWindow>,
) -> Result<Vec<Listing>, PricingError> {
    match window {
        Some(window) => source.search_window(tier, window).await,
        None => source.search(tier).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MokaResultCache;
    use crate::models::{Condition, TierLabel};
    use async_trait::async_trait;
    use rust_decimal_macros::dec;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    type Script = Box<dyn Fn(&QueryTier) -> Result<Vec<Listing>, PricingError> + Send + Sync>;

    struct MockSource {
        id: &'static str,
        script: Script,
        windowed: bool,
        delay: Duration,
        slow_prefix: Option<&'static str>,
        call_count: AtomicUsize,
        queries: Mutex<Vec<String>>,
    }

    impl MockSource {
        fn new(
            script: impl Fn(&QueryTier) -> Result<Vec<Listing>, PricingError> + Send + Sync + 'static,
        ) -> Self {
            Self {
                id: "MOCK",
                script: Box::new(script),
                windowed: false,
                delay: Duration::ZERO,
                slow_prefix: None,
                call_count: AtomicUsize::new(0),
                queries: Mutex::new(Vec::new()),
            }
        }

        fn windowed(mut self) -> Self {
            self.windowed = true;
            self
        }

        fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = delay;
            self
        }

        /// Only queries starting with `prefix` are delayed.
        fn with_delay_for(mut self, prefix: &'static str, delay: Duration) -> Self {
            self.slow_prefix = Some(prefix);
            self.delay = delay;
            self
        }

        fn calls(&self) -> usize {
            self.call_count.load(Ordering::SeqCst)
        }

        fn queries(&self) -> Vec<String> {
            self.queries.lock().unwrap().clone()
        }

        async fn run(&self, tier: &QueryTier) -> Result<Vec<Listing>, PricingError> {
            self.call_count.fetch_add(1, Ordering::SeqCst);
            let query = tier.keywords();
            self.queries.lock().unwrap().push(query.clone());
            let slow = self.slow_prefix.map_or(true, |p| query.starts_with(p));
            if slow && !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            (self.script)(tier)
        }
    }

    #[async_trait]
    impl SourceAdapter for MockSource {
        fn id(&self) -> &'static str {
            self.id
        }

        fn supports_time_window(&self) -> bool {
            self.windowed
        }

        async fn search(&self, tier: &QueryTier) -> Result<Vec<Listing>, PricingError> {
            self.run(tier).await
        }

        async fn search_window(
            &self,
            tier: &QueryTier,
            _window: &TimeWindow,
        ) -> Result<Vec<Listing>, PricingError> {
            if !self.windowed {
                return Err(PricingError::NotSupported {
                    operation: "time-windowed search".to_string(),
                    provider: self.id.to_string(),
                });
            }
            self.run(tier).await
        }
    }

    fn listings(title: &str, prices: &[&str]) -> Vec<Listing> {
        prices
            .iter()
            .map(|p| Listing::new(title, *p, "MOCK"))
            .collect()
    }

    fn charizard() -> SearchRequest {
        let mut request = SearchRequest::new("Charizard", "Base Set");
        request.card_number = Some("4/102".to_string());
        request.condition = Some(Condition::Used);
        request
    }

    fn test_config() -> OrchestratorConfig {
        OrchestratorConfig {
            retry_backoff: Duration::ZERO,
            ..Default::default()
        }
    }

    fn orchestrator(source: Arc<MockSource>) -> FallbackOrchestrator {
        FallbackOrchestrator::new(
            vec![source],
            Arc::new(MokaResultCache::default()),
            ListingFilter::default(),
            test_config(),
        )
    }

    /// Strict tier finds nothing; the condition-dropped tier finds three.
    fn charizard_script(tier: &QueryTier) -> Result<Vec<Listing>, PricingError> {
        match tier.label {
            TierLabel::Strict => Ok(vec![]),
            _ => Ok(listings("Charizard Base Set 4/102 Holo", &["120", "150", "130"])),
        }
    }

    #[tokio::test]
    async fn test_falls_back_to_next_tier() {
        let source = Arc::new(MockSource::new(charizard_script));
        let orchestrator = orchestrator(source.clone());

        let summary = orchestrator.resolve(&charizard()).await.unwrap();

        assert_eq!(summary.count, 3);
        assert_eq!(summary.avg_price, dec!(133.33));
        assert_eq!(summary.median, dec!(130));
        assert_eq!(summary.min, dec!(120));
        assert_eq!(summary.max, dec!(150));
        assert_eq!(summary.tier.as_deref(), Some("drop condition"));
        assert_eq!(source.calls(), 2);
    }

    #[tokio::test]
    async fn test_second_identical_request_hits_cache() {
        let source = Arc::new(MockSource::new(charizard_script));
        let orchestrator = orchestrator(source.clone());

        let first = orchestrator.resolve_detailed(&charizard()).await.unwrap();
        let second = orchestrator.resolve_detailed(&charizard()).await.unwrap();

        assert!(!first.cache_hit);
        assert_eq!(first.listings.len(), 3);
        assert!(second.cache_hit);
        assert_eq!(first.summary, second.summary);
        assert_eq!(source.calls(), 2);
    }

    #[tokio::test]
    async fn test_relaxed_tier_result_is_shared_by_key() {
        let source = Arc::new(MockSource::new(|tier: &QueryTier| {
            if tier.filters.location.is_some() {
                Ok(vec![])
            } else {
                Ok(listings("Pikachu Jungle", &["10", "12"]))
            }
        }));
        let orchestrator = orchestrator(source.clone());

        let mut located = SearchRequest::new("Pikachu", "Jungle");
        located.seller_location = Some("US".to_string());
        let first = orchestrator.resolve(&located).await.unwrap();
        assert_eq!(first.tier.as_deref(), Some("drop location"));
        assert_eq!(source.calls(), 2);

        // Same query once the location is dropped: answered from the tier entry.
        let plain = SearchRequest::new("Pikachu", "Jungle");
        let second = orchestrator.resolve(&plain).await.unwrap();
        assert_eq!(second.count, first.count);
        assert_eq!(second.avg_price, first.avg_price);
        assert_eq!(second.tier.as_deref(), Some("strict"));
        assert_eq!(source.calls(), 2);
    }

    #[tokio::test]
    async fn test_shared_tier_entry_reports_resolving_tier() {
        let source = Arc::new(MockSource::new(|tier: &QueryTier| {
            if tier.filters.location.is_some() || tier.filters.rarity.is_some() {
                Ok(vec![])
            } else {
                Ok(listings("Pikachu Jungle", &["10", "12"]))
            }
        }));
        let orchestrator = orchestrator(source.clone());

        let plain = orchestrator
            .resolve(&SearchRequest::new("Pikachu", "Jungle"))
            .await
            .unwrap();
        assert_eq!(plain.tier.as_deref(), Some("strict"));
        assert_eq!(source.calls(), 1);

        let mut located = SearchRequest::new("Pikachu", "Jungle");
        located.seller_location = Some("US".to_string());
        located.rarity = Some("Holo".to_string());
        let relaxed = orchestrator.resolve(&located).await.unwrap();

        assert_eq!(relaxed.count, 2);
        assert_eq!(relaxed.tier.as_deref(), Some("drop rarity"));
        // Strict and drop-location tiers searched, then the plain entry reused.
        assert_eq!(source.calls(), 3);

        // The aliased answer keeps the resolving label too.
        let repeat = orchestrator.resolve(&located).await.unwrap();
        assert_eq!(repeat.tier.as_deref(), Some("drop rarity"));
        assert_eq!(source.calls(), 3);
    }

    #[tokio::test]
    async fn test_no_global_query_without_global_fallback() {
        let source = Arc::new(MockSource::new(|_: &QueryTier| Ok(vec![])));
        let orchestrator = orchestrator(source.clone());

        let mut request = charizard();
        request.graded = Some(true);
        request.grading_company = Some("PSA".to_string());
        request.grade = Some("10".to_string());

        let summary = orchestrator.resolve(&request).await.unwrap();

        assert_eq!(summary.count, 0);
        assert!(summary.error.is_none());
        assert!(source
            .queries()
            .iter()
            .all(|q| q.contains("4/102") && q.ends_with("PSA 10")));
    }

    #[tokio::test]
    async fn test_global_tier_used_when_requested() {
        let source = Arc::new(MockSource::new(|tier: &QueryTier| match tier.label {
            TierLabel::Global => Ok(listings("Charizard Base Set 4/102 PSA 10", &["5000"])),
            _ => Ok(vec![]),
        }));
        let orchestrator = orchestrator(source.clone());

        let mut request = SearchRequest::new("Charizard", "Base Set");
        request.card_number = Some("4/102".to_string());
        request.graded = Some(true);
        request.grading_company = Some("PSA".to_string());
        request.grade = Some("10".to_string());
        request.global_fallback = true;

        let summary = orchestrator.resolve(&request).await.unwrap();
        assert_eq!(summary.count, 1);
        assert_eq!(summary.tier.as_deref(), Some("global"));
        assert_eq!(
            source.queries().last().map(String::as_str),
            Some("Charizard Base Set 4/102 sold")
        );
    }

    #[tokio::test]
    async fn test_zero_result_cached_under_request_key() {
        let source = Arc::new(MockSource::new(|_: &QueryTier| Ok(vec![])));
        let orchestrator = orchestrator(source.clone());

        let first = orchestrator.resolve(&charizard()).await.unwrap();
        let calls = source.calls();
        let second = orchestrator.resolve(&charizard()).await.unwrap();

        assert_eq!(first.count, 0);
        assert_eq!(first.tier.as_deref(), Some("drop condition"));
        assert_eq!(second, first);
        assert_eq!(source.calls(), calls);
    }

    #[tokio::test]
    async fn test_unavailable_everywhere_reports_error_and_is_not_cached() {
        let source = Arc::new(MockSource::new(|_: &QueryTier| {
            Err(PricingError::unavailable("MOCK", "connection refused"))
        }));
        let orchestrator = orchestrator(source.clone());

        let summary = orchestrator.resolve(&charizard()).await.unwrap();

        assert_eq!(summary.count, 0);
        assert!(summary
            .error
            .as_deref()
            .is_some_and(|e| e.contains("connection refused")));
        // Two tiers, each tried twice.
        assert_eq!(source.calls(), 4);

        // Not cached: the next request searches again.
        orchestrator.resolve(&charizard()).await.unwrap();
        assert_eq!(source.calls(), 8);
    }

    #[tokio::test]
    async fn test_unavailable_source_retried_once() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let counter = attempts.clone();
        let source = Arc::new(MockSource::new(move |_: &QueryTier| {
            if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                Err(PricingError::unavailable("MOCK", "503"))
            } else {
                Ok(listings("Charizard Base Set 4/102", &["100"]))
            }
        }));
        let orchestrator = orchestrator(source.clone());

        let summary = orchestrator.resolve(&charizard()).await.unwrap();
        assert_eq!(summary.count, 1);
        assert_eq!(summary.tier.as_deref(), Some("strict"));
        assert_eq!(source.calls(), 2);
    }

    #[tokio::test]
    async fn test_parse_error_treated_as_empty_tier() {
        let source = Arc::new(MockSource::new(|tier: &QueryTier| match tier.label {
            TierLabel::Strict => Err(PricingError::parse("MOCK", "unexpected markup")),
            _ => Ok(listings("Charizard Base Set 4/102", &["80", "90"])),
        }));
        let orchestrator = orchestrator(source.clone());

        let summary = orchestrator.resolve(&charizard()).await.unwrap();
        assert_eq!(summary.count, 2);
        assert!(summary.error.is_none());
        // Parse errors are not retried.
        assert_eq!(source.calls(), 2);
    }

    #[tokio::test]
    async fn test_sources_are_concatenated_per_tier() {
        let api = Arc::new(MockSource::new(|_: &QueryTier| {
            Ok(listings("Charizard Base Set 4/102", &["100"]))
        }));
        let scrape = Arc::new(MockSource::new(|_: &QueryTier| {
            Err(PricingError::parse("MOCK", "no results container"))
        }));
        let third = Arc::new(MockSource::new(|_: &QueryTier| {
            Ok(listings("Charizard Base Set 4/102", &["200"]))
        }));
        let orchestrator = FallbackOrchestrator::new(
            vec![api, scrape, third],
            Arc::new(MokaResultCache::default()),
            ListingFilter::default(),
            test_config(),
        );

        let summary = orchestrator.resolve(&charizard()).await.unwrap();
        assert_eq!(summary.count, 2);
        assert_eq!(summary.avg_price, dec!(150));
    }

    #[tokio::test]
    async fn test_window_tier_tried_first() {
        let source = Arc::new(
            MockSource::new(|tier: &QueryTier| match tier.label {
                TierLabel::RecentWindow => Ok(listings("Charizard Base Set 4/102", &["300"])),
                _ => Ok(listings("Charizard Base Set 4/102", &["100"])),
            })
            .windowed(),
        );
        let orchestrator = orchestrator(source.clone());

        let mut request = charizard();
        request.recency_window_days = Some(30);
        let summary = orchestrator.resolve(&request).await.unwrap();

        assert_eq!(summary.tier.as_deref(), Some("recent window"));
        assert_eq!(summary.max, dec!(300));
        assert_eq!(source.calls(), 1);
    }

    #[tokio::test]
    async fn test_window_failure_falls_through_to_ladder() {
        let source = Arc::new(
            MockSource::new(|tier: &QueryTier| match tier.label {
                TierLabel::RecentWindow => Err(PricingError::unavailable("MOCK", "timeout")),
                _ => Ok(listings("Charizard Base Set 4/102", &["100"])),
            })
            .windowed(),
        );
        let orchestrator = orchestrator(source.clone());

        let mut request = charizard();
        request.recency_window_days = Some(7);
        let summary = orchestrator.resolve(&request).await.unwrap();

        assert_eq!(summary.tier.as_deref(), Some("strict"));
        assert!(summary.error.is_none());
    }

    #[tokio::test]
    async fn test_window_skipped_without_capable_source() {
        let source = Arc::new(MockSource::new(|_: &QueryTier| {
            Ok(listings("Charizard Base Set 4/102", &["100"]))
        }));
        let orchestrator = orchestrator(source.clone());

        let mut request = charizard();
        request.recency_window_days = Some(7);
        let summary = orchestrator.resolve(&request).await.unwrap();

        assert_eq!(summary.tier.as_deref(), Some("strict"));
        assert_eq!(source.calls(), 1);
    }

    #[tokio::test]
    async fn test_batch_preserves_order_with_failing_row() {
        let source = Arc::new(MockSource::new(|tier: &QueryTier| {
            let query = tier.keywords();
            if query.starts_with("Blastoise") {
                Err(PricingError::unavailable("MOCK", "down"))
            } else if query.starts_with("Charizard") {
                Ok(listings("Charizard Base Set", &["100"]))
            } else {
                Ok(listings("Venusaur Base Set", &["40", "60"]))
            }
        }));
        let orchestrator = orchestrator(source);

        let requests = vec![
            SearchRequest::new("Charizard", "Base Set"),
            SearchRequest::new("Blastoise", "Base Set"),
            SearchRequest::new("Venusaur", "Base Set"),
        ];
        let summaries = orchestrator.resolve_batch(&requests).await.unwrap();

        assert_eq!(summaries.len(), 3);
        assert_eq!(summaries[0].count, 1);
        assert_eq!(summaries[1].count, 0);
        assert!(summaries[1].error.is_some());
        assert_eq!(summaries[2].count, 2);
        assert_eq!(summaries[2].avg_price, dec!(50));
    }

    #[tokio::test]
    async fn test_batch_terminal_source_error_fails_only_its_row() {
        let source = Arc::new(MockSource::new(|tier: &QueryTier| {
            let query = tier.keywords();
            if query.starts_with("Blastoise") {
                Err(PricingError::InvalidRequest("source refused query".to_string()))
            } else if query.starts_with("Charizard") {
                Ok(listings("Charizard Base Set", &["100"]))
            } else {
                Ok(listings("Venusaur Base Set", &["40", "60"]))
            }
        }));
        let orchestrator = orchestrator(source);

        let requests = vec![
            SearchRequest::new("Charizard", "Base Set"),
            SearchRequest::new("Blastoise", "Base Set"),
            SearchRequest::new("Venusaur", "Base Set"),
        ];
        let summaries = orchestrator.resolve_batch(&requests).await.unwrap();

        assert_eq!(summaries.len(), 3);
        assert_eq!(summaries[0].count, 1);
        assert_eq!(summaries[1].count, 0);
        assert!(summaries[1]
            .error
            .as_deref()
            .is_some_and(|e| e.contains("source refused query")));
        assert_eq!(summaries[2].count, 2);
    }

    #[tokio::test]
    async fn test_batch_cache_error_from_source_fails_batch() {
        let source = Arc::new(MockSource::new(|_: &QueryTier| {
            Err(PricingError::Cache("backing store offline".to_string()))
        }));
        let orchestrator = orchestrator(source);

        let err = orchestrator
            .resolve_batch(&[SearchRequest::new("Charizard", "Base Set")])
            .await
            .unwrap_err();
        assert!(matches!(err, PricingError::Cache(_)));
    }

    #[tokio::test]
    async fn test_batch_rejects_invalid_row_before_searching() {
        let source = Arc::new(MockSource::new(|_: &QueryTier| Ok(vec![])));
        let orchestrator = orchestrator(source.clone());

        let requests = vec![
            SearchRequest::new("Charizard", "Base Set"),
            SearchRequest::new("", "Base Set"),
        ];
        let err = orchestrator.resolve_batch(&requests).await.unwrap_err();

        assert!(matches!(err, PricingError::InvalidRequest(ref m) if m.starts_with("row 1")));
        assert_eq!(source.calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_row_timeout_does_not_affect_other_rows() {
        let source = Arc::new(
            MockSource::new(|tier: &QueryTier| {
                Ok(listings(&tier.identity.join(" "), &["25"]))
            })
            .with_delay_for("Mew", Duration::from_secs(60)),
        );
        let orchestrator = FallbackOrchestrator::new(
            vec![source],
            Arc::new(MokaResultCache::default()),
            ListingFilter::default(),
            OrchestratorConfig {
                row_timeout: Some(Duration::from_secs(1)),
                ..test_config()
            },
        );

        let summaries = orchestrator
            .resolve_batch(&[
                SearchRequest::new("Mew", "Promo"),
                SearchRequest::new("Pikachu", "Jungle"),
            ])
            .await
            .unwrap();

        assert_eq!(summaries.len(), 2);
        assert_eq!(summaries[0].count, 0);
        assert_eq!(summaries[0].error.as_deref(), Some("Timed out after 1000 ms"));
        assert_eq!(summaries[1].count, 1);
        assert_eq!(summaries[1].avg_price, dec!(25));
        assert!(summaries[1].error.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_single_flight_shares_one_search() {
        let source = Arc::new(
            MockSource::new(|_: &QueryTier| Ok(listings("Mewtwo Base Set", &["30"])))
                .with_delay(Duration::from_millis(100)),
        );
        let orchestrator = orchestrator(source.clone());
        let request = SearchRequest::new("Mewtwo", "Base Set");

        let (a, b) = tokio::join!(orchestrator.resolve(&request), orchestrator.resolve(&request));

        assert_eq!(a.unwrap(), b.unwrap());
        assert_eq!(source.calls(), 1);
    }

    #[tokio::test]
    async fn test_invalid_request_rejected() {
        let source = Arc::new(MockSource::new(|_: &QueryTier| Ok(vec![])));
        let orchestrator = orchestrator(source.clone());

        let err = orchestrator
            .resolve(&SearchRequest::new("Charizard", " "))
            .await
            .unwrap_err();
        assert!(matches!(err, PricingError::InvalidRequest(_)));
        assert_eq!(source.calls(), 0);
    }

    #[tokio::test]
    async fn test_terminal_source_error_fails_the_row() {
        let source = Arc::new(MockSource::new(|_: &QueryTier| {
            Err(PricingError::Cache("backing store offline".to_string()))
        }));
        let orchestrator = orchestrator(source.clone());

        let err = orchestrator.resolve(&charizard()).await.unwrap_err();
        assert!(matches!(err, PricingError::Cache(_)));
        assert_eq!(source.calls(), 1);
    }
}
