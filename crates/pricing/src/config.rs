//! Library-level configuration.

use std::sync::Arc;

use crate::cache::{CacheConfig, MokaResultCache, ResultCache};
use crate::filter::{FilterConfig, ListingFilter};
use crate::orchestrator::{FallbackOrchestrator, OrchestratorConfig};
use crate::provider::SourceAdapter;

/// Everything the pricing pipeline needs apart from its sources.
#[derive(Clone, Debug, Default)]
pub struct PricingConfig {
    pub filter: FilterConfig,
    pub cache: CacheConfig,
    pub orchestrator: OrchestratorConfig,
}

impl PricingConfig {
    /// Build an orchestrator over `sources` with an in-process cache.
    pub fn build(&self, sources: Vec<Arc<dyn SourceAdapter>>) -> FallbackOrchestrator {
        let cache: Arc<dyn ResultCache> = Arc::new(MokaResultCache::new(&self.cache));
        self.build_with_cache(sources, cache)
    }

    /// Build an orchestrator over `sources` with a caller-supplied cache.
    pub fn build_with_cache(
        &self,
        sources: Vec<Arc<dyn SourceAdapter>>,
        cache: Arc<dyn ResultCache>,
    ) -> FallbackOrchestrator {
        FallbackOrchestrator::new(
            sources,
            cache,
            ListingFilter::new(self.filter.clone()),
            self.orchestrator.clone(),
        )
    }
}
