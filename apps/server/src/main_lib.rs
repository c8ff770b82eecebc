use std::sync::Arc;

use anyhow::anyhow;
use cardcatch_pricing::{
    EbayApiConfig, EbayBrowseAdapter, EbayOAuthTokenProvider, FallbackOrchestrator,
    ScrapingAdapter, ScrapingConfig, SourceAdapter,
};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::{Config, SourceMode};

pub struct AppState {
    pub orchestrator: Arc<FallbackOrchestrator>,
}

pub fn init_tracing(log_format: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);

    if log_format.eq_ignore_ascii_case("json") {
        registry
            .with(fmt::layer().json().with_current_span(false))
            .init();
    } else {
        registry
            .with(fmt::layer().with_target(true).with_line_number(true))
            .init();
    }
}

/// Build application state with the listing sources named by the config.
pub fn build_state(config: &Config) -> anyhow::Result<Arc<AppState>> {
    let sources = build_sources(config)?;
    Ok(build_state_with_sources(config, sources))
}

/// Build application state over caller-supplied sources.
pub fn build_state_with_sources(
    config: &Config,
    sources: Vec<Arc<dyn SourceAdapter>>,
) -> Arc<AppState> {
    let orchestrator = config.pricing_config().build(sources);
    tracing::info!(
        "Pricing sources in use: {:?}",
        orchestrator.source_ids()
    );
    Arc::new(AppState {
        orchestrator: Arc::new(orchestrator),
    })
}

fn build_sources(config: &Config) -> anyhow::Result<Vec<Arc<dyn SourceAdapter>>> {
    let mut sources: Vec<Arc<dyn SourceAdapter>> = Vec::new();

    if matches!(config.source_mode, SourceMode::Api | SourceMode::Both) {
        let (Some(client_id), Some(client_secret)) =
            (&config.ebay_client_id, &config.ebay_client_secret)
        else {
            return Err(anyhow!(
                "EBAY_CLIENT_ID and EBAY_CLIENT_SECRET are required when CC_SOURCE is api or both"
            ));
        };
        let tokens = Arc::new(EbayOAuthTokenProvider::new(
            config.ebay_api_base_url.clone(),
            client_id.clone(),
            client_secret.clone(),
        ));
        sources.push(Arc::new(EbayBrowseAdapter::new(
            tokens,
            EbayApiConfig {
                base_url: config.ebay_api_base_url.clone(),
                marketplace_id: config.ebay_marketplace_id.clone(),
                limit: config.result_limit,
                ..EbayApiConfig::default()
            },
        )));
    }

    if matches!(config.source_mode, SourceMode::Scrape | SourceMode::Both) {
        sources.push(Arc::new(ScrapingAdapter::new(ScrapingConfig {
            base_url: config.ebay_web_base_url.clone(),
            ..ScrapingConfig::default()
        })));
    }

    Ok(sources)
}
