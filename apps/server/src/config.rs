use std::{net::SocketAddr, str::FromStr, time::Duration};

use anyhow::{anyhow, Context};
use cardcatch_pricing::{CacheConfig, FilterConfig, OrchestratorConfig, PricingConfig};
use rust_decimal::Decimal;

/// Which listing sources the server searches.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SourceMode {
    Api,
    Scrape,
    /// API first, then scraping, concatenated per tier.
    Both,
}

impl FromStr for SourceMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "api" => Ok(SourceMode::Api),
            "scrape" => Ok(SourceMode::Scrape),
            "both" => Ok(SourceMode::Both),
            other => Err(anyhow!("Invalid CC_SOURCE '{}': expected api, scrape or both", other)),
        }
    }
}

pub struct Config {
    pub listen_addr: SocketAddr,
    pub source_mode: SourceMode,
    pub ebay_client_id: Option<String>,
    pub ebay_client_secret: Option<String>,
    pub ebay_api_base_url: String,
    pub ebay_web_base_url: String,
    pub ebay_marketplace_id: String,
    pub result_limit: u32,
    pub cache_ttl: Duration,
    pub zero_result_ttl: Duration,
    pub min_price: Decimal,
    pub max_price: Decimal,
    pub row_timeout: Option<Duration>,
    pub request_timeout: Duration,
    pub cors_allow: Vec<String>,
    pub log_format: String,
}

impl Default for Config {
    fn default() -> Self {
        let filter = FilterConfig::default();
        let cache = CacheConfig::default();
        Self {
            listen_addr: SocketAddr::from(([0, 0, 0, 0], 3000)),
            source_mode: SourceMode::Api,
            ebay_client_id: None,
            ebay_client_secret: None,
            ebay_api_base_url: "https://api.ebay.com".to_string(),
            ebay_web_base_url: "https://www.ebay.com".to_string(),
            ebay_marketplace_id: "EBAY_US".to_string(),
            result_limit: 50,
            cache_ttl: cache.ttl,
            zero_result_ttl: cache.zero_result_ttl,
            min_price: filter.min_price,
            max_price: filter.max_price,
            row_timeout: None,
            request_timeout: Duration::from_millis(30000),
            cors_allow: vec!["*".to_string()],
            log_format: "text".to_string(),
        }
    }
}

impl Config {
    /// Read configuration from the process environment, after loading `.env`.
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from any key lookup. Unset keys keep defaults.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        let listen_addr = match (get("CC_LISTEN_ADDR"), get("PORT")) {
            (Some(addr), _) => addr
                .parse()
                .with_context(|| format!("Invalid CC_LISTEN_ADDR '{}'", addr))?,
            (None, Some(port)) => {
                let port: u16 = port
                    .parse()
                    .with_context(|| format!("Invalid PORT '{}'", port))?;
                SocketAddr::from(([0, 0, 0, 0], port))
            }
            (None, None) => defaults.listen_addr,
        };

        let source_mode = match get("CC_SOURCE") {
            Some(mode) => mode.parse()?,
            None => defaults.source_mode,
        };

        let min_price = parse_or(&get, "CC_MIN_PRICE", defaults.min_price)?;
        let max_price = parse_or(&get, "CC_MAX_PRICE", defaults.max_price)?;
        if min_price > max_price {
            return Err(anyhow!(
                "CC_MIN_PRICE ({}) exceeds CC_MAX_PRICE ({})",
                min_price,
                max_price
            ));
        }

        let row_timeout = match get("CC_ROW_TIMEOUT_MS") {
            Some(ms) => Some(Duration::from_millis(
                ms.parse()
                    .with_context(|| format!("Invalid CC_ROW_TIMEOUT_MS '{}'", ms))?,
            )),
            None => defaults.row_timeout,
        };

        let cors_allow = get("CC_CORS_ALLOW_ORIGINS")
            .map(|origins| {
                origins
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect()
            })
            .unwrap_or(defaults.cors_allow);

        Ok(Self {
            listen_addr,
            source_mode,
            ebay_client_id: get("EBAY_CLIENT_ID"),
            ebay_client_secret: get("EBAY_CLIENT_SECRET"),
            ebay_api_base_url: get("EBAY_API_BASE_URL").unwrap_or(defaults.ebay_api_base_url),
            ebay_web_base_url: get("EBAY_WEB_BASE_URL").unwrap_or(defaults.ebay_web_base_url),
            ebay_marketplace_id: get("EBAY_MARKETPLACE_ID")
                .unwrap_or(defaults.ebay_marketplace_id),
            result_limit: parse_or(&get, "CC_RESULT_LIMIT", defaults.result_limit)?,
            cache_ttl: Duration::from_secs(parse_or(
                &get,
                "CC_CACHE_TTL_SECS",
                defaults.cache_ttl.as_secs(),
            )?),
            zero_result_ttl: Duration::from_secs(parse_or(
                &get,
                "CC_ZERO_RESULT_TTL_SECS",
                defaults.zero_result_ttl.as_secs(),
            )?),
            min_price,
            max_price,
            row_timeout,
            request_timeout: Duration::from_millis(parse_or(
                &get,
                "CC_REQUEST_TIMEOUT_MS",
                defaults.request_timeout.as_millis() as u64,
            )?),
            cors_allow,
            log_format: get("CC_LOG_FORMAT").unwrap_or(defaults.log_format),
        })
    }

    /// Pricing pipeline settings derived from this configuration.
    pub fn pricing_config(&self) -> PricingConfig {
        PricingConfig {
            filter: FilterConfig {
                min_price: self.min_price,
                max_price: self.max_price,
                ..FilterConfig::default()
            },
            cache: CacheConfig {
                ttl: self.cache_ttl,
                zero_result_ttl: self.zero_result_ttl,
                ..CacheConfig::default()
            },
            orchestrator: OrchestratorConfig {
                row_timeout: self.row_timeout,
                ..OrchestratorConfig::default()
            },
        }
    }
}

fn parse_or<T, G>(get: &G, key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| anyhow!("Invalid {} '{}': {}", key, raw, e)),
        None => Ok(default),
    }
}
