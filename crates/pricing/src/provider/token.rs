//! Access token acquisition for credential-backed sources.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use log::debug;
use reqwest::Client;
use serde::Deserialize;
use tokio::sync::Mutex;

use crate::errors::PricingError;

const PROVIDER_ID: &str = "EBAY_OAUTH";

/// Default eBay API scope for client-credentials tokens.
const DEFAULT_SCOPE: &str = "https://api.ebay.com/oauth/api_scope";

/// Tokens are refreshed this long before eBay says they expire.
const EXPIRY_MARGIN: Duration = Duration::from_secs(60);

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Opaque bearer token capability.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    /// Return a currently valid access token.
    ///
    /// Failures surface as `SourceUnavailable`.
    async fn access_token(&self) -> Result<String, PricingError>;
}

/// Fixed token, for tests and pre-provisioned credentials.
pub struct StaticTokenProvider {
    token: String,
}

impl StaticTokenProvider {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

#[async_trait]
impl TokenProvider for StaticTokenProvider {
    async fn access_token(&self) -> Result<String, PricingError> {
        Ok(self.token.clone())
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    /// Lifetime in seconds.
    expires_in: u64,
}

struct CachedToken {
    token: String,
    expires_at: Instant,
}

/// eBay OAuth2 client-credentials token provider.
///
/// Tokens are cached until shortly before expiry. Concurrent callers
/// serialize on the cache lock, so at most one token request is in flight.
pub struct EbayOAuthTokenProvider {
    client: Client,
    base_url: String,
    client_id: String,
    client_secret: String,
    scope: String,
    cached: Mutex<Option<CachedToken>>,
}

impl EbayOAuthTokenProvider {
    pub fn new(
        base_url: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Self {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            scope: DEFAULT_SCOPE.to_string(),
            cached: Mutex::new(None),
        }
    }

    async fn request_token(&self) -> Result<TokenResponse, PricingError> {
        let url = format!("{}/identity/v1/oauth2/token", self.base_url);
        let response = self
            .client
            .post(&url)
            .basic_auth(&self.client_id, Some(&self.client_secret))
            .form(&[
                ("grant_type", "client_credentials"),
                ("scope", self.scope.as_str()),
            ])
            .send()
            .await
            .map_err(|e| PricingError::unavailable(PROVIDER_ID, format!("Request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(PricingError::unavailable(
                PROVIDER_ID,
                format!("Token request rejected: HTTP {}", status),
            ));
        }

        response
            .json::<TokenResponse>()
            .await
            .map_err(|e| PricingError::unavailable(PROVIDER_ID, format!("Bad token response: {}", e)))
    }
}

#[async_trait]
impl TokenProvider for EbayOAuthTokenProvider {
    async fn access_token(&self) -> Result<String, PricingError> {
        let mut cached = self.cached.lock().await;
        if let Some(token) = cached.as_ref() {
            if Instant::now() < token.expires_at {
                return Ok(token.token.clone());
            }
        }

        debug!("Requesting new eBay access token");
        let fresh = self.request_token().await?;
        let lifetime = Duration::from_secs(fresh.expires_in).saturating_sub(EXPIRY_MARGIN);
        *cached = Some(CachedToken {
            token: fresh.access_token.clone(),
            expires_at: Instant::now() + lifetime,
        });
        Ok(fresh.access_token)
    }
}
