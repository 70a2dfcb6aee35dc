use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use reqwest::Client;

use crate::config::CmpOAuthConfig;
use crate::models::TokenResponse;
use crate::providers::StructuredLogger;
use crate::utils::error::{AppError, Result};

/// Seconds taken off the server-declared token lifetime before caching.
pub const TOKEN_EXPIRY_MARGIN_SECS: i64 = 300;

const TOKEN_PATH: &str = "/o/oauth2/v1/token";

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Source of bearer tokens for the CMP API.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TokenProvider: Send + Sync {
    async fn get_access_token(&self) -> Result<String>;

    fn has_cached_token(&self) -> bool;

    fn clear_cache(&self);
}

#[derive(Debug, Clone)]
struct CachedToken {
    access_token: String,
    expires_at: DateTime<Utc>,
}

/// Client-credentials grant with a single in-memory token cache.
///
/// Clones share the cache. The lock only guards reads and writes of the cached
/// entry and is never held across the token request, so callers that observe a
/// stale entry at the same time each fetch a token and the last one stored wins.
#[derive(Clone)]
pub struct OAuthClient {
    client: Client,
    config: CmpOAuthConfig,
    token_url: String,
    token_cache: Arc<Mutex<Option<CachedToken>>>,
    clock: Arc<dyn Clock>,
}

impl OAuthClient {
    pub fn new(config: CmpOAuthConfig) -> Result<Self> {
        Self::with_http_client(config, Client::new())
    }

    pub fn with_http_client(config: CmpOAuthConfig, client: Client) -> Result<Self> {
        config.validate()?;

        let token_url = format!("{}{}", config.auth_server_url.trim_end_matches('/'), TOKEN_PATH);

        Ok(Self {
            client,
            config,
            token_url,
            token_cache: Arc::new(Mutex::new(None)),
            clock: Arc::new(SystemClock),
        })
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    fn cache(&self) -> MutexGuard<'_, Option<CachedToken>> {
        self.token_cache.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn cached_token_at(&self, now: DateTime<Utc>) -> Option<String> {
        self.cache()
            .as_ref()
            .filter(|cached| now < cached.expires_at)
            .map(|cached| cached.access_token.clone())
    }

    async fn request_token(&self) -> Result<TokenResponse> {
        let form = [
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.as_str()),
            ("grant_type", "client_credentials"),
        ];

        let response = self.client.post(&self.token_url).form(&form).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();

            StructuredLogger::log_error(
                &format!("Token request failed with status {}: {}", status, body),
                None,
            );

            return Err(AppError::authentication(
                status.as_u16(),
                "Failed to obtain access token",
                body,
            ));
        }

        Ok(response.json().await?)
    }
}

/// `issued_at + expires_in - margin`; an out-of-range lifetime counts as zero.
pub fn token_expiry(issued_at: DateTime<Utc>, expires_in: i64) -> DateTime<Utc> {
    let lifetime = Duration::try_seconds(expires_in.saturating_sub(TOKEN_EXPIRY_MARGIN_SECS))
        .unwrap_or_else(Duration::zero);

    issued_at
        .checked_add_signed(lifetime)
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

#[async_trait]
impl TokenProvider for OAuthClient {
    async fn get_access_token(&self) -> Result<String> {
        if let Some(token) = self.cached_token_at(self.clock.now()) {
            StructuredLogger::log_info("Using cached token", None, None);
            return Ok(token);
        }

        StructuredLogger::log_info("Fetching new token from authorization server", None, None);
        let token_response = self.request_token().await?;

        let (access_token, expires_in) = match (token_response.access_token, token_response.expires_in) {
            (Some(access_token), Some(expires_in)) if !access_token.is_empty() => (access_token, expires_in),
            _ => {
                return Err(AppError::configuration(
                    "Invalid token response: missing access_token or expires_in",
                ))
            }
        };

        let expires_at = token_expiry(self.clock.now(), expires_in);
        *self.cache() = Some(CachedToken {
            access_token: access_token.clone(),
            expires_at,
        });

        StructuredLogger::log_info(
            &format!("Successfully obtained token, expires in {} seconds", expires_in),
            None,
            None,
        );

        Ok(access_token)
    }

    fn has_cached_token(&self) -> bool {
        self.cached_token_at(self.clock.now()).is_some()
    }

    fn clear_cache(&self) {
        *self.cache() = None;
        StructuredLogger::log_info("Token cache cleared", None, None);
    }
}
