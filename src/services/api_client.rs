use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::Serialize;

use crate::config::CmpClientConfig;
use crate::models::{AcknowledgeRequest, CompletionRequest, Image, KeyedPreviews};
use crate::providers::StructuredLogger;
use crate::services::oauth_client::{OAuthClient, TokenProvider};
use crate::utils::error::{AppError, Result};

/// Calls the webhook handler makes against the CMP API.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PreviewApi: Send + Sync {
    async fn acknowledge_preview(
        &self,
        content_id: &str,
        version_id: &str,
        preview_id: &str,
        acknowledged_by: &str,
        content_hash: &str,
    ) -> Result<()>;

    async fn submit_preview_completion(
        &self,
        content_id: &str,
        version_id: &str,
        preview_id: &str,
        keyed_previews: &KeyedPreviews,
    ) -> Result<()>;

    async fn get_image(&self, id: &str) -> Result<Image>;
}

#[derive(Clone)]
pub struct CmpApiClient {
    client: Client,
    api_base_url: Url,
    token_provider: Arc<dyn TokenProvider>,
}

impl CmpApiClient {
    pub fn new(config: CmpClientConfig) -> Result<Self> {
        Self::with_http_client(config, Client::new())
    }

    pub fn with_http_client(config: CmpClientConfig, client: Client) -> Result<Self> {
        config.validate()?;

        let oauth_client = OAuthClient::with_http_client(config.oauth, client.clone())?;
        Self::with_token_provider(&config.api_base_url, Arc::new(oauth_client), client)
    }

    /// Builds a client that authenticates through an existing, possibly shared, token provider.
    pub fn with_token_provider(
        api_base_url: &str,
        token_provider: Arc<dyn TokenProvider>,
        client: Client,
    ) -> Result<Self> {
        if api_base_url.trim().is_empty() {
            return Err(AppError::configuration("api_base_url is required"));
        }

        let api_base_url = Url::parse(api_base_url.trim_end_matches('/'))
            .map_err(|e| AppError::configuration(format!("Invalid api_base_url: {}", e)))?;
        if api_base_url.cannot_be_a_base() {
            return Err(AppError::configuration("Invalid api_base_url: cannot be a base URL"));
        }

        Ok(Self {
            client,
            api_base_url,
            token_provider,
        })
    }

    pub fn token_provider(&self) -> Arc<dyn TokenProvider> {
        Arc::clone(&self.token_provider)
    }

    /// Appends each value to the base path as a single percent-encoded segment.
    ///
    /// Values come from webhook payloads, so `/`, `?` and `#` are encoded and
    /// dot segments are refused instead of being resolved against the base.
    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        if let Some(segment) = segments.iter().find(|s| matches!(**s, "" | "." | "..")) {
            return Err(AppError::validation(format!("Invalid path segment: {:?}", segment)));
        }

        let mut url = self.api_base_url.clone();
        url.path_segments_mut()
            .map_err(|_| AppError::configuration("Invalid api_base_url: cannot be a base URL"))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn preview_endpoint(&self, content_id: &str, version_id: &str, preview_id: &str, action: &str) -> Result<Url> {
        self.endpoint(&[
            "structured-content",
            "contents",
            content_id,
            "versions",
            version_id,
            "previews",
            preview_id,
            action,
        ])
    }

    async fn post_json<T: Serialize + Sync>(
        &self,
        url: Url,
        body: &T,
        failure_message: &str,
        request_id: Option<&str>,
    ) -> Result<()> {
        let access_token = self.token_provider.get_access_token().await?;

        let response = self
            .client
            .post(url.clone())
            .bearer_auth(access_token)
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            StructuredLogger::log_error(
                &format!("{}: POST {} returned {}: {}", failure_message, url, status, body),
                request_id,
            );
            return Err(AppError::upstream(status.as_u16(), failure_message, body));
        }

        Ok(())
    }
}

#[async_trait]
impl PreviewApi for CmpApiClient {
    async fn acknowledge_preview(
        &self,
        content_id: &str,
        version_id: &str,
        preview_id: &str,
        acknowledged_by: &str,
        content_hash: &str,
    ) -> Result<()> {
        let url = self.preview_endpoint(content_id, version_id, preview_id, "acknowledge")?;
        let body = AcknowledgeRequest {
            acknowledged_by,
            content_hash,
        };

        self.post_json(url, &body, "Failed to acknowledge preview", Some(preview_id))
            .await?;

        StructuredLogger::log_info(
            "Preview acknowledged",
            Some(preview_id),
            Some(serde_json::json!({
                "content_id": content_id,
                "version_id": version_id
            })),
        );
        Ok(())
    }

    async fn submit_preview_completion(
        &self,
        content_id: &str,
        version_id: &str,
        preview_id: &str,
        keyed_previews: &KeyedPreviews,
    ) -> Result<()> {
        let url = self.preview_endpoint(content_id, version_id, preview_id, "complete")?;
        let body = CompletionRequest { keyed_previews };

        self.post_json(url, &body, "Failed to submit preview completion", Some(preview_id))
            .await?;

        StructuredLogger::log_info(
            "Preview completion submitted",
            Some(preview_id),
            Some(serde_json::json!({ "previews": keyed_previews.len() })),
        );
        Ok(())
    }

    async fn get_image(&self, id: &str) -> Result<Image> {
        let url = self.endpoint(&["images", id])?;
        let access_token = self.token_provider.get_access_token().await?;

        let response = self.client.get(url).bearer_auth(access_token).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            StructuredLogger::log_error(
                &format!("Image lookup for {} returned {}: {}", id, status, body),
                None,
            );
            return Err(AppError::upstream(
                status.as_u16(),
                format!("Failed to get image {}", id),
                body,
            ));
        }

        Ok(response.json().await?)
    }
}
