use std::sync::Arc;

use reqwest::Client;
use serde_json::Value;

use crate::config::CmpWebhookConfig;
use crate::models::{
    KeyedPreviews, PreviewCompletion, PreviewRequest, WebhookHandlerResult, WebhookPayload,
};
use crate::providers::logging::StructuredLogger;
use crate::services::api_client::{CmpApiClient, PreviewApi};
use crate::utils::error::{AppError, Result};
use crate::utils::json::json_path_str;

const STRUCTURED_CONTENT: [&str; 4] = ["data", "assets", "structured_contents", "0"];

/// Drives one preview webhook through acknowledge, URL generation and completion.
///
/// Nothing is kept between invocations. A failure at any step ends the
/// invocation; an acknowledged preview whose completion fails stays
/// acknowledged upstream.
#[derive(Clone)]
pub struct WebhookHandler {
    api: Arc<dyn PreviewApi>,
    preview_url: String,
    preview_types: Vec<String>,
}

impl WebhookHandler {
    pub fn new(config: CmpWebhookConfig) -> Result<Self> {
        Self::with_http_client(config, Client::new())
    }

    pub fn with_http_client(config: CmpWebhookConfig, client: Client) -> Result<Self> {
        config.validate()?;

        let api = CmpApiClient::with_http_client(config.client.clone(), client)?;
        Self::with_api(&config, Arc::new(api))
    }

    pub fn with_api(config: &CmpWebhookConfig, api: Arc<dyn PreviewApi>) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            api,
            preview_url: config.preview_url.trim_end_matches('/').to_string(),
            preview_types: config.preview_types(),
        })
    }

    /// Extracts the preview request from a webhook body.
    ///
    /// Only the first entry of `data.assets.structured_contents` is read; any
    /// further entries are ignored.
    pub fn parse_webhook_payload(payload: &Value) -> Result<PreviewRequest> {
        let structured = |suffix: &[&'static str]| {
            let mut path = STRUCTURED_CONTENT.to_vec();
            path.extend_from_slice(suffix);
            json_path_str(payload, &path)
        };

        let fields = [
            ("contentId", structured(&["id"])),
            ("versionId", structured(&["version_id"])),
            ("previewId", json_path_str(payload, &["data", "preview_id"])),
            ("updatedBy", structured(&["content_body", "updated_by"])),
            ("contentHash", structured(&["content_body", "fields_version", "content_hash"])),
        ];

        let missing: Vec<String> = fields
            .iter()
            .filter(|(_, value)| value.is_none())
            .map(|(name, _)| name.to_string())
            .collect();

        if !missing.is_empty() {
            let extracted = fields
                .iter()
                .map(|(name, value)| format!("{}={}", name, value.as_deref().unwrap_or("")))
                .collect::<Vec<_>>()
                .join(", ");

            return Err(AppError::missing_fields(
                format!(
                    "Missing required fields in webhook payload: {} ({})",
                    missing.join(", "),
                    extracted
                ),
                missing,
            ));
        }

        let [content_id, version_id, preview_id, updated_by, content_hash] =
            fields.map(|(_, value)| value.unwrap_or_default());

        Ok(PreviewRequest {
            content_id,
            version_id,
            preview_id,
            updated_by,
            content_hash,
        })
    }

    /// `{preview_url}/preview/{type}/{content_id}` for every configured type.
    pub fn generate_preview_urls(&self, content_id: &str) -> KeyedPreviews {
        self.preview_types
            .iter()
            .map(|preview_type| {
                (
                    preview_type.clone(),
                    format!("{}/preview/{}/{}", self.preview_url, preview_type, content_id),
                )
            })
            .collect()
    }

    /// Runs the whole preview protocol for one webhook. Never fails; every
    /// error is folded into the returned result.
    pub async fn handle_webhook(&self, payload: impl Into<WebhookPayload>) -> WebhookHandlerResult {
        self.handle_webhook_with_context(payload, None).await
    }

    /// Same as [`handle_webhook`](Self::handle_webhook), logging under the caller's request id.
    /// Without one, logs after parsing carry the preview id.
    pub async fn handle_webhook_with_context(
        &self,
        payload: impl Into<WebhookPayload>,
        request_id: Option<&str>,
    ) -> WebhookHandlerResult {
        let request = match Self::decode(payload.into()) {
            Ok(request) => request,
            Err(e) => return Self::failure(e, request_id, None),
        };

        let preview_id = request.preview_id.clone();
        let log_id = request_id.unwrap_or(preview_id.as_str());

        match self.process(request, log_id).await {
            Ok(completion) => {
                StructuredLogger::log_info(
                    "Preview webhook processed",
                    Some(log_id),
                    Some(serde_json::json!({
                        "preview_id": completion.preview_id,
                        "content_id": completion.content_id,
                        "previews": completion.keyed_previews.len()
                    })),
                );
                WebhookHandlerResult::success(completion)
            }
            Err(e) => Self::failure(e, Some(log_id), Some(&preview_id)),
        }
    }

    fn failure(e: AppError, request_id: Option<&str>, preview_id: Option<&str>) -> WebhookHandlerResult {
        let status = e.status_code().unwrap_or(500);
        let message = match preview_id {
            Some(preview_id) => format!(
                "Preview webhook failed with status {} (preview_id={}): {}",
                status, preview_id, e
            ),
            None => format!("Preview webhook failed with status {}: {}", status, e),
        };

        // Rejected payloads stay out of the error log
        if matches!(e, AppError::Validation { .. }) {
            StructuredLogger::log_warning(&message, request_id);
        } else {
            StructuredLogger::log_error(&message, request_id);
        }

        WebhookHandlerResult::failure(e.message(), status)
    }

    fn decode(payload: WebhookPayload) -> Result<PreviewRequest> {
        let payload = match payload {
            WebhookPayload::Raw(body) if body.is_empty() => {
                return Err(AppError::validation("Empty payload"));
            }
            WebhookPayload::Raw(body) => serde_json::from_str::<Value>(&body)
                .map_err(|_| AppError::validation("Invalid JSON payload"))?,
            WebhookPayload::Json(value) => value,
        };

        Self::parse_webhook_payload(&payload)
    }

    async fn process(&self, request: PreviewRequest, request_id: &str) -> Result<PreviewCompletion> {
        StructuredLogger::log_info(
            "Received preview request",
            Some(request_id),
            Some(serde_json::json!({
                "preview_id": request.preview_id,
                "content_id": request.content_id,
                "version_id": request.version_id
            })),
        );

        self.api
            .acknowledge_preview(
                &request.content_id,
                &request.version_id,
                &request.preview_id,
                &request.updated_by,
                &request.content_hash,
            )
            .await?;

        let keyed_previews = self.generate_preview_urls(&request.content_id);

        self.api
            .submit_preview_completion(
                &request.content_id,
                &request.version_id,
                &request.preview_id,
                &keyed_previews,
            )
            .await?;

        Ok(PreviewCompletion {
            content_id: request.content_id,
            version_id: request.version_id,
            preview_id: request.preview_id,
            keyed_previews,
        })
    }
}
