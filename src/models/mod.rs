use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

/// Preview type name to fully qualified preview URL.
pub type KeyedPreviews = BTreeMap<String, String>;

/// Body of a successful client-credentials grant.
///
/// Fields are optional so that an incomplete answer can be reported as such
/// instead of surfacing as a decoding failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub expires_in: Option<i64>,
    #[serde(default)]
    pub token_type: Option<String>,
}

/// Fields pulled out of a preview webhook.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreviewRequest {
    pub content_id: String,
    pub version_id: String,
    pub preview_id: String,
    pub updated_by: String,
    pub content_hash: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct AcknowledgeRequest<'a> {
    pub acknowledged_by: &'a str,
    pub content_hash: &'a str,
}

#[derive(Debug, Clone, Serialize)]
pub struct CompletionRequest<'a> {
    pub keyed_previews: &'a KeyedPreviews,
}

/// Image asset metadata as returned by `GET /images/{id}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Image {
    pub id: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub alt_text: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub thumbnail_url: Option<String>,
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
    #[serde(default)]
    pub file_type: Option<String>,
    #[serde(default)]
    pub file_size: Option<u64>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub labels: Vec<String>,
    #[serde(default)]
    pub owner_id: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub modified_at: Option<DateTime<Utc>>,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<Vec<String>>::deserialize(deserializer).map(Option::unwrap_or_default)
}

/// Inbound webhook body, either as received or already decoded.
#[derive(Debug, Clone)]
pub enum WebhookPayload {
    Raw(String),
    Json(serde_json::Value),
}

impl From<String> for WebhookPayload {
    fn from(body: String) -> Self {
        Self::Raw(body)
    }
}

impl From<&str> for WebhookPayload {
    fn from(body: &str) -> Self {
        Self::Raw(body.to_string())
    }
}

impl From<serde_json::Value> for WebhookPayload {
    fn from(value: serde_json::Value) -> Self {
        Self::Json(value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewCompletion {
    pub content_id: String,
    pub version_id: String,
    pub preview_id: String,
    pub keyed_previews: KeyedPreviews,
}

/// Uniform outcome of a webhook invocation, handed to HTTP adapters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebhookHandlerResult {
    pub success: bool,
    pub status: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<PreviewCompletion>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl WebhookHandlerResult {
    pub fn success(data: PreviewCompletion) -> Self {
        Self {
            success: true,
            status: 200,
            data: Some(data),
            error: None,
        }
    }

    pub fn failure(error: impl Into<String>, status: u16) -> Self {
        Self {
            success: false,
            status,
            data: None,
            error: Some(error.into()),
        }
    }
}
