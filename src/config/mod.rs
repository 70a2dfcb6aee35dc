use serde::{Deserialize, Serialize};

use crate::utils::error::{AppError, Result};

/// Preview types generated when the configuration does not list any.
pub const DEFAULT_PREVIEW_TYPES: [&str; 5] = ["default", "mobile", "desktop", "tablet", "signage"];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub webclient: WebClientConfig,
    pub cmp: CmpWebhookConfig,
    pub logger: LoggerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub listen_host: String,
    pub listen_port: u16,
    pub webhook_path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebClientConfig {
    pub timeout: u64,
}

/// Credentials for the client-credentials grant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CmpOAuthConfig {
    pub client_id: String,
    pub client_secret: String,
    pub auth_server_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CmpClientConfig {
    #[serde(flatten)]
    pub oauth: CmpOAuthConfig,
    pub api_base_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CmpWebhookConfig {
    #[serde(flatten)]
    pub client: CmpClientConfig,
    pub preview_url: String,
    #[serde(default)]
    pub preview_types: Option<Vec<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggerConfig {
    pub dir: String,
    pub file_name: String,
    pub max_backups: u32,
}

impl CmpOAuthConfig {
    pub fn new(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        auth_server_url: impl Into<String>,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            auth_server_url: auth_server_url.into(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        require("client_id", &self.client_id)?;
        require("client_secret", &self.client_secret)?;
        require("auth_server_url", &self.auth_server_url)
    }
}

impl CmpClientConfig {
    pub fn new(oauth: CmpOAuthConfig, api_base_url: impl Into<String>) -> Self {
        Self {
            oauth,
            api_base_url: api_base_url.into(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.oauth.validate()?;
        require("api_base_url", &self.api_base_url)
    }
}

impl CmpWebhookConfig {
    pub fn new(client: CmpClientConfig, preview_url: impl Into<String>) -> Self {
        Self {
            client,
            preview_url: preview_url.into(),
            preview_types: None,
        }
    }

    pub fn with_preview_types<I, S>(mut self, preview_types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.preview_types = Some(preview_types.into_iter().map(Into::into).collect());
        self
    }

    pub fn validate(&self) -> Result<()> {
        self.client.validate()?;
        require("preview_url", &self.preview_url)
    }

    /// Configured preview types, or [`DEFAULT_PREVIEW_TYPES`] when none are set.
    pub fn preview_types(&self) -> Vec<String> {
        match &self.preview_types {
            Some(types) => types.clone(),
            None => DEFAULT_PREVIEW_TYPES.iter().map(|t| t.to_string()).collect(),
        }
    }
}

fn require(name: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(AppError::configuration(format!("{} is required", name)));
    }
    Ok(())
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        Self::load_from("config.yaml")
    }

    pub fn load_from(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path))
            .add_source(
                config::Environment::with_prefix("APP")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?;

        Ok(settings.try_deserialize()?)
    }
}
