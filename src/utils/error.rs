use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("HTTP request error: {0}")]
    HttpRequest(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Validation error: {message}")]
    Validation {
        message: String,
        missing_fields: Vec<String>,
    },

    #[error("Authentication failed: {message} ({status}): {body}")]
    Authentication {
        status: u16,
        message: String,
        body: String,
    },

    #[error("Upstream error: {message} ({status}): {body}")]
    Upstream {
        status: u16,
        message: String,
        body: String,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Logging initialization error: {0}")]
    LoggingInit(#[from] tracing_appender::rolling::InitError),

    #[error("Generic error: {0}")]
    Generic(#[from] anyhow::Error),
}

impl AppError {
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
            missing_fields: Vec::new(),
        }
    }

    pub fn missing_fields(message: impl Into<String>, missing_fields: Vec<String>) -> Self {
        Self::Validation {
            message: message.into(),
            missing_fields,
        }
    }

    pub fn authentication(status: u16, message: impl Into<String>, body: impl Into<String>) -> Self {
        Self::Authentication {
            status,
            message: message.into(),
            body: body.into(),
        }
    }

    pub fn upstream(status: u16, message: impl Into<String>, body: impl Into<String>) -> Self {
        Self::Upstream {
            status,
            message: message.into(),
            body: body.into(),
        }
    }

    /// HTTP status this error maps to, when it carries one.
    ///
    /// Validation failures are always 400; authentication and upstream failures
    /// mirror the status the platform answered with. Everything else has no
    /// status and is reported as 500 by the webhook handler.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Validation { .. } => Some(400),
            Self::Authentication { status, .. } | Self::Upstream { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Message surfaced to webhook senders, without the variant prefix.
    pub fn message(&self) -> String {
        match self {
            Self::Configuration { message }
            | Self::Validation { message, .. }
            | Self::Authentication { message, .. }
            | Self::Upstream { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }

    /// Upstream response body kept for diagnostics.
    pub fn detail(&self) -> Option<&str> {
        match self {
            Self::Authentication { body, .. } | Self::Upstream { body, .. } => Some(body),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
