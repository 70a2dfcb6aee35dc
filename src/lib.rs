pub mod config;
pub mod models;
pub mod services;
pub mod providers;
pub mod utils;
pub mod handlers;

// Re-export commonly used types
pub use config::AppConfig;
pub use models::*;
pub use services::{CmpApiClient, OAuthClient, PreviewApi, TokenProvider, WebhookHandler};
pub use utils::{AppError, Result};
