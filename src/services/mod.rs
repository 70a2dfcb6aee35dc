pub mod api_client;
pub mod oauth_client;
pub mod webhook_handler;

pub use api_client::{CmpApiClient, PreviewApi};
pub use oauth_client::{Clock, OAuthClient, SystemClock, TokenProvider, TOKEN_EXPIRY_MARGIN_SECS};
pub use webhook_handler::WebhookHandler;

#[cfg(test)]
pub use api_client::MockPreviewApi;
#[cfg(test)]
pub use oauth_client::MockTokenProvider;
