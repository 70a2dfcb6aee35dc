use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use cmp_preview_gateway::{
    config::AppConfig,
    handlers::{WebhookServer, WebhookServerTrait},
    providers::StructuredLogger,
    services::WebhookHandler,
};

#[tokio::main]
async fn main() -> Result<()> {
    let config = AppConfig::load()?;

    StructuredLogger::init("info", Some(config.logger.clone()))?;

    info!("Starting CMP Preview Gateway");

    let http_client = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.webclient.timeout))
        .build()?;
    let webhook_handler = WebhookHandler::with_http_client(config.cmp.clone(), http_client)?;
    let webhook_server = WebhookServer::new(config.server.clone(), Arc::new(webhook_handler));

    StructuredLogger::log_info(
        "CMP Preview Gateway started successfully",
        None,
        Some(serde_json::json!({
            "listen_address": format!("{}:{}", config.server.listen_host, config.server.listen_port),
            "webhook_path": config.server.webhook_path,
            "api_base_url": config.cmp.client.api_base_url,
            "preview_types": config.cmp.preview_types()
        })),
    );

    // Returns once Ctrl-C or SIGTERM has been received and in-flight requests have drained
    if let Err(e) = webhook_server.start().await {
        StructuredLogger::log_error(&format!("Webhook server error: {}", e), None);
        return Err(e.into());
    }

    StructuredLogger::log_info("CMP Preview Gateway stopped", None, None);

    Ok(())
}
