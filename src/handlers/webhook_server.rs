use async_trait::async_trait;
use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Json},
    routing::post,
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tokio::sync::Notify;
use tower::ServiceBuilder;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::config::ServerConfig;
use crate::providers::logging::StructuredLogger;
use crate::services::WebhookHandler;
use crate::utils::error::{AppError, Result};
use crate::utils::request_id::extract_request_id;

#[async_trait]
pub trait WebhookServerTrait {
    async fn start(&self) -> Result<()>;
    async fn shutdown(&self) -> Result<()>;
}

#[derive(Clone)]
pub struct AppState {
    pub handler: Arc<WebhookHandler>,
}

#[derive(Clone)]
pub struct WebhookServer {
    config: ServerConfig,
    handler: Arc<WebhookHandler>,
    shutdown: Arc<Notify>,
}

impl WebhookServer {
    pub fn new(config: ServerConfig, handler: Arc<WebhookHandler>) -> Self {
        Self {
            config,
            handler,
            shutdown: Arc::new(Notify::new()),
        }
    }

    pub fn create_router(&self) -> Router {
        let app_state = AppState {
            handler: self.handler.clone(),
        };

        Router::new()
            .route(
                &self.config.webhook_path,
                post(webhook_handler).get(health_check_handler),
            )
            .with_state(app_state)
            .layer(
                ServiceBuilder::new()
                    .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                    .layer(TraceLayer::new_for_http())
                    .layer(PropagateRequestIdLayer::x_request_id()),
            )
    }
}

pub async fn webhook_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> impl IntoResponse {
    let request_id = extract_request_id(&headers);

    StructuredLogger::log_info(
        "Received webhook request",
        Some(&request_id),
        Some(serde_json::json!({
            "body_size": body.len(),
            "headers": headers.len()
        })),
    );

    let body_str = String::from_utf8_lossy(&body).into_owned();
    let result = state
        .handler
        .handle_webhook_with_context(body_str, Some(&request_id))
        .await;

    let http_status =
        StatusCode::from_u16(result.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

    StructuredLogger::log_info(
        &format!("Webhook processed with HTTP status {}", result.status),
        Some(&request_id),
        None,
    );

    (http_status, Json(result))
}

pub async fn health_check_handler(headers: HeaderMap) -> impl IntoResponse {
    let request_id = extract_request_id(&headers);

    StructuredLogger::log_info("Health check request", Some(&request_id), None);

    (
        StatusCode::OK,
        Json(serde_json::json!({
            "status": "success",
            "message": "Application is healthy"
        })),
    )
}

#[async_trait]
impl WebhookServerTrait for WebhookServer {
    async fn start(&self) -> Result<()> {
        let addr: SocketAddr = format!("{}:{}", self.config.listen_host, self.config.listen_port)
            .parse()
            .map_err(|e| AppError::configuration(format!("Invalid server address: {}", e)))?;

        let app = self.create_router();

        info!("Webhook server listening on {}", addr);
        StructuredLogger::log_info(
            "Webhook server started",
            None,
            Some(serde_json::json!({
                "address": addr.to_string(),
                "webhook_path": self.config.webhook_path
            })),
        );

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| AppError::configuration(format!("Failed to bind to address {}: {}", addr, e)))?;

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal(self.shutdown.clone()))
            .await?;

        StructuredLogger::log_info("Webhook server stopped", None, None);
        Ok(())
    }

    /// Asks a running `start` to stop accepting connections and drain in-flight requests.
    /// A request made before `start` is kept and applies once the server is up.
    async fn shutdown(&self) -> Result<()> {
        StructuredLogger::log_info("Webhook server shutting down", None, None);
        self.shutdown.notify_one();
        Ok(())
    }
}

async fn shutdown_signal(requested: Arc<Notify>) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            StructuredLogger::log_error(&format!("Failed to install Ctrl+C handler: {}", e), None);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                StructuredLogger::log_error(&format!("Failed to install signal handler: {}", e), None);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
        _ = requested.notified() => {},
    }

    StructuredLogger::log_info("Shutdown requested, draining in-flight requests", None, None);
}
