use std::sync::Arc;

use mockito::{Matcher, Server, ServerGuard};
use serde_json::json;

use cmp_preview_gateway::config::{CmpClientConfig, CmpOAuthConfig};
use cmp_preview_gateway::models::KeyedPreviews;
use cmp_preview_gateway::services::{CmpApiClient, OAuthClient, PreviewApi, TokenProvider};
use cmp_preview_gateway::utils::error::AppError;

const ACK_PATH: &str = "/structured-content/contents/c1/versions/v1/previews/p1/acknowledge";
const COMPLETE_PATH: &str = "/structured-content/contents/c1/versions/v1/previews/p1/complete";

fn create_test_config(mock_server_url: &str) -> CmpClientConfig {
    CmpClientConfig::new(
        CmpOAuthConfig::new("client-1", "secret-1", mock_server_url),
        mock_server_url,
    )
}

async fn mock_token(server: &mut ServerGuard, hits: usize) -> mockito::Mock {
    server
        .mock("POST", "/o/oauth2/v1/token")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "access_token": "token-123",
                "token_type": "Bearer",
                "expires_in": 3600
            })
            .to_string(),
        )
        .expect(hits)
        .create_async()
        .await
}

#[tokio::test]
async fn test_api_client_creation() {
    let server = Server::new_async().await;
    assert!(CmpApiClient::new(create_test_config(&server.url())).is_ok());
}

#[test]
fn test_api_client_requires_base_url() {
    let config = CmpClientConfig::new(CmpOAuthConfig::new("id", "secret", "https://auth"), "");

    match CmpApiClient::new(config) {
        Err(AppError::Configuration { message }) => assert_eq!(message, "api_base_url is required"),
        _ => panic!("Expected Configuration error"),
    }
}

#[tokio::test]
async fn test_acknowledge_preview_success() {
    let mut server = Server::new_async().await;
    let token_mock = mock_token(&mut server, 1).await;

    let ack_mock = server
        .mock("POST", ACK_PATH)
        .match_header("authorization", "Bearer token-123")
        .match_header("content-type", "application/json")
        .match_body(Matcher::Json(json!({
            "acknowledged_by": "editor@example.com",
            "content_hash": "hash-1"
        })))
        .with_status(200)
        .with_body("{}")
        .expect(1)
        .create_async()
        .await;

    let client = CmpApiClient::new(create_test_config(&server.url())).unwrap();

    let result = client
        .acknowledge_preview("c1", "v1", "p1", "editor@example.com", "hash-1")
        .await;

    assert!(result.is_ok());
    token_mock.assert_async().await;
    ack_mock.assert_async().await;
}

#[tokio::test]
async fn test_acknowledge_preview_http_error() {
    let mut server = Server::new_async().await;
    let _token_mock = mock_token(&mut server, 1).await;

    let ack_mock = server
        .mock("POST", ACK_PATH)
        .with_status(403)
        .with_body("forbidden")
        .expect(1)
        .create_async()
        .await;

    let client = CmpApiClient::new(create_test_config(&server.url())).unwrap();
    let error = client
        .acknowledge_preview("c1", "v1", "p1", "editor", "hash")
        .await
        .unwrap_err();

    match &error {
        AppError::Upstream { status, message, body } => {
            assert_eq!(*status, 403);
            assert_eq!(message, "Failed to acknowledge preview");
            assert_eq!(body, "forbidden");
        }
        other => panic!("Expected Upstream variant, got {:?}", other),
    }

    ack_mock.assert_async().await;
}

#[tokio::test]
async fn test_submit_preview_completion_reuses_token() {
    let mut server = Server::new_async().await;
    let token_mock = mock_token(&mut server, 1).await;

    let ack_mock = server
        .mock("POST", ACK_PATH)
        .with_status(204)
        .create_async()
        .await;

    let complete_mock = server
        .mock("POST", COMPLETE_PATH)
        .match_header("authorization", "Bearer token-123")
        .match_body(Matcher::Json(json!({
            "keyed_previews": {
                "default": "https://preview.example.com/preview/default/c1",
                "mobile": "https://preview.example.com/preview/mobile/c1"
            }
        })))
        .with_status(200)
        .expect(1)
        .create_async()
        .await;

    let client = CmpApiClient::new(create_test_config(&server.url())).unwrap();

    let mut previews = KeyedPreviews::new();
    previews.insert("default".to_string(), "https://preview.example.com/preview/default/c1".to_string());
    previews.insert("mobile".to_string(), "https://preview.example.com/preview/mobile/c1".to_string());

    client.acknowledge_preview("c1", "v1", "p1", "editor", "hash").await.unwrap();
    client.submit_preview_completion("c1", "v1", "p1", &previews).await.unwrap();

    token_mock.assert_async().await;
    ack_mock.assert_async().await;
    complete_mock.assert_async().await;
}

#[tokio::test]
async fn test_submit_preview_completion_http_error() {
    let mut server = Server::new_async().await;
    let _token_mock = mock_token(&mut server, 1).await;

    let _complete_mock = server
        .mock("POST", COMPLETE_PATH)
        .with_status(500)
        .with_body("internal error")
        .create_async()
        .await;

    let client = CmpApiClient::new(create_test_config(&server.url())).unwrap();
    let error = client
        .submit_preview_completion("c1", "v1", "p1", &KeyedPreviews::new())
        .await
        .unwrap_err();

    assert_eq!(error.status_code(), Some(500));
    assert_eq!(error.message(), "Failed to submit preview completion");
    assert_eq!(error.detail(), Some("internal error"));
}

#[tokio::test]
async fn test_get_image_success() {
    let mut server = Server::new_async().await;
    let _token_mock = mock_token(&mut server, 1).await;

    let image_mock = server
        .mock("GET", "/images/img-42")
        .match_header("authorization", "Bearer token-123")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "id": "img-42",
                "title": "Hero banner",
                "alt_text": "A banner",
                "url": "https://cdn.example.com/img-42.png",
                "thumbnail_url": "https://cdn.example.com/img-42-thumb.png",
                "width": 1920,
                "height": 1080,
                "file_type": "png",
                "file_size": 204800,
                "labels": ["hero", "homepage"],
                "owner_id": "user-7",
                "created_at": "2024-03-01T10:00:00Z",
                "modified_at": "2024-03-02T11:30:00Z",
                "unexpected_field": true
            })
            .to_string(),
        )
        .expect(1)
        .create_async()
        .await;

    let client = CmpApiClient::new(create_test_config(&server.url())).unwrap();
    let image = client.get_image("img-42").await.unwrap();

    assert_eq!(image.id, "img-42");
    assert_eq!(image.title.as_deref(), Some("Hero banner"));
    assert_eq!(image.width, Some(1920));
    assert_eq!(image.height, Some(1080));
    assert_eq!(image.labels, vec!["hero", "homepage"]);
    assert!(image.description.is_none());
    assert!(image.created_at.is_some());

    image_mock.assert_async().await;
}

#[tokio::test]
async fn test_get_image_not_found_names_the_image() {
    let mut server = Server::new_async().await;
    let _token_mock = mock_token(&mut server, 1).await;

    let _image_mock = server
        .mock("GET", "/images/missing-1")
        .with_status(404)
        .with_body("not found")
        .create_async()
        .await;

    let client = CmpApiClient::new(create_test_config(&server.url())).unwrap();
    let error = client.get_image("missing-1").await.unwrap_err();

    assert_eq!(error.status_code(), Some(404));
    assert!(error.message().contains("missing-1"));
}

#[tokio::test]
async fn test_shared_token_provider_across_clients() {
    let mut server = Server::new_async().await;
    let token_mock = mock_token(&mut server, 1).await;

    let _image_mock = server
        .mock("GET", Matcher::Regex(r"^/images/.+$".to_string()))
        .with_status(200)
        .with_body(json!({ "id": "any" }).to_string())
        .expect(2)
        .create_async()
        .await;

    let oauth = Arc::new(
        OAuthClient::new(CmpOAuthConfig::new("client-1", "secret-1", server.url())).unwrap(),
    );
    let first = CmpApiClient::with_token_provider(&server.url(), oauth.clone(), reqwest::Client::new()).unwrap();
    let second = CmpApiClient::with_token_provider(&server.url(), oauth.clone(), reqwest::Client::new()).unwrap();

    first.get_image("a").await.unwrap();
    second.get_image("b").await.unwrap();

    assert!(oauth.has_cached_token());
    assert!(second.token_provider().has_cached_token());
    token_mock.assert_async().await;
}

#[tokio::test]
async fn test_ids_with_path_characters_stay_under_preview_route() {
    let mut server = Server::new_async().await;
    let _token_mock = mock_token(&mut server, 1).await;

    let admin_mock = server
        .mock("POST", Matcher::Regex(r"^/admin".to_string()))
        .expect(0)
        .create_async()
        .await;

    let ack_mock = server
        .mock(
            "POST",
            Matcher::Regex(r"^/structured-content/contents/c1/versions/v1/previews/[^/?#]+/acknowledge$".to_string()),
        )
        .with_status(200)
        .expect(1)
        .create_async()
        .await;

    let client = CmpApiClient::new(create_test_config(&server.url())).unwrap();

    client
        .acknowledge_preview("c1", "v1", "../../../../../admin/delete-everything?", "editor", "hash")
        .await
        .unwrap();

    ack_mock.assert_async().await;
    admin_mock.assert_async().await;
}

#[tokio::test]
async fn test_dot_segment_id_is_refused_before_any_request() {
    let mut server = Server::new_async().await;
    let token_mock = mock_token(&mut server, 0).await;

    let client = CmpApiClient::new(create_test_config(&server.url())).unwrap();
    let error = client.get_image("..").await.unwrap_err();

    assert!(matches!(error, AppError::Validation { .. }));
    token_mock.assert_async().await;
}

#[tokio::test]
async fn test_get_image_with_null_labels() {
    let mut server = Server::new_async().await;
    let _token_mock = mock_token(&mut server, 1).await;

    let _image_mock = server
        .mock("GET", "/images/img-7")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(json!({ "id": "img-7", "title": "Logo", "labels": null }).to_string())
        .create_async()
        .await;

    let client = CmpApiClient::new(create_test_config(&server.url())).unwrap();
    let image = client.get_image("img-7").await.unwrap();

    assert_eq!(image.id, "img-7");
    assert!(image.labels.is_empty());
}
