//! Token guard tests
//!
//! Every guarded endpoint must answer 401 without touching the engine when
//! the token is absent, wrong or not configured.

use axum::http::{HeaderName, HeaderValue, StatusCode};
use axum_test::TestServer;
use itemsearch_core::{InMemoryEngine, ServiceConfig};
use itemsearch_serve::{create_routes, AppState};
use serde_json::{json, Value};
use std::sync::Arc;

fn server_with_token(token: Option<&str>) -> (Arc<InMemoryEngine>, TestServer) {
    let engine = Arc::new(InMemoryEngine::new("items"));
    let config = ServiceConfig {
        api_token: token.map(str::to_string),
        ..ServiceConfig::default()
    };
    let app = create_routes(AppState::new(engine.clone(), &config));
    (engine, TestServer::new(app).unwrap())
}

fn token_header(value: &'static str) -> (HeaderName, HeaderValue) {
    (
        HeaderName::from_static("x-api-token"),
        HeaderValue::from_static(value),
    )
}

fn expected_body() -> Value {
    json!({"error": "Unauthorized", "detail": "Invalid or missing API token"})
}

#[tokio::test]
async fn test_missing_token_rejected_everywhere() {
    let (engine, server) = server_with_token(Some("right"));
    let item = json!({"id": "1", "name": "x", "suggest_input": ["x"]});
    let search = json!({"query": "x", "zipcode": "10001"});

    let responses = vec![
        server.get("/api/v1/items/1").await,
        server.put("/api/v1/items").json(&item).await,
        server.delete("/api/v1/items/1").await,
        server.get("/api/v1/search?query=x&zipcode=10001").await,
        server.post("/api/v1/search").json(&search).await,
        server.get("/api/v1/suggestions?query=x&zipcode=10001").await,
        server.post("/api/v1/suggestions").json(&search).await,
    ];

    for response in responses {
        assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(response.json::<Value>(), expected_body());
    }
    assert_eq!(engine.call_count(), 0);
}

#[tokio::test]
async fn test_wrong_token_rejected() {
    let (engine, server) = server_with_token(Some("right"));
    let (name, value) = token_header("wrong");

    let response = server
        .get("/api/v1/suggestions?query=x&zipcode=10001")
        .add_header(name, value)
        .await;

    assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
    assert_eq!(engine.call_count(), 0);
}

#[tokio::test]
async fn test_token_comparison_is_exact() {
    let (_, server) = server_with_token(Some("right"));

    for presented in ["Right", "right ", "righ"] {
        let response = server
            .get("/api/v1/items/1")
            .add_header(
                HeaderName::from_static("x-api-token"),
                HeaderValue::from_str(presented).unwrap(),
            )
            .await;
        assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED, "{}", presented);
    }
}

#[tokio::test]
async fn test_unset_token_rejects_all() {
    let (engine, server) = server_with_token(None);
    let (name, value) = token_header("anything");

    let response = server.get("/api/v1/items/1").add_header(name, value).await;

    assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
    assert_eq!(engine.call_count(), 0);
}

#[tokio::test]
async fn test_valid_token_reaches_handler() {
    let (engine, server) = server_with_token(Some("right"));
    let (name, value) = token_header("right");

    let response = server.get("/api/v1/items/missing").add_header(name, value).await;

    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
    assert_eq!(response.json::<Value>(), json!({"error": "Item not found"}));
    assert_eq!(engine.call_count(), 1);
}

#[tokio::test]
async fn test_bearer_token_accepted() {
    let (_, server) = server_with_token(Some("right"));

    let response = server
        .get("/api/v1/items/missing")
        .add_header(
            HeaderName::from_static("authorization"),
            HeaderValue::from_static("Bearer right"),
        )
        .await;

    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_status_needs_no_token() {
    let (_, server) = server_with_token(None);
    let response = server.get("/api/status").await;
    response.assert_status_ok();
    response.assert_json(&json!({"status": "Search service is running"}));
}
