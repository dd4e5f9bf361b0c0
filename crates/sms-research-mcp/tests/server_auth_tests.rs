//! Bearer-auth tests for the protected resource server.
//!
//! The authorization server is mocked with wiremock: only its `/introspect`
//! contract matters to the resource server.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::json;
use tower::ServiceExt;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use sms_research_mcp::client::{TavilyClient, TextBeltClient};
use sms_research_mcp::config::Config;
use sms_research_mcp::resources;
use sms_research_mcp::server::transport::create_router;
use sms_research_mcp::server::{HttpAuth, IntrospectionTokenVerifier};
use sms_research_mcp::tools::{self, ToolContext};

const BASE_URL: &str = "http://localhost:8080";

fn build_protected_router(auth_server_url: &str, strict: bool) -> axum::Router {
    let config = Config::for_testing("http://unused.localhost");
    let ctx = ToolContext::new(
        Arc::new(TavilyClient::new(&config).unwrap()),
        Arc::new(TextBeltClient::new(&config).unwrap()),
    )
    .with_auth(auth_server_url);

    let verifier =
        IntrospectionTokenVerifier::new(auth_server_url, BASE_URL, "user", strict).unwrap();

    create_router(
        tools::register_all_tools(),
        resources::register_all_resources(),
        ctx,
        BASE_URL.to_string(),
        Some(HttpAuth {
            verifier: Arc::new(verifier),
            auth_server_url: auth_server_url.to_string(),
            required_scope: "user".to_string(),
        }),
    )
}

async fn mount_introspection(server: &MockServer, token: &str, response: serde_json::Value) {
    Mock::given(method("POST"))
        .and(path("/introspect"))
        .and(body_string_contains(token))
        .respond_with(ResponseTemplate::new(200).set_body_json(response))
        .mount(server)
        .await;
}

fn tools_list_request(token: Option<&str>) -> Request<Body> {
    let mut builder = Request::post("/mcp").header("Content-Type", "application/json");
    if let Some(token) = token {
        builder = builder.header("Authorization", format!("Bearer {token}"));
    }
    builder
        .body(Body::from(json!({"jsonrpc": "2.0", "method": "tools/list", "id": 1}).to_string()))
        .unwrap()
}

#[tokio::test]
async fn test_request_without_token_gets_401_with_challenge() {
    let mock_as = MockServer::start().await;
    let app = build_protected_router(&mock_as.uri(), false);

    let response = app.oneshot(tools_list_request(None)).await.unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let www_auth = response.headers().get("WWW-Authenticate").unwrap().to_str().unwrap();
    assert!(www_auth.contains("oauth-protected-resource"));
    assert!(www_auth.starts_with("Bearer"));
}

#[tokio::test]
async fn test_health_stays_open() {
    let mock_as = MockServer::start().await;
    let app = build_protected_router(&mock_as.uri(), false);

    let response = app.oneshot(Request::get("/health").body(Body::empty()).unwrap()).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_protected_resource_metadata() {
    let mock_as = MockServer::start().await;
    let app = build_protected_router(&mock_as.uri(), false);

    let response = app
        .oneshot(Request::get("/.well-known/oauth-protected-resource").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();

    assert_eq!(json["resource"], BASE_URL);
    assert!(
        json["authorization_servers"].as_array().unwrap().contains(&json!(mock_as.uri()))
    );
    assert!(json["scopes_supported"].as_array().unwrap().contains(&json!("user")));
    assert_eq!(json["introspection_endpoint"], format!("{}/introspect", mock_as.uri()));
}

#[tokio::test]
async fn test_valid_token_passes() {
    let mock_as = MockServer::start().await;
    mount_introspection(
        &mock_as,
        "good-token",
        json!({"active": true, "client_id": "c1", "scope": "user"}),
    )
    .await;

    let app = build_protected_router(&mock_as.uri(), false);
    let response = app.oneshot(tools_list_request(Some("good-token"))).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(json["result"]["tools"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn test_inactive_token_gets_401() {
    let mock_as = MockServer::start().await;
    mount_introspection(&mock_as, "stale-token", json!({"active": false})).await;

    let app = build_protected_router(&mock_as.uri(), false);
    let response = app.oneshot(tools_list_request(Some("stale-token"))).await.unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_wrong_scope_gets_403() {
    let mock_as = MockServer::start().await;
    mount_introspection(
        &mock_as,
        "narrow-token",
        json!({"active": true, "client_id": "c1", "scope": "other"}),
    )
    .await;

    let app = build_protected_router(&mock_as.uri(), false);
    let response = app.oneshot(tools_list_request(Some("narrow-token"))).await.unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_strict_mode_rejects_foreign_audience() {
    let mock_as = MockServer::start().await;
    mount_introspection(
        &mock_as,
        "foreign-token",
        json!({"active": true, "client_id": "c1", "scope": "user", "aud": "http://other:9999"}),
    )
    .await;

    let app = build_protected_router(&mock_as.uri(), true);
    let response = app.oneshot(tools_list_request(Some("foreign-token"))).await.unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_strict_mode_accepts_matching_audience() {
    let mock_as = MockServer::start().await;
    mount_introspection(
        &mock_as,
        "local-token",
        json!({"active": true, "client_id": "c1", "scope": "user", "aud": BASE_URL}),
    )
    .await;

    let app = build_protected_router(&mock_as.uri(), true);
    let response = app.oneshot(tools_list_request(Some("local-token"))).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_introspection_outage_gets_401() {
    let mock_as = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/introspect"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&mock_as)
        .await;

    let app = build_protected_router(&mock_as.uri(), false);
    let response = app.oneshot(tools_list_request(Some("any-token"))).await.unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_protected_capabilities_resource_reports_oauth() {
    let mock_as = MockServer::start().await;
    mount_introspection(
        &mock_as,
        "good-token",
        json!({"active": true, "client_id": "c1", "scope": "user"}),
    )
    .await;

    let app = build_protected_router(&mock_as.uri(), false);
    let response = app
        .oneshot(
            Request::post("/mcp")
                .header("Content-Type", "application/json")
                .header("Authorization", "Bearer good-token")
                .body(Body::from(
                    json!({
                        "jsonrpc": "2.0",
                        "method": "resources/read",
                        "params": {"uri": "mcp://server/capabilities"},
                        "id": 1
                    })
                    .to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    let text = json["result"]["contents"][0]["text"].as_str().unwrap();
    let capabilities: serde_json::Value = serde_json::from_str(text).unwrap();

    assert_eq!(capabilities["authentication"]["type"], "OAuth 2.0");
    assert_eq!(capabilities["authentication"]["authorization_server"], mock_as.uri());
}
