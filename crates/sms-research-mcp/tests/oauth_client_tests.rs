//! Tests for the client-side OAuth provider.
//!
//! The interactive browser hop is exercised by the callback listener's own
//! tests; here the discovery, refresh, and storage paths run against a
//! mocked authorization server.

use std::sync::Arc;

use serde_json::json;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use sms_research_mcp::oauth::storage::{InMemoryTokenStorage, StoredTokens, TokenStorage};
use sms_research_mcp::oauth::OAuthProvider;

fn valid_tokens() -> StoredTokens {
    StoredTokens {
        access_token: "stored-access".to_string(),
        refresh_token: Some("stored-refresh".to_string()),
        expires_at: Some(chrono::Utc::now().timestamp() + 3600),
        scope: Some("user".to_string()),
    }
}

fn expired_tokens() -> StoredTokens {
    StoredTokens {
        access_token: "stale-access".to_string(),
        refresh_token: Some("stored-refresh".to_string()),
        expires_at: Some(chrono::Utc::now().timestamp() - 60),
        scope: Some("user".to_string()),
    }
}

/// Mount discovery metadata where the mock server plays both the resource
/// server and the authorization server.
async fn mount_discovery(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/.well-known/oauth-protected-resource"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "resource": server.uri(),
            "authorization_servers": [server.uri()],
        })))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/.well-known/oauth-authorization-server"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "issuer": server.uri(),
            "authorization_endpoint": format!("{}/oauth/authorize", server.uri()),
            "token_endpoint": format!("{}/oauth/token", server.uri()),
            "registration_endpoint": format!("{}/oauth/register", server.uri()),
        })))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_stored_token_used_without_network() {
    // No mocks mounted: any HTTP call would fail the test
    let storage = Arc::new(InMemoryTokenStorage::new());
    storage.set_tokens(valid_tokens()).await;

    let provider =
        OAuthProvider::new("http://localhost:1", 3030, storage).unwrap();

    assert!(provider.has_tokens().await);
    let token = provider.access_token().await.unwrap();
    assert_eq!(token, "stored-access");
}

#[tokio::test]
async fn test_expired_token_is_refreshed() {
    let server = MockServer::start().await;
    mount_discovery(&server).await;

    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .and(body_string_contains("grant_type=refresh_token"))
        .and(body_string_contains("stored-refresh"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "fresh-access",
            "token_type": "Bearer",
            "expires_in": 3600,
            "refresh_token": "fresh-refresh",
            "scope": "user"
        })))
        .mount(&server)
        .await;

    let storage = Arc::new(InMemoryTokenStorage::new());
    storage.set_tokens(expired_tokens()).await;

    let provider = OAuthProvider::new(server.uri(), 3030, Arc::clone(&storage) as _).unwrap();

    let token = provider.access_token().await.unwrap();
    assert_eq!(token, "fresh-access");

    // The rotated pair replaced the stale one in storage
    let stored = storage.tokens().await.unwrap();
    assert_eq!(stored.access_token, "fresh-access");
    assert_eq!(stored.refresh_token.as_deref(), Some("fresh-refresh"));
    assert!(!stored.is_expired());
}

#[tokio::test]
async fn test_expired_tokens_do_not_count_as_authenticated() {
    let storage = Arc::new(InMemoryTokenStorage::new());
    storage.set_tokens(expired_tokens()).await;

    let provider = OAuthProvider::new("http://localhost:1", 3030, storage).unwrap();
    assert!(!provider.has_tokens().await);
}

#[tokio::test]
async fn test_clear_tokens() {
    let storage = Arc::new(InMemoryTokenStorage::new());
    storage.set_tokens(valid_tokens()).await;

    let provider =
        OAuthProvider::new("http://localhost:1", 3030, Arc::clone(&storage) as _).unwrap();

    provider.clear_tokens().await;
    assert!(!provider.has_tokens().await);
    assert!(storage.tokens().await.is_none());
}
