//! Integration tests for the OAuth 2.0 authorization server.
//!
//! Covers the full lifecycle: discovery → registration → authorization →
//! login → token exchange → introspection → refresh → revocation.

use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use serde_json::json;
use tower::ServiceExt;

use sms_research_mcp::auth_server::create_router;
use sms_research_mcp::config::AuthServerConfig;
use sms_research_mcp::pkce;

const ISSUER: &str = "http://localhost:9000";

fn build_test_router() -> axum::Router {
    let mut config = AuthServerConfig::new("localhost", 9000);
    config.demo_username = "demo_user".to_string();
    config.demo_password = "demo_password".to_string();
    create_router(config)
}

async fn json_body(response: axum::response::Response) -> serde_json::Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&body).unwrap()
}

async fn text_body(response: axum::response::Response) -> String {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(body.to_vec()).unwrap()
}

/// Register a client and return its client_id.
async fn register_client(app: &axum::Router) -> String {
    let response = app
        .clone()
        .oneshot(
            Request::post("/oauth/register")
                .header("Content-Type", "application/json")
                .body(Body::from(
                    json!({
                        "client_name": "Test Client",
                        "redirect_uris": ["http://localhost:3030/callback"]
                    })
                    .to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    let json = json_body(response).await;
    json["client_id"].as_str().unwrap().to_string()
}

/// Drive authorize + login and return the authorization code.
async fn obtain_auth_code(app: &axum::Router, client_id: &str, challenge: &str) -> String {
    // Authorization request parks a transaction and redirects to /login
    let authorize_uri = format!(
        "/oauth/authorize?client_id={client_id}\
         &redirect_uri=http%3A%2F%2Flocalhost%3A3030%2Fcallback\
         &response_type=code&state=xyz123\
         &code_challenge={challenge}&code_challenge_method=S256&scope=user"
    );

    let response =
        app.clone().oneshot(Request::get(authorize_uri.as_str()).body(Body::empty()).unwrap()).await.unwrap();

    assert_eq!(response.status(), StatusCode::FOUND);
    let location = response.headers()[header::LOCATION].to_str().unwrap().to_string();
    assert!(location.starts_with(&format!("{ISSUER}/login?txn=")));
    let txn = location.split("txn=").nth(1).unwrap().to_string();

    // Login with the demo credentials completes the transaction
    let response = app
        .clone()
        .oneshot(
            Request::post("/login/callback")
                .header("Content-Type", "application/x-www-form-urlencoded")
                .body(Body::from(serde_urlencoded::to_string([
                    ("txn", txn.as_str()),
                    ("username", "demo_user"),
                    ("password", "demo_password"),
                ])
                .unwrap()))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FOUND);
    let location = response.headers()[header::LOCATION].to_str().unwrap();
    assert!(location.starts_with("http://localhost:3030/callback?code="));
    assert!(location.contains("state=xyz123"));

    let code_part = location.split("code=").nth(1).unwrap();
    code_part.split('&').next().unwrap().to_string()
}

/// Exchange a code for tokens.
async fn exchange_code(
    app: &axum::Router,
    code: &str,
    verifier: &str,
) -> (StatusCode, serde_json::Value) {
    let response = app
        .clone()
        .oneshot(
            Request::post("/oauth/token")
                .header("Content-Type", "application/x-www-form-urlencoded")
                .body(Body::from(
                    serde_urlencoded::to_string([
                        ("grant_type", "authorization_code"),
                        ("code", code),
                        ("redirect_uri", "http://localhost:3030/callback"),
                        ("code_verifier", verifier),
                    ])
                    .unwrap(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();

    let status = response.status();
    (status, json_body(response).await)
}

// ─── Discovery ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_auth_server_metadata() {
    let app = build_test_router();

    let response = app
        .oneshot(Request::get("/.well-known/oauth-authorization-server").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;

    assert_eq!(json["issuer"], ISSUER);
    assert_eq!(json["authorization_endpoint"], format!("{ISSUER}/oauth/authorize"));
    assert_eq!(json["token_endpoint"], format!("{ISSUER}/oauth/token"));
    assert_eq!(json["introspection_endpoint"], format!("{ISSUER}/introspect"));
    assert_eq!(json["registration_endpoint"], format!("{ISSUER}/oauth/register"));
    assert_eq!(json["revocation_endpoint"], format!("{ISSUER}/oauth/revoke"));
    assert!(json["code_challenge_methods_supported"].as_array().unwrap().contains(&json!("S256")));
    assert!(json["grant_types_supported"].as_array().unwrap().contains(&json!("refresh_token")));
}

#[tokio::test]
async fn test_health() {
    let app = build_test_router();

    let response = app.oneshot(Request::get("/health").body(Body::empty()).unwrap()).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json["service"], "authorization-server");
}

// ─── Dynamic Client Registration ─────────────────────────────────────────────

#[tokio::test]
async fn test_register_client() {
    let app = build_test_router();
    let client_id = register_client(&app).await;
    assert!(!client_id.is_empty());
}

#[tokio::test]
async fn test_register_requires_redirect_uris() {
    let app = build_test_router();

    let response = app
        .oneshot(
            Request::post("/oauth/register")
                .header("Content-Type", "application/json")
                .body(Body::from(json!({"client_name": "No URIs"}).to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = json_body(response).await;
    assert_eq!(json["error"], "invalid_client_metadata");
}

#[tokio::test]
async fn test_register_rejects_unparseable_redirect_uri() {
    let app = build_test_router();

    let response = app
        .oneshot(
            Request::post("/oauth/register")
                .header("Content-Type", "application/json")
                .body(Body::from(
                    json!({"client_name": "Bad", "redirect_uris": ["not a url"]}).to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// ─── Authorization Endpoint ──────────────────────────────────────────────────

#[tokio::test]
async fn test_authorize_requires_pkce() {
    let app = build_test_router();
    let client_id = register_client(&app).await;

    let uri = format!(
        "/oauth/authorize?client_id={client_id}\
         &redirect_uri=http%3A%2F%2Flocalhost%3A3030%2Fcallback&response_type=code"
    );
    let response = app.oneshot(Request::get(uri.as_str()).body(Body::empty()).unwrap()).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_authorize_rejects_unknown_client() {
    let app = build_test_router();

    let uri = "/oauth/authorize?client_id=nope\
               &redirect_uri=http%3A%2F%2Flocalhost%3A3030%2Fcallback\
               &response_type=code&code_challenge=abc&code_challenge_method=S256";
    let response = app.oneshot(Request::get(uri).body(Body::empty()).unwrap()).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_authorize_rejects_unregistered_redirect_uri() {
    let app = build_test_router();
    let client_id = register_client(&app).await;

    let uri = format!(
        "/oauth/authorize?client_id={client_id}\
         &redirect_uri=http%3A%2F%2Fevil.example%2Fcallback\
         &response_type=code&code_challenge=abc&code_challenge_method=S256"
    );
    let response = app.oneshot(Request::get(uri.as_str()).body(Body::empty()).unwrap()).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// ─── Login ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_login_page_renders_client_name() {
    let app = build_test_router();
    let client_id = register_client(&app).await;
    let challenge = pkce::challenge_s256("verifier-abc");

    let authorize_uri = format!(
        "/oauth/authorize?client_id={client_id}\
         &redirect_uri=http%3A%2F%2Flocalhost%3A3030%2Fcallback\
         &response_type=code&code_challenge={challenge}&code_challenge_method=S256"
    );
    let response =
        app.clone().oneshot(Request::get(authorize_uri.as_str()).body(Body::empty()).unwrap()).await.unwrap();
    let location = response.headers()[header::LOCATION].to_str().unwrap();
    let txn = location.split("txn=").nth(1).unwrap();

    let response = app
        .oneshot(Request::get(format!("/login?txn={txn}")).body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let html = text_body(response).await;
    assert!(html.contains("Test Client"));
    assert!(html.contains(txn));
}

#[tokio::test]
async fn test_login_rejects_bad_credentials() {
    let app = build_test_router();
    let client_id = register_client(&app).await;
    let challenge = pkce::challenge_s256("verifier-abc");

    let authorize_uri = format!(
        "/oauth/authorize?client_id={client_id}\
         &redirect_uri=http%3A%2F%2Flocalhost%3A3030%2Fcallback\
         &response_type=code&code_challenge={challenge}&code_challenge_method=S256"
    );
    let response =
        app.clone().oneshot(Request::get(authorize_uri.as_str()).body(Body::empty()).unwrap()).await.unwrap();
    let location = response.headers()[header::LOCATION].to_str().unwrap();
    let txn = location.split("txn=").nth(1).unwrap().to_string();

    let response = app
        .clone()
        .oneshot(
            Request::post("/login/callback")
                .header("Content-Type", "application/x-www-form-urlencoded")
                .body(Body::from(
                    serde_urlencoded::to_string([
                        ("txn", txn.as_str()),
                        ("username", "demo_user"),
                        ("password", "wrong"),
                    ])
                    .unwrap(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();

    // Error page, and the transaction survives for a retry
    assert_eq!(response.status(), StatusCode::OK);
    let html = text_body(response).await;
    assert!(html.contains("Invalid username or password"));

    let retry = app
        .oneshot(Request::get(format!("/login?txn={txn}")).body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(retry.status(), StatusCode::OK);
}

// ─── Token Exchange ──────────────────────────────────────────────────────────

#[tokio::test]
async fn test_full_flow_and_introspection() {
    let app = build_test_router();
    let client_id = register_client(&app).await;

    let verifier = pkce::generate_verifier();
    let challenge = pkce::challenge_s256(&verifier);
    let code = obtain_auth_code(&app, &client_id, &challenge).await;

    let (status, tokens) = exchange_code(&app, &code, &verifier).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(tokens["token_type"], "Bearer");
    assert_eq!(tokens["scope"], "user");
    assert!(tokens["access_token"].as_str().is_some());
    assert!(tokens["refresh_token"].as_str().is_some());

    // Introspection reports the token as active with RFC 7662 claims
    let response = app
        .clone()
        .oneshot(
            Request::post("/introspect")
                .header("Content-Type", "application/x-www-form-urlencoded")
                .body(Body::from(
                    serde_urlencoded::to_string([("token", tokens["access_token"].as_str().unwrap())])
                        .unwrap(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json["active"], true);
    assert_eq!(json["client_id"], client_id.as_str());
    assert_eq!(json["scope"], "user");
    assert_eq!(json["token_type"], "Bearer");
    assert!(json["exp"].as_i64().unwrap() > json["iat"].as_i64().unwrap());
}

#[tokio::test]
async fn test_token_response_is_uncacheable() {
    let app = build_test_router();
    let client_id = register_client(&app).await;

    let verifier = pkce::generate_verifier();
    let challenge = pkce::challenge_s256(&verifier);
    let code = obtain_auth_code(&app, &client_id, &challenge).await;

    let response = app
        .oneshot(
            Request::post("/oauth/token")
                .header("Content-Type", "application/x-www-form-urlencoded")
                .body(Body::from(
                    serde_urlencoded::to_string([
                        ("grant_type", "authorization_code"),
                        ("code", code.as_str()),
                        ("redirect_uri", "http://localhost:3030/callback"),
                        ("code_verifier", verifier.as_str()),
                    ])
                    .unwrap(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CACHE_CONTROL], "no-store");
    assert_eq!(response.headers()[header::PRAGMA], "no-cache");
}

#[tokio::test]
async fn test_exchange_rejects_wrong_verifier() {
    let app = build_test_router();
    let client_id = register_client(&app).await;

    let verifier = pkce::generate_verifier();
    let challenge = pkce::challenge_s256(&verifier);
    let code = obtain_auth_code(&app, &client_id, &challenge).await;

    let (status, json) = exchange_code(&app, &code, "wrong-verifier").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "invalid_grant");
}

#[tokio::test]
async fn test_auth_code_is_single_use() {
    let app = build_test_router();
    let client_id = register_client(&app).await;

    let verifier = pkce::generate_verifier();
    let challenge = pkce::challenge_s256(&verifier);
    let code = obtain_auth_code(&app, &client_id, &challenge).await;

    let (status, _) = exchange_code(&app, &code, &verifier).await;
    assert_eq!(status, StatusCode::OK);

    // Replay fails
    let (status, json) = exchange_code(&app, &code, &verifier).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "invalid_grant");
}

#[tokio::test]
async fn test_unsupported_grant_type() {
    let app = build_test_router();

    let response = app
        .oneshot(
            Request::post("/oauth/token")
                .header("Content-Type", "application/x-www-form-urlencoded")
                .body(Body::from("grant_type=password&username=u&password=p"))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = json_body(response).await;
    assert_eq!(json["error"], "unsupported_grant_type");
}

// ─── Refresh & Revocation ────────────────────────────────────────────────────

#[tokio::test]
async fn test_refresh_rotates_and_invalidates() {
    let app = build_test_router();
    let client_id = register_client(&app).await;

    let verifier = pkce::generate_verifier();
    let challenge = pkce::challenge_s256(&verifier);
    let code = obtain_auth_code(&app, &client_id, &challenge).await;
    let (_, tokens) = exchange_code(&app, &code, &verifier).await;

    let old_access = tokens["access_token"].as_str().unwrap().to_string();
    let refresh_token = tokens["refresh_token"].as_str().unwrap().to_string();

    let response = app
        .clone()
        .oneshot(
            Request::post("/oauth/token")
                .header("Content-Type", "application/x-www-form-urlencoded")
                .body(Body::from(
                    serde_urlencoded::to_string([
                        ("grant_type", "refresh_token"),
                        ("refresh_token", refresh_token.as_str()),
                    ])
                    .unwrap(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let new_tokens = json_body(response).await;
    assert_ne!(new_tokens["access_token"], old_access.as_str());

    // The old access token is no longer active
    let response = app
        .oneshot(
            Request::post("/introspect")
                .header("Content-Type", "application/x-www-form-urlencoded")
                .body(Body::from(
                    serde_urlencoded::to_string([("token", old_access.as_str())]).unwrap(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();

    let json = json_body(response).await;
    assert_eq!(json["active"], false);
}

#[tokio::test]
async fn test_revocation() {
    let app = build_test_router();
    let client_id = register_client(&app).await;

    let verifier = pkce::generate_verifier();
    let challenge = pkce::challenge_s256(&verifier);
    let code = obtain_auth_code(&app, &client_id, &challenge).await;
    let (_, tokens) = exchange_code(&app, &code, &verifier).await;
    let access_token = tokens["access_token"].as_str().unwrap().to_string();

    let response = app
        .clone()
        .oneshot(
            Request::post("/oauth/revoke")
                .header("Content-Type", "application/x-www-form-urlencoded")
                .body(Body::from(
                    serde_urlencoded::to_string([("token", access_token.as_str())]).unwrap(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .oneshot(
            Request::post("/introspect")
                .header("Content-Type", "application/x-www-form-urlencoded")
                .body(Body::from(
                    serde_urlencoded::to_string([("token", access_token.as_str())]).unwrap(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();

    let json = json_body(response).await;
    assert_eq!(json["active"], false);
}

#[tokio::test]
async fn test_introspect_unknown_token() {
    let app = build_test_router();

    let response = app
        .oneshot(
            Request::post("/introspect")
                .header("Content-Type", "application/x-www-form-urlencoded")
                .body(Body::from("token=garbage"))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json["active"], false);
}

#[tokio::test]
async fn test_introspect_missing_token() {
    let app = build_test_router();

    let response = app
        .oneshot(
            Request::post("/introspect")
                .header("Content-Type", "application/x-www-form-urlencoded")
                .body(Body::from(""))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = json_body(response).await;
    assert_eq!(json["active"], false);
}
