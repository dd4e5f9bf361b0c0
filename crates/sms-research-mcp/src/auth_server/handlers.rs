//! OAuth 2.0 endpoint handlers for the authorization server.
//!
//! Implements:
//! - RFC 8414: OAuth Authorization Server Metadata
//! - RFC 7591: Dynamic Client Registration
//! - RFC 7636: PKCE (S256)
//! - RFC 6749: OAuth 2.0 Authorization Code Grant
//! - RFC 7662: Token Introspection
//! - RFC 7009: Token Revocation

use std::sync::Arc;

use axum::{
    Form, Json,
    extract::{Query, State},
    http::{HeaderValue, StatusCode, header},
    response::{Html, IntoResponse, Response},
};
use serde::Deserialize;

use super::login;
use super::store::{OAuthStore, PendingAuthorizationRequest, TokenPair};
use crate::config::AuthServerConfig;
use crate::pkce;

/// Shared state for the authorization server handlers.
pub struct AuthServerState {
    pub store: OAuthStore,
    pub config: AuthServerConfig,
}

// ─── RFC 8414: Authorization Server Metadata ─────────────────────────────────

/// `GET /.well-known/oauth-authorization-server`
///
/// Describes the OAuth endpoints and capabilities.
pub async fn handle_metadata(State(state): State<Arc<AuthServerState>>) -> impl IntoResponse {
    let issuer = &state.config.issuer_url;

    Json(serde_json::json!({
        "issuer": issuer,
        "authorization_endpoint": format!("{issuer}/oauth/authorize"),
        "token_endpoint": format!("{issuer}/oauth/token"),
        "introspection_endpoint": format!("{issuer}/introspect"),
        "registration_endpoint": format!("{issuer}/oauth/register"),
        "revocation_endpoint": format!("{issuer}/oauth/revoke"),
        "response_types_supported": ["code"],
        "grant_types_supported": ["authorization_code", "refresh_token"],
        "token_endpoint_auth_methods_supported": ["none"],
        "scopes_supported": [state.config.scope],
        "code_challenge_methods_supported": ["S256"]
    }))
}

// ─── RFC 7591: Dynamic Client Registration ───────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub client_name: Option<String>,
    pub redirect_uris: Option<Vec<String>>,
    #[serde(default)]
    pub grant_types: Vec<String>,
    #[serde(default)]
    pub response_types: Vec<String>,
    pub token_endpoint_auth_method: Option<String>,
}

/// `POST /oauth/register`
///
/// Register a new OAuth client dynamically.
pub async fn handle_register(
    State(state): State<Arc<AuthServerState>>,
    Json(req): Json<RegisterRequest>,
) -> Response {
    let redirect_uris = req.redirect_uris.unwrap_or_default();
    if redirect_uris.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({
                "error": "invalid_client_metadata",
                "error_description": "redirect_uris is required"
            })),
        )
            .into_response();
    }

    // Loopback and custom-scheme URIs are both fine for a demo AS, but they
    // must at least parse
    for uri in &redirect_uris {
        if url::Url::parse(uri).is_err() {
            return (
                StatusCode::BAD_REQUEST,
                Json(serde_json::json!({
                    "error": "invalid_redirect_uri",
                    "error_description": format!("cannot parse redirect_uri: {uri}")
                })),
            )
                .into_response();
        }
    }

    let client = state.store.register_client(req.client_name, redirect_uris).await;

    tracing::info!(client_id = %client.client_id, "Registered OAuth client");

    (
        StatusCode::CREATED,
        Json(serde_json::json!({
            "client_id": client.client_id,
            "client_name": client.client_name,
            "redirect_uris": client.redirect_uris,
            "grant_types": ["authorization_code", "refresh_token"],
            "response_types": ["code"],
            "token_endpoint_auth_method": "none"
        })),
    )
        .into_response()
}

// ─── Authorization Endpoint ──────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct AuthorizeQuery {
    pub client_id: Option<String>,
    pub redirect_uri: Option<String>,
    pub response_type: Option<String>,
    pub state: Option<String>,
    pub code_challenge: Option<String>,
    pub code_challenge_method: Option<String>,
    pub scope: Option<String>,
    /// RFC 8707 target resource, echoed back as the token audience.
    pub resource: Option<String>,
}

/// `GET /oauth/authorize`
///
/// Validate the authorization request, park it as a pending transaction, and
/// send the user to the login page.
pub async fn handle_authorize(
    State(state): State<Arc<AuthServerState>>,
    Query(query): Query<AuthorizeQuery>,
) -> Response {
    // Validate required parameters
    let Some(client_id) = query.client_id.as_deref() else {
        return (StatusCode::BAD_REQUEST, "Missing client_id").into_response();
    };
    let Some(redirect_uri) = query.redirect_uri.as_deref() else {
        return (StatusCode::BAD_REQUEST, "Missing redirect_uri").into_response();
    };
    let Some(code_challenge) = query.code_challenge.as_deref() else {
        return (StatusCode::BAD_REQUEST, "Missing code_challenge").into_response();
    };

    if query.response_type.as_deref() != Some("code") {
        return (StatusCode::BAD_REQUEST, "response_type must be 'code'").into_response();
    }
    if query.code_challenge_method.as_deref() != Some("S256") {
        return (StatusCode::BAD_REQUEST, "code_challenge_method must be 'S256'").into_response();
    }

    // Validate client
    let Some(client) = state.store.get_client(client_id).await else {
        return (StatusCode::BAD_REQUEST, "Unknown client_id").into_response();
    };

    // Validate redirect_uri matches registered URIs
    if !client.redirect_uris.iter().any(|u| u == redirect_uri) {
        return (StatusCode::BAD_REQUEST, "redirect_uri not registered for this client")
            .into_response();
    }

    let scope = query.scope.clone().unwrap_or_else(|| state.config.scope.clone());

    let txn = state
        .store
        .create_pending_authorization(PendingAuthorizationRequest {
            client_id: client_id.to_owned(),
            client_name: client.client_name,
            redirect_uri: redirect_uri.to_owned(),
            state: query.state,
            code_challenge: code_challenge.to_owned(),
            scope,
            resource: query.resource,
        })
        .await;

    tracing::info!(client_id = %client_id, "Authorization request pending login");

    let location = format!("{}/login?txn={txn}", state.config.issuer_url);
    (StatusCode::FOUND, [(header::LOCATION, location)]).into_response()
}

// ─── Login Page ──────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct LoginQuery {
    pub txn: Option<String>,
}

/// `GET /login`
///
/// Show the login form for a pending authorization transaction.
pub async fn handle_login_page(
    State(state): State<Arc<AuthServerState>>,
    Query(query): Query<LoginQuery>,
) -> Response {
    let Some(txn) = query.txn.as_deref() else {
        return (StatusCode::BAD_REQUEST, "Missing txn parameter").into_response();
    };

    let Some(pending) = state.store.get_pending_authorization(txn).await else {
        return (StatusCode::BAD_REQUEST, "Unknown or expired authorization request")
            .into_response();
    };

    let client_name = pending.client_name.as_deref().unwrap_or("An application");
    Html(login::render_login_page(client_name, txn, None)).into_response()
}

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub txn: String,
    pub username: String,
    pub password: String,
}

/// `POST /login/callback`
///
/// Check the demo credentials; on success issue an authorization code and
/// redirect back to the client.
pub async fn handle_login_callback(
    State(state): State<Arc<AuthServerState>>,
    Form(form): Form<LoginForm>,
) -> Response {
    let Some(pending) = state.store.get_pending_authorization(&form.txn).await else {
        return (StatusCode::BAD_REQUEST, "Unknown or expired authorization request")
            .into_response();
    };

    if form.username != state.config.demo_username || form.password != state.config.demo_password {
        tracing::warn!(client_id = %pending.client_id, "Login attempt with bad credentials");
        let client_name = pending.client_name.as_deref().unwrap_or("An application");
        return Html(login::render_login_page(
            client_name,
            &form.txn,
            Some("Invalid username or password"),
        ))
        .into_response();
    }

    // Credentials accepted: consume the transaction and issue a code
    let Some(approved) = state.store.consume_pending_authorization(&form.txn).await else {
        return (StatusCode::BAD_REQUEST, "Authorization request already completed")
            .into_response();
    };

    let code = state.store.create_auth_code(&approved).await;

    tracing::info!(client_id = %approved.client_id, "Login approved, issued authorization code");

    let mut location = approved.redirect_uri.clone();
    location.push_str(if location.contains('?') { "&" } else { "?" });
    location.push_str(&format!("code={code}"));
    if let Some(ref oauth_state) = approved.state {
        let encoded: String = url::form_urlencoded::byte_serialize(oauth_state.as_bytes()).collect();
        location.push_str(&format!("&state={encoded}"));
    }

    (StatusCode::FOUND, [(header::LOCATION, location)]).into_response()
}

// ─── Token Endpoint ──────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct TokenRequest {
    pub grant_type: String,
    pub code: Option<String>,
    pub redirect_uri: Option<String>,
    pub code_verifier: Option<String>,
    pub client_id: Option<String>,
    pub refresh_token: Option<String>,
}

/// `POST /oauth/token`
///
/// Exchange an authorization code for tokens, or refresh tokens.
pub async fn handle_token(
    State(state): State<Arc<AuthServerState>>,
    Form(form): Form<TokenRequest>,
) -> Response {
    match form.grant_type.as_str() {
        "authorization_code" => handle_authorization_code_grant(&state.store, &form).await,
        "refresh_token" => handle_refresh_token_grant(&state.store, &form).await,
        _ => (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({
                "error": "unsupported_grant_type"
            })),
        )
            .into_response(),
    }
}

async fn handle_authorization_code_grant(store: &OAuthStore, form: &TokenRequest) -> Response {
    let Some(ref code) = form.code else {
        return token_error("invalid_request", "Missing code");
    };
    let Some(ref code_verifier) = form.code_verifier else {
        return token_error("invalid_request", "Missing code_verifier");
    };

    // Consume the auth code (one-time)
    let Some(auth_code) = store.consume_auth_code(code).await else {
        return token_error("invalid_grant", "Invalid or expired authorization code");
    };

    // Public client: the presented client_id must match the code's owner
    if let Some(ref client_id) = form.client_id {
        if *client_id != auth_code.client_id {
            return token_error("invalid_grant", "client_id mismatch");
        }
    }

    // Verify redirect_uri matches
    if let Some(ref redirect_uri) = form.redirect_uri {
        if *redirect_uri != auth_code.redirect_uri {
            return token_error("invalid_grant", "redirect_uri mismatch");
        }
    }

    // Verify PKCE
    if !pkce::verify_s256(code_verifier, &auth_code.code_challenge) {
        return token_error("invalid_grant", "PKCE verification failed");
    }

    // Issue tokens
    let pair = store
        .create_token_pair(&auth_code.client_id, &auth_code.scope, auth_code.resource.as_deref())
        .await;

    tracing::info!(client_id = %auth_code.client_id, "Issued token pair");

    token_success(&pair)
}

async fn handle_refresh_token_grant(store: &OAuthStore, form: &TokenRequest) -> Response {
    let Some(ref refresh_token) = form.refresh_token else {
        return token_error("invalid_request", "Missing refresh_token");
    };

    let Some(pair) = store.refresh_token_pair(refresh_token).await else {
        return token_error("invalid_grant", "Invalid or expired refresh token");
    };

    tracing::info!("Refreshed token pair");

    token_success(&pair)
}

/// Build a token response with required OAuth 2.0 cache headers (RFC 6749 §5.1).
fn token_success(pair: &TokenPair) -> Response {
    let mut response = Json(serde_json::json!({
        "access_token": pair.access_token,
        "token_type": "Bearer",
        "expires_in": pair.expires_in,
        "refresh_token": pair.refresh_token,
        "scope": pair.scope
    }))
    .into_response();

    let headers = response.headers_mut();
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
    headers.insert(header::PRAGMA, HeaderValue::from_static("no-cache"));
    response
}

fn token_error(error: &str, description: &str) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(serde_json::json!({
            "error": error,
            "error_description": description
        })),
    )
        .into_response()
}

// ─── RFC 7662: Token Introspection ───────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct IntrospectForm {
    pub token: Option<String>,
}

/// `POST /introspect`
///
/// Token introspection for resource servers. They call this endpoint to
/// validate tokens without direct access to token storage.
pub async fn handle_introspect(
    State(state): State<Arc<AuthServerState>>,
    Form(form): Form<IntrospectForm>,
) -> Response {
    let Some(token) = form.token.filter(|t| !t.is_empty()) else {
        return (StatusCode::BAD_REQUEST, Json(serde_json::json!({"active": false})))
            .into_response();
    };

    let Some(info) = state.store.introspect_token(&token).await else {
        return Json(serde_json::json!({"active": false})).into_response();
    };

    Json(serde_json::json!({
        "active": true,
        "client_id": info.client_id,
        "scope": info.scope,
        "exp": info.expires_at,
        "iat": info.issued_at,
        "token_type": "Bearer",
        // RFC 8707 audience claim
        "aud": info.resource,
    }))
    .into_response()
}

// ─── RFC 7009: Token Revocation ──────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct RevokeForm {
    pub token: Option<String>,
}

/// `POST /oauth/revoke`
///
/// Revoke a token. Per RFC 7009 the response is 200 even for unknown tokens.
pub async fn handle_revoke(
    State(state): State<Arc<AuthServerState>>,
    Form(form): Form<RevokeForm>,
) -> Response {
    if let Some(token) = form.token.filter(|t| !t.is_empty()) {
        state.store.revoke_token(&token).await;
    }
    Json(serde_json::json!({})).into_response()
}

// ─── Health ──────────────────────────────────────────────────────────────────

/// `GET /health`
pub async fn handle_health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "authorization-server",
        "version": env!("CARGO_PKG_VERSION")
    }))
}
