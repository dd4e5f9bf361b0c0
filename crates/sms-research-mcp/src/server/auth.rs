//! Bearer-token authentication for the HTTP transport.
//!
//! The resource server never sees credentials or token state; it validates
//! access tokens against the authorization server's RFC 7662 introspection
//! endpoint. Unauthenticated requests get 401 with a `WWW-Authenticate`
//! header pointing at the RFC 9728 protected-resource metadata.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Request, State},
    http::{HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::TypedHeader;
use axum_extra::headers::{Authorization, authorization::Bearer};
use serde::Deserialize;

use super::transport::HttpState;
use crate::config::auth;
use crate::error::AuthError;

/// Authentication settings for a protected HTTP transport.
#[derive(Clone)]
pub struct HttpAuth {
    /// Token verifier.
    pub verifier: Arc<dyn TokenVerifier>,

    /// Authorization server URL, announced in discovery metadata.
    pub auth_server_url: String,

    /// Scope required on every token.
    pub required_scope: String,
}

impl std::fmt::Debug for HttpAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpAuth")
            .field("auth_server_url", &self.auth_server_url)
            .field("required_scope", &self.required_scope)
            .finish()
    }
}

/// A successfully verified access token.
#[derive(Debug, Clone)]
pub struct VerifiedToken {
    /// Client the token was issued to.
    pub client_id: String,

    /// Scopes granted to the token.
    pub scopes: Vec<String>,
}

/// Validates bearer tokens presented to the resource server.
#[async_trait::async_trait]
pub trait TokenVerifier: Send + Sync {
    /// Verify an access token.
    async fn verify(&self, token: &str) -> Result<VerifiedToken, AuthError>;
}

/// RFC 7662 introspection response, as produced by the authorization server.
#[derive(Debug, Deserialize)]
struct IntrospectionResponse {
    active: bool,
    #[serde(default)]
    client_id: Option<String>,
    #[serde(default)]
    scope: Option<String>,
    #[serde(default)]
    exp: Option<i64>,
    #[serde(default)]
    aud: Option<String>,
}

/// Token verifier backed by the authorization server's introspection endpoint.
pub struct IntrospectionTokenVerifier {
    http: reqwest::Client,
    introspection_endpoint: String,
    resource_url: String,
    required_scope: String,
    validate_resource: bool,
}

impl IntrospectionTokenVerifier {
    /// Create a verifier for the given authorization server.
    ///
    /// `validate_resource` enables RFC 8707 audience checking: tokens issued
    /// for a different resource server are rejected.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be built.
    pub fn new(
        auth_server_url: &str,
        resource_url: &str,
        required_scope: &str,
        validate_resource: bool,
    ) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder().timeout(auth::INTROSPECTION_TIMEOUT).build()?;

        Ok(Self {
            http,
            introspection_endpoint: format!("{}/introspect", auth_server_url.trim_end_matches('/')),
            resource_url: resource_url.to_string(),
            required_scope: required_scope.to_string(),
            validate_resource,
        })
    }
}

#[async_trait::async_trait]
impl TokenVerifier for IntrospectionTokenVerifier {
    async fn verify(&self, token: &str) -> Result<VerifiedToken, AuthError> {
        let response = self
            .http
            .post(&self.introspection_endpoint)
            .form(&[("token", token)])
            .send()
            .await
            .map_err(|e| AuthError::Introspection(e.to_string()))?;

        if !response.status().is_success() {
            return Err(AuthError::Introspection(format!(
                "introspection endpoint returned {}",
                response.status()
            )));
        }

        let info: IntrospectionResponse =
            response.json().await.map_err(|e| AuthError::Introspection(e.to_string()))?;

        if !info.active {
            return Err(AuthError::InvalidToken("token is not active".to_string()));
        }

        // Introspection reports exp for active tokens; reject anyway if it has passed
        if let Some(exp) = info.exp {
            if exp < chrono::Utc::now().timestamp() {
                return Err(AuthError::InvalidToken("token has expired".to_string()));
            }
        }

        let scopes: Vec<String> = info
            .scope
            .as_deref()
            .unwrap_or_default()
            .split_whitespace()
            .map(ToString::to_string)
            .collect();

        if !scopes.iter().any(|s| s == &self.required_scope) {
            return Err(AuthError::InsufficientScope { required: self.required_scope.clone() });
        }

        if self.validate_resource {
            if info.aud.as_deref() != Some(self.resource_url.as_str()) {
                return Err(AuthError::AudienceMismatch { expected: self.resource_url.clone() });
            }
        }

        Ok(VerifiedToken {
            client_id: info.client_id.unwrap_or_default(),
            scopes,
        })
    }
}

impl std::fmt::Debug for IntrospectionTokenVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IntrospectionTokenVerifier")
            .field("introspection_endpoint", &self.introspection_endpoint)
            .field("validate_resource", &self.validate_resource)
            .finish()
    }
}

/// Middleware gating MCP routes behind bearer authentication.
///
/// A no-op when the server runs unprotected.
pub async fn require_bearer(
    State(state): State<Arc<HttpState>>,
    bearer: Option<TypedHeader<Authorization<Bearer>>>,
    request: Request,
    next: Next,
) -> Response {
    let Some(ref http_auth) = state.auth else {
        return next.run(request).await;
    };

    let Some(TypedHeader(bearer)) = bearer else {
        return auth_failure(&state.base_url, &AuthError::MissingToken);
    };

    match http_auth.verifier.verify(bearer.token()).await {
        Ok(verified) => {
            tracing::debug!(client_id = %verified.client_id, "Bearer token accepted");
            next.run(request).await
        }
        Err(e) => {
            tracing::warn!(error = %e, "Bearer token rejected");
            auth_failure(&state.base_url, &e)
        }
    }
}

/// Build a 401/403 response with the RFC 9728 `WWW-Authenticate` challenge.
fn auth_failure(base_url: &str, error: &AuthError) -> Response {
    let status =
        StatusCode::from_u16(error.status_code()).unwrap_or(StatusCode::UNAUTHORIZED);

    let challenge = format!(
        "Bearer resource_metadata=\"{base_url}/.well-known/oauth-protected-resource\", \
         error=\"invalid_token\", error_description=\"{error}\""
    );

    let mut response = (
        status,
        Json(serde_json::json!({
            "error": "unauthorized",
            "error_description": error.to_string(),
        })),
    )
        .into_response();

    if let Ok(value) = HeaderValue::from_str(&challenge) {
        response.headers_mut().insert("WWW-Authenticate", value);
    }

    response
}

/// `GET /.well-known/oauth-protected-resource`
///
/// RFC 9728 Protected Resource Metadata: tells clients where to find the
/// authorization server for this resource.
pub async fn handle_protected_resource(State(state): State<Arc<HttpState>>) -> Response {
    let Some(ref http_auth) = state.auth else {
        return (StatusCode::NOT_FOUND, "OAuth not configured").into_response();
    };

    Json(serde_json::json!({
        "resource": state.base_url,
        "authorization_servers": [http_auth.auth_server_url],
        "scopes_supported": [http_auth.required_scope],
        "bearer_methods_supported": ["header"],
        "introspection_endpoint": format!("{}/introspect", http_auth.auth_server_url),
    }))
    .into_response()
}
