//! Client-side OAuth 2.0 support.
//!
//! Implements the discovery → dynamic registration → authorization-code +
//! PKCE → token exchange flow against an OAuth-protected MCP server, with
//! refresh-token rotation and pluggable token storage.

pub mod callback;
pub mod storage;

use std::sync::Arc;

use anyhow::Context;
use serde::Deserialize;

use crate::config::auth::DEFAULT_SCOPE;
use crate::pkce;
use storage::{RegisteredClient, StoredTokens, TokenStorage};

pub use storage::InMemoryTokenStorage;

/// Authorization server endpoints discovered via RFC 9728 + RFC 8414.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthServerMetadata {
    pub issuer: String,
    pub authorization_endpoint: String,
    pub token_endpoint: String,
    #[serde(default)]
    pub registration_endpoint: Option<String>,
}

/// RFC 9728 protected resource metadata (the subset the client needs).
#[derive(Debug, Deserialize)]
struct ProtectedResourceMetadata {
    #[serde(default)]
    authorization_servers: Vec<String>,
}

/// RFC 6749 token endpoint response.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    scope: Option<String>,
}

impl TokenResponse {
    fn into_stored(self) -> StoredTokens {
        StoredTokens {
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            expires_at: self.expires_in.map(|ttl| chrono::Utc::now().timestamp() + ttl),
            scope: self.scope,
        }
    }
}

/// OAuth client provider for the interactive MCP client.
///
/// Holds no tokens itself; everything lives in the [`TokenStorage`] so the
/// provider can be shared and the storage swapped (e.g., for a keychain).
pub struct OAuthProvider {
    http: reqwest::Client,
    /// Resource server base URL (scheme://host:port, no /mcp suffix).
    resource_base_url: String,
    client_name: String,
    callback_port: u16,
    storage: Arc<dyn TokenStorage>,
    /// Discovered endpoints, cached after the first flow.
    metadata: tokio::sync::RwLock<Option<AuthServerMetadata>>,
}

impl OAuthProvider {
    /// Create a provider for the given resource server.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be built.
    pub fn new(
        resource_base_url: impl Into<String>,
        callback_port: u16,
        storage: Arc<dyn TokenStorage>,
    ) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()?;

        Ok(Self {
            http,
            resource_base_url: resource_base_url.into(),
            client_name: "SMS & Research MCP Client".to_string(),
            callback_port,
            storage,
            metadata: tokio::sync::RwLock::new(None),
        })
    }

    fn redirect_uri(&self) -> String {
        format!("http://localhost:{}/callback", self.callback_port)
    }

    /// Whether valid-looking tokens are currently stored.
    pub async fn has_tokens(&self) -> bool {
        self.storage.tokens().await.is_some_and(|t| !t.is_expired())
    }

    /// Drop stored tokens (e.g., after the server rejected them).
    pub async fn clear_tokens(&self) {
        self.storage.clear_tokens().await;
    }

    /// Get a usable access token, running the full flow if needed.
    ///
    /// Order of attempts: stored token → refresh grant → interactive
    /// browser authorization.
    ///
    /// # Errors
    ///
    /// Returns error if every path to a token fails.
    pub async fn access_token(&self) -> anyhow::Result<String> {
        if let Some(tokens) = self.storage.tokens().await {
            if !tokens.is_expired() {
                return Ok(tokens.access_token);
            }

            if let Some(ref refresh_token) = tokens.refresh_token {
                if let Some(refreshed) = self.try_refresh(refresh_token).await? {
                    return Ok(refreshed.access_token);
                }
            }

            // Neither path worked; start over
            self.storage.clear_tokens().await;
        }

        let tokens = self.authorize().await?;
        Ok(tokens.access_token)
    }

    /// Run the interactive authorization-code flow.
    ///
    /// # Errors
    ///
    /// Returns error on discovery, registration, callback, or exchange failure.
    pub async fn authorize(&self) -> anyhow::Result<StoredTokens> {
        let metadata = self.discover().await?;
        let client = self.ensure_registered(&metadata).await?;

        let code_verifier = pkce::generate_verifier();
        let code_challenge = pkce::challenge_s256(&code_verifier);
        let request_state = uuid::Uuid::new_v4().simple().to_string();

        let mut authorize_url = url::Url::parse(&metadata.authorization_endpoint)
            .context("invalid authorization endpoint")?;
        authorize_url
            .query_pairs_mut()
            .append_pair("client_id", &client.client_id)
            .append_pair("redirect_uri", &client.redirect_uri)
            .append_pair("response_type", "code")
            .append_pair("state", &request_state)
            .append_pair("code_challenge", &code_challenge)
            .append_pair("code_challenge_method", "S256")
            .append_pair("scope", DEFAULT_SCOPE)
            .append_pair("resource", &self.resource_base_url);

        println!("Opening browser for authorization:\n  {authorize_url}");
        open_browser(authorize_url.as_str());

        let result =
            callback::wait_for_callback(self.callback_port, callback::CALLBACK_TIMEOUT).await?;

        // The state must round-trip unchanged (CSRF protection)
        if result.state.as_deref() != Some(request_state.as_str()) {
            anyhow::bail!("authorization state mismatch");
        }

        let tokens = self
            .exchange_code(&metadata, &client, &result.code, &code_verifier)
            .await?;

        self.storage.set_tokens(tokens.clone()).await;
        tracing::info!("Authorization flow completed");

        Ok(tokens)
    }

    /// Discover the authorization server via the resource server's metadata.
    async fn discover(&self) -> anyhow::Result<AuthServerMetadata> {
        if let Some(ref cached) = *self.metadata.read().await {
            return Ok(cached.clone());
        }

        let resource_metadata_url =
            format!("{}/.well-known/oauth-protected-resource", self.resource_base_url);
        let resource_metadata: ProtectedResourceMetadata = self
            .http
            .get(&resource_metadata_url)
            .send()
            .await
            .context("fetching protected resource metadata")?
            .error_for_status()?
            .json()
            .await?;

        let auth_server = resource_metadata
            .authorization_servers
            .first()
            .context("resource server lists no authorization servers")?;

        let as_metadata_url =
            format!("{}/.well-known/oauth-authorization-server", auth_server.trim_end_matches('/'));
        let metadata: AuthServerMetadata = self
            .http
            .get(&as_metadata_url)
            .send()
            .await
            .context("fetching authorization server metadata")?
            .error_for_status()?
            .json()
            .await?;

        tracing::debug!(issuer = %metadata.issuer, "Discovered authorization server");

        *self.metadata.write().await = Some(metadata.clone());
        Ok(metadata)
    }

    /// Register this client dynamically, unless already registered.
    async fn ensure_registered(
        &self,
        metadata: &AuthServerMetadata,
    ) -> anyhow::Result<RegisteredClient> {
        if let Some(client) = self.storage.client().await {
            return Ok(client);
        }

        let registration_endpoint = metadata
            .registration_endpoint
            .as_deref()
            .context("authorization server does not support dynamic registration")?;

        #[derive(Deserialize)]
        struct RegistrationResponse {
            client_id: String,
        }

        let response: RegistrationResponse = self
            .http
            .post(registration_endpoint)
            .json(&serde_json::json!({
                "client_name": self.client_name,
                "redirect_uris": [self.redirect_uri()],
                "grant_types": ["authorization_code", "refresh_token"],
                "response_types": ["code"],
                "token_endpoint_auth_method": "none",
            }))
            .send()
            .await
            .context("registering OAuth client")?
            .error_for_status()?
            .json()
            .await?;

        let client =
            RegisteredClient { client_id: response.client_id, redirect_uri: self.redirect_uri() };

        tracing::info!(client_id = %client.client_id, "Registered OAuth client");

        self.storage.set_client(client.clone()).await;
        Ok(client)
    }

    /// Exchange an authorization code for tokens.
    async fn exchange_code(
        &self,
        metadata: &AuthServerMetadata,
        client: &RegisteredClient,
        code: &str,
        code_verifier: &str,
    ) -> anyhow::Result<StoredTokens> {
        let response = self
            .http
            .post(&metadata.token_endpoint)
            .form(&[
                ("grant_type", "authorization_code"),
                ("code", code),
                ("redirect_uri", client.redirect_uri.as_str()),
                ("code_verifier", code_verifier),
                ("client_id", client.client_id.as_str()),
            ])
            .send()
            .await
            .context("exchanging authorization code")?;

        if !response.status().is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("token exchange failed: {body}");
        }

        let tokens: TokenResponse = response.json().await?;
        Ok(tokens.into_stored())
    }

    /// Try the refresh grant. Returns `None` if the server rejected it, in
    /// which case the caller falls back to the interactive flow.
    async fn try_refresh(&self, refresh_token: &str) -> anyhow::Result<Option<StoredTokens>> {
        let metadata = self.discover().await?;

        let response = self
            .http
            .post(&metadata.token_endpoint)
            .form(&[("grant_type", "refresh_token"), ("refresh_token", refresh_token)])
            .send()
            .await
            .context("refreshing tokens")?;

        if !response.status().is_success() {
            tracing::debug!(status = %response.status(), "Refresh grant rejected");
            return Ok(None);
        }

        let tokens: TokenResponse = response.json().await?;
        let stored = tokens.into_stored();
        self.storage.set_tokens(stored.clone()).await;

        tracing::info!("Refreshed access token");
        Ok(Some(stored))
    }
}

impl std::fmt::Debug for OAuthProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OAuthProvider")
            .field("resource_base_url", &self.resource_base_url)
            .field("callback_port", &self.callback_port)
            .finish()
    }
}

/// Best-effort browser launch; the URL is always printed as a fallback.
fn open_browser(url: &str) {
    #[cfg(target_os = "macos")]
    let command = Some(("open", vec![url]));
    #[cfg(target_os = "windows")]
    let command = Some(("cmd", vec!["/C", "start", "", url]));
    #[cfg(all(unix, not(target_os = "macos")))]
    let command = Some(("xdg-open", vec![url]));
    #[cfg(not(any(unix, target_os = "windows")))]
    let command: Option<(&str, Vec<&str>)> = None;

    if let Some((program, args)) = command {
        match std::process::Command::new(program)
            .args(args)
            .stdout(std::process::Stdio::null())
            .stderr(std::process::Stdio::null())
            .spawn()
        {
            Ok(_) => tracing::debug!("Launched browser"),
            Err(e) => tracing::debug!(error = %e, "Could not launch browser"),
        }
    }
}
