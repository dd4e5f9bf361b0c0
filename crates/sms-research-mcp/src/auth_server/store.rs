//! In-memory OAuth state store.
//!
//! Holds registered clients, pending authorization transactions (the hop
//! through the login page), one-time authorization codes, and token state.
//! Everything is process-local; this is a demo authorization server, not a
//! production one.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;

use crate::config::auth::{ACCESS_TOKEN_LIFETIME, AUTH_CODE_LIFETIME, REFRESH_TOKEN_LIFETIME};

/// Pending authorization transaction lifetime: same as an auth code.
const PENDING_AUTH_LIFETIME: u64 = AUTH_CODE_LIFETIME;

/// Cleanup interval: 5 minutes.
const CLEANUP_INTERVAL: Duration = Duration::from_secs(300);

fn now_unix() -> i64 {
    chrono::Utc::now().timestamp()
}

/// A dynamically registered OAuth client.
#[derive(Debug, Clone)]
pub struct OAuthClient {
    pub client_id: String,
    pub client_name: Option<String>,
    pub redirect_uris: Vec<String>,
}

/// An authorization request parked while the user logs in.
#[derive(Debug, Clone)]
pub struct PendingAuthorization {
    pub client_id: String,
    pub client_name: Option<String>,
    pub redirect_uri: String,
    pub state: Option<String>,
    pub code_challenge: String,
    pub scope: String,
    pub resource: Option<String>,
    created_at: i64,
}

impl PendingAuthorization {
    fn is_expired(&self) -> bool {
        now_unix() - self.created_at > i64::try_from(PENDING_AUTH_LIFETIME).unwrap_or(i64::MAX)
    }
}

/// An authorization code issued after login.
#[derive(Debug)]
struct AuthCode {
    client_id: String,
    redirect_uri: String,
    code_challenge: String,
    scope: String,
    resource: Option<String>,
    created_at: i64,
    used: bool,
}

impl AuthCode {
    fn is_expired(&self) -> bool {
        now_unix() - self.created_at > i64::try_from(AUTH_CODE_LIFETIME).unwrap_or(i64::MAX)
    }
}

/// An access token with wall-clock expiry, so introspection can report `exp`.
#[derive(Debug)]
struct AccessToken {
    client_id: String,
    scope: String,
    resource: Option<String>,
    issued_at: i64,
    expires_at: i64,
}

impl AccessToken {
    fn is_expired(&self) -> bool {
        now_unix() > self.expires_at
    }
}

/// A refresh token tied to the access token it was issued with.
#[derive(Debug)]
struct RefreshToken {
    client_id: String,
    access_token: String,
    scope: String,
    resource: Option<String>,
    expires_at: i64,
}

impl RefreshToken {
    fn is_expired(&self) -> bool {
        now_unix() > self.expires_at
    }
}

/// Auth code details returned from a consume.
#[derive(Debug)]
pub struct AuthCodeInfo {
    pub client_id: String,
    pub redirect_uri: String,
    pub code_challenge: String,
    pub scope: String,
    pub resource: Option<String>,
}

/// Introspection view of an active access token (RFC 7662 claims).
#[derive(Debug)]
pub struct TokenIntrospection {
    pub client_id: String,
    pub scope: String,
    pub issued_at: i64,
    pub expires_at: i64,
    pub resource: Option<String>,
}

/// A token pair returned from token creation/refresh.
#[derive(Debug)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: u64,
    pub scope: String,
}

/// In-memory OAuth state store.
#[derive(Clone)]
pub struct OAuthStore {
    clients: Arc<RwLock<HashMap<String, OAuthClient>>>,
    pending: Arc<RwLock<HashMap<String, PendingAuthorization>>>,
    auth_codes: Arc<RwLock<HashMap<String, AuthCode>>>,
    access_tokens: Arc<RwLock<HashMap<String, AccessToken>>>,
    refresh_tokens: Arc<RwLock<HashMap<String, RefreshToken>>>,
}

impl OAuthStore {
    #[must_use]
    pub fn new() -> Self {
        Self {
            clients: Arc::new(RwLock::new(HashMap::new())),
            pending: Arc::new(RwLock::new(HashMap::new())),
            auth_codes: Arc::new(RwLock::new(HashMap::new())),
            access_tokens: Arc::new(RwLock::new(HashMap::new())),
            refresh_tokens: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Generate a random opaque token using two UUIDs (256 bits).
    fn generate_token() -> String {
        format!("{}{}", uuid::Uuid::new_v4().simple(), uuid::Uuid::new_v4().simple())
    }

    /// Register a new OAuth client (Dynamic Client Registration).
    pub async fn register_client(
        &self,
        client_name: Option<String>,
        redirect_uris: Vec<String>,
    ) -> OAuthClient {
        let client = OAuthClient {
            client_id: uuid::Uuid::new_v4().simple().to_string(),
            client_name,
            redirect_uris,
        };

        self.clients.write().await.insert(client.client_id.clone(), client.clone());

        client
    }

    /// Look up a client by ID.
    pub async fn get_client(&self, client_id: &str) -> Option<OAuthClient> {
        self.clients.read().await.get(client_id).cloned()
    }

    /// Park an authorization request while the user logs in. Returns the
    /// transaction id carried through the login page.
    pub async fn create_pending_authorization(&self, pending: PendingAuthorizationRequest) -> String {
        let txn = uuid::Uuid::new_v4().simple().to_string();

        self.pending.write().await.insert(
            txn.clone(),
            PendingAuthorization {
                client_id: pending.client_id,
                client_name: pending.client_name,
                redirect_uri: pending.redirect_uri,
                state: pending.state,
                code_challenge: pending.code_challenge,
                scope: pending.scope,
                resource: pending.resource,
                created_at: now_unix(),
            },
        );

        txn
    }

    /// Look at a pending authorization without consuming it (login page render).
    pub async fn get_pending_authorization(&self, txn: &str) -> Option<PendingAuthorization> {
        let pending = self.pending.read().await;
        pending.get(txn).filter(|p| !p.is_expired()).cloned()
    }

    /// Consume a pending authorization after a successful login.
    pub async fn consume_pending_authorization(&self, txn: &str) -> Option<PendingAuthorization> {
        let mut pending = self.pending.write().await;
        let auth = pending.remove(txn)?;
        if auth.is_expired() { None } else { Some(auth) }
    }

    /// Create an authorization code for an approved request.
    pub async fn create_auth_code(&self, approved: &PendingAuthorization) -> String {
        let code = Self::generate_token();

        self.auth_codes.write().await.insert(
            code.clone(),
            AuthCode {
                client_id: approved.client_id.clone(),
                redirect_uri: approved.redirect_uri.clone(),
                code_challenge: approved.code_challenge.clone(),
                scope: approved.scope.clone(),
                resource: approved.resource.clone(),
                created_at: now_unix(),
                used: false,
            },
        );

        code
    }

    /// Consume an authorization code (one-time use).
    ///
    /// Returns the code details if valid, unused, and not expired.
    pub async fn consume_auth_code(&self, code: &str) -> Option<AuthCodeInfo> {
        let mut codes = self.auth_codes.write().await;
        let auth_code = codes.get_mut(code)?;

        if auth_code.used || auth_code.is_expired() {
            return None;
        }

        auth_code.used = true;

        Some(AuthCodeInfo {
            client_id: auth_code.client_id.clone(),
            redirect_uri: auth_code.redirect_uri.clone(),
            code_challenge: auth_code.code_challenge.clone(),
            scope: auth_code.scope.clone(),
            resource: auth_code.resource.clone(),
        })
    }

    /// Create an access + refresh token pair.
    pub async fn create_token_pair(
        &self,
        client_id: &str,
        scope: &str,
        resource: Option<&str>,
    ) -> TokenPair {
        let access = Self::generate_token();
        let refresh = Self::generate_token();
        let issued_at = now_unix();

        self.access_tokens.write().await.insert(
            access.clone(),
            AccessToken {
                client_id: client_id.to_owned(),
                scope: scope.to_owned(),
                resource: resource.map(ToOwned::to_owned),
                issued_at,
                expires_at: issued_at + i64::try_from(ACCESS_TOKEN_LIFETIME).unwrap_or(i64::MAX),
            },
        );

        self.refresh_tokens.write().await.insert(
            refresh.clone(),
            RefreshToken {
                client_id: client_id.to_owned(),
                access_token: access.clone(),
                scope: scope.to_owned(),
                resource: resource.map(ToOwned::to_owned),
                expires_at: issued_at + i64::try_from(REFRESH_TOKEN_LIFETIME).unwrap_or(i64::MAX),
            },
        );

        TokenPair {
            access_token: access,
            refresh_token: refresh,
            expires_in: ACCESS_TOKEN_LIFETIME,
            scope: scope.to_owned(),
        }
    }

    /// Introspect an access token (RFC 7662 lookup for resource servers).
    pub async fn introspect_token(&self, token: &str) -> Option<TokenIntrospection> {
        let tokens = self.access_tokens.read().await;
        let access = tokens.get(token)?;
        if access.is_expired() {
            return None;
        }
        Some(TokenIntrospection {
            client_id: access.client_id.clone(),
            scope: access.scope.clone(),
            issued_at: access.issued_at,
            expires_at: access.expires_at,
            resource: access.resource.clone(),
        })
    }

    /// Refresh a token pair: invalidate old tokens and issue new ones.
    pub async fn refresh_token_pair(&self, refresh_token: &str) -> Option<TokenPair> {
        // Validate and remove the old refresh token
        let old = {
            let mut tokens = self.refresh_tokens.write().await;
            tokens.remove(refresh_token)?
        };

        if old.is_expired() {
            return None;
        }

        // Remove old access token
        self.access_tokens.write().await.remove(&old.access_token);

        // Issue new pair
        Some(self.create_token_pair(&old.client_id, &old.scope, old.resource.as_deref()).await)
    }

    /// Revoke a token (RFC 7009). Accepts access or refresh tokens.
    ///
    /// Revoking a refresh token also revokes its access token.
    pub async fn revoke_token(&self, token: &str) {
        if self.access_tokens.write().await.remove(token).is_some() {
            tracing::info!("Revoked access token");
            return;
        }

        let removed = self.refresh_tokens.write().await.remove(token);
        if let Some(refresh) = removed {
            self.access_tokens.write().await.remove(&refresh.access_token);
            tracing::info!("Revoked refresh token and its access token");
        }
    }

    /// Start background cleanup task for expired state.
    pub fn start_cleanup_task(self: Arc<Self>) {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(CLEANUP_INTERVAL);
            loop {
                interval.tick().await;
                self.cleanup_expired().await;
            }
        });
    }

    async fn cleanup_expired(&self) {
        self.pending.write().await.retain(|_, p| !p.is_expired());

        self.auth_codes.write().await.retain(|_, code| !code.used && !code.is_expired());

        {
            let mut tokens = self.access_tokens.write().await;
            let before = tokens.len();
            tokens.retain(|_, token| !token.is_expired());
            let removed = before - tokens.len();
            if removed > 0 {
                tracing::debug!(count = removed, "Cleaned up expired access tokens");
            }
        }

        {
            let mut tokens = self.refresh_tokens.write().await;
            let before = tokens.len();
            tokens.retain(|_, token| !token.is_expired());
            let removed = before - tokens.len();
            if removed > 0 {
                tracing::debug!(count = removed, "Cleaned up expired refresh tokens");
            }
        }
    }
}

impl Default for OAuthStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for OAuthStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OAuthStore").finish()
    }
}

/// Parameters for parking an authorization request.
#[derive(Debug)]
pub struct PendingAuthorizationRequest {
    pub client_id: String,
    pub client_name: Option<String>,
    pub redirect_uri: String,
    pub state: Option<String>,
    pub code_challenge: String,
    pub scope: String,
    pub resource: Option<String>,
}
