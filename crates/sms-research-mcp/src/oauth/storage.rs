//! Token storage for the OAuth client.

use tokio::sync::RwLock;

/// Tokens held by the client after a successful flow.
#[derive(Debug, Clone)]
pub struct StoredTokens {
    pub access_token: String,
    pub refresh_token: Option<String>,
    /// Unix timestamp when the access token expires.
    pub expires_at: Option<i64>,
    pub scope: Option<String>,
}

/// Leeway before expiry at which a token is treated as expired.
const EXPIRY_LEEWAY_SECS: i64 = 30;

impl StoredTokens {
    /// Check if the access token is expired (or about to expire).
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.expires_at
            .is_some_and(|exp| exp - EXPIRY_LEEWAY_SECS <= chrono::Utc::now().timestamp())
    }
}

/// Client registration details returned by dynamic registration.
#[derive(Debug, Clone)]
pub struct RegisteredClient {
    pub client_id: String,
    pub redirect_uri: String,
}

/// Storage for OAuth client state.
#[async_trait::async_trait]
pub trait TokenStorage: Send + Sync {
    /// Get the stored tokens, if any.
    async fn tokens(&self) -> Option<StoredTokens>;

    /// Store a token set.
    async fn set_tokens(&self, tokens: StoredTokens);

    /// Drop the stored tokens (e.g., after a 401).
    async fn clear_tokens(&self);

    /// Get the registered client, if any.
    async fn client(&self) -> Option<RegisteredClient>;

    /// Store the registered client.
    async fn set_client(&self, client: RegisteredClient);
}

/// Simple in-memory token storage.
#[derive(Debug, Default)]
pub struct InMemoryTokenStorage {
    tokens: RwLock<Option<StoredTokens>>,
    client: RwLock<Option<RegisteredClient>>,
}

impl InMemoryTokenStorage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl TokenStorage for InMemoryTokenStorage {
    async fn tokens(&self) -> Option<StoredTokens> {
        self.tokens.read().await.clone()
    }

    async fn set_tokens(&self, tokens: StoredTokens) {
        *self.tokens.write().await = Some(tokens);
    }

    async fn clear_tokens(&self) {
        *self.tokens.write().await = None;
    }

    async fn client(&self) -> Option<RegisteredClient> {
        self.client.read().await.clone()
    }

    async fn set_client(&self, client: RegisteredClient) {
        *self.client.write().await = Some(client);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_token_roundtrip() {
        let storage = InMemoryTokenStorage::new();
        assert!(storage.tokens().await.is_none());

        storage
            .set_tokens(StoredTokens {
                access_token: "at".into(),
                refresh_token: Some("rt".into()),
                expires_at: None,
                scope: Some("user".into()),
            })
            .await;

        let tokens = storage.tokens().await.unwrap();
        assert_eq!(tokens.access_token, "at");

        storage.clear_tokens().await;
        assert!(storage.tokens().await.is_none());
    }

    #[test]
    fn test_expiry_check() {
        let now = chrono::Utc::now().timestamp();

        let fresh = StoredTokens {
            access_token: "at".into(),
            refresh_token: None,
            expires_at: Some(now + 3600),
            scope: None,
        };
        assert!(!fresh.is_expired());

        let stale = StoredTokens { expires_at: Some(now - 10), ..fresh.clone() };
        assert!(stale.is_expired());

        // Inside the leeway window counts as expired
        let closing = StoredTokens { expires_at: Some(now + 5), ..fresh.clone() };
        assert!(closing.is_expired());

        // No expiry recorded: treat as valid until the server says otherwise
        let unknown = StoredTokens { expires_at: None, ..fresh };
        assert!(!unknown.is_expired());
    }
}
