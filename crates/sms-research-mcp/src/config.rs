//! Configuration for the SMS & Research MCP server.

use std::time::Duration;

/// Upstream API configuration constants.
pub mod api {
    use std::time::Duration;

    /// Base URL for the Tavily search API.
    pub const TAVILY_API: &str = "https://api.tavily.com";

    /// Base URL for the TextBelt SMS API.
    pub const TEXTBELT_API: &str = "https://textbelt.com";

    /// Shared key for the TextBelt free tier (1 message per day per phone).
    pub const TEXTBELT_FREE_KEY: &str = "textbelt";

    /// Request timeout for upstream API calls.
    pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

    /// Connection timeout.
    pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

    /// Timeout for the TextBelt reachability probe in `get_server_status`.
    pub const STATUS_PROBE_TIMEOUT: Duration = Duration::from_secs(5);

    /// Delay between search requests (200ms = 5 req/s).
    pub const RATE_LIMIT_DELAY: Duration = Duration::from_millis(200);

    /// Search cache TTL (5 minutes).
    pub const CACHE_TTL: Duration = Duration::from_secs(300);

    /// Maximum cache size.
    pub const CACHE_MAX_SIZE: u64 = 1000;

    /// Maximum keepalive connections per host.
    pub const MAX_KEEPALIVE: usize = 10;

    /// Keepalive expiry.
    pub const KEEPALIVE_EXPIRY: Duration = Duration::from_secs(30);
}

/// OAuth configuration constants.
pub mod auth {
    use std::time::Duration;

    /// Default authorization server URL.
    pub const DEFAULT_AUTH_SERVER: &str = "http://localhost:9000";

    /// Default OAuth scope required for MCP access.
    pub const DEFAULT_SCOPE: &str = "user";

    /// HTTP timeout for token introspection requests.
    pub const INTROSPECTION_TIMEOUT: Duration = Duration::from_secs(10);

    /// Authorization code lifetime: 10 minutes.
    pub const AUTH_CODE_LIFETIME: u64 = 600;

    /// Access token lifetime: 1 hour.
    pub const ACCESS_TOKEN_LIFETIME: u64 = 3600;

    /// Refresh token lifetime: 30 days.
    pub const REFRESH_TOKEN_LIFETIME: u64 = 30 * 24 * 3600;
}

/// Resource server configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Tavily API key. Required for `web_search`.
    pub tavily_api_key: Option<String>,

    /// TextBelt API key. Defaults to the shared free-tier key.
    pub textbelt_key: String,

    /// Base URL for the Tavily API (for testing with mock servers).
    pub tavily_api_url: String,

    /// Base URL for the TextBelt API (for testing with mock servers).
    pub textbelt_api_url: String,

    /// Request timeout.
    pub request_timeout: Duration,

    /// Connection timeout.
    pub connect_timeout: Duration,

    /// Delay between search requests.
    pub rate_limit_delay: Duration,

    /// Search cache TTL.
    pub cache_ttl: Duration,

    /// Maximum cache size.
    pub cache_max_size: u64,
}

impl Config {
    /// Create a new configuration.
    #[must_use]
    pub fn new(tavily_api_key: Option<String>, textbelt_key: Option<String>) -> Self {
        Self {
            tavily_api_key,
            textbelt_key: textbelt_key.unwrap_or_else(|| api::TEXTBELT_FREE_KEY.to_string()),
            tavily_api_url: api::TAVILY_API.to_string(),
            textbelt_api_url: api::TEXTBELT_API.to_string(),
            request_timeout: api::REQUEST_TIMEOUT,
            connect_timeout: api::CONNECT_TIMEOUT,
            rate_limit_delay: api::RATE_LIMIT_DELAY,
            cache_ttl: api::CACHE_TTL,
            cache_max_size: api::CACHE_MAX_SIZE,
        }
    }

    /// Create a test configuration with custom URLs for mock servers.
    #[must_use]
    pub fn for_testing(base_url: &str) -> Self {
        Self {
            tavily_api_key: Some("tvly-test-key".to_string()),
            textbelt_key: api::TEXTBELT_FREE_KEY.to_string(),
            tavily_api_url: base_url.to_string(),
            textbelt_api_url: base_url.to_string(),
            request_timeout: Duration::from_secs(5),
            connect_timeout: Duration::from_secs(2),
            rate_limit_delay: Duration::from_millis(0), // No delay in tests
            cache_ttl: Duration::from_secs(0),          // No caching in tests
            cache_max_size: 0,
        }
    }

    /// Create configuration from environment variables.
    ///
    /// Reads `TV_API_KEY` for Tavily and `TEXTBELT_API_KEY` for TextBelt.
    ///
    /// # Errors
    ///
    /// Returns error if environment variables are invalid.
    pub fn from_env() -> anyhow::Result<Self> {
        let tavily_api_key = std::env::var("TV_API_KEY").ok();
        let textbelt_key = std::env::var("TEXTBELT_API_KEY").ok();
        Ok(Self::new(tavily_api_key, textbelt_key))
    }

    /// Check if a Tavily API key is configured.
    #[must_use]
    pub const fn has_tavily_key(&self) -> bool {
        self.tavily_api_key.is_some()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new(None, None)
    }
}

/// Authorization server configuration.
#[derive(Debug, Clone)]
pub struct AuthServerConfig {
    /// Host to bind to.
    pub host: String,

    /// Port to listen on.
    pub port: u16,

    /// Issuer URL announced in metadata and used to build endpoint URLs.
    pub issuer_url: String,

    /// Demo username accepted by the login page.
    pub demo_username: String,

    /// Demo password accepted by the login page.
    pub demo_password: String,

    /// Scope granted to issued tokens.
    pub scope: String,
}

impl AuthServerConfig {
    /// Create a configuration for the given bind address.
    ///
    /// Demo credentials can be overridden with `MCP_DEMO_USERNAME` and
    /// `MCP_DEMO_PASSWORD`.
    #[must_use]
    pub fn new(host: &str, port: u16) -> Self {
        Self {
            host: host.to_string(),
            port,
            issuer_url: format!("http://{host}:{port}"),
            demo_username: std::env::var("MCP_DEMO_USERNAME")
                .unwrap_or_else(|_| "demo_user".to_string()),
            demo_password: std::env::var("MCP_DEMO_PASSWORD")
                .unwrap_or_else(|_| "demo_password".to_string()),
            scope: auth::DEFAULT_SCOPE.to_string(),
        }
    }
}

impl Default for AuthServerConfig {
    fn default() -> Self {
        Self::new("localhost", 9000)
    }
}
