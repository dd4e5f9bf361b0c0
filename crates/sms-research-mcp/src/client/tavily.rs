//! Tavily web search client.

use moka::future::Cache;
use reqwest_middleware::ClientWithMiddleware;

use super::{build_http_client, handle_response};
use crate::config::Config;
use crate::error::{ClientError, ClientResult};
use crate::models::SearchResponse;

/// Client for the Tavily search API.
#[derive(Clone)]
pub struct TavilyClient {
    /// HTTP client with middleware.
    client: ClientWithMiddleware,

    /// Search response cache.
    cache: Cache<String, serde_json::Value>,

    /// API key (required for searches).
    api_key: Option<String>,

    /// Base URL.
    base_url: String,

    /// Delay between requests.
    rate_limit_delay: std::time::Duration,
}

impl TavilyClient {
    /// Create a new client with the given configuration.
    ///
    /// # Errors
    ///
    /// Returns error if HTTP client initialization fails.
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        let client = build_http_client(config)?;

        let cache = Cache::builder()
            .max_capacity(config.cache_max_size)
            .time_to_live(config.cache_ttl)
            .build();

        Ok(Self {
            client,
            cache,
            api_key: config.tavily_api_key.clone(),
            base_url: config.tavily_api_url.clone(),
            rate_limit_delay: config.rate_limit_delay,
        })
    }

    /// Check if an API key is configured.
    #[must_use]
    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    /// Run a web search.
    ///
    /// # Errors
    ///
    /// Returns error if no API key is configured or on API failure.
    pub async fn search(
        &self,
        query: &str,
        max_results: i32,
        include_answer: bool,
    ) -> ClientResult<SearchResponse> {
        let Some(ref api_key) = self.api_key else {
            return Err(ClientError::unauthorized("TV_API_KEY is not configured"));
        };

        let url = format!("{}/search", self.base_url);

        let body = serde_json::json!({
            "api_key": api_key,
            "query": query,
            "search_depth": "basic",
            "include_answer": include_answer,
            "max_results": max_results,
        });

        // Check cache (key excludes the api_key)
        let cache_key = self.cache_key(query, max_results, include_answer);
        if let Some(cached) = self.cache.get(&cache_key).await {
            return serde_json::from_value(cached).map_err(ClientError::from);
        }

        // Rate limit
        tokio::time::sleep(self.rate_limit_delay).await;

        let body_str = serde_json::to_string(&body)?;

        let response = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .body(body_str)
            .send()
            .await?;
        let response = handle_response(response).await?;
        let value: serde_json::Value = response.json().await?;

        // Cache response
        self.cache.insert(cache_key, value.clone()).await;

        serde_json::from_value(value).map_err(ClientError::from)
    }

    /// Generate cache key.
    fn cache_key(&self, query: &str, max_results: i32, include_answer: bool) -> String {
        use md5::{Digest, Md5};

        let mut hasher = Md5::new();
        hasher.update(b"search|");
        hasher.update(query.as_bytes());
        hasher.update(b"|");
        hasher.update(max_results.to_string().as_bytes());
        hasher.update(b"|");
        hasher.update([u8::from(include_answer)]);

        format!("{:x}", hasher.finalize())
    }
}

impl std::fmt::Debug for TavilyClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TavilyClient").field("has_api_key", &self.has_api_key()).finish()
    }
}
