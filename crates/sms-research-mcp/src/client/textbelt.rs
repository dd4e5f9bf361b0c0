//! TextBelt SMS client.

use reqwest_middleware::ClientWithMiddleware;

use super::{build_http_client, handle_response};
use crate::config::{Config, api};
use crate::error::{ClientError, ClientResult};
use crate::models::SendOutcome;

/// Client for the TextBelt SMS API.
#[derive(Clone)]
pub struct TextBeltClient {
    /// HTTP client with middleware.
    client: ClientWithMiddleware,

    /// Plain client for reachability probes: no retries, short timeout.
    probe_client: reqwest::Client,

    /// API key ("textbelt" selects the free tier).
    key: String,

    /// Base URL.
    base_url: String,
}

impl TextBeltClient {
    /// Create a new client with the given configuration.
    ///
    /// # Errors
    ///
    /// Returns error if HTTP client initialization fails.
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        let probe_client =
            reqwest::Client::builder().timeout(api::STATUS_PROBE_TIMEOUT).build()?;

        Ok(Self {
            client: build_http_client(config)?,
            probe_client,
            key: config.textbelt_key.clone(),
            base_url: config.textbelt_api_url.clone(),
        })
    }

    /// Check if a paid API key is configured (vs the shared free key).
    #[must_use]
    pub fn has_paid_key(&self) -> bool {
        self.key != api::TEXTBELT_FREE_KEY
    }

    /// Send a text message.
    ///
    /// Delivery failures are reported in the returned [`SendOutcome`], not as
    /// errors; errors are reserved for transport-level problems.
    ///
    /// # Errors
    ///
    /// Returns error on HTTP failure.
    pub async fn send_text(&self, phone: &str, message: &str) -> ClientResult<SendOutcome> {
        let url = format!("{}/text", self.base_url);

        let body = url::form_urlencoded::Serializer::new(String::new())
            .append_pair("phone", phone)
            .append_pair("message", message)
            .append_pair("key", &self.key)
            .finish();

        let response = self
            .client
            .post(&url)
            .header("Content-Type", "application/x-www-form-urlencoded")
            .body(body)
            .send()
            .await?;
        let response = handle_response(response).await?;

        response.json().await.map_err(ClientError::from)
    }

    /// Probe TextBelt reachability for the status tool.
    ///
    /// Uses the plain client: a slow or flapping upstream must not stall the
    /// status report behind retries.
    pub async fn probe(&self) -> bool {
        match self.probe_client.get(&self.base_url).send().await {
            Ok(response) => response.status().is_success(),
            Err(_) => false,
        }
    }
}

impl std::fmt::Debug for TextBeltClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TextBeltClient").field("has_paid_key", &self.has_paid_key()).finish()
    }
}
