//! TextBelt SMS API response models.

use serde::{Deserialize, Serialize};

/// Response from the TextBelt `/text` endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendOutcome {
    /// Whether the message was accepted for delivery.
    #[serde(default)]
    pub success: bool,

    /// Delivery tracking id, present on success.
    #[serde(rename = "textId", default)]
    pub text_id: Option<serde_json::Value>,

    /// Remaining quota for the API key.
    #[serde(rename = "quotaRemaining", default)]
    pub quota_remaining: Option<i64>,

    /// Error description, present on failure.
    #[serde(default)]
    pub error: Option<String>,
}

impl SendOutcome {
    /// Error message, or a placeholder when the API omits it.
    #[must_use]
    pub fn error_or_default(&self) -> &str {
        self.error.as_deref().unwrap_or("Unknown error")
    }
}
