//! Input models for MCP tool parameters.

use serde::{Deserialize, Serialize};

use super::ResponseFormat;

/// Input for the `send_text` tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendTextInput {
    /// Recipient phone number (e.g., "5551234567" or "+445551234567").
    pub phone: String,

    /// Text message body.
    pub message: String,
}

/// Input for the `web_search` tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebSearchInput {
    /// Search query.
    pub query: String,

    /// Maximum results to return.
    #[serde(default = "default_max_results")]
    pub max_results: i32,

    /// Include an AI-generated answer summary.
    #[serde(default = "default_true")]
    pub include_answer: bool,

    /// Output format.
    #[serde(default)]
    pub response_format: ResponseFormat,
}

fn default_max_results() -> i32 {
    5
}

fn default_true() -> bool {
    true
}

/// Input for the `get_server_status` tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerStatusInput {
    /// Output format.
    #[serde(default)]
    pub response_format: ResponseFormat,
}
