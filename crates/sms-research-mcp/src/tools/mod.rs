//! MCP tool implementations.
//!
//! Each tool module provides a type that:
//! 1. Parses and validates input parameters
//! 2. Calls an upstream API client
//! 3. Formats results as Markdown or JSON

mod search;
mod sms;
mod status;

pub use search::WebSearchTool;
pub use sms::SendTextTool;
pub use status::ServerStatusTool;

use std::sync::Arc;

use crate::client::{TavilyClient, TextBeltClient};
use crate::error::ToolResult;

/// Tool execution context.
pub struct ToolContext {
    /// Web search client.
    pub search: Arc<TavilyClient>,

    /// SMS client.
    pub sms: Arc<TextBeltClient>,

    /// When the server started, reported by the status tool.
    pub started_at: chrono::DateTime<chrono::Utc>,

    /// Whether OAuth protection is enabled on this server.
    pub auth_enabled: bool,

    /// Authorization server URL, when OAuth protection is enabled.
    pub auth_server_url: Option<String>,
}

impl ToolContext {
    /// Create a new tool context.
    #[must_use]
    pub fn new(search: Arc<TavilyClient>, sms: Arc<TextBeltClient>) -> Self {
        Self {
            search,
            sms,
            started_at: chrono::Utc::now(),
            auth_enabled: false,
            auth_server_url: None,
        }
    }

    /// Mark this context as running behind OAuth protection.
    #[must_use]
    pub fn with_auth(mut self, auth_server_url: impl Into<String>) -> Self {
        self.auth_enabled = true;
        self.auth_server_url = Some(auth_server_url.into());
        self
    }
}

/// Trait for MCP tools.
#[async_trait::async_trait]
pub trait McpTool: Send + Sync {
    /// Tool name (e.g., "send_text").
    fn name(&self) -> &'static str;

    /// Tool description for LLM.
    fn description(&self) -> &'static str;

    /// JSON Schema for input parameters.
    fn input_schema(&self) -> serde_json::Value;

    /// Execute the tool with given input.
    async fn execute(&self, ctx: &ToolContext, input: serde_json::Value) -> ToolResult<String>;
}

/// Register all tools.
#[must_use]
pub fn register_all_tools() -> Vec<Box<dyn McpTool>> {
    vec![
        Box::new(sms::SendTextTool),
        Box::new(search::WebSearchTool),
        Box::new(status::ServerStatusTool),
    ]
}

/// Names of all registered tools, for the status report.
#[must_use]
pub fn tool_names() -> Vec<&'static str> {
    register_all_tools().iter().map(|t| t.name()).collect()
}
