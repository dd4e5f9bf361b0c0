//! MCP resource implementations.
//!
//! Resources are read-only documents addressed by URI, served through
//! `resources/list` and `resources/read`.

use serde_json::json;

use crate::config::auth;
use crate::error::ToolResult;
use crate::tools::{ToolContext, tool_names};

/// Trait for MCP resources.
#[async_trait::async_trait]
pub trait McpResource: Send + Sync {
    /// Resource URI (e.g., "sms://test/message").
    fn uri(&self) -> &'static str;

    /// Human-readable name.
    fn name(&self) -> &'static str;

    /// Description for LLM.
    fn description(&self) -> &'static str;

    /// MIME type of the content.
    fn mime_type(&self) -> &'static str;

    /// Read the resource content.
    async fn read(&self, ctx: &ToolContext) -> ToolResult<String>;
}

/// Register all resources.
#[must_use]
pub fn register_all_resources() -> Vec<Box<dyn McpResource>> {
    vec![Box::new(TestMessageResource), Box::new(CapabilitiesResource)]
}

/// Test message resource, useful for verifying connectivity end to end.
pub struct TestMessageResource;

#[async_trait::async_trait]
impl McpResource for TestMessageResource {
    fn uri(&self) -> &'static str {
        "sms://test/message"
    }

    fn name(&self) -> &'static str {
        "Test SMS message"
    }

    fn description(&self) -> &'static str {
        "A test message with the current server time."
    }

    fn mime_type(&self) -> &'static str {
        "text/plain"
    }

    async fn read(&self, ctx: &ToolContext) -> ToolResult<String> {
        let now = chrono::Utc::now().format("%Y-%m-%d %H:%M:%S");
        if ctx.auth_enabled {
            Ok(format!("Protected SMS Resource - Current time: {now} | Auth: OAuth Required"))
        } else {
            Ok(format!("Test SMS Resource - Current time: {now}"))
        }
    }
}

/// Server capabilities document.
pub struct CapabilitiesResource;

#[async_trait::async_trait]
impl McpResource for CapabilitiesResource {
    fn uri(&self) -> &'static str {
        "mcp://server/capabilities"
    }

    fn name(&self) -> &'static str {
        "Server capabilities"
    }

    fn description(&self) -> &'static str {
        "Detailed server capabilities and configuration."
    }

    fn mime_type(&self) -> &'static str {
        "application/json"
    }

    async fn read(&self, ctx: &ToolContext) -> ToolResult<String> {
        let authentication = if ctx.auth_enabled {
            json!({
                "type": "OAuth 2.0",
                "token_type": "Bearer",
                "required_scopes": [auth::DEFAULT_SCOPE],
                "authorization_server": ctx.auth_server_url,
            })
        } else {
            json!({"type": "none"})
        };

        let capabilities = json!({
            "name": "SMS & Research MCP Server",
            "version": env!("CARGO_PKG_VERSION"),
            "capabilities": {
                "sms": {
                    "description": "Send SMS messages via the TextBelt API",
                    "provider": "TextBelt",
                    "supports_international": true,
                    "rate_limits": "Free tier: 1 message per day per phone number",
                },
                "web_search": {
                    "description": "Web search with AI-powered answers",
                    "provider": "Tavily",
                    "features": ["real-time search", "AI summaries", "source citations"],
                }
            },
            "tools": tool_names(),
            "authentication": authentication,
            "generated_at": chrono::Utc::now().to_rfc3339(),
        });

        Ok(serde_json::to_string_pretty(&capabilities)?)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::client::{TavilyClient, TextBeltClient};
    use crate::config::Config;

    fn test_context() -> ToolContext {
        let config = Config::for_testing("http://unused.localhost");
        ToolContext::new(
            Arc::new(TavilyClient::new(&config).unwrap()),
            Arc::new(TextBeltClient::new(&config).unwrap()),
        )
    }

    #[test]
    fn test_register_all_resources() {
        let resources = register_all_resources();
        assert_eq!(resources.len(), 2);

        let uris: Vec<_> = resources.iter().map(|r| r.uri()).collect();
        assert!(uris.contains(&"sms://test/message"));
        assert!(uris.contains(&"mcp://server/capabilities"));
    }

    #[tokio::test]
    async fn test_test_message_unprotected() {
        let ctx = test_context();
        let content = TestMessageResource.read(&ctx).await.unwrap();
        assert!(content.starts_with("Test SMS Resource"));
        assert!(!content.contains("OAuth"));
    }

    #[tokio::test]
    async fn test_test_message_protected() {
        let ctx = test_context().with_auth("http://localhost:9000");
        let content = TestMessageResource.read(&ctx).await.unwrap();
        assert!(content.contains("OAuth Required"));
    }

    #[tokio::test]
    async fn test_capabilities_document() {
        let ctx = test_context().with_auth("http://localhost:9000");
        let content = CapabilitiesResource.read(&ctx).await.unwrap();
        let json: serde_json::Value = serde_json::from_str(&content).unwrap();

        assert_eq!(json["capabilities"]["sms"]["provider"], "TextBelt");
        assert_eq!(json["authentication"]["type"], "OAuth 2.0");
        assert_eq!(json["authentication"]["authorization_server"], "http://localhost:9000");
    }
}
