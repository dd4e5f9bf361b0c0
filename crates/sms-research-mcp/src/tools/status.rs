//! Server status tool.

use serde_json::json;

use super::{McpTool, ToolContext, tool_names};
use crate::config::api;
use crate::error::ToolResult;
use crate::models::{ResponseFormat, ServerStatusInput};

/// Server status and capability report.
pub struct ServerStatusTool;

#[async_trait::async_trait]
impl McpTool for ServerStatusTool {
    fn name(&self) -> &'static str {
        "get_server_status"
    }

    fn description(&self) -> &'static str {
        "Get the current status of the SMS & Research server, including \
         upstream service reachability and configuration."
    }

    fn input_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "responseFormat": {
                    "type": "string",
                    "enum": ["markdown", "json"],
                    "default": "markdown"
                }
            }
        })
    }

    async fn execute(&self, ctx: &ToolContext, input: serde_json::Value) -> ToolResult<String> {
        let params: ServerStatusInput = serde_json::from_value(input)?;

        let textbelt_status = if ctx.sms.probe().await { "reachable" } else { "unreachable" };
        let tavily_status = if ctx.search.has_api_key() { "connected" } else { "disconnected" };

        let authentication = if ctx.auth_enabled {
            "OAuth 2.0 Bearer Token Required"
        } else {
            "None"
        };

        let status = json!({
            "server_name": "SMS & Research MCP Server",
            "status": "running",
            "uptime_since": ctx.started_at.to_rfc3339(),
            "services": {
                "sms": {
                    "provider": "TextBelt",
                    "status": textbelt_status,
                    "endpoint": format!("{}/text", api::TEXTBELT_API),
                },
                "search": {
                    "provider": "Tavily",
                    "status": tavily_status,
                    "api_key_configured": ctx.search.has_api_key(),
                }
            },
            "authentication": authentication,
            "available_tools": tool_names(),
        });

        match params.response_format {
            ResponseFormat::Markdown => {
                let mut output = format!(
                    "# Server Status\n\n\
                     **Server:** SMS & Research MCP Server\n\
                     **Status:** running\n\
                     **Up since:** {}\n\
                     **Authentication:** {}\n\n\
                     ## Services\n\n\
                     - **SMS** (TextBelt): {}\n\
                     - **Search** (Tavily): {}\n\n\
                     ## Tools\n\n",
                    ctx.started_at.to_rfc3339(),
                    authentication,
                    textbelt_status,
                    tavily_status,
                );

                for name in tool_names() {
                    output.push_str(&format!("- `{name}`\n"));
                }

                Ok(output)
            }
            ResponseFormat::Json => Ok(serde_json::to_string(&status)?),
        }
    }
}
