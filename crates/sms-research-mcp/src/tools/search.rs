//! Web search tool.

use serde_json::json;

use super::{McpTool, ToolContext};
use crate::error::{ToolError, ToolResult};
use crate::models::{ResponseFormat, WebSearchInput};

/// Web search tool backed by the Tavily API.
pub struct WebSearchTool;

#[async_trait::async_trait]
impl McpTool for WebSearchTool {
    fn name(&self) -> &'static str {
        "web_search"
    }

    fn description(&self) -> &'static str {
        "Perform a web search with AI-powered answer summaries via the Tavily API."
    }

    fn input_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "Search query"
                },
                "maxResults": {
                    "type": "integer",
                    "default": 5,
                    "minimum": 1,
                    "maximum": 20,
                    "description": "Maximum results to return"
                },
                "includeAnswer": {
                    "type": "boolean",
                    "default": true,
                    "description": "Include an AI-generated answer summary"
                },
                "responseFormat": {
                    "type": "string",
                    "enum": ["markdown", "json"],
                    "default": "markdown"
                }
            },
            "required": ["query"]
        })
    }

    async fn execute(&self, ctx: &ToolContext, input: serde_json::Value) -> ToolResult<String> {
        let params: WebSearchInput = serde_json::from_value(input)?;

        if params.query.trim().is_empty() {
            return Err(ToolError::validation("query", "cannot be empty"));
        }
        if !(1..=20).contains(&params.max_results) {
            return Err(ToolError::validation("maxResults", "must be between 1 and 20"));
        }

        tracing::info!(query = %params.query, "Running web search");

        let response = ctx
            .search
            .search(&params.query, params.max_results, params.include_answer)
            .await?;

        let total_results = response.results.len();
        tracing::info!(query = %params.query, results = total_results, "Search completed");

        match params.response_format {
            ResponseFormat::Markdown => {
                let mut output = format!(
                    "# Web Search Results\n\n**Query:** {}\n",
                    response.query.as_deref().unwrap_or(&params.query)
                );

                if let Some(ref answer) = response.answer {
                    output.push_str(&format!("\n**Answer:** {answer}\n"));
                }

                if let Some(time) = response.response_time {
                    output.push_str(&format!("\n**Results:** {total_results} (in {time:.2}s)\n"));
                } else {
                    output.push_str(&format!("\n**Results:** {total_results}\n"));
                }

                output.push_str("\n---\n\n");

                for (i, item) in response.results.iter().enumerate() {
                    output.push_str(&format!(
                        "**{}. {}**\n   - {}\n",
                        i + 1,
                        item.title_or_default(),
                        item.url
                    ));
                    if let Some(ref content) = item.content {
                        output.push_str(&format!("   - {content}\n"));
                    }
                    output.push('\n');
                }

                if response.results.is_empty() {
                    output.push_str("*No results found.*\n");
                }

                Ok(output)
            }
            ResponseFormat::Json => Ok(serde_json::to_string(&json!({
                "query": response.query.as_deref().unwrap_or(&params.query),
                "answer": response.answer,
                "results": response.results,
                "response_time": response.response_time,
                "total_results": total_results,
            }))?),
        }
    }
}
