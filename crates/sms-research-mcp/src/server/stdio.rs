//! Stdio transport for MCP protocol.
//!
//! Handles JSON-RPC 2.0 over stdin/stdout. Runs unprotected: stdio is a
//! local pipe, bearer auth applies to the HTTP transport only.

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

use super::transport;
use crate::protocol::{JsonRpcRequest, JsonRpcResponse};
use crate::resources::McpResource;
use crate::tools::{McpTool, ToolContext};

/// Handle MCP protocol over stdio.
pub async fn run_stdio(
    tools: Vec<Box<dyn McpTool>>,
    resources: Vec<Box<dyn McpResource>>,
    ctx: ToolContext,
) -> anyhow::Result<()> {
    let stdin = tokio::io::stdin();
    let mut stdout = tokio::io::stdout();
    let mut reader = BufReader::new(stdin);
    let mut line = String::new();

    tracing::info!("MCP stdio server ready, waiting for requests...");

    loop {
        line.clear();
        let bytes_read = reader.read_line(&mut line).await?;

        if bytes_read == 0 {
            // EOF
            tracing::info!("Stdin closed, shutting down");
            break;
        }

        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        // Parse JSON-RPC request
        let request: JsonRpcRequest = match serde_json::from_str(trimmed) {
            Ok(req) => req,
            Err(e) => {
                let error_response =
                    JsonRpcResponse::error(None, -32700, format!("Parse error: {e}"));
                write_response(&mut stdout, &error_response).await?;
                continue;
            }
        };

        tracing::debug!(method = %request.method, "Received request");

        // Notifications get no response
        if request.id.is_none() {
            continue;
        }

        let response = handle_request(&request, &tools, &resources, &ctx).await;
        write_response(&mut stdout, &response).await?;
    }

    Ok(())
}

async fn write_response(
    stdout: &mut tokio::io::Stdout,
    response: &JsonRpcResponse,
) -> anyhow::Result<()> {
    let response_json = serde_json::to_string(response)?;
    stdout.write_all(response_json.as_bytes()).await?;
    stdout.write_all(b"\n").await?;
    stdout.flush().await?;
    Ok(())
}

async fn handle_request(
    req: &JsonRpcRequest,
    tools: &[Box<dyn McpTool>],
    resources: &[Box<dyn McpResource>],
    ctx: &ToolContext,
) -> JsonRpcResponse {
    match req.method.as_str() {
        "initialize" => {
            JsonRpcResponse::success(req.id.clone(), transport::handle_initialize(&req.params))
        }
        "initialized" => JsonRpcResponse::success(req.id.clone(), serde_json::json!({})),
        "tools/list" => transport::handle_tools_list(req.id.clone(), tools),
        "tools/call" => transport::call_tool(req.id.clone(), &req.params, tools, ctx).await,
        "resources/list" => transport::handle_resources_list(req.id.clone(), resources),
        "resources/read" => {
            transport::read_resource(req.id.clone(), &req.params, resources, ctx).await
        }
        "ping" => JsonRpcResponse::success(req.id.clone(), serde_json::json!({})),
        _ => JsonRpcResponse::error(
            req.id.clone(),
            -32601,
            format!("Method not found: {}", req.method),
        ),
    }
}
