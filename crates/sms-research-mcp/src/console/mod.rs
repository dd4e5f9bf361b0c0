//! Interactive MCP client with lazy OAuth authentication.
//!
//! Connects to an MCP server and verifies basic reachability without
//! authenticating; the OAuth flow only runs the first time a command needs
//! the protected API. Tokens live in in-memory storage for the lifetime of
//! the REPL.

use std::io::Write as _;
use std::sync::Arc;

use anyhow::Context;
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::oauth::{InMemoryTokenStorage, OAuthProvider};
use crate::protocol::{JsonRpcRequest, JsonRpcResponse, PROTOCOL_VERSION};

/// Options for the interactive client.
#[derive(Debug, Clone)]
pub struct ConsoleOptions {
    /// MCP endpoint URL (e.g., "http://localhost:8080/mcp").
    pub server_url: String,

    /// Port for the loopback OAuth callback listener.
    pub callback_port: u16,

    /// Whether to authenticate with OAuth when the server demands it.
    pub use_oauth: bool,
}

/// Interactive REPL client for an MCP server.
pub struct InteractiveClient {
    http: reqwest::Client,
    /// Full MCP endpoint URL.
    server_url: String,
    /// Server base URL (endpoint URL without the /mcp or /sse suffix).
    base_url: String,
    oauth: Option<OAuthProvider>,
    session_id: Option<String>,
    initialized: bool,
    next_id: i64,
}

impl InteractiveClient {
    /// Create a client for the given server.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client or OAuth provider cannot be built.
    pub fn new(options: ConsoleOptions) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(60))
            .build()?;

        let base_url = options
            .server_url
            .trim_end_matches("/mcp")
            .trim_end_matches("/sse")
            .trim_end_matches('/')
            .to_string();

        let oauth = if options.use_oauth {
            Some(OAuthProvider::new(
                base_url.clone(),
                options.callback_port,
                Arc::new(InMemoryTokenStorage::new()),
            )?)
        } else {
            None
        };

        Ok(Self {
            http,
            server_url: options.server_url,
            base_url,
            oauth,
            session_id: None,
            initialized: false,
            next_id: 0,
        })
    }

    /// Connect (reachability check only) and run the interactive loop.
    ///
    /// # Errors
    ///
    /// Returns error on stdin failure; protocol problems are reported to the
    /// user and leave the loop running.
    pub async fn run(&mut self) -> anyhow::Result<()> {
        println!("Connecting to {} (authentication will happen when needed)...", self.server_url);

        // Health is served outside the protected routes, so this works
        // against protected and unprotected servers alike.
        match self.http.get(format!("{}/health", self.base_url)).send().await {
            Ok(response) => println!("Health check: {}", response.status()),
            Err(e) => {
                println!("Could not reach the server: {e}");
                println!("Make sure the MCP server is running, then try again.");
                return Ok(());
            }
        }

        if self.oauth.is_some() {
            println!("Authentication will be triggered on first tool use.");
        }

        self.interactive_loop().await
    }

    async fn interactive_loop(&mut self) -> anyhow::Result<()> {
        println!();
        println!("Interactive MCP client");
        println!("Commands:");
        println!("  list                      - List available tools");
        println!("  call <tool> [json-args]   - Call a tool");
        println!("  resources                 - List available resources");
        println!("  read <uri>                - Read a resource");
        println!("  status                    - Show session status");
        println!("  quit                      - Exit");
        println!();

        let stdin = BufReader::new(tokio::io::stdin());
        let mut lines = stdin.lines();

        loop {
            print!("mcp> ");
            std::io::stdout().flush()?;

            let Some(line) = lines.next_line().await? else {
                break; // EOF
            };
            let command = line.trim();

            if command.is_empty() {
                continue;
            }

            if command == "quit" || command == "exit" {
                break;
            }

            let result = self.dispatch(command).await;
            if let Err(e) = result {
                println!("Error: {e:#}");
                // A failed exchange may leave half-initialized state behind
                self.initialized = false;
                self.session_id = None;
            }
        }

        println!("Goodbye!");
        Ok(())
    }

    async fn dispatch(&mut self, command: &str) -> anyhow::Result<()> {
        if command == "status" {
            self.print_status().await;
            return Ok(());
        }

        if command == "list" {
            return self.list_tools().await;
        }

        if command == "resources" {
            return self.list_resources().await;
        }

        if let Some(uri) = command.strip_prefix("read ") {
            return self.read_resource(uri.trim()).await;
        }

        if let Some(rest) = command.strip_prefix("call ") {
            let mut parts = rest.splitn(2, char::is_whitespace);
            let Some(tool_name) = parts.next().filter(|s| !s.is_empty()) else {
                println!("Please specify a tool name");
                return Ok(());
            };

            let arguments = match parts.next() {
                Some(raw) => match serde_json::from_str::<serde_json::Value>(raw.trim()) {
                    Ok(value) => value,
                    Err(_) => {
                        println!("Invalid arguments format (expected JSON)");
                        return Ok(());
                    }
                },
                None => serde_json::json!({}),
            };

            return self.call_tool(tool_name, arguments).await;
        }

        println!("Unknown command. Try 'list', 'call <tool>', 'resources', 'read <uri>', 'status', or 'quit'");
        Ok(())
    }

    async fn print_status(&self) {
        match self.oauth {
            Some(ref oauth) => {
                if oauth.has_tokens().await && self.initialized {
                    println!("Authenticated and connected");
                } else if oauth.has_tokens().await {
                    println!("Authenticated (session not yet initialized)");
                } else {
                    println!("Not authenticated (will authenticate on first tool use)");
                }
            }
            None => {
                if self.initialized {
                    println!("Connected (no authentication)");
                } else {
                    println!("Not connected yet (no authentication configured)");
                }
            }
        }
        if let Some(ref id) = self.session_id {
            println!("Session ID: {id}");
        }
    }

    async fn list_tools(&mut self) -> anyhow::Result<()> {
        let result = self.request("tools/list", serde_json::json!({})).await?;

        let tools = result["tools"].as_array().cloned().unwrap_or_default();
        if tools.is_empty() {
            println!("No tools available");
            return Ok(());
        }

        println!();
        println!("Available tools:");
        for (i, tool) in tools.iter().enumerate() {
            println!("{}. {}", i + 1, tool["name"].as_str().unwrap_or("?"));
            if let Some(description) = tool["description"].as_str() {
                println!("   {description}");
            }
        }
        println!();
        Ok(())
    }

    async fn call_tool(
        &mut self,
        tool_name: &str,
        arguments: serde_json::Value,
    ) -> anyhow::Result<()> {
        println!("Calling tool '{tool_name}'...");

        let result = self
            .request(
                "tools/call",
                serde_json::json!({"name": tool_name, "arguments": arguments}),
            )
            .await?;

        println!();
        for content in result["content"].as_array().cloned().unwrap_or_default() {
            if content["type"] == "text" {
                println!("{}", content["text"].as_str().unwrap_or(""));
            } else {
                println!("{content}");
            }
        }
        Ok(())
    }

    async fn list_resources(&mut self) -> anyhow::Result<()> {
        let result = self.request("resources/list", serde_json::json!({})).await?;

        let resources = result["resources"].as_array().cloned().unwrap_or_default();
        if resources.is_empty() {
            println!("No resources available");
            return Ok(());
        }

        println!();
        println!("Available resources:");
        for resource in &resources {
            println!(
                "- {} ({})",
                resource["uri"].as_str().unwrap_or("?"),
                resource["name"].as_str().unwrap_or("unnamed")
            );
        }
        println!();
        Ok(())
    }

    async fn read_resource(&mut self, uri: &str) -> anyhow::Result<()> {
        let result = self.request("resources/read", serde_json::json!({"uri": uri})).await?;

        for content in result["contents"].as_array().cloned().unwrap_or_default() {
            if let Some(text) = content["text"].as_str() {
                println!("{text}");
            }
        }
        Ok(())
    }

    /// Run an MCP request, initializing the session (and authenticating)
    /// first if needed.
    async fn request(
        &mut self,
        method: &str,
        params: serde_json::Value,
    ) -> anyhow::Result<serde_json::Value> {
        self.ensure_initialized().await?;
        self.rpc(method, params).await
    }

    /// Initialize the MCP session. Triggers the OAuth flow on a protected
    /// server, since initialize itself requires a bearer token there.
    async fn ensure_initialized(&mut self) -> anyhow::Result<()> {
        if self.initialized {
            return Ok(());
        }

        let result = self
            .rpc(
                "initialize",
                serde_json::json!({
                    "protocolVersion": PROTOCOL_VERSION,
                    "capabilities": {},
                    "clientInfo": {
                        "name": "sms-research-client",
                        "version": env!("CARGO_PKG_VERSION")
                    }
                }),
            )
            .await?;

        let server_name = result["serverInfo"]["name"].as_str().unwrap_or("unknown");
        println!("Connected to MCP server: {server_name}");
        if let Some(ref id) = self.session_id {
            println!("Session ID: {id}");
        }

        self.notify("notifications/initialized").await?;
        self.initialized = true;
        Ok(())
    }

    /// Send a JSON-RPC request and return its result.
    async fn rpc(
        &mut self,
        method: &str,
        params: serde_json::Value,
    ) -> anyhow::Result<serde_json::Value> {
        self.next_id += 1;
        let request = JsonRpcRequest::new(self.next_id, method, params);

        let mut response = self.post(&request).await?;

        // One re-auth attempt: the token may have been revoked server-side
        if response.status() == reqwest::StatusCode::UNAUTHORIZED {
            let Some(ref oauth) = self.oauth else {
                anyhow::bail!(
                    "server requires authentication; restart the client with OAuth enabled"
                );
            };

            println!("Authentication required - starting OAuth flow...");
            oauth.clear_tokens().await;
            oauth.access_token().await.context("authentication failed")?;

            response = self.post(&request).await?;
        }

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("server returned {status}: {body}");
        }

        if let Some(session_id) = response
            .headers()
            .get("Mcp-Session-Id")
            .and_then(|v| v.to_str().ok())
        {
            self.session_id = Some(session_id.to_string());
        }

        let rpc_response: JsonRpcResponse = response.json().await?;

        if let Some(error) = rpc_response.error {
            anyhow::bail!("{} (code {})", error.message, error.code);
        }

        Ok(rpc_response.result.unwrap_or(serde_json::Value::Null))
    }

    /// Send a JSON-RPC notification (no response body expected).
    async fn notify(&mut self, method: &str) -> anyhow::Result<()> {
        let request = JsonRpcRequest::notification(method);
        let response = self.post(&request).await?;

        if !response.status().is_success() {
            anyhow::bail!("notification rejected with {}", response.status());
        }
        Ok(())
    }

    async fn post(&self, request: &JsonRpcRequest) -> anyhow::Result<reqwest::Response> {
        let mut builder = self.http.post(&self.server_url).json(request);

        if let Some(ref session_id) = self.session_id {
            builder = builder.query(&[("sessionId", session_id.as_str())]);
        }

        if let Some(ref oauth) = self.oauth {
            // Only attach a token we already hold; acquisition is driven by
            // the 401 path so unprotected servers never trigger the flow
            if oauth.has_tokens().await {
                let token = oauth.access_token().await?;
                builder = builder.bearer_auth(token);
            }
        }

        builder.send().await.context("sending request to MCP server")
    }
}

impl std::fmt::Debug for InteractiveClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InteractiveClient")
            .field("server_url", &self.server_url)
            .field("initialized", &self.initialized)
            .finish()
    }
}
