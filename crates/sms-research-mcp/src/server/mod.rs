//! MCP server implementation.
//!
//! Provides both stdio (for local MCP hosts) and HTTP transports.
//!
//! ## Never-Failing Architecture
//!
//! The HTTP transport implements a robust "mailbox" pattern:
//! - Session-based message buffering with ring buffer
//! - Last-Event-ID support for reconnection recovery
//! - Broadcast channels for live event delivery
//! - Background cleanup of stale sessions
//!
//! The HTTP transport can additionally run behind OAuth bearer protection,
//! validating tokens against an external authorization server.

pub mod auth;
pub mod session;
pub mod stdio;
pub mod transport;

use std::net::SocketAddr;
use std::sync::Arc;

use crate::client::{TavilyClient, TextBeltClient};
use crate::resources::{self, McpResource};
use crate::tools::{self, McpTool, ToolContext};

pub use auth::{HttpAuth, IntrospectionTokenVerifier, TokenVerifier};

/// MCP server for SMS delivery and web research.
pub struct McpServer {
    /// Tool execution context.
    ctx: ToolContext,

    /// Registered tools.
    tools: Vec<Box<dyn McpTool>>,

    /// Registered resources.
    resources: Vec<Box<dyn McpResource>>,

    /// Bearer auth for the HTTP transport, when protection is enabled.
    http_auth: Option<HttpAuth>,
}

impl McpServer {
    /// Create a new MCP server.
    #[must_use]
    pub fn new(search: TavilyClient, sms: TextBeltClient) -> Self {
        let ctx = ToolContext::new(Arc::new(search), Arc::new(sms));
        let tools = tools::register_all_tools();
        let resources = resources::register_all_resources();

        Self { ctx, tools, resources, http_auth: None }
    }

    /// Enable OAuth bearer protection on the HTTP transport.
    #[must_use]
    pub fn with_auth(mut self, http_auth: HttpAuth) -> Self {
        self.ctx.auth_enabled = true;
        self.ctx.auth_server_url = Some(http_auth.auth_server_url.clone());
        self.http_auth = Some(http_auth);
        self
    }

    /// Run the server in stdio mode.
    ///
    /// # Errors
    ///
    /// Returns error on I/O failure.
    pub async fn run_stdio(self) -> anyhow::Result<()> {
        tracing::info!("Starting MCP server in stdio mode");
        tracing::info!(tools = self.tools.len(), resources = self.resources.len(), "Registered");

        stdio::run_stdio(self.tools, self.resources, self.ctx).await
    }

    /// Run the server in HTTP mode.
    ///
    /// # Errors
    ///
    /// Returns error on server failure.
    pub async fn run_http(
        self,
        addr: SocketAddr,
        base_url: Option<String>,
    ) -> anyhow::Result<()> {
        tracing::info!(%addr, "Starting MCP server in HTTP mode");
        tracing::info!(tools = self.tools.len(), resources = self.resources.len(), "Registered");

        if let Some(ref http_auth) = self.http_auth {
            tracing::info!(
                auth_server = %http_auth.auth_server_url,
                required_scope = %http_auth.required_scope,
                "OAuth protection enabled"
            );
        }

        let base_url = base_url.unwrap_or_else(|| format!("http://{addr}"));
        let router =
            transport::create_router(self.tools, self.resources, self.ctx, base_url, self.http_auth);

        tracing::info!("HTTP server listening on http://{}", addr);

        let listener = tokio::net::TcpListener::bind(addr).await?;
        axum::serve(listener, router).with_graceful_shutdown(shutdown_signal()).await?;

        tracing::info!("HTTP server shut down");
        Ok(())
    }

    /// Get tool by name.
    #[must_use]
    pub fn get_tool(&self, name: &str) -> Option<&dyn McpTool> {
        self.tools.iter().find(|t| t.name() == name).map(|t| t.as_ref())
    }

    /// List all available tools.
    #[must_use]
    pub fn list_tools(&self) -> Vec<(&str, &str)> {
        self.tools.iter().map(|t| (t.name(), t.description())).collect()
    }

    /// Get tool context for execution.
    #[must_use]
    pub const fn context(&self) -> &ToolContext {
        &self.ctx
    }
}

impl std::fmt::Debug for McpServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("McpServer")
            .field("tools", &self.tools.len())
            .field("resources", &self.resources.len())
            .field("protected", &self.http_auth.is_some())
            .finish()
    }
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c().await.expect("Failed to install CTRL+C handler");
    tracing::info!("Received shutdown signal");
}
