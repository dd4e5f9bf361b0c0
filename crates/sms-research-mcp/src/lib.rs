//! SMS & Research MCP Server
//!
//! A Model Context Protocol (MCP) server exposing SMS delivery (TextBelt)
//! and web research (Tavily) tools, with an OAuth 2.0 protected mode.
//!
//! # Components
//!
//! - **Resource server**: MCP over stdio or streamable HTTP; optionally
//!   protected by bearer tokens validated via RFC 7662 introspection
//! - **Authorization server**: standalone OAuth 2.0 server with dynamic
//!   client registration, PKCE, a demo login page, and introspection
//! - **Interactive client**: REPL MCP client with lazy OAuth - the browser
//!   flow only runs the first time a tool is used
//!
//! # Example
//!
//! ```no_run
//! use sms_research_mcp::client::{TavilyClient, TextBeltClient};
//! use sms_research_mcp::config::Config;
//! use sms_research_mcp::server::McpServer;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::from_env()?;
//!     let server = McpServer::new(TavilyClient::new(&config)?, TextBeltClient::new(&config)?);
//!
//!     server.run_http(([0, 0, 0, 0], 8080).into(), None).await
//! }
//! ```

pub mod auth_server;
pub mod client;
pub mod config;
pub mod console;
pub mod error;
pub mod models;
pub mod oauth;
pub mod pkce;
pub mod protocol;
pub mod resources;
pub mod server;
pub mod tools;

pub use client::{TavilyClient, TextBeltClient};
pub use config::{AuthServerConfig, Config};
pub use error::{AuthError, ClientError, ToolError};
pub use server::McpServer;

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize tracing for a binary.
///
/// `RUST_LOG` overrides `log_level` when set.
pub fn init_tracing(log_level: &str, json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    let subscriber = tracing_subscriber::registry().with(filter);

    if json {
        subscriber.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        subscriber.with(tracing_subscriber::fmt::layer().compact()).init();
    }
}
