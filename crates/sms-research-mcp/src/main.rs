//! SMS & Research MCP Server - Entry Point
//!
//! Runs unprotected by default; pass `--auth-server` to require OAuth bearer
//! tokens on the HTTP transport.

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;

use sms_research_mcp::config::{Config, auth};
use sms_research_mcp::server::{HttpAuth, IntrospectionTokenVerifier, McpServer};
use sms_research_mcp::{TavilyClient, TextBeltClient, init_tracing};

#[derive(Parser, Debug)]
#[command(name = "sms-research-mcp")]
#[command(about = "MCP server for SMS delivery and web research")]
#[command(version)]
struct Cli {
    /// Tavily API key (required; enables the web_search tool)
    #[arg(long, env = "TV_API_KEY", hide_env_values = true)]
    tavily_api_key: Option<String>,

    /// TextBelt API key (defaults to the shared free-tier key)
    #[arg(long, env = "TEXTBELT_API_KEY", hide_env_values = true)]
    textbelt_key: Option<String>,

    /// Transport mode: stdio or http
    #[arg(long, default_value = "http")]
    transport: Transport,

    /// Host to bind to (only used with --transport http)
    #[arg(long, default_value = "0.0.0.0")]
    host: String,

    /// HTTP server port (only used with --transport http)
    #[arg(long, default_value = "8080", env = "PORT")]
    port: u16,

    /// Base URL for endpoint announcements and discovery metadata
    #[arg(long, env = "BASE_URL")]
    base_url: Option<String>,

    /// Authorization server URL; enables OAuth bearer protection
    #[arg(long, env = "MCP_AUTH_SERVER")]
    auth_server: Option<String>,

    /// Enable strict RFC 8707 resource (audience) validation
    #[arg(long)]
    oauth_strict: bool,

    /// OAuth scope required on access tokens
    #[arg(long, default_value = auth::DEFAULT_SCOPE)]
    required_scope: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", env = "RUST_LOG")]
    log_level: String,

    /// Output logs as JSON
    #[arg(long)]
    json_logs: bool,
}

#[derive(Debug, Clone, Copy, Default, clap::ValueEnum)]
enum Transport {
    /// Standard input/output (for local MCP hosts)
    Stdio,
    /// Streamable HTTP with Server-Sent Events
    #[default]
    Http,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    let cli = Cli::parse();

    init_tracing(&cli.log_level, cli.json_logs);

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        transport = ?cli.transport,
        "Starting SMS & Research MCP server"
    );

    let config = Config::new(cli.tavily_api_key, cli.textbelt_key);
    if !config.has_tavily_key() {
        anyhow::bail!("TV_API_KEY env is not set (required for the web_search tool)");
    }

    let search = TavilyClient::new(&config)?;
    let sms = TextBeltClient::new(&config)?;
    let mut server = McpServer::new(search, sms);

    let base_url =
        cli.base_url.clone().unwrap_or_else(|| format!("http://{}:{}", cli.host, cli.port));

    if let Some(ref auth_server_url) = cli.auth_server {
        let verifier = IntrospectionTokenVerifier::new(
            auth_server_url,
            &base_url,
            &cli.required_scope,
            cli.oauth_strict,
        )?;

        server = server.with_auth(HttpAuth {
            verifier: Arc::new(verifier),
            auth_server_url: auth_server_url.clone(),
            required_scope: cli.required_scope.clone(),
        });
    }

    match cli.transport {
        Transport::Stdio => {
            tracing::info!("Running in stdio mode");
            server.run_stdio().await?;
        }
        Transport::Http => {
            let addr = tokio::net::lookup_host(format!("{}:{}", cli.host, cli.port))
                .await?
                .next()
                .context("could not resolve bind address")?;

            tracing::info!(%addr, base_url = %base_url, "Running in HTTP mode");
            server.run_http(addr, Some(base_url)).await?;
        }
    }

    Ok(())
}
