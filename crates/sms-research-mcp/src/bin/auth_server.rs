//! Standalone OAuth 2.0 Authorization Server - Entry Point
//!
//! Issues tokens for the SMS & Research MCP server. The resource server
//! validates them via this server's `/introspect` endpoint.

use clap::Parser;

use sms_research_mcp::config::AuthServerConfig;
use sms_research_mcp::{auth_server, init_tracing};

#[derive(Parser, Debug)]
#[command(name = "sms-research-auth")]
#[command(about = "OAuth 2.0 authorization server for the SMS & Research MCP server")]
#[command(version)]
struct Cli {
    /// Host to bind to
    #[arg(long, default_value = "localhost")]
    host: String,

    /// Port to listen on
    #[arg(long, default_value = "9000")]
    port: u16,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", env = "RUST_LOG")]
    log_level: String,

    /// Output logs as JSON
    #[arg(long)]
    json_logs: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    let cli = Cli::parse();

    init_tracing(&cli.log_level, cli.json_logs);

    let config = AuthServerConfig::new(&cli.host, cli.port);

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        issuer = %config.issuer_url,
        "Starting authorization server"
    );

    auth_server::run(config).await
}
