//! Interactive MCP Client - Entry Point
//!
//! REPL client with lazy OAuth: authentication only happens the first time a
//! tool is actually used against a protected server.

use clap::Parser;

use sms_research_mcp::console::{ConsoleOptions, InteractiveClient};
use sms_research_mcp::init_tracing;

#[derive(Parser, Debug)]
#[command(name = "sms-research-client")]
#[command(about = "Interactive MCP client with lazy OAuth authentication")]
#[command(version)]
struct Cli {
    /// MCP endpoint URL
    #[arg(long, default_value = "http://localhost:8080/mcp", env = "MCP_SERVER_URL")]
    server_url: String,

    /// Port for the loopback OAuth callback listener
    #[arg(long, default_value = "3030")]
    callback_port: u16,

    /// Disable OAuth (for talking to an unprotected server)
    #[arg(long)]
    no_oauth: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "warn", env = "RUST_LOG")]
    log_level: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    let cli = Cli::parse();

    init_tracing(&cli.log_level, false);

    println!("SMS & Research MCP Client");

    let mut client = InteractiveClient::new(ConsoleOptions {
        server_url: cli.server_url,
        callback_port: cli.callback_port,
        use_oauth: !cli.no_oauth,
    })?;

    client.run().await
}
