//! sourcify-mcp: MCP server for the Sourcify verification API.
//!
//! Speaks JSON-RPC over stdio by default, or over HTTP on `HOST:PORT` when
//! started with `http` (or `MCP_TRANSPORT=http`). Logs go to stderr.

use clap::Parser;
use sourcify_mcp::{transport, SourcifyConfig, TransportMode};
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "sourcify-mcp", version, about = "MCP server for the Sourcify verification API")]
struct Cli {
    /// Transport binding (`stdio` or `http`). Takes precedence over MCP_TRANSPORT.
    transport: Option<TransportMode>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    // stdout is reserved for JSON-RPC in stdio mode
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("sourcify_mcp=info")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let cli = Cli::parse();

    let mut config = match SourcifyConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("Invalid configuration: {e}");
            return ExitCode::FAILURE;
        }
    };
    if let Some(mode) = cli.transport {
        config.transport = mode;
    }

    info!(
        "{} v{} starting ({} transport)",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION"),
        config.transport
    );

    match transport::serve(&config).await {
        Ok(()) => {
            info!("Shutting down.");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("Fatal error: {e}");
            ExitCode::FAILURE
        }
    }
}
