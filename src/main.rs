//! MCP server for Valkey.
//!
//! Run with `valkey-mcp --url valkey://localhost:6379`. Logs go to stderr;
//! stdout carries the protocol.

use std::sync::Arc;

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use valkey_mcp::config::DEFAULT_URL;
use valkey_mcp::{
    tools, ConnectionConfig, DbIndex, McpServer, RedisClient, SharedClient, ToolRegistry,
    ValkeyUrl,
};

/// MCP server for Valkey.
///
/// Exposes Valkey commands as MCP tools for AI agents.
/// Communicates via JSON-RPC 2.0 over stdin/stdout.
#[derive(Parser)]
#[command(name = "valkey-mcp")]
#[command(version, about, long_about = None)]
struct Args {
    /// Server URL (valkey://, redis://, valkeys:// or rediss://).
    #[arg(long, env = "VALKEY_URL", default_value = DEFAULT_URL)]
    url: String,

    /// Password, overriding any in the URL.
    #[arg(long, env = "VALKEY_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// Logical database index (0-15).
    #[arg(long, env = "VALKEY_DB", default_value_t = 0, allow_negative_numbers = true)]
    db: i64,

    /// Enable debug logging to stderr.
    #[arg(long, short)]
    verbose: bool,
}

impl Args {
    fn connection_config(&self) -> valkey_mcp::Result<ConnectionConfig> {
        Ok(ConnectionConfig {
            url: ValkeyUrl::parse(&self.url)?,
            password: self.password.clone(),
            db: DbIndex::new(self.db)?,
        })
    }
}

fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("valkey_mcp={}", level)));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    init_logging(args.verbose);

    let config = match args.connection_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };
    let url = match config.connection_url() {
        Ok(url) => url,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    let client: SharedClient = match RedisClient::connect(&url).await {
        Ok(client) => Arc::new(client),
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };
    info!(host = config.url.host(), db = config.db.get(), "connected to valkey");

    let mut registry = ToolRegistry::new();
    tools::register_all(&mut registry, &client);

    let mut server = McpServer::new();
    if let Err(e) = registry.register_with_server(&mut server) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
    info!(tools = registry.count(), "serving MCP over stdio");

    if let Err(e) = server.run().await {
        eprintln!("Error: Server error: {}", e);
        std::process::exit(1);
    }
}
