//! Circular node: entry point.
//!
//! Starts the daemon with configuration from a TOML file or defaults.

use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use circular_node::{start_api_server, CircularConfig, CircularNode, ClnRpcClient};

/// Circular rebalancing daemon
#[derive(Parser, Debug)]
#[command(name = "circular-node", version, about = "Circular rebalancing daemon")]
struct Args {
    /// Path to the configuration file (TOML).
    #[arg(short, long, default_value = "circular.toml")]
    config: PathBuf,

    /// Override the Core Lightning RPC socket path.
    #[arg(long)]
    rpc_path: Option<PathBuf>,

    /// Override the API port.
    #[arg(long)]
    api_port: Option<u16>,

    /// Override the data directory.
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Override the log level (trace, debug, info, warn, error).
    #[arg(long)]
    log_level: Option<String>,

    /// Generate a default config file and exit.
    #[arg(long)]
    init: bool,
}

fn init_tracing(level: &str, format: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    if format == "json" {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    if args.init {
        init_tracing(args.log_level.as_deref().unwrap_or("info"), "text");
        let config = CircularConfig::default();
        config.save(&args.config)?;
        tracing::info!(path = %args.config.display(), "wrote default config");
        return Ok(());
    }

    let mut config = CircularConfig::load(&args.config)?;

    // Apply CLI overrides
    if let Some(rpc_path) = args.rpc_path {
        config.lightning.rpc_path = rpc_path;
    }
    if let Some(api_port) = args.api_port {
        config.api.port = api_port;
    }
    if let Some(data_dir) = args.data_dir {
        config.storage.data_dir = data_dir;
    }
    if let Some(level) = args.log_level {
        config.logging.level = level;
    }

    init_tracing(&config.logging.level, &config.logging.format);
    tracing::info!("Circular node v{}", env!("CARGO_PKG_VERSION"));

    let api_addr: SocketAddr = config.api_addr().parse()?;
    let client = Arc::new(ClnRpcClient::new(config.lightning.rpc_path.clone()));
    let node = Arc::new(CircularNode::new(config, client).await?);
    let mut tasks = node.start().await;

    let api_node = Arc::clone(&node);
    tasks.push(tokio::spawn(async move {
        if let Err(e) = start_api_server(api_addr, api_node).await {
            tracing::error!(error = %e, "API server error");
        }
    }));

    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("received shutdown signal"),
        Err(e) => tracing::error!(error = %e, "failed to listen for ctrl-c"),
    }

    for task in &tasks {
        task.abort();
    }
    node.shutdown()?;
    tracing::info!("Circular node exited cleanly");
    Ok(())
}
