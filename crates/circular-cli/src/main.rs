//! Circular CLI: command-line interface for a running Circular node.
//!
//! Subcommands: init, status, peers, route, rebalance.

mod commands;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

/// Circular: circular rebalancing for Lightning nodes.
#[derive(Parser, Debug)]
#[command(name = "circular", version, about, long_about = None)]
struct Cli {
    /// Log HTTP traffic to stderr.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Write a default node configuration.
    Init(commands::init::InitArgs),
    /// Query the status of a running node.
    Status(commands::status::StatusArgs),
    /// List the node's peers.
    Peers(commands::peers::PeersArgs),
    /// Find a route without paying it.
    Route(commands::route::RouteArgs),
    /// Move liquidity from one of our channels to another.
    Rebalance(commands::rebalance::RebalanceArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .with_writer(std::io::stderr)
        .init();

    match &cli.command {
        Commands::Init(args) => commands::init::run(args),
        Commands::Status(args) => commands::status::run(args).await,
        Commands::Peers(args) => commands::peers::run(args).await,
        Commands::Route(args) => commands::route::run(args).await,
        Commands::Rebalance(args) => commands::rebalance::run(args).await,
    }
}
