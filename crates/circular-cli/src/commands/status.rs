//! `circular status`: query the status of a running node.

use clap::Args;
use serde::Deserialize;

use super::DEFAULT_ENDPOINT;

#[derive(Args, Debug)]
pub struct StatusArgs {
    /// API endpoint of the node.
    #[arg(short, long, default_value = DEFAULT_ENDPOINT)]
    pub endpoint: String,
}

#[derive(Deserialize)]
struct GraphStats {
    nodes: usize,
    channels: usize,
    total_capacity: u64,
}

#[derive(Deserialize)]
struct StatusResponse {
    version: String,
    node_id: String,
    alias: Option<String>,
    uptime_secs: u64,
    graph: GraphStats,
    peers: usize,
    connected_peers: usize,
}

pub async fn run(args: &StatusArgs) -> anyhow::Result<()> {
    let url = format!("{}/api/v1/status", args.endpoint);
    tracing::debug!(%url, "GET");
    let resp = reqwest::get(&url).await;

    match resp {
        Ok(r) if r.status().is_success() => {
            let status: StatusResponse = r.json().await?;
            println!("Node Status:");
            println!("  Version:    {}", status.version);
            println!("  Node ID:    {}", status.node_id);
            println!("  Alias:      {}", status.alias.as_deref().unwrap_or("(none)"));
            println!("  Uptime:     {}s", status.uptime_secs);
            println!(
                "  Peers:      {} ({} connected)",
                status.peers, status.connected_peers
            );
            println!(
                "  Graph:      {} nodes, {} channels, {} sat capacity",
                status.graph.nodes,
                status.graph.channels,
                status.graph.total_capacity / 1000
            );
        }
        Ok(r) => return Err(super::fail("status", r).await),
        Err(e) => super::unreachable(&args.endpoint, &e),
    }

    Ok(())
}
