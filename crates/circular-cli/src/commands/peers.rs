//! `circular peers`: list the node's peers.

use clap::Args;
use serde::Deserialize;

use super::DEFAULT_ENDPOINT;

#[derive(Args, Debug)]
pub struct PeersArgs {
    /// API endpoint of the node.
    #[arg(short, long, default_value = DEFAULT_ENDPOINT)]
    pub endpoint: String,
}

#[derive(Deserialize)]
struct PeerInfo {
    id: String,
    alias: String,
    connected: bool,
    num_channels: u32,
}

#[derive(Deserialize)]
struct PeersResponse {
    peers: Vec<PeerInfo>,
    count: usize,
}

pub async fn run(args: &PeersArgs) -> anyhow::Result<()> {
    let url = format!("{}/api/v1/peers", args.endpoint);
    tracing::debug!(%url, "GET");
    let resp = reqwest::get(&url).await;

    match resp {
        Ok(r) if r.status().is_success() => {
            let data: PeersResponse = r.json().await?;
            println!("Peers ({}):", data.count);
            if data.peers.is_empty() {
                println!("  (none)");
            }
            for peer in &data.peers {
                let state = if peer.connected { "connected" } else { "disconnected" };
                println!(
                    "  {} {:<24} {:<12} channels={}",
                    peer.id, peer.alias, state, peer.num_channels
                );
            }
        }
        Ok(r) => return Err(super::fail("peers", r).await),
        Err(e) => super::unreachable(&args.endpoint, &e),
    }

    Ok(())
}
