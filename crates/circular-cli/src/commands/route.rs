//! `circular route`: ask the node for a route without paying it.

use clap::Args;
use serde::{Deserialize, Serialize};

use circular_core::NodeId;

use super::DEFAULT_ENDPOINT;

#[derive(Args, Debug)]
pub struct RouteArgs {
    /// Destination node id.
    #[arg(short, long)]
    pub to: String,

    /// Amount to deliver, in millisatoshi.
    #[arg(short, long)]
    pub amount: u64,

    /// Source node id (defaults to the node itself).
    #[arg(short, long)]
    pub from: Option<String>,

    /// Maximum number of hops (0 for no limit).
    #[arg(long)]
    pub max_hops: Option<usize>,

    /// Print the raw route JSON.
    #[arg(long)]
    pub json: bool,

    /// API endpoint of the node.
    #[arg(short, long, default_value = DEFAULT_ENDPOINT)]
    pub endpoint: String,
}

#[derive(Serialize)]
struct RouteRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    from: Option<NodeId>,
    to: NodeId,
    amount: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_hops: Option<usize>,
}

#[derive(Deserialize)]
struct RouteResponse {
    summary: String,
    fee: u64,
    fee_ppm: u64,
    total_delay: u32,
    route: serde_json::Value,
}

pub async fn run(args: &RouteArgs) -> anyhow::Result<()> {
    let url = format!("{}/api/v1/route", args.endpoint);
    let body = RouteRequest {
        from: args.from.clone().map(NodeId::from),
        to: NodeId::from(args.to.clone()),
        amount: args.amount,
        max_hops: args.max_hops,
    };
    tracing::debug!(%url, "POST");

    let client = reqwest::Client::new();
    let resp = client.post(&url).json(&body).send().await;

    match resp {
        Ok(r) if r.status().is_success() => {
            let data: RouteResponse = r.json().await?;
            println!("{}", data.summary);
            println!("  Fee:    {} msat ({} ppm)", data.fee, data.fee_ppm);
            println!("  Delay:  {} blocks", data.total_delay);
            if args.json {
                println!("{}", serde_json::to_string_pretty(&data.route)?);
            }
        }
        Ok(r) => return Err(super::fail("route", r).await),
        Err(e) => super::unreachable(&args.endpoint, &e),
    }

    Ok(())
}
