//! `circular rebalance`: push liquidity out of one channel and back in
//! through another.

use clap::Args;
use serde::{Deserialize, Serialize};

use circular_core::ShortChannelId;

use super::DEFAULT_ENDPOINT;

#[derive(Args, Debug)]
pub struct RebalanceArgs {
    /// Channel to push liquidity out of.
    #[arg(long = "out")]
    pub out_scid: ShortChannelId,

    /// Channel to bring liquidity back in through.
    #[arg(long = "in")]
    pub in_scid: ShortChannelId,

    /// Amount to move, in millisatoshi.
    #[arg(short, long)]
    pub amount: u64,

    /// Maximum fee in parts per million (node default if omitted).
    #[arg(long)]
    pub max_ppm: Option<u64>,

    /// Hop limit of the first search (node default if omitted).
    #[arg(long, visible_alias = "max-hops")]
    pub initial_max_hops: Option<usize>,

    /// API endpoint of the node.
    #[arg(short, long, default_value = DEFAULT_ENDPOINT)]
    pub endpoint: String,
}

#[derive(Serialize)]
struct RebalanceRequest {
    out_scid: ShortChannelId,
    in_scid: ShortChannelId,
    amount: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_ppm: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    initial_max_hops: Option<usize>,
}

#[derive(Deserialize)]
struct RebalanceResponse {
    summary: String,
    fee: u64,
    fee_ppm: u64,
    attempts: usize,
    preimage: String,
}

pub async fn run(args: &RebalanceArgs) -> anyhow::Result<()> {
    let url = format!("{}/api/v1/rebalance", args.endpoint);
    let body = RebalanceRequest {
        out_scid: args.out_scid.clone(),
        in_scid: args.in_scid.clone(),
        amount: args.amount,
        max_ppm: args.max_ppm,
        initial_max_hops: args.initial_max_hops,
    };
    tracing::debug!(%url, out = %args.out_scid, inbound = %args.in_scid, "POST");
    println!(
        "Rebalancing {} msat from {} to {}...",
        args.amount, args.out_scid, args.in_scid
    );

    let client = reqwest::Client::new();
    let resp = client.post(&url).json(&body).send().await;

    match resp {
        Ok(r) if r.status().is_success() => {
            let data: RebalanceResponse = r.json().await?;
            println!("Rebalance succeeded!");
            println!("  Route:     {}", data.summary);
            println!("  Fee:       {} msat ({} ppm)", data.fee, data.fee_ppm);
            println!("  Attempts:  {}", data.attempts);
            println!("  Preimage:  {}", data.preimage);
        }
        Ok(r) => return Err(super::fail("rebalance", r).await),
        Err(e) => super::unreachable(&args.endpoint, &e),
    }

    Ok(())
}
