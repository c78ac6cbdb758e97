pub mod init;
pub mod peers;
pub mod rebalance;
pub mod route;
pub mod status;

use serde::Deserialize;

pub const DEFAULT_ENDPOINT: &str = "http://127.0.0.1:9101";

#[derive(Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Turn a non-success response into an error carrying the node's message.
pub async fn fail(what: &str, resp: reqwest::Response) -> anyhow::Error {
    let status = resp.status();
    match resp.json::<ErrorResponse>().await {
        Ok(err) => anyhow::anyhow!("{} failed (HTTP {}): {}", what, status, err.error),
        Err(_) => anyhow::anyhow!("{} failed (HTTP {})", what, status),
    }
}

/// Printed when the node cannot be reached at all.
pub fn unreachable(endpoint: &str, e: &reqwest::Error) {
    println!("Could not reach node at {}", endpoint);
    println!("  Error: {}", e);
    println!();
    println!("Is the node running? Start it with: circular-node");
}
