//! Integration test: the HTTP API served over a real socket.

use std::net::SocketAddr;
use std::sync::Arc;

use serde_json::{json, Value};

use circular_integration_tests::{refreshed_node, temp_config, triangle};
use circular_node::{build_router, CircularNode};

async fn serve(node: Arc<CircularNode>) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, build_router(node)).await.unwrap();
    });
    addr
}

#[tokio::test]
async fn test_status_and_peers() {
    let (config, dir) = temp_config();
    let node = refreshed_node(triangle(), config).await;
    let addr = serve(node).await;

    let status: Value = reqwest::get(format!("http://{}/api/v1/status", addr))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(status["node_id"], "S");
    assert_eq!(status["graph"]["channels"], 6);
    assert_eq!(status["peers"], 2);
    assert!(status["version"].is_string());

    let peers: Value = reqwest::get(format!("http://{}/api/v1/peers", addr))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(peers["count"], 2);
    assert_eq!(peers["peers"][0]["id"], "X");
    assert_eq!(peers["peers"][0]["alias"], "xavier");
    std::fs::remove_dir_all(&dir).ok();
}

#[tokio::test]
async fn test_route_endpoint() {
    let (config, dir) = temp_config();
    let node = refreshed_node(triangle(), config).await;
    let addr = serve(node).await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("http://{}/api/v1/route", addr))
        .json(&json!({ "to": "Y", "amount": 10_000, "max_hops": 1 }))
        .send()
        .await
        .unwrap();
    assert!(resp.status().is_success());
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["route"]["hops"].as_array().unwrap().len(), 1);
    // The payer's own channel carries no fee.
    assert_eq!(body["fee"], 0);

    let resp = client
        .post(format!("http://{}/api/v1/route", addr))
        .json(&json!({ "to": "nobody", "amount": 10_000 }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), reqwest::StatusCode::UNPROCESSABLE_ENTITY);
    let body: Value = resp.json().await.unwrap();
    assert!(body["error"].as_str().unwrap().contains("no route"));
    std::fs::remove_dir_all(&dir).ok();
}

#[tokio::test]
async fn test_rebalance_endpoint() {
    let network = triangle();
    let (config, dir) = temp_config();
    let node = refreshed_node(network.clone(), config).await;
    let addr = serve(node).await;
    let client = reqwest::Client::new();
    let url = format!("http://{}/api/v1/rebalance", addr);

    let resp = client
        .post(&url)
        .json(&json!({
            "out_scid": "1x0x0",
            "in_scid": "3x0x0",
            "amount": 100_000_000,
            "initial_max_hops": 1
        }))
        .send()
        .await
        .unwrap();
    assert!(resp.status().is_success());
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["fee"], 22_001);
    assert_eq!(body["fee_ppm"], 220);
    assert_eq!(body["attempts"], 1);
    assert_eq!(body["preimage"].as_str().unwrap().len(), 64);

    let resp = client
        .post(&url)
        .json(&json!({
            "out_scid": "1x0x0",
            "in_scid": "3x0x0",
            "amount": 100_000_000,
            "max_ppm": 100
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), reqwest::StatusCode::UNPROCESSABLE_ENTITY);

    let resp = client
        .post(&url)
        .json(&json!({ "out_scid": "1x0x0", "in_scid": "9x0x0", "amount": 1_000 }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), reqwest::StatusCode::NOT_FOUND);
    assert_eq!(network.payment_count(), 1);
    std::fs::remove_dir_all(&dir).ok();
}
