//! Integration test: refresh a node from the Lightning listings, then route
//! and rebalance through it.

use circular_core::NodeId;
use circular_integration_tests::{refreshed_node, scid, temp_config, triangle, PaymentBehavior};
use circular_rebalance::{RebalanceError, RebalanceRequest};
use circular_routing::PrettyRoute;

fn request(out: u32, inc: u32, max_ppm: u64) -> RebalanceRequest {
    RebalanceRequest {
        out_scid: scid(out),
        in_scid: scid(inc),
        amount: 100_000_000,
        max_ppm,
        initial_max_hops: 1,
    }
}

#[tokio::test]
async fn test_circular_rebalance_settles() {
    let network = triangle();
    let (config, dir) = temp_config();
    let node = refreshed_node(network.clone(), config).await;

    let outcome = node.rebalance(&request(1, 3, 1_000)).await.unwrap();
    let route = &outcome.route;
    assert_eq!(route.source, NodeId::from("S"));
    assert_eq!(route.destination, NodeId::from("S"));
    assert_eq!(route.hop_count(), 3);
    assert!(route.is_contiguous());

    let amounts: Vec<u64> = route.hops().iter().map(|h| h.amount).collect();
    assert_eq!(amounts, vec![100_022_001, 100_011_000, 100_000_000]);
    assert_eq!(route.fee(), 22_001);
    assert_eq!(route.fee_ppm(), 220);
    assert_eq!(outcome.attempts, 1);

    // The network saw exactly the route we were handed back.
    assert_eq!(network.payment_count(), 1);
    assert_eq!(&network.payments.lock()[0], route);

    let pretty = PrettyRoute::new(route, |n| node.graph().alias(n)).simple();
    assert!(pretty.contains("xavier"));
    assert!(pretty.contains("yolanda"));
    std::fs::remove_dir_all(&dir).ok();
}

#[tokio::test]
async fn test_expensive_route_is_refused_without_paying() {
    let network = triangle();
    let (config, dir) = temp_config();
    let node = refreshed_node(network.clone(), config).await;

    let err = node.rebalance(&request(1, 3, 100)).await.unwrap_err();
    assert!(matches!(
        err,
        RebalanceError::RouteTooExpensive {
            fee_ppm: 220,
            max_ppm: 100
        }
    ));
    assert_eq!(network.payment_count(), 0);
    std::fs::remove_dir_all(&dir).ok();
}

#[tokio::test]
async fn test_payment_failures_surface_as_rebalance_errors() {
    let network = triangle();
    let (config, dir) = temp_config();
    let node = refreshed_node(network.clone(), config).await;

    network.set_behavior(PaymentBehavior::Timeout);
    assert!(matches!(
        node.rebalance(&request(1, 3, 1_000)).await,
        Err(RebalanceError::PaymentTimeout)
    ));

    network.set_behavior(PaymentBehavior::Fail);
    assert!(matches!(
        node.rebalance(&request(1, 3, 1_000)).await,
        Err(RebalanceError::TemporaryFailure)
    ));
    assert_eq!(network.payment_count(), 2);
    std::fs::remove_dir_all(&dir).ok();
}

#[tokio::test]
async fn test_longer_cycle_needs_hop_widening() {
    // S -1- A -2- B -3- C -4- S: the interior route A -> C takes two hops.
    let network = circular_integration_tests::MockNetwork::new("S");
    network.add_channel(1, "S", "A", 10);
    network.add_channel(2, "A", "B", 10);
    network.add_channel(3, "B", "C", 10);
    network.add_channel(4, "C", "S", 10);
    let network = std::sync::Arc::new(network);
    let (config, dir) = temp_config();
    let node = refreshed_node(network.clone(), config).await;

    let outcome = node.rebalance(&request(1, 4, 1_000)).await.unwrap();
    assert_eq!(outcome.route.hop_count(), 4);
    assert_eq!(outcome.attempts, 2);
    std::fs::remove_dir_all(&dir).ok();
}

#[tokio::test]
async fn test_closed_channel_disappears_from_routing() {
    let network = triangle();
    let (config, dir) = temp_config();
    let node = refreshed_node(network.clone(), config).await;
    assert!(node.route(None, &NodeId::from("Y"), 10_000, Some(1)).is_ok());

    network.close_channel(3);
    node.refresh_graph().await.unwrap();

    // Only the long way round is left.
    let route = node.route(None, &NodeId::from("Y"), 10_000, None).unwrap();
    assert_eq!(route.hop_count(), 2);
    assert!(matches!(
        node.rebalance(&request(1, 3, 1_000)).await,
        Err(RebalanceError::UnknownChannel(_))
    ));
    std::fs::remove_dir_all(&dir).ok();
}
