//! Integration test: the graph survives a node restart through its JSON
//! snapshot, and a failing Lightning node never clobbers it.

use circular_core::NodeId;
use circular_integration_tests::{refreshed_node, temp_config, triangle};
use circular_node::{CircularNode, GraphStore, NodeError};

#[tokio::test]
async fn test_restart_restores_graph_and_aliases() {
    let network = triangle();
    let (config, dir) = temp_config();
    let node = refreshed_node(network.clone(), config.clone()).await;
    let before = node.graph().snapshot();
    node.shutdown().unwrap();

    let snapshot = GraphStore::new(config.graph_path()).load().unwrap();
    assert_eq!(snapshot, before);
    assert_eq!(snapshot.channels.len(), 6);

    // No refresh yet: everything comes from disk.
    network.set_offline(true);
    let restarted = CircularNode::new(config, network).await.unwrap();
    assert_eq!(restarted.graph().snapshot(), before);
    assert_eq!(restarted.graph().alias(&NodeId::from("X")), "xavier");
    assert!(restarted
        .route(None, &NodeId::from("Y"), 10_000, None)
        .is_ok());
    std::fs::remove_dir_all(&dir).ok();
}

#[tokio::test]
async fn test_offline_lightning_node_keeps_last_graph() {
    let network = triangle();
    let (config, dir) = temp_config();
    let node = refreshed_node(network.clone(), config.clone()).await;
    let before = node.graph().snapshot();

    network.set_offline(true);
    assert!(matches!(
        node.refresh_graph().await,
        Err(NodeError::ListingRetrieval(_))
    ));
    assert!(node.refresh_peers().await.is_err());
    assert_eq!(node.graph().snapshot(), before);
    assert_eq!(node.peers().len(), 2);
    assert_eq!(
        GraphStore::new(config.graph_path()).load(),
        Some(before)
    );
    std::fs::remove_dir_all(&dir).ok();
}

#[tokio::test]
async fn test_corrupt_snapshot_starts_empty() {
    let network = triangle();
    let (config, dir) = temp_config();
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(config.graph_path(), b"not json").unwrap();

    let node = CircularNode::new(config, network).await.unwrap();
    assert_eq!(node.status().graph.channels, 0);
    node.refresh_graph().await.unwrap();
    assert_eq!(node.status().graph.channels, 6);
    std::fs::remove_dir_all(&dir).ok();
}
