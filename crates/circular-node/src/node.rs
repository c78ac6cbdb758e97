//! The Circular node orchestrator.
//!
//! Owns the shared graph, the peer table and the rebalancer, keeps them in
//! sync with the Lightning node on independent schedules, and persists the
//! graph after every refresh.

use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use circular_core::{Msat, NodeId, NodeInfo};
use circular_rebalance::{
    LightningClient, RebalanceError, RebalanceOutcome, RebalanceRequest, Rebalancer,
};
use circular_routing::{
    Graph, GraphStats, PathFinder, PathFinderConfig, RefreshSummary, Route, RoutingError,
    SharedGraph,
};

use crate::config::CircularConfig;
use crate::error::NodeError;
use crate::state::PeerTable;
use crate::storage::GraphStore;

/// Point-in-time view of the node for the status API.
#[derive(Debug, Clone, Serialize)]
pub struct NodeStatus {
    pub node_id: NodeId,
    pub alias: Option<String>,
    pub started_at: DateTime<Utc>,
    pub uptime_secs: u64,
    pub graph: GraphStats,
    pub peers: usize,
    pub connected_peers: usize,
}

pub struct CircularNode {
    config: CircularConfig,
    info: NodeInfo,
    client: Arc<dyn LightningClient>,
    graph: Arc<SharedGraph>,
    peers: PeerTable,
    store: GraphStore,
    rebalancer: Rebalancer,
    /// Held for the duration of a refresh so a kind never overlaps itself.
    graph_refresh: Mutex<()>,
    peer_refresh: Mutex<()>,
    started_at: DateTime<Utc>,
    start_instant: Instant,
}

impl CircularNode {
    /// Connect to the Lightning node and load the saved graph, if any.
    pub async fn new(
        config: CircularConfig,
        client: Arc<dyn LightningClient>,
    ) -> Result<Self, NodeError> {
        let info = client.get_info().await?;
        let store = GraphStore::new(config.graph_path());
        let graph = store.load().map(Graph::from_snapshot).unwrap_or_default();
        let graph = Arc::new(SharedGraph::new(
            graph,
            config.liquidity_aging(),
            StdRng::from_entropy(),
        ));
        let rebalancer = Rebalancer::new(
            Arc::clone(&graph),
            Arc::clone(&client),
            info.id.clone(),
            config.rebalance_config(),
        );

        tracing::info!(
            node_id = %info.id,
            alias = info.alias.as_deref().unwrap_or(""),
            blockheight = info.blockheight,
            "circular node created"
        );

        Ok(Self {
            config,
            info,
            client,
            graph,
            peers: PeerTable::new(),
            store,
            rebalancer,
            graph_refresh: Mutex::new(()),
            peer_refresh: Mutex::new(()),
            started_at: Utc::now(),
            start_instant: Instant::now(),
        })
    }

    pub fn id(&self) -> &NodeId {
        &self.info.id
    }

    pub fn info(&self) -> &NodeInfo {
        &self.info
    }

    pub fn config(&self) -> &CircularConfig {
        &self.config
    }

    pub fn graph(&self) -> &Arc<SharedGraph> {
        &self.graph
    }

    pub fn peers(&self) -> &PeerTable {
        &self.peers
    }

    /// Fetch the channel listing, refresh and prune the graph, then refresh
    /// aliases and save.
    ///
    /// Listings are fetched before any lock is taken. If the channel listing
    /// fails nothing changes; if the node listing fails the channel update
    /// stands, is saved, and only the aliases stay stale.
    pub async fn refresh_graph(&self) -> Result<RefreshSummary, NodeError> {
        let _guard = self.graph_refresh.lock().await;
        let started = Instant::now();

        let channels = self.client.list_channels().await.map_err(|e| {
            tracing::warn!(error = %e, "error listing channels");
            e
        })?;
        let summary = self.graph.apply_channel_listing(&channels);

        let nodes = match self.client.list_nodes().await {
            Ok(nodes) => nodes,
            Err(e) => {
                tracing::warn!(error = %e, "error listing nodes, aliases left as they were");
                // The channel update already stands; persist it anyway.
                self.save_graph()?;
                return Err(e.into());
            }
        };
        let aliases = self.graph.apply_node_listing(&nodes);
        tracing::debug!(aliases, "aliases refreshed");

        self.save_graph()?;
        tracing::info!(
            elapsed_ms = started.elapsed().as_millis() as u64,
            "node.refresh_graph"
        );
        Ok(summary)
    }

    /// Replace the peer table with a fresh listing. Returns the peer count.
    pub async fn refresh_peers(&self) -> Result<usize, NodeError> {
        let _guard = self.peer_refresh.lock().await;
        let started = Instant::now();
        let listing = self.client.list_peers().await.map_err(|e| {
            tracing::warn!(error = %e, "error listing peers");
            e
        })?;
        let count = listing.len();
        let dropped = self.peers.replace(listing);
        tracing::debug!(
            peers = count,
            dropped,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "node.refresh_peers"
        );
        Ok(count)
    }

    /// Persist the current graph. Failures are logged and returned; the
    /// in-memory graph stays authoritative.
    pub fn save_graph(&self) -> Result<(), NodeError> {
        self.store.save(&self.graph.snapshot()).map_err(|e| {
            tracing::warn!(error = %e, "failed to save graph");
            NodeError::from(e)
        })
    }

    pub async fn rebalance(
        &self,
        request: &RebalanceRequest,
    ) -> Result<RebalanceOutcome, RebalanceError> {
        self.rebalancer.rebalance(request).await
    }

    /// Route search without paying, from `from` (defaults to us) to `to`.
    pub fn route(
        &self,
        from: Option<&NodeId>,
        to: &NodeId,
        amount: Msat,
        max_hops: Option<usize>,
    ) -> Result<Route, RoutingError> {
        let finder = PathFinder::new(PathFinderConfig {
            max_hops: max_hops.unwrap_or(PathFinderConfig::default().max_hops),
        });
        let from = from.unwrap_or(&self.info.id);
        self.graph.get_route(&finder, from, to, amount, &HashSet::new())
    }

    pub fn status(&self) -> NodeStatus {
        NodeStatus {
            node_id: self.info.id.clone(),
            alias: self.info.alias.clone(),
            started_at: self.started_at,
            uptime_secs: self.start_instant.elapsed().as_secs(),
            graph: self.graph.stats(),
            peers: self.peers.len(),
            connected_peers: self.peers.connected_count(),
        }
    }

    pub fn print_stats(&self) {
        let status = self.status();
        tracing::info!(
            channels = status.graph.channels,
            nodes = status.graph.nodes,
            aliases = status.graph.aliases,
            total_capacity_msat = status.graph.total_capacity,
            peers = status.peers,
            connected_peers = status.connected_peers,
            uptime_secs = status.uptime_secs,
            "stats"
        );
    }

    /// Run the initial refreshes and spawn the periodic ones.
    pub async fn start(self: &Arc<Self>) -> Vec<JoinHandle<()>> {
        tracing::info!("starting circular node");
        if let Err(e) = self.refresh_graph().await {
            tracing::warn!(error = %e, "initial graph refresh failed");
        }
        if let Err(e) = self.refresh_peers().await {
            tracing::warn!(error = %e, "initial peer refresh failed");
        }

        let refresh = &self.config.refresh;
        let graph_node = Arc::clone(self);
        let peer_node = Arc::clone(self);
        let stats_node = Arc::clone(self);
        vec![
            every(Duration::from_secs(refresh.graph_interval_secs), move || {
                let node = Arc::clone(&graph_node);
                async move {
                    if let Err(e) = node.refresh_graph().await {
                        tracing::warn!(error = %e, "graph refresh failed");
                    }
                }
            }),
            every(Duration::from_secs(refresh.peer_interval_secs), move || {
                let node = Arc::clone(&peer_node);
                async move {
                    if let Err(e) = node.refresh_peers().await {
                        tracing::warn!(error = %e, "peer refresh failed");
                    }
                }
            }),
            every(Duration::from_secs(refresh.stats_interval_secs), move || {
                let node = Arc::clone(&stats_node);
                async move { node.print_stats() }
            }),
        ]
    }

    /// Save the graph one last time.
    pub fn shutdown(&self) -> Result<(), NodeError> {
        tracing::info!("shutting down circular node");
        self.save_graph()
    }
}

/// Run `job` every `period`, skipping missed ticks. The first run happens one
/// period after spawning; each run is awaited before the next tick.
fn every<F, Fut>(period: Duration, mut job: F) -> JoinHandle<()>
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    let period = period.max(Duration::from_secs(1));
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        ticker.tick().await;
        loop {
            ticker.tick().await;
            job().await;
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicBool, Ordering};

    use async_trait::async_trait;
    use circular_core::{ListedChannel, ListedNode, ListedPeer, ShortChannelId};
    use circular_rebalance::{ClientError, PaymentSecret, Preimage};

    #[derive(Default)]
    struct FakeLightning {
        channels: std::sync::Mutex<Vec<ListedChannel>>,
        fail_channels: AtomicBool,
        fail_nodes: AtomicBool,
    }

    #[async_trait]
    impl LightningClient for FakeLightning {
        async fn get_info(&self) -> Result<NodeInfo, ClientError> {
            Ok(NodeInfo {
                id: NodeId::from("S"),
                alias: Some("self".into()),
                blockheight: 1,
            })
        }

        async fn list_channels(&self) -> Result<Vec<ListedChannel>, ClientError> {
            if self.fail_channels.load(Ordering::SeqCst) {
                return Err(ClientError::Transport("socket closed".into()));
            }
            Ok(self.channels.lock().unwrap().clone())
        }

        async fn list_nodes(&self) -> Result<Vec<ListedNode>, ClientError> {
            if self.fail_nodes.load(Ordering::SeqCst) {
                return Err(ClientError::Transport("socket closed".into()));
            }
            Ok(vec![ListedNode {
                node_id: NodeId::from("X"),
                alias: Some("xavier".into()),
            }])
        }

        async fn list_peers(&self) -> Result<Vec<ListedPeer>, ClientError> {
            Ok(vec![ListedPeer {
                id: NodeId::from("X"),
                connected: true,
                num_channels: 1,
                netaddr: Vec::new(),
            }])
        }

        async fn send_pay(
            &self,
            _route: &Route,
            secret: &PaymentSecret,
            _timeout: Duration,
        ) -> Result<Preimage, ClientError> {
            Ok(secret.preimage())
        }
    }

    fn listed(block: u32, source: &str, destination: &str) -> ListedChannel {
        ListedChannel {
            short_channel_id: ShortChannelId::from_parts(block, 0, 0),
            source: NodeId::from(source),
            destination: NodeId::from(destination),
            satoshis: 1_000_000,
            base_fee_millisatoshi: 1_000,
            fee_per_millionth: 1,
            htlc_minimum_msat: 0,
            htlc_maximum_msat: None,
            delay: 6,
            active: true,
            last_update: 0,
        }
    }

    fn temp_config() -> (CircularConfig, PathBuf) {
        let dir = std::env::temp_dir().join(format!("circular-node-{}", uuid::Uuid::now_v7()));
        let mut config = CircularConfig::default();
        config.storage.data_dir = dir.clone();
        (config, dir)
    }

    fn fake() -> Arc<FakeLightning> {
        let fake = FakeLightning::default();
        *fake.channels.lock().unwrap() = vec![
            listed(1, "S", "X"),
            listed(1, "X", "S"),
            listed(2, "X", "Y"),
            listed(2, "Y", "X"),
        ];
        Arc::new(fake)
    }

    #[tokio::test]
    async fn test_refresh_graph_applies_and_saves() {
        let (config, dir) = temp_config();
        let node = CircularNode::new(config.clone(), fake()).await.unwrap();
        let summary = node.refresh_graph().await.unwrap();
        assert_eq!(summary.added, 4);
        assert_eq!(node.graph().alias(&NodeId::from("X")), "xavier");
        assert!(config.graph_path().exists());

        // A restarted node picks the saved graph back up.
        let restarted = CircularNode::new(config, fake()).await.unwrap();
        assert_eq!(restarted.status().graph.channels, 4);
        std::fs::remove_dir_all(&dir).ok();
    }

    #[tokio::test]
    async fn test_failed_channel_listing_leaves_graph_untouched() {
        let (config, dir) = temp_config();
        let client = fake();
        let node = CircularNode::new(config, client.clone()).await.unwrap();
        node.refresh_graph().await.unwrap();
        let before = node.graph().snapshot();

        client.fail_channels.store(true, Ordering::SeqCst);
        client.channels.lock().unwrap().truncate(2);
        assert!(matches!(
            node.refresh_graph().await,
            Err(NodeError::ListingRetrieval(_))
        ));
        assert_eq!(node.graph().snapshot(), before);
        std::fs::remove_dir_all(&dir).ok();
    }

    #[tokio::test]
    async fn test_failed_node_listing_keeps_channel_update() {
        let (config, dir) = temp_config();
        let client = fake();
        let node = CircularNode::new(config, client.clone()).await.unwrap();
        node.refresh_graph().await.unwrap();

        client.fail_nodes.store(true, Ordering::SeqCst);
        client.channels.lock().unwrap().truncate(2);
        assert!(node.refresh_graph().await.is_err());
        // Channel 2 was pruned even though the refresh reported an error.
        assert_eq!(node.status().graph.channels, 2);
        assert_eq!(node.graph().alias(&NodeId::from("X")), "xavier");

        // And the pruned graph reached disk.
        let saved = GraphStore::new(node.config().graph_path()).load().unwrap();
        assert_eq!(saved, node.graph().snapshot());
        assert_eq!(saved.channels.len(), 2);
        std::fs::remove_dir_all(&dir).ok();
    }

    #[tokio::test]
    async fn test_refresh_peers_and_status() {
        let (config, dir) = temp_config();
        let node = CircularNode::new(config, fake()).await.unwrap();
        assert_eq!(node.refresh_peers().await.unwrap(), 1);
        let status = node.status();
        assert_eq!(status.node_id, NodeId::from("S"));
        assert_eq!(status.peers, 1);
        assert_eq!(status.connected_peers, 1);
        std::fs::remove_dir_all(&dir).ok();
    }

    #[tokio::test]
    async fn test_dry_run_route_defaults_to_self() {
        let (config, dir) = temp_config();
        let node = CircularNode::new(config, fake()).await.unwrap();
        node.refresh_graph().await.unwrap();
        let route = node.route(None, &NodeId::from("Y"), 10_000, None).unwrap();
        assert_eq!(route.source, NodeId::from("S"));
        assert_eq!(route.hop_count(), 2);
        assert!(matches!(
            node.route(None, &NodeId::from("Z"), 10_000, None),
            Err(RoutingError::NoRouteFound { .. })
        ));
        std::fs::remove_dir_all(&dir).ok();
    }

    #[tokio::test]
    async fn test_start_spawns_schedulers() {
        let (config, dir) = temp_config();
        let node = Arc::new(CircularNode::new(config, fake()).await.unwrap());
        let handles = node.start().await;
        assert_eq!(handles.len(), 3);
        assert_eq!(node.status().graph.channels, 4);
        for handle in handles {
            handle.abort();
        }
        node.shutdown().unwrap();
        std::fs::remove_dir_all(&dir).ok();
    }
}
