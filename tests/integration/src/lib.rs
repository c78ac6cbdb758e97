//! Shared fixtures for the cross-crate tests: an in-memory Lightning node
//! that serves listings and settles payments.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use circular_core::{ListedChannel, ListedNode, ListedPeer, NodeId, NodeInfo, ShortChannelId};
use circular_node::{CircularConfig, CircularNode};
use circular_rebalance::{ClientError, LightningClient, PaymentSecret, Preimage};
use circular_routing::Route;

/// How the network answers `send_pay`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentBehavior {
    Settle,
    Timeout,
    Fail,
}

/// A toy Lightning network as seen from node `self_id`.
pub struct MockNetwork {
    pub self_id: NodeId,
    channels: Mutex<Vec<ListedChannel>>,
    nodes: Mutex<Vec<ListedNode>>,
    peers: Mutex<Vec<ListedPeer>>,
    behavior: Mutex<PaymentBehavior>,
    offline: AtomicBool,
    /// Every route handed to `send_pay`, in order.
    pub payments: Mutex<Vec<Route>>,
}

impl MockNetwork {
    pub fn new(self_id: &str) -> Self {
        Self {
            self_id: NodeId::from(self_id),
            channels: Mutex::new(Vec::new()),
            nodes: Mutex::new(Vec::new()),
            peers: Mutex::new(Vec::new()),
            behavior: Mutex::new(PaymentBehavior::Settle),
            offline: AtomicBool::new(false),
            payments: Mutex::new(Vec::new()),
        }
    }

    /// Add both directions of a channel. Peers of `self_id` are registered
    /// as connected peers.
    pub fn add_channel(&self, block: u32, a: &str, b: &str, fee_ppm: u64) {
        let mut channels = self.channels.lock();
        channels.push(listed(block, a, b, fee_ppm));
        channels.push(listed(block, b, a, fee_ppm));
        drop(channels);

        for (ours, theirs) in [(a, b), (b, a)] {
            if NodeId::from(ours) == self.self_id {
                let mut peers = self.peers.lock();
                match peers.iter_mut().find(|p| p.id.as_str() == theirs) {
                    Some(peer) => peer.num_channels += 1,
                    None => peers.push(ListedPeer {
                        id: NodeId::from(theirs),
                        connected: true,
                        num_channels: 1,
                        netaddr: Vec::new(),
                    }),
                }
            }
        }
    }

    pub fn close_channel(&self, block: u32) {
        let scid = scid(block);
        self.channels.lock().retain(|c| c.short_channel_id != scid);
    }

    pub fn add_alias(&self, id: &str, alias: &str) {
        self.nodes.lock().push(ListedNode {
            node_id: NodeId::from(id),
            alias: Some(alias.to_string()),
        });
    }

    pub fn set_behavior(&self, behavior: PaymentBehavior) {
        *self.behavior.lock() = behavior;
    }

    /// Make every listing call fail with a transport error.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub fn payment_count(&self) -> usize {
        self.payments.lock().len()
    }

    fn check_online(&self) -> Result<(), ClientError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(ClientError::Transport("connection refused".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl LightningClient for MockNetwork {
    async fn get_info(&self) -> Result<NodeInfo, ClientError> {
        Ok(NodeInfo {
            id: self.self_id.clone(),
            alias: Some("circular-test".into()),
            blockheight: 800_000,
        })
    }

    async fn list_channels(&self) -> Result<Vec<ListedChannel>, ClientError> {
        self.check_online()?;
        Ok(self.channels.lock().clone())
    }

    async fn list_nodes(&self) -> Result<Vec<ListedNode>, ClientError> {
        self.check_online()?;
        Ok(self.nodes.lock().clone())
    }

    async fn list_peers(&self) -> Result<Vec<ListedPeer>, ClientError> {
        self.check_online()?;
        Ok(self.peers.lock().clone())
    }

    async fn send_pay(
        &self,
        route: &Route,
        secret: &PaymentSecret,
        _timeout: Duration,
    ) -> Result<Preimage, ClientError> {
        self.payments.lock().push(route.clone());
        if !route.is_contiguous() {
            return Err(ClientError::Rpc {
                code: 204,
                message: "WIRE_UNKNOWN_NEXT_PEER".into(),
            });
        }
        let behavior = *self.behavior.lock();
        match behavior {
            PaymentBehavior::Settle => Ok(secret.preimage()),
            PaymentBehavior::Timeout => Err(ClientError::Timeout),
            PaymentBehavior::Fail => Err(ClientError::Rpc {
                code: 204,
                message: "WIRE_TEMPORARY_CHANNEL_FAILURE".into(),
            }),
        }
    }
}

pub fn scid(block: u32) -> ShortChannelId {
    ShortChannelId::from_parts(block, 0, 0)
}

/// A 0.01 BTC channel charging 1 sat base plus `fee_ppm`.
pub fn listed(block: u32, source: &str, destination: &str, fee_ppm: u64) -> ListedChannel {
    ListedChannel {
        short_channel_id: scid(block),
        source: NodeId::from(source),
        destination: NodeId::from(destination),
        satoshis: 1_000_000,
        base_fee_millisatoshi: 1_000,
        fee_per_millionth: fee_ppm,
        htlc_minimum_msat: 0,
        htlc_maximum_msat: None,
        delay: 6,
        active: true,
        last_update: 0,
    }
}

/// S -1- X -2- Y -3- S, every channel at 100 ppm.
pub fn triangle() -> Arc<MockNetwork> {
    let network = MockNetwork::new("S");
    network.add_channel(1, "S", "X", 100);
    network.add_channel(2, "X", "Y", 100);
    network.add_channel(3, "Y", "S", 100);
    network.add_alias("X", "xavier");
    network.add_alias("Y", "yolanda");
    Arc::new(network)
}

/// Default config with its data directory in a fresh temp dir.
pub fn temp_config() -> (CircularConfig, PathBuf) {
    let dir = std::env::temp_dir().join(format!("circular-it-{}", uuid::Uuid::now_v7()));
    let mut config = CircularConfig::default();
    config.storage.data_dir = dir.clone();
    (config, dir)
}

/// A node over `network` with its graph and peers already refreshed.
pub async fn refreshed_node(
    network: Arc<MockNetwork>,
    config: CircularConfig,
) -> Arc<CircularNode> {
    let node = CircularNode::new(config, network)
        .await
        .expect("node construction");
    node.refresh_graph().await.expect("graph refresh");
    node.refresh_peers().await.expect("peer refresh");
    Arc::new(node)
}
