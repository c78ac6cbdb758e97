//! Thread-safe owner of the channel graph.
//!
//! Refreshes take the write lock once for the whole update-then-prune cycle,
//! so route searches (read lock) never observe a half-applied listing.

use std::collections::HashSet;
use std::time::Instant;

use circular_core::{Channel, ChannelId, Direction, ListedChannel, ListedNode, Msat, NodeId, ShortChannelId};
use parking_lot::{Mutex, RwLock};
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::error::RoutingError;
use crate::graph::{Graph, GraphSnapshot, GraphStats};
use crate::maintenance::{LiquidityAging, RefreshSummary};
use crate::pathfinder::PathFinder;
use crate::route::{Route, RouteHop};

/// Which end of one of our own channels we are looking for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelSide {
    /// The direction that moves funds away from us.
    Outgoing,
    /// The direction that moves funds towards us.
    Incoming,
}

pub struct SharedGraph {
    // Lock order: graph, then rng.
    graph: RwLock<Graph>,
    rng: Mutex<StdRng>,
    aging: LiquidityAging,
}

impl SharedGraph {
    pub fn new(graph: Graph, aging: LiquidityAging, rng: StdRng) -> Self {
        Self {
            graph: RwLock::new(graph),
            rng: Mutex::new(rng),
            aging,
        }
    }

    /// Empty graph with default aging and an entropy-seeded rng.
    pub fn with_defaults() -> Self {
        Self::new(Graph::new(), LiquidityAging::default(), StdRng::from_entropy())
    }

    pub fn from_snapshot(snapshot: GraphSnapshot, aging: LiquidityAging, rng: StdRng) -> Self {
        Self::new(Graph::from_snapshot(snapshot), aging, rng)
    }

    pub fn aging(&self) -> LiquidityAging {
        self.aging
    }

    /// Refresh channels from `listing` and prune the ones it no longer
    /// contains, under a single write lock.
    pub fn apply_channel_listing(&self, listing: &[ListedChannel]) -> RefreshSummary {
        let started = Instant::now();
        let mut graph = self.graph.write();
        let mut summary = {
            let mut rng = self.rng.lock();
            graph.refresh_channels(listing, &self.aging, &mut *rng)
        };
        summary.pruned = graph.prune_channels();
        tracing::info!(
            added = summary.added,
            updated = summary.updated,
            skipped = summary.skipped,
            pruned = summary.pruned,
            channels = graph.channel_count(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "graph refreshed"
        );
        summary
    }

    pub fn apply_node_listing(&self, nodes: &[ListedNode]) -> usize {
        self.graph.write().refresh_aliases(nodes)
    }

    pub fn find_route(
        &self,
        finder: &PathFinder,
        source: &NodeId,
        destination: &NodeId,
        amount: Msat,
        exclude: &HashSet<NodeId>,
    ) -> Result<Vec<RouteHop>, RoutingError> {
        let graph = self.graph.read();
        finder.find_route(&graph, source, destination, amount, exclude)
    }

    pub fn get_route(
        &self,
        finder: &PathFinder,
        source: &NodeId,
        destination: &NodeId,
        amount: Msat,
        exclude: &HashSet<NodeId>,
    ) -> Result<Route, RoutingError> {
        let graph = self.graph.read();
        finder.get_route(&graph, source, destination, amount, exclude)
    }

    pub fn channel(&self, id: &ChannelId) -> Option<Channel> {
        self.graph.read().channel(id).cloned()
    }

    /// Resolve one direction of a channel owned by `node`.
    pub fn find_own_channel(
        &self,
        node: &NodeId,
        short_channel_id: &ShortChannelId,
        side: ChannelSide,
    ) -> Result<Channel, RoutingError> {
        let graph = self.graph.read();
        [Direction::Zero, Direction::One]
            .into_iter()
            .filter_map(|d| graph.channel(&ChannelId::new(short_channel_id.clone(), d)))
            .find(|c| match side {
                ChannelSide::Outgoing => &c.source == node,
                ChannelSide::Incoming => &c.destination == node,
            })
            .cloned()
            .ok_or_else(|| {
                RoutingError::UnknownChannel(ChannelId::new(short_channel_id.clone(), Direction::Zero))
            })
    }

    pub fn snapshot(&self) -> GraphSnapshot {
        self.graph.read().snapshot()
    }

    pub fn stats(&self) -> GraphStats {
        self.graph.read().stats()
    }

    pub fn alias(&self, node: &NodeId) -> String {
        self.graph.read().alias(node).to_string()
    }

    /// Run `f` against a consistent view of the graph.
    pub fn with_read<T>(&self, f: impl FnOnce(&Graph) -> T) -> T {
        f(&self.graph.read())
    }
}
