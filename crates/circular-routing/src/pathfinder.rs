use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap, HashSet};
use std::time::Instant;

use circular_core::{ChannelId, Direction, Msat, NodeId};

use crate::error::RoutingError;
use crate::graph::Graph;
use crate::route::{Route, RouteHop};

/// Configuration for the PathFinder algorithm.
#[derive(Debug, Clone)]
pub struct PathFinderConfig {
    /// Maximum number of hops in a returned path. `0` means unlimited.
    pub max_hops: usize,
}

impl Default for PathFinderConfig {
    fn default() -> Self {
        Self { max_hops: 20 }
    }
}

/// Cheapest-fee path search over the channel graph.
///
/// The search runs backward from the destination: the amount a node has to
/// forward, and therefore the fee of the channel leading into it, is only
/// known once the rest of the path towards the destination is fixed.
pub struct PathFinder {
    config: PathFinderConfig,
}

/// Frontier entry of the priority queue.
#[derive(Debug, Clone)]
struct SearchNode {
    node_id: NodeId,
    /// Total fee accumulated between this node and the destination.
    cost: u64,
    /// Amount this node has to forward towards the destination.
    amount: Msat,
    /// CLTV delta accumulated between this node and the destination.
    delay: u32,
    /// Number of hops between this node and the destination.
    hops: usize,
}

impl PartialEq for SearchNode {
    fn eq(&self, other: &Self) -> bool {
        self.cost == other.cost
    }
}

impl Eq for SearchNode {}

impl PartialOrd for SearchNode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for SearchNode {
    fn cmp(&self, other: &Self) -> Ordering {
        // Lower cost = better. BinaryHeap is a max-heap, so compare reversed.
        other.cost.cmp(&self.cost)
    }
}

impl PathFinder {
    pub fn new(config: PathFinderConfig) -> Self {
        Self { config }
    }

    pub fn with_defaults() -> Self {
        Self {
            config: PathFinderConfig::default(),
        }
    }

    pub fn with_max_hops(max_hops: usize) -> Self {
        Self {
            config: PathFinderConfig { max_hops },
        }
    }

    pub fn config(&self) -> &PathFinderConfig {
        &self.config
    }

    /// Find the cheapest path delivering `amount` from `source` to
    /// `destination`, never passing through a node in `exclude`.
    ///
    /// Returns the hops in payment order. Every hop carries the amount to
    /// forward over its channel and the delay remaining from that point on.
    /// Cost ties are resolved by heap pop order.
    pub fn find_route(
        &self,
        graph: &Graph,
        source: &NodeId,
        destination: &NodeId,
        amount: Msat,
        exclude: &HashSet<NodeId>,
    ) -> Result<Vec<RouteHop>, RoutingError> {
        if source == destination {
            return Err(RoutingError::SameEndpoints(source.clone()));
        }
        if amount == 0 {
            return Err(RoutingError::ZeroAmount);
        }

        let started = Instant::now();
        tracing::debug!(
            %source,
            %destination,
            amount,
            channels = graph.channel_count(),
            nodes = graph.node_count(),
            "looking for a route"
        );

        // With a hop limit, search state is (node, hops from destination):
        // a cheap but long path to a node must not shadow a dearer short one
        // that still fits under the limit. Without a limit every node lives
        // in layer 0 and this is plain Dijkstra.
        let limited = self.config.max_hops > 0;
        let layer = |hops: usize| if limited { hops } else { 0 };

        // Missing entries are at infinite distance.
        let mut distance: HashMap<(NodeId, usize), u64> = HashMap::new();
        let mut best_hop: HashMap<(NodeId, usize), RouteHop> = HashMap::new();
        let mut heap: BinaryHeap<SearchNode> = BinaryHeap::new();

        distance.insert((destination.clone(), 0), 0);
        heap.push(SearchNode {
            node_id: destination.clone(),
            cost: 0,
            amount,
            delay: 0,
            hops: 0,
        });

        let mut reached: Option<(usize, u64)> = None;
        while let Some(current) = heap.pop() {
            let key = (current.node_id.clone(), layer(current.hops));
            let known = distance.get(&key).copied().unwrap_or(u64::MAX);
            if current.cost > known {
                continue;
            }
            if current.node_id == *source {
                reached = Some((key.1, current.cost));
                break;
            }
            if limited && current.hops >= self.config.max_hops {
                continue;
            }

            let Some(peers) = graph.inbound_peers(&current.node_id) else {
                continue;
            };

            for (peer, edge) in peers {
                if exclude.contains(peer) || peer == destination {
                    continue;
                }
                let direction = Direction::between(peer, &current.node_id);
                let peer_key = (peer.clone(), layer(current.hops + 1));
                for scid in edge {
                    let Some(channel) = graph.channel(&ChannelId::new(scid.clone(), direction))
                    else {
                        continue;
                    };
                    if !channel.can_use(current.amount) {
                        continue;
                    }

                    let channel_fee = channel.compute_fee(current.amount);
                    let candidate = known.saturating_add(channel_fee);
                    let peer_distance = distance.get(&peer_key).copied().unwrap_or(u64::MAX);
                    if candidate < peer_distance {
                        distance.insert(peer_key.clone(), candidate);
                        best_hop.insert(
                            peer_key.clone(),
                            RouteHop {
                                channel: channel.clone(),
                                amount: current.amount,
                                delay: current.delay,
                            },
                        );
                        heap.push(SearchNode {
                            node_id: peer.clone(),
                            cost: candidate,
                            amount: current.amount.saturating_add(channel_fee),
                            delay: current.delay.saturating_add(channel.delay),
                            hops: current.hops + 1,
                        });
                    }
                }
            }
        }

        let no_route = || RoutingError::NoRouteFound {
            from: source.clone(),
            to: destination.clone(),
        };

        let Some((source_layer, fee)) = reached else {
            tracing::debug!(
                %source,
                %destination,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "no route found"
            );
            return Err(no_route());
        };

        let mut hops: Vec<RouteHop> = Vec::new();
        let mut key = (source.clone(), source_layer);
        while key.0 != *destination {
            let hop = best_hop.get(&key).ok_or_else(no_route)?;
            if hops.len() >= best_hop.len() {
                // The hop chain loops; can only happen if the table is inconsistent.
                return Err(no_route());
            }
            key = (hop.channel.destination.clone(), layer(key.1.saturating_sub(1)));
            hops.push(hop.clone());
        }

        tracing::debug!(
            %source,
            %destination,
            hops = hops.len(),
            fee,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "route found"
        );
        Ok(hops)
    }

    /// Like [`find_route`](Self::find_route) but wraps the hops into a [`Route`].
    pub fn get_route(
        &self,
        graph: &Graph,
        source: &NodeId,
        destination: &NodeId,
        amount: Msat,
        exclude: &HashSet<NodeId>,
    ) -> Result<Route, RoutingError> {
        let hops = self.find_route(graph, source, destination, amount, exclude)?;
        Ok(Route::new(source.clone(), destination.clone(), amount, hops))
    }
}
