use std::collections::{BTreeSet, HashMap, HashSet};

use circular_core::{Channel, ChannelId, Direction, Msat, NodeId, ShortChannelId};
use serde::{Deserialize, Serialize};

/// All short channel ids connecting one node to one peer in a given direction.
pub type Edge = BTreeSet<ShortChannelId>;

/// `links[node][peer]` adjacency map.
pub type Links = HashMap<NodeId, HashMap<NodeId, Edge>>;

/// The Lightning network graph from the perspective of our node, built from
/// the gossip the node has received.
///
/// - `outbound[a][b]` holds the channels that can move funds from `a` to `b`.
/// - `inbound[b][a]` is the mirror view: the channels moving funds from `a` into `b`.
/// - `channels` is keyed by `scid/direction`.
///
/// The two adjacency maps are derived from `channels` and kept consistent by
/// every mutator; they are never persisted.
#[derive(Debug, Default)]
pub struct Graph {
    pub(crate) channels: HashMap<ChannelId, Channel>,
    outbound: Links,
    inbound: Links,
    pub(crate) aliases: HashMap<NodeId, String>,
    /// Channel ids seen in the most recent listing; `None` until the first refresh.
    pub(crate) last_listing: Option<HashSet<ChannelId>>,
}

/// Serializable form of the graph: the channel records and aliases only.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphSnapshot {
    pub channels: Vec<Channel>,
    #[serde(default)]
    pub aliases: HashMap<NodeId, String>,
}

/// Summary counters for logging and the status API.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphStats {
    pub channels: usize,
    pub nodes: usize,
    pub aliases: usize,
    pub total_capacity: Msat,
}

impl Graph {
    /// Create an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a graph from a snapshot by replaying `add_channel`.
    pub fn from_snapshot(snapshot: GraphSnapshot) -> Self {
        let mut graph = Self::new();
        for channel in snapshot.channels {
            graph.add_channel(channel);
        }
        graph.aliases = snapshot.aliases;
        graph
    }

    /// Channel records sorted by id, plus the alias table.
    pub fn snapshot(&self) -> GraphSnapshot {
        let mut channels: Vec<Channel> = self.channels.values().cloned().collect();
        channels.sort_by(|a, b| a.id().cmp(&b.id()));
        GraphSnapshot {
            channels,
            aliases: self.aliases.clone(),
        }
    }

    /// Insert a channel and index it. A channel whose id is already known
    /// replaces the stored record without touching the indices.
    ///
    /// Returns `true` if the channel was new.
    pub fn add_channel(&mut self, channel: Channel) -> bool {
        let id = channel.id();
        if let Some(existing) = self.channels.get_mut(&id) {
            *existing = channel;
            return false;
        }
        link(
            &mut self.outbound,
            &channel.source,
            &channel.destination,
            &channel.short_channel_id,
        );
        link(
            &mut self.inbound,
            &channel.destination,
            &channel.source,
            &channel.short_channel_id,
        );
        self.channels.insert(id, channel);
        true
    }

    /// Remove a channel from the map and both indices, dropping buckets that
    /// become empty.
    pub fn remove_channel(&mut self, id: &ChannelId) -> Option<Channel> {
        let channel = self.channels.remove(id)?;
        unlink(
            &mut self.outbound,
            &channel.source,
            &channel.destination,
            &channel.short_channel_id,
        );
        unlink(
            &mut self.inbound,
            &channel.destination,
            &channel.source,
            &channel.short_channel_id,
        );
        Some(channel)
    }

    pub fn channel(&self, id: &ChannelId) -> Option<&Channel> {
        self.channels.get(id)
    }

    pub(crate) fn channel_mut(&mut self, id: &ChannelId) -> Option<&mut Channel> {
        self.channels.get_mut(id)
    }

    pub fn channels(&self) -> impl Iterator<Item = &Channel> {
        self.channels.values()
    }

    /// Every channel able to forward from `from` to `to`.
    pub fn channels_between<'a>(
        &'a self,
        from: &NodeId,
        to: &NodeId,
    ) -> impl Iterator<Item = &'a Channel> + 'a {
        let direction = Direction::between(from, to);
        self.outbound
            .get(from)
            .and_then(|peers| peers.get(to))
            .into_iter()
            .flatten()
            .filter_map(move |scid| {
                self.channels
                    .get(&ChannelId::new(scid.clone(), direction))
            })
    }

    /// Peers that have channels forwarding into `node`.
    pub fn inbound_peers(&self, node: &NodeId) -> Option<&HashMap<NodeId, Edge>> {
        self.inbound.get(node)
    }

    /// Peers that `node` has channels forwarding towards.
    pub fn outbound_peers(&self, node: &NodeId) -> Option<&HashMap<NodeId, Edge>> {
        self.outbound.get(node)
    }

    pub fn outbound_index(&self) -> &Links {
        &self.outbound
    }

    pub fn inbound_index(&self) -> &Links {
        &self.inbound
    }

    pub fn contains_node(&self, node: &NodeId) -> bool {
        self.outbound.contains_key(node) || self.inbound.contains_key(node)
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    pub fn node_count(&self) -> usize {
        let mut nodes: HashSet<&NodeId> = self.outbound.keys().collect();
        nodes.extend(self.inbound.keys());
        nodes.len()
    }

    /// Human readable name of a node, falling back to its id.
    pub fn alias<'a>(&'a self, node: &'a NodeId) -> &'a str {
        self.aliases
            .get(node)
            .map(String::as_str)
            .unwrap_or(node.as_str())
    }

    pub fn aliases(&self) -> &HashMap<NodeId, String> {
        &self.aliases
    }

    pub fn stats(&self) -> GraphStats {
        // Each physical channel is listed once per direction.
        let total_capacity = self
            .channels
            .values()
            .filter(|c| c.direction() == Direction::Zero)
            .map(|c| c.capacity)
            .fold(0u64, u64::saturating_add);
        GraphStats {
            channels: self.channels.len(),
            nodes: self.node_count(),
            aliases: self.aliases.len(),
            total_capacity,
        }
    }
}

fn link(links: &mut Links, from: &NodeId, to: &NodeId, scid: &ShortChannelId) {
    links
        .entry(from.clone())
        .or_default()
        .entry(to.clone())
        .or_default()
        .insert(scid.clone());
}

fn unlink(links: &mut Links, from: &NodeId, to: &NodeId, scid: &ShortChannelId) {
    let Some(peers) = links.get_mut(from) else {
        return;
    };
    if let Some(edge) = peers.get_mut(to) {
        edge.remove(scid);
        if edge.is_empty() {
            peers.remove(to);
        }
    }
    if peers.is_empty() {
        links.remove(from);
    }
}
