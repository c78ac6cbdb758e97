//! Peer side table, kept apart from the graph and its lock.

use std::collections::HashSet;

use dashmap::DashMap;

use circular_core::{ListedPeer, NodeId};

/// Our peers as of the last `listpeers`.
#[derive(Default)]
pub struct PeerTable {
    peers: DashMap<NodeId, ListedPeer>,
}

impl PeerTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the table with a fresh listing. Returns how many peers were
    /// dropped because they are no longer listed.
    pub fn replace(&self, listing: Vec<ListedPeer>) -> usize {
        let mut seen = HashSet::with_capacity(listing.len());
        for peer in listing {
            seen.insert(peer.id.clone());
            self.peers.insert(peer.id.clone(), peer);
        }
        let mut dropped = 0;
        self.peers.retain(|id, _| {
            let keep = seen.contains(id);
            if !keep {
                dropped += 1;
            }
            keep
        });
        dropped
    }

    pub fn get(&self, id: &NodeId) -> Option<ListedPeer> {
        self.peers.get(id).map(|p| p.clone())
    }

    pub fn len(&self) -> usize {
        self.peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }

    pub fn connected_count(&self) -> usize {
        self.peers.iter().filter(|p| p.connected).count()
    }

    /// All peers sorted by id.
    pub fn list(&self) -> Vec<ListedPeer> {
        let mut peers: Vec<ListedPeer> = self.peers.iter().map(|p| p.value().clone()).collect();
        peers.sort_by(|a, b| a.id.cmp(&b.id));
        peers
    }
}
