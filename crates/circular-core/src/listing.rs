//! Records returned by the Lightning node's listing calls.
//!
//! These are the raw inputs to graph maintenance; the graph never stores
//! them directly, it derives [`Channel`](crate::Channel) values from them.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::{ChannelId, Direction, Msat, NodeId, ShortChannelId, MSAT_PER_SAT};

/// One direction of a channel as announced through gossip.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListedChannel {
    pub short_channel_id: ShortChannelId,
    pub source: NodeId,
    pub destination: NodeId,
    /// Total channel size in satoshi.
    pub satoshis: u64,
    pub base_fee_millisatoshi: Msat,
    pub fee_per_millionth: u64,
    pub htlc_minimum_msat: Msat,
    /// Absent on older gossip; the channel capacity is used instead.
    #[serde(default)]
    pub htlc_maximum_msat: Option<Msat>,
    /// CLTV delta in blocks.
    pub delay: u32,
    #[serde(default = "default_active")]
    pub active: bool,
    #[serde(default)]
    pub last_update: u64,
}

fn default_active() -> bool {
    true
}

impl ListedChannel {
    pub fn direction(&self) -> Direction {
        Direction::between(&self.source, &self.destination)
    }

    pub fn channel_id(&self) -> ChannelId {
        ChannelId::new(self.short_channel_id.clone(), self.direction())
    }

    /// Channel size in millisatoshi.
    pub fn capacity_msat(&self) -> Msat {
        self.satoshis.saturating_mul(MSAT_PER_SAT)
    }

    /// Check that the record describes a usable directed edge.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.source.is_empty() || self.destination.is_empty() {
            return Err(CoreError::InvalidListing(format!(
                "{}: missing endpoint",
                self.short_channel_id
            )));
        }
        if self.source == self.destination {
            return Err(CoreError::InvalidListing(format!(
                "{}: source equals destination",
                self.short_channel_id
            )));
        }
        Ok(())
    }
}

/// A node announcement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListedNode {
    #[serde(rename = "nodeid")]
    pub node_id: NodeId,
    #[serde(default)]
    pub alias: Option<String>,
}

/// A peer we have (or had) a connection with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListedPeer {
    pub id: NodeId,
    #[serde(default)]
    pub connected: bool,
    #[serde(default)]
    pub num_channels: u32,
    #[serde(default)]
    pub netaddr: Vec<String>,
}

/// Identity of the local node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeInfo {
    pub id: NodeId,
    #[serde(default)]
    pub alias: Option<String>,
    #[serde(default)]
    pub blockheight: u32,
}
