use serde::{Deserialize, Serialize};

use crate::listing::ListedChannel;
use crate::types::{ChannelId, Direction, Msat, NodeId, ShortChannelId};

/// One forwarding direction of a payment channel, together with our current
/// estimate of how much of its capacity can leave `source` right now.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Channel {
    pub short_channel_id: ShortChannelId,
    pub source: NodeId,
    pub destination: NodeId,
    /// Total channel size in millisatoshi.
    pub capacity: Msat,
    /// Estimated outbound liquidity of `source`. Always `<= capacity`.
    pub liquidity: Msat,
    /// Flat fee charged by `source` for forwarding over this channel.
    pub base_fee: Msat,
    /// Proportional fee in parts per million of the forwarded amount.
    pub fee_per_millionth: u64,
    pub min_htlc: Msat,
    pub max_htlc: Msat,
    /// CLTV delta in blocks.
    pub delay: u32,
    pub active: bool,
    pub last_update: u64,
}

impl Channel {
    /// Build a channel from a listing record with the given liquidity
    /// estimate, clamped to the channel capacity.
    pub fn from_listing(listed: &ListedChannel, liquidity: Msat) -> Self {
        let capacity = listed.capacity_msat();
        Self {
            short_channel_id: listed.short_channel_id.clone(),
            source: listed.source.clone(),
            destination: listed.destination.clone(),
            capacity,
            liquidity: liquidity.min(capacity),
            base_fee: listed.base_fee_millisatoshi,
            fee_per_millionth: listed.fee_per_millionth,
            min_htlc: listed.htlc_minimum_msat,
            max_htlc: listed.htlc_maximum_msat.unwrap_or(capacity),
            delay: listed.delay,
            active: listed.active,
            last_update: listed.last_update,
        }
    }

    pub fn direction(&self) -> Direction {
        Direction::between(&self.source, &self.destination)
    }

    pub fn id(&self) -> ChannelId {
        ChannelId::new(self.short_channel_id.clone(), self.direction())
    }

    /// Whether `amount` can be forwarded from `source` over this channel.
    pub fn can_use(&self, amount: Msat) -> bool {
        amount >= self.min_htlc && amount <= self.max_htlc && amount <= self.liquidity
    }

    /// Fee charged by `source` for forwarding `amount`, rounded down.
    pub fn compute_fee(&self, amount: Msat) -> Msat {
        let proportional = (self.fee_per_millionth as u128 * amount as u128) / 1_000_000;
        self.base_fee
            .saturating_add(u64::try_from(proportional).unwrap_or(u64::MAX))
    }
}
