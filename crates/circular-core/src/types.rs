use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;

/// Millisatoshi, the smallest payment unit handled by the graph.
pub type Msat = u64;

/// Number of millisatoshi in one satoshi.
pub const MSAT_PER_SAT: u64 = 1_000;

/// Identifier of a Lightning node (hex-encoded public key).
///
/// Treated as an opaque string: the graph never interprets it beyond
/// ordering, which decides the channel [`Direction`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub String);

impl NodeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Borrow<str> for NodeId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for NodeId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for NodeId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Short channel id in the `BLOCKxTXxOUTPUT` notation, stable for the
/// lifetime of the physical channel.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ShortChannelId(String);

impl ShortChannelId {
    /// Parse and validate a short channel id.
    pub fn new(scid: impl Into<String>) -> Result<Self, CoreError> {
        let scid = scid.into();
        let parts: Vec<&str> = scid.split('x').collect();
        if parts.len() != 3 || parts.iter().any(|p| p.is_empty() || p.parse::<u64>().is_err()) {
            return Err(CoreError::InvalidShortChannelId(scid));
        }
        Ok(Self(scid))
    }

    /// Build a short channel id from block height, transaction index and output index.
    pub fn from_parts(block: u32, tx_index: u32, output: u16) -> Self {
        Self(format!("{}x{}x{}", block, tx_index, output))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ShortChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for ShortChannelId {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ShortChannelId> for String {
    fn from(scid: ShortChannelId) -> Self {
        scid.0
    }
}

impl FromStr for ShortChannelId {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

/// Forwarding direction of a channel.
///
/// Follows the gossip convention: direction 0 is taken by the node whose id
/// sorts first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Direction {
    Zero,
    One,
}

impl Direction {
    /// Direction of a channel forwarding from `source` to `destination`.
    pub fn between(source: &NodeId, destination: &NodeId) -> Self {
        if source < destination {
            Self::Zero
        } else {
            Self::One
        }
    }

    pub fn opposite(self) -> Self {
        match self {
            Self::Zero => Self::One,
            Self::One => Self::Zero,
        }
    }

    pub fn as_u8(self) -> u8 {
        match self {
            Self::Zero => 0,
            Self::One => 1,
        }
    }
}

impl TryFrom<u8> for Direction {
    type Error = CoreError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Zero),
            1 => Ok(Self::One),
            other => Err(CoreError::InvalidDirection(other.to_string())),
        }
    }
}

impl From<Direction> for u8 {
    fn from(direction: Direction) -> Self {
        direction.as_u8()
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_u8())
    }
}

/// Composite key of a directed channel: short channel id plus direction.
/// Rendered as `scid/direction`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChannelId {
    pub short_channel_id: ShortChannelId,
    pub direction: Direction,
}

impl ChannelId {
    pub fn new(short_channel_id: ShortChannelId, direction: Direction) -> Self {
        Self {
            short_channel_id,
            direction,
        }
    }

    /// Key of the same physical channel in the other forwarding direction.
    pub fn opposite(&self) -> Self {
        Self {
            short_channel_id: self.short_channel_id.clone(),
            direction: self.direction.opposite(),
        }
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.short_channel_id, self.direction)
    }
}

impl FromStr for ChannelId {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (scid, direction) = s
            .split_once('/')
            .ok_or_else(|| CoreError::InvalidChannelId(s.to_string()))?;
        let direction: u8 = direction
            .parse()
            .map_err(|_| CoreError::InvalidChannelId(s.to_string()))?;
        Ok(Self {
            short_channel_id: ShortChannelId::new(scid)?,
            direction: Direction::try_from(direction)?,
        })
    }
}
