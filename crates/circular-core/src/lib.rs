//! Circular core — leaf types shared by the graph, router and rebalancer.

pub mod channel;
pub mod error;
pub mod listing;
pub mod state_machine;
pub mod types;

pub use channel::Channel;
pub use error::CoreError;
pub use listing::{ListedChannel, ListedNode, ListedPeer, NodeInfo};
pub use state_machine::{RebalanceEvent, RebalanceState, RebalanceStateMachine};
pub use types::{ChannelId, Direction, Msat, NodeId, ShortChannelId, MSAT_PER_SAT};
