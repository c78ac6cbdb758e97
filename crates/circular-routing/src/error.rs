use circular_core::{ChannelId, NodeId};

/// Errors that can occur within the routing layer.
#[derive(Debug, thiserror::Error)]
pub enum RoutingError {
    #[error("no route found from {from} to {to}")]
    NoRouteFound { from: NodeId, to: NodeId },

    #[error("source and destination are the same node: {0}")]
    SameEndpoints(NodeId),

    #[error("channel not in graph: {0}")]
    UnknownChannel(ChannelId),

    #[error("cannot route a zero amount")]
    ZeroAmount,
}
