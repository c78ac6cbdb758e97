use circular_core::{CoreError, Msat, NodeId, ShortChannelId};
use circular_routing::RoutingError;

/// Why a rebalance did not complete.
#[derive(Debug, thiserror::Error)]
pub enum RebalanceError {
    #[error("no route found from {from} to {to} within {max_hops} hops")]
    NoRouteFound {
        from: NodeId,
        to: NodeId,
        max_hops: usize,
    },

    #[error("route costs {fee_ppm} ppm, above the {max_ppm} ppm ceiling")]
    RouteTooExpensive { fee_ppm: u64, max_ppm: u64 },

    /// The payment outcome is unknown; it may still be pending.
    #[error("payment timed out")]
    PaymentTimeout,

    #[error("payment failed temporarily")]
    TemporaryFailure,

    #[error("not one of our channels: {0}")]
    UnknownChannel(ShortChannelId),

    #[error("insufficient liquidity: need {needed} msat, have {available} msat")]
    InsufficientLiquidity { needed: Msat, available: Msat },

    #[error("invalid rebalance request: {0}")]
    InvalidRequest(String),

    #[error("rebalance deadline exceeded after {attempts} attempts")]
    DeadlineExceeded { attempts: usize },

    #[error("routing error: {0}")]
    Routing(#[from] RoutingError),

    #[error(transparent)]
    Core(#[from] CoreError),
}
