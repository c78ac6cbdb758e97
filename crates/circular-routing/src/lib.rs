//! Circular Routing — the liquidity-aware channel graph and its router.
//!
//! This crate provides:
//! - [`Graph`] — directed channels indexed by outbound and inbound peer.
//! - [`LiquidityAging`] and the refresh/prune cycle that keeps liquidity estimates current.
//! - [`PathFinder`] — a reverse Dijkstra search for the cheapest route by fee.
//! - [`Route`] — hops in payment order with amounts and delays derived backward.
//! - [`SharedGraph`] — the lock-guarded owner used by the node and the rebalancer.

pub mod error;
pub mod graph;
pub mod maintenance;
pub mod pathfinder;
pub mod route;
pub mod shared;

// Re-exports for convenience.
pub use error::RoutingError;
pub use graph::{Graph, GraphSnapshot, GraphStats};
pub use maintenance::{LiquidityAging, RefreshSummary, AGING_VARIANCE, AVERAGE_AGING_AMOUNT};
pub use pathfinder::{PathFinder, PathFinderConfig};
pub use route::{PrettyRoute, Route, RouteHop};
pub use shared::{ChannelSide, SharedGraph};
