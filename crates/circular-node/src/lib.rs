//! Circular daemon internals.
//!
//! Talks to Core Lightning over its RPC socket, keeps the channel graph and
//! peer table fresh, persists the graph, and serves rebalances over HTTP.

pub mod api;
pub mod cln;
pub mod config;
pub mod error;
pub mod node;
pub mod state;
pub mod storage;

pub use api::{build_router, start_api_server};
pub use cln::ClnRpcClient;
pub use config::CircularConfig;
pub use error::NodeError;
pub use node::{CircularNode, NodeStatus};
pub use state::PeerTable;
pub use storage::{GraphStore, StorageError};
