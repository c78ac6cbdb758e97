use std::time::Duration;

use async_trait::async_trait;
use circular_core::{ListedChannel, ListedNode, ListedPeer, NodeInfo};
use circular_routing::Route;

use crate::secret::{PaymentSecret, Preimage};

/// Failures reported by a Lightning node client.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The payment outcome was not known before the deadline.
    #[error("timed out waiting for the node")]
    Timeout,

    #[error("rpc error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("decode error: {0}")]
    Decode(String),
}

/// The operations Circular needs from a Lightning node.
///
/// Implementations bridge to a concrete node (Core Lightning over its RPC
/// socket in production, in-memory mocks in tests).
#[async_trait]
pub trait LightningClient: Send + Sync {
    /// Identity of the node we are running against.
    async fn get_info(&self) -> Result<NodeInfo, ClientError>;

    /// Every directed channel the node knows from gossip.
    async fn list_channels(&self) -> Result<Vec<ListedChannel>, ClientError>;

    async fn list_nodes(&self) -> Result<Vec<ListedNode>, ClientError>;

    async fn list_peers(&self) -> Result<Vec<ListedPeer>, ClientError>;

    /// Pay along `route` locked to `secret`'s payment hash, waiting at most
    /// `timeout` for the outcome. Returns the revealed preimage.
    async fn send_pay(
        &self,
        route: &Route,
        secret: &PaymentSecret,
        timeout: Duration,
    ) -> Result<Preimage, ClientError>;
}
