use circular_rebalance::ClientError;

use crate::storage::StorageError;

/// Failures of the node's refresh cycle.
#[derive(Debug, thiserror::Error)]
pub enum NodeError {
    #[error("listing retrieval failed: {0}")]
    ListingRetrieval(#[from] ClientError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}
