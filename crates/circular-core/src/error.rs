use crate::state_machine::RebalanceState;

/// Core model errors.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("invalid short channel id: {0}")]
    InvalidShortChannelId(String),

    #[error("invalid channel direction: {0}")]
    InvalidDirection(String),

    #[error("invalid channel id: {0}")]
    InvalidChannelId(String),

    #[error("invalid channel listing: {0}")]
    InvalidListing(String),

    #[error("invalid rebalance state transition from {from} to {to}")]
    InvalidStateTransition {
        from: RebalanceState,
        to: RebalanceState,
    },
}
