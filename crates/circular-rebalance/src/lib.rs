//! Circular Rebalance
//!
//! Moves liquidity from one of our channels to another by paying ourselves
//! along a circular route. The Lightning node itself is reached through the
//! [`LightningClient`] trait.

pub mod error;
pub mod rebalancer;
pub mod secret;
pub mod traits;

pub use error::RebalanceError;
pub use rebalancer::{RebalanceConfig, RebalanceOutcome, RebalanceRequest, Rebalancer};
pub use secret::{PaymentSecret, Preimage};
pub use traits::{ClientError, LightningClient};
