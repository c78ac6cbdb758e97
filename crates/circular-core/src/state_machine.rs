use std::fmt;

use crate::error::CoreError;

/// States of a single rebalance attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum RebalanceState {
    /// Nothing requested yet.
    Idle,
    /// A route has been requested from the router.
    RouteRequested,
    /// The router returned an interior path.
    RouteFound,
    /// The router found nothing under the current hop limit.
    NoRouteFound,
    /// The composed route is within the fee ceiling.
    FeeAcceptable,
    /// The composed route exceeds the fee ceiling. Final state.
    FeeTooHigh,
    /// The payment has been handed to the Lightning node.
    PaymentSent,
    /// The payment settled. Final state.
    PaymentSucceeded,
    /// The payment failed or timed out. Final state.
    PaymentFailed,
}

impl RebalanceState {
    /// Whether this is a final (terminal) state.
    pub fn is_final(&self) -> bool {
        matches!(
            self,
            Self::FeeTooHigh | Self::PaymentSucceeded | Self::PaymentFailed
        )
    }
}

impl fmt::Display for RebalanceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "Idle"),
            Self::RouteRequested => write!(f, "RouteRequested"),
            Self::RouteFound => write!(f, "RouteFound"),
            Self::NoRouteFound => write!(f, "NoRouteFound"),
            Self::FeeAcceptable => write!(f, "FeeAcceptable"),
            Self::FeeTooHigh => write!(f, "FeeTooHigh"),
            Self::PaymentSent => write!(f, "PaymentSent"),
            Self::PaymentSucceeded => write!(f, "PaymentSucceeded"),
            Self::PaymentFailed => write!(f, "PaymentFailed"),
        }
    }
}

/// Events that drive a rebalance attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RebalanceEvent {
    /// Ask the router for a path (also used to retry with more hops).
    RequestRoute,
    RouteFound,
    RouteNotFound,
    FeeAccepted,
    FeeRejected,
    PaymentDispatched,
    PaymentSucceeded,
    PaymentFailed,
}

/// Valid transitions:
/// - Idle → RouteRequested (RequestRoute)
/// - RouteRequested → RouteFound (RouteFound)
/// - RouteRequested → NoRouteFound (RouteNotFound)
/// - NoRouteFound → RouteRequested (RequestRoute)
/// - RouteFound → FeeAcceptable (FeeAccepted)
/// - RouteFound → FeeTooHigh (FeeRejected)
/// - FeeAcceptable → PaymentSent (PaymentDispatched)
/// - PaymentSent → PaymentSucceeded (PaymentSucceeded)
/// - PaymentSent → PaymentFailed (PaymentFailed)
pub struct RebalanceStateMachine;

impl RebalanceStateMachine {
    /// Attempt a state transition based on an event.
    pub fn transition(
        current: RebalanceState,
        event: RebalanceEvent,
    ) -> Result<RebalanceState, CoreError> {
        let new_state = match (current, event) {
            (RebalanceState::Idle, RebalanceEvent::RequestRoute) => RebalanceState::RouteRequested,
            (RebalanceState::NoRouteFound, RebalanceEvent::RequestRoute) => {
                RebalanceState::RouteRequested
            }

            (RebalanceState::RouteRequested, RebalanceEvent::RouteFound) => {
                RebalanceState::RouteFound
            }
            (RebalanceState::RouteRequested, RebalanceEvent::RouteNotFound) => {
                RebalanceState::NoRouteFound
            }

            (RebalanceState::RouteFound, RebalanceEvent::FeeAccepted) => {
                RebalanceState::FeeAcceptable
            }
            (RebalanceState::RouteFound, RebalanceEvent::FeeRejected) => RebalanceState::FeeTooHigh,

            (RebalanceState::FeeAcceptable, RebalanceEvent::PaymentDispatched) => {
                RebalanceState::PaymentSent
            }

            (RebalanceState::PaymentSent, RebalanceEvent::PaymentSucceeded) => {
                RebalanceState::PaymentSucceeded
            }
            (RebalanceState::PaymentSent, RebalanceEvent::PaymentFailed) => {
                RebalanceState::PaymentFailed
            }

            _ => {
                let target = match event {
                    RebalanceEvent::RequestRoute => RebalanceState::RouteRequested,
                    RebalanceEvent::RouteFound => RebalanceState::RouteFound,
                    RebalanceEvent::RouteNotFound => RebalanceState::NoRouteFound,
                    RebalanceEvent::FeeAccepted => RebalanceState::FeeAcceptable,
                    RebalanceEvent::FeeRejected => RebalanceState::FeeTooHigh,
                    RebalanceEvent::PaymentDispatched => RebalanceState::PaymentSent,
                    RebalanceEvent::PaymentSucceeded => RebalanceState::PaymentSucceeded,
                    RebalanceEvent::PaymentFailed => RebalanceState::PaymentFailed,
                };
                return Err(CoreError::InvalidStateTransition {
                    from: current,
                    to: target,
                });
            }
        };

        tracing::debug!(
            from = %current,
            to = %new_state,
            event = ?event,
            "rebalance state transition"
        );

        Ok(new_state)
    }

    /// Check if a transition is valid without performing it.
    pub fn can_transition(current: RebalanceState, event: RebalanceEvent) -> bool {
        Self::transition(current, event).is_ok()
    }
}
