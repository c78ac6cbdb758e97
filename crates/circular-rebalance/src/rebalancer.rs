use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use circular_core::{
    Msat, NodeId, RebalanceEvent, RebalanceState, RebalanceStateMachine, ShortChannelId,
};
use circular_routing::{ChannelSide, PathFinder, PrettyRoute, Route, RoutingError, SharedGraph};
use serde::{Deserialize, Serialize};

use crate::error::RebalanceError;
use crate::secret::{PaymentSecret, Preimage};
use crate::traits::{ClientError, LightningClient};

/// Tuning knobs for the rebalance engine.
#[derive(Debug, Clone)]
pub struct RebalanceConfig {
    /// Largest interior hop limit the retry loop widens to.
    pub max_hops_ceiling: usize,
    /// How much the hop limit grows after each `NoRouteFound`.
    pub hop_step: usize,
    /// CLTV delta required by the final hop back into our node.
    pub final_cltv_delta: u32,
    pub payment_timeout: Duration,
    /// Time budget for the whole route search loop.
    pub attempt_deadline: Duration,
}

impl Default for RebalanceConfig {
    fn default() -> Self {
        Self {
            max_hops_ceiling: 10,
            hop_step: 1,
            final_cltv_delta: 9,
            payment_timeout: Duration::from_secs(60),
            attempt_deadline: Duration::from_secs(300),
        }
    }
}

/// Move `amount` out through `out_scid` and back in through `in_scid`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RebalanceRequest {
    pub out_scid: ShortChannelId,
    pub in_scid: ShortChannelId,
    pub amount: Msat,
    pub max_ppm: u64,
    /// Hop limit of the first route search between the two peers. `0`
    /// searches without a limit and never widens.
    pub initial_max_hops: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct RebalanceOutcome {
    pub route: Route,
    pub preimage: Preimage,
    /// Number of route searches it took.
    pub attempts: usize,
}

/// Drives a single rebalance from route search to payment.
pub struct Rebalancer {
    graph: Arc<SharedGraph>,
    client: Arc<dyn LightningClient>,
    self_id: NodeId,
    config: RebalanceConfig,
}

impl Rebalancer {
    pub fn new(
        graph: Arc<SharedGraph>,
        client: Arc<dyn LightningClient>,
        self_id: NodeId,
        config: RebalanceConfig,
    ) -> Self {
        Self {
            graph,
            client,
            self_id,
            config,
        }
    }

    pub fn self_id(&self) -> &NodeId {
        &self.self_id
    }

    pub fn config(&self) -> &RebalanceConfig {
        &self.config
    }

    /// Run a rebalance.
    ///
    /// The route search between our two peers never passes through our own
    /// node and is retried with a wider hop limit while no route is found.
    /// A route above `max_ppm` is rejected before any payment is attempted.
    /// The graph's liquidity estimates are not touched; the next refresh
    /// re-derives them.
    pub async fn rebalance(
        &self,
        request: &RebalanceRequest,
    ) -> Result<RebalanceOutcome, RebalanceError> {
        if request.amount == 0 {
            return Err(RebalanceError::InvalidRequest("amount must be positive".into()));
        }
        if request.out_scid == request.in_scid {
            return Err(RebalanceError::InvalidRequest(format!(
                "outgoing and incoming channel are both {}",
                request.out_scid
            )));
        }

        let out_channel = self
            .graph
            .find_own_channel(&self.self_id, &request.out_scid, ChannelSide::Outgoing)
            .map_err(|_| RebalanceError::UnknownChannel(request.out_scid.clone()))?;
        let in_channel = self
            .graph
            .find_own_channel(&self.self_id, &request.in_scid, ChannelSide::Incoming)
            .map_err(|_| RebalanceError::UnknownChannel(request.in_scid.clone()))?;

        let from = out_channel.destination.clone();
        let to = in_channel.source.clone();
        tracing::info!(
            out_scid = %request.out_scid,
            in_scid = %request.in_scid,
            amount = request.amount,
            max_ppm = request.max_ppm,
            "starting rebalance"
        );

        let started = Instant::now();
        let mut state = RebalanceState::Idle;
        let (mut route, attempts) = self.search(request, &from, &to, &mut state, started)?;

        route.prepend(out_channel.clone());
        route.append(in_channel);
        route.set_final_delay(self.config.final_cltv_delta);

        let pretty = PrettyRoute::new(&route, |node| self.graph.alias(node));
        tracing::debug!("candidate route\n{}", pretty);
        tracing::info!(route = %pretty.simple(), attempts, "route found");

        let fee_ppm = route.fee_ppm();
        if fee_ppm > request.max_ppm {
            state = RebalanceStateMachine::transition(state, RebalanceEvent::FeeRejected)?;
            tracing::info!(
                fee_ppm,
                max_ppm = request.max_ppm,
                state = %state,
                "route too expensive"
            );
            return Err(RebalanceError::RouteTooExpensive {
                fee_ppm,
                max_ppm: request.max_ppm,
            });
        }

        let needed = route.sent_amount();
        if !out_channel.can_use(needed) {
            return Err(RebalanceError::InsufficientLiquidity {
                needed,
                available: out_channel.liquidity,
            });
        }
        state = RebalanceStateMachine::transition(state, RebalanceEvent::FeeAccepted)?;

        let secret = PaymentSecret::generate(&mut rand::thread_rng());
        state = RebalanceStateMachine::transition(state, RebalanceEvent::PaymentDispatched)?;
        tracing::info!(
            payment_hash = %secret.payment_hash_hex(),
            hops = route.hop_count(),
            fee = route.fee(),
            fee_ppm,
            "sending circular payment"
        );

        match self
            .client
            .send_pay(&route, &secret, self.config.payment_timeout)
            .await
        {
            Ok(preimage) => {
                RebalanceStateMachine::transition(state, RebalanceEvent::PaymentSucceeded)?;
                tracing::info!(
                    payment_hash = %secret.payment_hash_hex(),
                    fee = route.fee(),
                    attempts,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "rebalance succeeded"
                );
                Ok(RebalanceOutcome {
                    route,
                    preimage,
                    attempts,
                })
            }
            Err(e) => {
                RebalanceStateMachine::transition(state, RebalanceEvent::PaymentFailed)?;
                match e {
                    ClientError::Timeout => {
                        tracing::warn!(payment_hash = %secret.payment_hash_hex(), "payment timed out");
                        Err(RebalanceError::PaymentTimeout)
                    }
                    other => {
                        tracing::warn!(
                            payment_hash = %secret.payment_hash_hex(),
                            error = %other,
                            "payment failed"
                        );
                        Err(RebalanceError::TemporaryFailure)
                    }
                }
            }
        }
    }

    /// Route search between our two peers, widening the hop limit on every
    /// `NoRouteFound` until the ceiling. Returns the interior route and the
    /// number of searches made.
    fn search(
        &self,
        request: &RebalanceRequest,
        from: &NodeId,
        to: &NodeId,
        state: &mut RebalanceState,
        started: Instant,
    ) -> Result<(Route, usize), RebalanceError> {
        // Both channels lead to the same peer: nothing to route in between.
        if from == to {
            *state = RebalanceStateMachine::transition(*state, RebalanceEvent::RequestRoute)?;
            *state = RebalanceStateMachine::transition(*state, RebalanceEvent::RouteFound)?;
            return Ok((Route::new(from.clone(), to.clone(), request.amount, Vec::new()), 1));
        }

        let exclude: HashSet<NodeId> = HashSet::from([self.self_id.clone()]);
        let ceiling = self.config.max_hops_ceiling.max(request.initial_max_hops);
        let step = self.config.hop_step.max(1);
        let mut max_hops = request.initial_max_hops;
        let mut attempts = 0;

        loop {
            if started.elapsed() >= self.config.attempt_deadline {
                tracing::warn!(attempts, "rebalance deadline exceeded");
                return Err(RebalanceError::DeadlineExceeded { attempts });
            }
            attempts += 1;
            *state = RebalanceStateMachine::transition(*state, RebalanceEvent::RequestRoute)?;

            let finder = PathFinder::with_max_hops(max_hops);
            match self
                .graph
                .get_route(&finder, from, to, request.amount, &exclude)
            {
                Ok(route) => {
                    *state = RebalanceStateMachine::transition(*state, RebalanceEvent::RouteFound)?;
                    return Ok((route, attempts));
                }
                Err(RoutingError::NoRouteFound { .. }) => {
                    *state =
                        RebalanceStateMachine::transition(*state, RebalanceEvent::RouteNotFound)?;
                    if max_hops == 0 || max_hops >= ceiling {
                        return Err(RebalanceError::NoRouteFound {
                            from: from.clone(),
                            to: to.clone(),
                            max_hops,
                        });
                    }
                    max_hops = max_hops.saturating_add(step).min(ceiling);
                    tracing::debug!(max_hops, attempts, "no route, widening hop limit");
                }
                Err(e) => return Err(e.into()),
            }
        }
    }
}
