//! HTTP API server for the Circular node.
//!
//! Provides REST endpoints for node status, peer listing, dry-run routing and
//! rebalancing.

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;

use circular_core::{Msat, NodeId, ShortChannelId};
use circular_rebalance::{Preimage, RebalanceError, RebalanceRequest};
use circular_routing::{PrettyRoute, Route, RoutingError};

use crate::node::{CircularNode, NodeStatus};

// --- Request / response types ---

#[derive(Serialize)]
pub struct StatusResponse {
    pub version: String,
    #[serde(flatten)]
    pub status: NodeStatus,
}

#[derive(Serialize)]
pub struct PeerInfo {
    pub id: NodeId,
    pub alias: String,
    pub connected: bool,
    pub num_channels: u32,
}

#[derive(Serialize)]
pub struct PeersResponse {
    pub peers: Vec<PeerInfo>,
    pub count: usize,
}

#[derive(Deserialize)]
pub struct RouteRequest {
    /// Defaults to this node.
    #[serde(default)]
    pub from: Option<NodeId>,
    pub to: NodeId,
    pub amount: Msat,
    #[serde(default)]
    pub max_hops: Option<usize>,
}

#[derive(Serialize)]
pub struct RouteResponse {
    pub summary: String,
    pub fee: Msat,
    pub fee_ppm: u64,
    pub total_delay: u32,
    pub route: Route,
}

#[derive(Deserialize)]
pub struct RebalanceBody {
    pub out_scid: ShortChannelId,
    pub in_scid: ShortChannelId,
    pub amount: Msat,
    #[serde(default)]
    pub max_ppm: Option<u64>,
    #[serde(default)]
    pub initial_max_hops: Option<usize>,
}

#[derive(Serialize)]
pub struct RebalanceResponse {
    pub summary: String,
    pub fee: Msat,
    pub fee_ppm: u64,
    pub attempts: usize,
    pub preimage: Preimage,
    pub route: Route,
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn api_error(status: StatusCode, error: impl ToString) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: error.to_string(),
        }),
    )
}

pub fn routing_status(e: &RoutingError) -> StatusCode {
    match e {
        RoutingError::NoRouteFound { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        RoutingError::SameEndpoints(_) | RoutingError::ZeroAmount => StatusCode::BAD_REQUEST,
        RoutingError::UnknownChannel(_) => StatusCode::NOT_FOUND,
    }
}

pub fn rebalance_status(e: &RebalanceError) -> StatusCode {
    match e {
        RebalanceError::NoRouteFound { .. }
        | RebalanceError::RouteTooExpensive { .. }
        | RebalanceError::InsufficientLiquidity { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        RebalanceError::PaymentTimeout | RebalanceError::DeadlineExceeded { .. } => {
            StatusCode::GATEWAY_TIMEOUT
        }
        RebalanceError::TemporaryFailure => StatusCode::BAD_GATEWAY,
        RebalanceError::UnknownChannel(_) => StatusCode::NOT_FOUND,
        RebalanceError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
        RebalanceError::Routing(e) => routing_status(e),
        RebalanceError::Core(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

// --- Handlers ---

async fn handle_status(State(node): State<Arc<CircularNode>>) -> Json<StatusResponse> {
    Json(StatusResponse {
        version: env!("CARGO_PKG_VERSION").to_string(),
        status: node.status(),
    })
}

async fn handle_peers(State(node): State<Arc<CircularNode>>) -> Json<PeersResponse> {
    let peers: Vec<PeerInfo> = node
        .peers()
        .list()
        .into_iter()
        .map(|p| PeerInfo {
            alias: node.graph().alias(&p.id),
            id: p.id,
            connected: p.connected,
            num_channels: p.num_channels,
        })
        .collect();
    let count = peers.len();
    Json(PeersResponse { peers, count })
}

async fn handle_route(
    State(node): State<Arc<CircularNode>>,
    Json(req): Json<RouteRequest>,
) -> Result<Json<RouteResponse>, ApiError> {
    let route = node
        .route(req.from.as_ref(), &req.to, req.amount, req.max_hops)
        .map_err(|e| api_error(routing_status(&e), e))?;
    let summary = PrettyRoute::new(&route, |n| node.graph().alias(n)).simple();
    Ok(Json(RouteResponse {
        summary,
        fee: route.fee(),
        fee_ppm: route.fee_ppm(),
        total_delay: route.total_delay(),
        route,
    }))
}

async fn handle_rebalance(
    State(node): State<Arc<CircularNode>>,
    Json(body): Json<RebalanceBody>,
) -> Result<Json<RebalanceResponse>, ApiError> {
    let defaults = &node.config().rebalance;
    let request = RebalanceRequest {
        out_scid: body.out_scid,
        in_scid: body.in_scid,
        amount: body.amount,
        max_ppm: body.max_ppm.unwrap_or(defaults.default_max_ppm),
        initial_max_hops: body
            .initial_max_hops
            .unwrap_or(defaults.default_initial_max_hops),
    };

    let outcome = node.rebalance(&request).await.map_err(|e| {
        tracing::info!(error = %e, "rebalance request failed");
        api_error(rebalance_status(&e), e)
    })?;
    let summary = PrettyRoute::new(&outcome.route, |n| node.graph().alias(n)).simple();
    Ok(Json(RebalanceResponse {
        summary,
        fee: outcome.route.fee(),
        fee_ppm: outcome.route.fee_ppm(),
        attempts: outcome.attempts,
        preimage: outcome.preimage,
        route: outcome.route,
    }))
}

// --- Server ---

pub fn build_router(node: Arc<CircularNode>) -> Router {
    Router::new()
        .route("/api/v1/status", get(handle_status))
        .route("/api/v1/peers", get(handle_peers))
        .route("/api/v1/route", post(handle_route))
        .route("/api/v1/rebalance", post(handle_rebalance))
        .with_state(node)
}

pub async fn start_api_server(
    listen_addr: SocketAddr,
    node: Arc<CircularNode>,
) -> anyhow::Result<()> {
    let app = build_router(node);
    let listener = tokio::net::TcpListener::bind(listen_addr).await?;
    tracing::info!(%listen_addr, "HTTP API server started");
    axum::serve(listener, app).await?;
    Ok(())
}
