//! HTTP API handlers for the oracle network

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use common::{Amount, AssetId, OracleId};
use observability::ServerMetrics;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::error::{ErrorKind, NetworkError, OperationContext, OperationError};
use crate::event::SequencedEvent;
use crate::network::OracleNetwork;
use crate::registry::authorize;
use crate::types::{
    AssetFeed, NetworkStats, OracleInfo, OraclePerformance, Registration, ReportSubmission,
    RoundOutcome, SubmitReceipt,
};

/// Header carrying the acting oracle for owner-only operations
pub const CALLER_HEADER: &str = "x-oracle-id";

/// Shared state for the API; one writer at a time
#[derive(Clone)]
pub struct ApiState {
    pub network: Arc<RwLock<OracleNetwork>>,
    pub metrics: ServerMetrics,
    clock: fn() -> DateTime<Utc>,
}

impl ApiState {
    pub fn new(network: Arc<RwLock<OracleNetwork>>) -> Self {
        Self {
            network,
            metrics: ServerMetrics::new("http"),
            clock: Utc::now,
        }
    }

    /// Replace the wall clock used to timestamp operations
    pub fn with_clock(mut self, clock: fn() -> DateTime<Utc>) -> Self {
        self.clock = clock;
        self
    }

    fn now(&self) -> DateTime<Utc> {
        (self.clock)()
    }
}

/// Error response: `{ kind, operation, message }` with a matching status
#[derive(Debug)]
pub struct ApiError(pub OperationError);

impl From<OperationError> for ApiError {
    fn from(err: OperationError) -> Self {
        Self(err)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        if self.0.source.is_not_found() {
            return StatusCode::NOT_FOUND;
        }
        match self.0.kind() {
            ErrorKind::Validation => StatusCode::BAD_REQUEST,
            ErrorKind::Eligibility => StatusCode::FORBIDDEN,
            ErrorKind::Timing => StatusCode::CONFLICT,
            ErrorKind::Consensus => StatusCode::UNPROCESSABLE_ENTITY,
            ErrorKind::InvariantViolation => match self.0.source {
                NetworkError::AssetHalted { .. } => StatusCode::SERVICE_UNAVAILABLE,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = json!({
            "success": false,
            "kind": self.0.kind(),
            "operation": self.0.operation,
            "message": self.0.source.to_string(),
        });
        (status, Json(body)).into_response()
    }
}

pub type ApiResult<T> = Result<Json<T>, ApiError>;

fn caller(headers: &HeaderMap, operation: &'static str) -> Result<OracleId, ApiError> {
    headers
        .get(CALLER_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(OracleId::new)
        .ok_or_else(|| {
            ApiError(OperationError::new(
                operation,
                NetworkError::InvalidInput(format!("missing {} header", CALLER_HEADER)),
            ))
        })
}

#[derive(Debug, Deserialize)]
pub struct AmountRequest {
    pub amount: Amount,
}

#[derive(Debug, Serialize)]
pub struct WithdrawResponse {
    pub oracle: OracleId,
    pub amount: Amount,
    pub balance: Amount,
}

#[derive(Debug, Serialize)]
pub struct FundResponse {
    pub asset: AssetId,
    pub amount: Amount,
    pub accrued: Amount,
}

#[derive(Debug, Serialize)]
pub struct CloseResponse {
    pub asset: AssetId,
    /// `None` when no round was due
    pub finalized: Option<RoundOutcome>,
}

#[derive(Debug, Deserialize)]
pub struct EventsQuery {
    #[serde(default)]
    pub from: Option<u64>,
}

#[derive(Debug, Serialize)]
pub struct EventsResponse {
    pub events: Vec<SequencedEvent>,
    /// Last assigned sequence number; poll again with `from = last + 1`
    pub last_sequence: u64,
}

/// Health check
pub async fn health() -> Json<serde_json::Value> {
    Json(json!({
        "status": "healthy",
        "service": "oraclenet"
    }))
}

/// Register an oracle and lock its stake
pub async fn register_oracle(
    State(state): State<ApiState>,
    Json(req): Json<Registration>,
) -> Result<(StatusCode, Json<OracleInfo>), ApiError> {
    let now = state.now();
    let mut network = state.network.write().await;
    let info = network.register_oracle(&req, now).during("register_oracle")?;
    Ok((StatusCode::CREATED, Json(info)))
}

/// Submit a price report; the caller must be the reporting oracle
pub async fn submit_report(
    State(state): State<ApiState>,
    headers: HeaderMap,
    Json(req): Json<ReportSubmission>,
) -> ApiResult<SubmitReceipt> {
    let caller = caller(&headers, "report_price")?;
    authorize(&caller, &req.oracle).during("report_price")?;
    let now = state.now();
    let mut network = state.network.write().await;
    let receipt = network.report_price(req, now).during("report_price")?;
    Ok(Json(receipt))
}

/// All feeds, published or not
pub async fn list_feeds(State(state): State<ApiState>) -> Json<Vec<AssetFeed>> {
    let network = state.network.read().await;
    Json(network.feeds())
}

/// Latest consensus value for one asset
pub async fn get_feed(
    State(state): State<ApiState>,
    Path(asset): Path<String>,
) -> ApiResult<AssetFeed> {
    let network = state.network.read().await;
    let feed = network.latest(&AssetId::new(asset)).during("latest")?;
    Ok(Json(feed))
}

/// Fund the next consensus round of an asset
pub async fn fund_feed(
    State(state): State<ApiState>,
    Path(asset): Path<String>,
    Json(req): Json<AmountRequest>,
) -> ApiResult<FundResponse> {
    let now = state.now();
    let asset = AssetId::new(asset);
    let mut network = state.network.write().await;
    let accrued = network
        .fund_request(&asset, req.amount, now)
        .during("fund_request")?;
    Ok(Json(FundResponse {
        asset,
        amount: req.amount,
        accrued,
    }))
}

/// Finalize the asset's round if its deadline has passed
pub async fn close_feed(
    State(state): State<ApiState>,
    Path(asset): Path<String>,
) -> ApiResult<CloseResponse> {
    let now = state.now();
    let asset = AssetId::new(asset);
    let mut network = state.network.write().await;
    let finalized = network.close_round(&asset, now).during("close_round")?;
    Ok(Json(CloseResponse { asset, finalized }))
}

/// Network statistics
pub async fn get_stats(State(state): State<ApiState>) -> Json<NetworkStats> {
    let network = state.network.read().await;
    Json(network.network_stats())
}

/// Active oracles
pub async fn active_oracles(State(state): State<ApiState>) -> Json<Vec<OracleInfo>> {
    let network = state.network.read().await;
    Json(network.active_oracles())
}

pub async fn get_oracle(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> ApiResult<OracleInfo> {
    let network = state.network.read().await;
    let info = network.oracle(&OracleId::new(id)).during("oracle")?;
    Ok(Json(info))
}

pub async fn oracle_performance(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> ApiResult<OraclePerformance> {
    let network = state.network.read().await;
    let performance = network
        .oracle_performance(&OracleId::new(id))
        .during("oracle_performance")?;
    Ok(Json(performance))
}

/// Withdraw free balance; the caller must be the oracle itself
pub async fn withdraw_stake(
    State(state): State<ApiState>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(req): Json<AmountRequest>,
) -> ApiResult<WithdrawResponse> {
    let caller = caller(&headers, "withdraw_stake")?;
    let oracle = OracleId::new(id);
    let now = state.now();
    let mut network = state.network.write().await;
    let balance = network
        .withdraw_stake(&caller, &oracle, req.amount, now)
        .during("withdraw_stake")?;
    Ok(Json(WithdrawResponse {
        oracle,
        amount: req.amount,
        balance,
    }))
}

/// Poll the event log
pub async fn list_events(
    State(state): State<ApiState>,
    Query(query): Query<EventsQuery>,
) -> Json<EventsResponse> {
    let network = state.network.read().await;
    let from = query.from.unwrap_or(1);
    Json(EventsResponse {
        events: network.events_since(from).to_vec(),
        last_sequence: network.events().sequence(),
    })
}
