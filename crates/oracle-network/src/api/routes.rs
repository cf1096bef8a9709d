//! HTTP routes for the oracle network API

use axum::{
    extract::{Request, State},
    middleware::{self, Next},
    response::Response,
    routing::{get, post},
    Router,
};
use observability::ServerMetrics;
use std::time::Instant;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use super::handlers::*;

async fn track_requests(
    State(metrics): State<ServerMetrics>,
    request: Request,
    next: Next,
) -> Response {
    let start = Instant::now();
    metrics.connection_opened();
    let response = next.run(request).await;
    metrics.connection_closed();
    metrics.record_request(start.elapsed(), response.status().as_u16());
    response
}

/// Create the oracle network router
///
/// Asset ids contain `/`; encode it as `%2F` in paths (`/api/v1/feeds/ETH%2FUSD`).
///
/// Routes:
/// - GET  /api/v1/health                     - Health check
/// - POST /api/v1/oracles                    - Register oracle
/// - GET  /api/v1/oracles/active             - Active oracles
/// - GET  /api/v1/oracles/:id                - Oracle details
/// - GET  /api/v1/oracles/:id/performance    - Reputation and counters
/// - POST /api/v1/oracles/:id/withdraw       - Withdraw free balance (x-oracle-id)
/// - POST /api/v1/reports                    - Submit price report (x-oracle-id)
/// - GET  /api/v1/feeds                      - All feeds
/// - GET  /api/v1/feeds/:asset               - Latest consensus value
/// - POST /api/v1/feeds/:asset/fund          - Pay a request fee
/// - POST /api/v1/feeds/:asset/close         - Finalize a round past its deadline
/// - GET  /api/v1/stats                      - Network statistics
/// - GET  /api/v1/events?from=N              - Event log from sequence N
pub fn create_router(state: ApiState) -> Router {
    let metrics = state.metrics.clone();

    Router::new()
        .route("/api/v1/health", get(health))
        // Oracles
        .route("/api/v1/oracles", post(register_oracle))
        .route("/api/v1/oracles/active", get(active_oracles))
        .route("/api/v1/oracles/:id", get(get_oracle))
        .route("/api/v1/oracles/:id/performance", get(oracle_performance))
        .route("/api/v1/oracles/:id/withdraw", post(withdraw_stake))
        // Reports and feeds
        .route("/api/v1/reports", post(submit_report))
        .route("/api/v1/feeds", get(list_feeds))
        .route("/api/v1/feeds/:asset", get(get_feed))
        .route("/api/v1/feeds/:asset/fund", post(fund_feed))
        .route("/api/v1/feeds/:asset/close", post(close_feed))
        // Network
        .route("/api/v1/stats", get(get_stats))
        .route("/api/v1/events", get(list_events))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(middleware::from_fn_with_state(metrics, track_requests)),
        )
        .with_state(state)
}
