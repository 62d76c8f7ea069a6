//! HTTP router construction.

use std::sync::Arc;

use axum::middleware::from_fn_with_state;
use axum::routing::get;
use axum::Router;
use tower_http::cors::CorsLayer;

use crate::state::AppState;
use crate::{api, auth};

/// Assemble the monitoring routes with auth and CORS applied.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/monitoring/getClusterInfo", get(api::cluster_info))
        .route("/monitoring/getMainOverviewData", get(api::main_overview))
        .route(
            "/monitoring/getStationOverviewData",
            get(api::station_overview),
        )
        .route("/monitoring/getSystemLogs", get(api::system_logs))
        .route(
            "/monitoring/downloadSystemLogs",
            get(api::download_system_logs),
        )
        .route(
            "/monitoring/getAvailableReplicas",
            get(api::available_replicas),
        )
        .layer(from_fn_with_state(Arc::clone(&state), auth::require_session))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
