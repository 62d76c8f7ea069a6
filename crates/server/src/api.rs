//! Monitoring API handlers and the error → response mapping.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json};
use serde::{Deserialize, Serialize};
use tracing::{error, warn};

use switchyard_core::{Error, Log};
use switchyard_monitor::{MainOverview, StationOverviewResponse};
use switchyard_stream::logs::LogWindow;

use crate::auth::AuthContext;
use crate::state::AppState;

// ── Error mapping ───────────────────────────────────────────────────

#[derive(Serialize)]
pub struct ErrorBody {
    pub message: String,
}

/// Wraps the core error taxonomy for axum. Showable errors become 4xx with
/// their message; everything else is a 500.
pub struct ApiError(pub Error);

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            Error::Unauthenticated => StatusCode::UNAUTHORIZED,
            Error::EnvUnavailable(_) => {
                warn!(error = %self.0, "environment unavailable");
                StatusCode::BAD_REQUEST
            }
            e if e.is_showable() => StatusCode::BAD_REQUEST,
            _ => {
                error!(error = %self.0, "monitoring request failed");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        let body = Json(ErrorBody {
            message: self.0.to_string(),
        });
        (status, body).into_response()
    }
}

// ── Cluster info ────────────────────────────────────────────────────

#[derive(Serialize)]
pub struct ClusterInfoResponse {
    pub version: &'static str,
}

pub async fn cluster_info() -> Json<ClusterInfoResponse> {
    Json(ClusterInfoResponse {
        version: env!("CARGO_PKG_VERSION"),
    })
}

// ── Overviews ───────────────────────────────────────────────────────

pub async fn main_overview(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
) -> Result<Json<MainOverview>, ApiError> {
    let overview = state.composer.main_overview(&auth.tenant).await?;
    Ok(Json(overview))
}

#[derive(Deserialize)]
pub struct StationOverviewParams {
    pub station_name: String,
}

pub async fn station_overview(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Query(params): Query<StationOverviewParams>,
) -> Result<Json<StationOverviewResponse>, ApiError> {
    if params.station_name.trim().is_empty() {
        return Err(Error::InvalidInput("station_name is required".into()).into());
    }
    let overview = state
        .composer
        .station_overview(&auth.tenant, &params.station_name)
        .await?;
    Ok(Json(overview))
}

// ── System logs ─────────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct SystemLogsParams {
    #[serde(default = "default_log_type")]
    pub log_type: String,
    #[serde(default)]
    pub start_index: u64,
}

fn default_log_type() -> String {
    "all".to_string()
}

#[derive(Serialize)]
pub struct SystemLogsResponse {
    pub logs: Vec<Log>,
}

pub async fn system_logs(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SystemLogsParams>,
) -> Result<Json<SystemLogsResponse>, ApiError> {
    let window = if params.start_index == 0 {
        LogWindow::Tail
    } else {
        LogWindow::FromSeq(params.start_index)
    };
    let logs = state.logs.fetch(&params.log_type, window).await?;
    Ok(Json(SystemLogsResponse { logs }))
}

/// Full retained syslog as a plain-text export, oldest first.
pub async fn download_system_logs(
    State(state): State<Arc<AppState>>,
) -> Result<Response, ApiError> {
    let logs = state.logs.fetch("all", LogWindow::All).await?;
    let mut body = String::new();
    for log in logs {
        body.push_str(&format!(
            "{} [{}] {}: {}\n",
            log.time.to_rfc3339(),
            log.log_type,
            log.source,
            log.payload_text.trim_end()
        ));
    }
    Ok((
        [("content-type", "text/plain; charset=utf-8")],
        body,
    )
        .into_response())
}

// ── Replicas ────────────────────────────────────────────────────────

#[derive(Serialize)]
pub struct AvailableReplicasResponse {
    pub available_replicas: usize,
}

pub async fn available_replicas(
    State(state): State<Arc<AppState>>,
) -> Result<Json<AvailableReplicasResponse>, ApiError> {
    let available = state.probe.available_replicas().await?;
    Ok(Json(AvailableReplicasResponse {
        available_replicas: available,
    }))
}
