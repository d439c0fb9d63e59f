use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Json;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::mount::MountStatus;
use crate::orchestrator::session::SessionStatus;
use crate::orchestrator::metrics::MetricsSnapshot;
use crate::registry::ServiceSnapshot;
use crate::safety::{ObservatoryState, SafetyStatus};
use crate::alerts::Alert;
use crate::tools::{Params, ToolResult};
use crate::web::{AppState, ApiResponse};

pub type ApiResult<T> = Result<Json<ApiResponse<T>>, (StatusCode, Json<ApiResponse<()>>)>;

#[derive(Debug, Clone, Serialize)]
pub struct StatusResponse {
    pub observatory_state: ObservatoryState,
    pub session: SessionStatus,
    pub mount: Option<MountStatus>,
}

pub async fn get_status(State(state): State<AppState>) -> ApiResult<StatusResponse> {
    let observatory_state = state.orchestrator.safety.observatory_state().await;
    let session = state.orchestrator.sessions.status().await;
    let mount = match state.orchestrator.mount.get_status().await {
        Ok(status) => Some(status),
        Err(err) => {
            warn!(error = %err, "mount status unavailable for /api/status");
            None
        }
    };

    Ok(Json(ApiResponse::success(StatusResponse {
        observatory_state,
        session,
        mount,
    })))
}

pub async fn get_safety(State(state): State<AppState>) -> ApiResult<SafetyStatus> {
    let status = state.orchestrator.safety.evaluate().await;
    Ok(Json(ApiResponse::success(status)))
}

pub async fn get_services(State(state): State<AppState>) -> ApiResult<Vec<ServiceSnapshot>> {
    let services = state.orchestrator.registry.list().await;
    Ok(Json(ApiResponse::success(services)))
}

pub async fn get_metrics(State(state): State<AppState>) -> ApiResult<MetricsSnapshot> {
    let snapshot = state.orchestrator.metrics.snapshot().await;
    Ok(Json(ApiResponse::success(snapshot)))
}

#[derive(Debug, Deserialize)]
pub struct AlertsQuery {
    #[serde(default = "default_alert_limit")]
    pub limit: usize,
}

fn default_alert_limit() -> usize {
    50
}

pub async fn get_alerts(
    axum::extract::Query(query): axum::extract::Query<AlertsQuery>,
    State(state): State<AppState>,
) -> ApiResult<Vec<Alert>> {
    let alerts = state.orchestrator.alerts.recent(query.limit).await;
    Ok(Json(ApiResponse::success(alerts)))
}

#[derive(Debug, Deserialize)]
pub struct AckRequest {
    pub user: String,
}

pub async fn ack_alert(
    Path(id): Path<String>,
    State(state): State<AppState>,
    Json(body): Json<AckRequest>,
) -> ApiResult<bool> {
    let acknowledged = state.orchestrator.alerts.acknowledge(&id, &body.user).await;
    if !acknowledged {
        return Err((
            StatusCode::NOT_FOUND,
            Json(ApiResponse::error(format!("no alert with id '{id}'"))),
        ));
    }
    Ok(Json(ApiResponse::success(true)))
}

pub async fn run_tool(
    Path(name): Path<String>,
    State(state): State<AppState>,
    Json(params): Json<Params>,
) -> ApiResult<ToolResult> {
    info!(tool = %name, "tool invoked via web API");
    let result = state.orchestrator.tools.execute(&name, params).await;
    Ok(Json(ApiResponse::success(result)))
}

#[derive(Debug, Deserialize)]
pub struct ShutdownRequest {
    #[serde(default = "default_true")]
    pub safe: bool,
}

fn default_true() -> bool {
    true
}

pub async fn shutdown(
    State(state): State<AppState>,
    body: Option<Json<ShutdownRequest>>,
) -> ApiResult<()> {
    let safe = body.map(|Json(req)| req.safe).unwrap_or(true);
    info!(safe, "shutdown requested via web API");
    state.orchestrator.shutdown(safe).await;
    Ok(Json(ApiResponse::success(())))
}
