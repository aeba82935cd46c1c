//! REST handlers for dispatch runs, campaign reads, and operational probes.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use dispatch_core::error::DispatchError;
use dispatch_core::types::{Campaign, CampaignMetric, Contact, DispatchRequest, DispatchSummary};
use dispatch_engine::CampaignDispatchEngine;
use dispatch_store::EntityStore;
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, warn};

/// Shared application state for REST handlers.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<CampaignDispatchEngine>,
    pub store: Arc<dyn EntityStore>,
    pub node_id: String,
    pub start_time: Instant,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

#[derive(Debug, Serialize)]
pub struct DispatchResponse {
    pub success: bool,
    pub results: DispatchSummary,
    pub message: String,
}

/// Map an engine error onto its HTTP status.
pub fn error_status(err: &DispatchError) -> StatusCode {
    match err {
        DispatchError::Unauthorized => StatusCode::UNAUTHORIZED,
        DispatchError::BadRequest(_) => StatusCode::BAD_REQUEST,
        DispatchError::NotFound(_) => StatusCode::NOT_FOUND,
        DispatchError::Precondition(_) => StatusCode::PRECONDITION_FAILED,
        DispatchError::Transport(_)
        | DispatchError::Serialization(_)
        | DispatchError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

// ─── Dispatch ──────────────────────────────────────────────────────────────

/// POST /api/v1/dispatch — run a campaign dispatch.
pub async fn handle_dispatch(
    State(state): State<AppState>,
    Json(req): Json<DispatchRequest>,
) -> Result<Json<DispatchResponse>, (StatusCode, Json<ErrorBody>)> {
    match state.engine.dispatch(&req) {
        Ok(results) => {
            let message = if req.test_mode {
                format!(
                    "Campaign dispatched (test mode): {} sent, {} failed",
                    results.sent, results.failed
                )
            } else {
                format!(
                    "Campaign dispatched: {} sent, {} failed",
                    results.sent, results.failed
                )
            };
            Ok(Json(DispatchResponse {
                success: true,
                results,
                message,
            }))
        }
        Err(e) => {
            let status = error_status(&e);
            if status.is_server_error() {
                error!(campaign_id = %req.campaign_id, error = %e, "Dispatch failed");
                metrics::counter!("api.errors").increment(1);
            } else {
                warn!(campaign_id = %req.campaign_id, error = %e, "Dispatch rejected");
            }
            Err((
                status,
                Json(ErrorBody {
                    error: e.to_string(),
                }),
            ))
        }
    }
}

// ─── Campaign / contact reads ──────────────────────────────────────────────

pub async fn list_campaigns(State(state): State<AppState>) -> Json<Vec<Campaign>> {
    Json(state.store.list_campaigns())
}

pub async fn get_campaign(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Campaign>, StatusCode> {
    state
        .store
        .get_campaign(&id)
        .map(Json)
        .map_err(|_| StatusCode::NOT_FOUND)
}

pub async fn campaign_metrics(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Vec<CampaignMetric>>, StatusCode> {
    // 404 for an unknown campaign rather than an empty list.
    state
        .store
        .get_campaign(&id)
        .map_err(|_| StatusCode::NOT_FOUND)?;
    Ok(Json(state.store.metrics_for_campaign(&id)))
}

pub async fn list_contacts(State(state): State<AppState>) -> Json<Vec<Contact>> {
    Json(state.store.list_contacts())
}

// ─── Auth ──────────────────────────────────────────────────────────────────

pub async fn handle_login(
    Json(req): Json<crate::auth::LoginRequest>,
) -> Result<Json<crate::auth::LoginResponse>, (StatusCode, Json<ErrorBody>)> {
    match crate::auth::authenticate(&req) {
        Ok(resp) => Ok(Json(resp)),
        Err(msg) => Err((StatusCode::UNAUTHORIZED, Json(ErrorBody { error: msg }))),
    }
}

// ─── Operational probes ────────────────────────────────────────────────────

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub node_id: String,
    pub uptime_secs: u64,
}

/// GET /health — health check endpoint.
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        node_id: state.node_id.clone(),
        uptime_secs: state.start_time.elapsed().as_secs(),
    })
}

/// GET /ready — readiness probe for Kubernetes.
pub async fn readiness() -> StatusCode {
    StatusCode::OK
}

/// GET /live — liveness probe for Kubernetes.
pub async fn liveness() -> StatusCode {
    StatusCode::OK
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_taxonomy_maps_to_distinct_statuses() {
        assert_eq!(
            error_status(&DispatchError::Unauthorized),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            error_status(&DispatchError::BadRequest("x".into())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            error_status(&DispatchError::NotFound("x".into())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            error_status(&DispatchError::Precondition("x".into())),
            StatusCode::PRECONDITION_FAILED
        );
        assert_eq!(
            error_status(&DispatchError::Internal(anyhow::anyhow!("boom"))),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
