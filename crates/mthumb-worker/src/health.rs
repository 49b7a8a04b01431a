//! Health and status endpoints.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;
use metrics_exporter_prometheus::PrometheusHandle;
use mthumb_models::WorkerStatus;
use serde::Serialize;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::info;

use crate::error::{WorkerError, WorkerResult};
use crate::processor::JobProcessor;

/// Health response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: String,
}

#[derive(Clone)]
pub struct HealthState {
    processor: Arc<JobProcessor>,
    metrics: Option<PrometheusHandle>,
}

impl HealthState {
    pub fn new(processor: Arc<JobProcessor>, metrics: Option<PrometheusHandle>) -> Self {
        Self { processor, metrics }
    }
}

/// Liveness probe.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: Utc::now().to_rfc3339(),
    })
}

/// Worker status. 503 once shutdown has started, so load balancers and
/// supervisors stop counting this worker.
pub async fn status(
    State(state): State<HealthState>,
) -> Result<Json<WorkerStatus>, (StatusCode, Json<WorkerStatus>)> {
    let status = state.processor.status();
    if status.shutting_down {
        Err((StatusCode::SERVICE_UNAVAILABLE, Json(status)))
    } else {
        Ok(Json(status))
    }
}

async fn metrics(State(state): State<HealthState>) -> Result<String, StatusCode> {
    state
        .metrics
        .as_ref()
        .map(|handle| handle.render())
        .ok_or(StatusCode::NOT_FOUND)
}

pub fn router(state: HealthState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/status", get(status))
        .route("/metrics", get(metrics))
        .with_state(state)
}

/// Serve the health surface until `shutdown` flips to true.
pub async fn serve(
    addr: SocketAddr,
    state: HealthState,
    mut shutdown: watch::Receiver<bool>,
) -> WorkerResult<()> {
    let listener = TcpListener::bind(addr).await.map_err(WorkerError::Server)?;
    info!(addr = %addr, "Health server listening");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(async move {
            let _ = shutdown.wait_for(|stop| *stop).await;
        })
        .await
        .map_err(WorkerError::Server)
}
