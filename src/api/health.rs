//! Service status for `/` and `/health`.
//! Read straight from the orchestrator and scheduler, nothing is cached.

use axum::{extract::State, Json};
use serde::Serialize;

use crate::api::routes::ApiState;
use crate::batch::BatchState;

pub const SERVICE_NAME: &str = "order-analytics";

#[derive(Serialize)]
pub struct RootResponse {
    pub service: &'static str,
    pub version: &'static str,
    pub status: &'static str,
    pub scheduler_running: bool,
    pub batch_in_progress: bool,
    pub batch_state: BatchState,
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub database: &'static str,
    pub scheduler: &'static str,
}

pub async fn root(State(state): State<ApiState>) -> Json<RootResponse> {
    Json(RootResponse {
        service: SERVICE_NAME,
        version: env!("CARGO_PKG_VERSION"),
        status: "running",
        scheduler_running: state.scheduler.is_running(),
        batch_in_progress: state.orchestrator.is_running(),
        batch_state: state.orchestrator.state(),
    })
}

pub async fn health(State(state): State<ApiState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        database: "connected",
        scheduler: if state.scheduler.is_running() {
            "active"
        } else {
            "inactive"
        },
    })
}
