use axum::{Router, extract::State, response::Json as ResponseJson, routing::get};
use deployment::Deployment;
use serde::Serialize;
use ts_rs::TS;
use utils::response::ApiResponse;

use crate::DeploymentImpl;

#[derive(Debug, Serialize, TS)]
pub struct HealthStatus {
    pub status: String,
    pub backend: String,
    pub version: String,
}

/// GET /api/health
pub async fn health_check(
    State(deployment): State<DeploymentImpl>,
) -> ResponseJson<ApiResponse<HealthStatus>> {
    ResponseJson(ApiResponse::success(HealthStatus {
        status: "ok".to_string(),
        backend: deployment.backend_name().to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    }))
}

pub fn router(_deployment: &DeploymentImpl) -> Router<DeploymentImpl> {
    Router::new().route("/health", get(health_check))
}
