use axum::{
    Router, extract::State, http::StatusCode, response::Json as ResponseJson, routing::get,
};
use deployment::Deployment;
use services::services::site_stats::DashboardStats;
use utils::response::StatsResponse;

use crate::{DeploymentImpl, error::ApiError, routes::stats_failure};

/// GET /api/dashboard
pub async fn get_dashboard_stats(
    State(deployment): State<DeploymentImpl>,
) -> (StatusCode, ResponseJson<StatsResponse<DashboardStats>>) {
    let stats = match deployment.sites() {
        Ok(service) => service.dashboard_stats().await.map_err(ApiError::from),
        Err(e) => Err(e.into()),
    };
    match stats {
        Ok(stats) => (StatusCode::OK, ResponseJson(StatsResponse::ok(stats))),
        Err(e) => stats_failure(e),
    }
}

pub fn router(_deployment: &DeploymentImpl) -> Router<DeploymentImpl> {
    Router::new().route("/dashboard", get(get_dashboard_stats))
}
