use axum::{
    Router,
    extract::State,
    http::StatusCode,
    response::Json as ResponseJson,
    routing::get,
};
use db::models::{
    energy_production::{CreateEnergyProduction, EnergyProduction},
    railway_site::{CreateRailwaySite, RailwaySite, UpdateRailwaySite},
};
use deployment::Deployment;
use serde::Serialize;
use services::services::{
    pagination::Pagination,
    site_stats::SitesWithStats,
    sites::{PaybackEstimate, PaybackQuery, SiteListQuery},
};
use ts_rs::TS;
use utils::response::{ApiResponse, StatsResponse};
use uuid::Uuid;

use crate::{
    DeploymentImpl,
    error::ApiError,
    extract::{ApiJson, ApiPath, ApiQuery},
    routes::stats_failure,
};

#[derive(Debug, Serialize, TS)]
pub struct SiteListResponse {
    pub success: bool,
    pub sites: Vec<RailwaySite>,
    pub pagination: Pagination,
}

#[derive(Debug, Serialize, TS)]
pub struct ProductionCleanup {
    #[ts(type = "number")]
    pub deleted: u64,
}

/// GET /api/sites
pub async fn list_sites(
    State(deployment): State<DeploymentImpl>,
    ApiQuery(query): ApiQuery<SiteListQuery>,
) -> Result<ResponseJson<SiteListResponse>, ApiError> {
    let page = deployment.sites()?.list(&query).await?;
    Ok(ResponseJson(SiteListResponse {
        success: true,
        sites: page.sites,
        pagination: page.pagination,
    }))
}

/// POST /api/sites
pub async fn create_site(
    State(deployment): State<DeploymentImpl>,
    ApiJson(payload): ApiJson<CreateRailwaySite>,
) -> Result<(StatusCode, ResponseJson<ApiResponse<RailwaySite>>), ApiError> {
    let site = deployment.sites()?.create(payload).await?;
    Ok((StatusCode::CREATED, ResponseJson(ApiResponse::success(site))))
}

/// GET /api/sites/{id}
pub async fn get_site(
    State(deployment): State<DeploymentImpl>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<ResponseJson<ApiResponse<RailwaySite>>, ApiError> {
    let site = deployment.sites()?.get(id).await?;
    Ok(ResponseJson(ApiResponse::success(site)))
}

/// PATCH /api/sites/{id}
pub async fn update_site(
    State(deployment): State<DeploymentImpl>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(payload): ApiJson<UpdateRailwaySite>,
) -> Result<ResponseJson<ApiResponse<RailwaySite>>, ApiError> {
    let site = deployment.sites()?.update(id, payload).await?;
    Ok(ResponseJson(ApiResponse::success(site)))
}

/// DELETE /api/sites/{id}
pub async fn delete_site(
    State(deployment): State<DeploymentImpl>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    deployment.sites()?.delete(id).await?;
    Ok(ResponseJson(ApiResponse::success(())))
}

/// GET /api/sites/{id}/payback
pub async fn get_site_payback(
    State(deployment): State<DeploymentImpl>,
    ApiPath(id): ApiPath<Uuid>,
    ApiQuery(query): ApiQuery<PaybackQuery>,
) -> Result<ResponseJson<ApiResponse<PaybackEstimate>>, ApiError> {
    let estimate = deployment.sites()?.payback(id, query).await?;
    Ok(ResponseJson(ApiResponse::success(estimate)))
}

/// GET /api/sites/stats
pub async fn get_sites_with_stats(
    State(deployment): State<DeploymentImpl>,
) -> (StatusCode, ResponseJson<StatsResponse<SitesWithStats>>) {
    let stats = match deployment.sites() {
        Ok(service) => service.sites_with_stats().await.map_err(ApiError::from),
        Err(e) => Err(e.into()),
    };
    match stats {
        Ok(stats) => (StatusCode::OK, ResponseJson(StatsResponse::ok(stats))),
        Err(e) => stats_failure(e),
    }
}

/// GET /api/sites/{id}/energy
pub async fn list_production(
    State(deployment): State<DeploymentImpl>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<ResponseJson<ApiResponse<Vec<EnergyProduction>>>, ApiError> {
    let rows = deployment.sites()?.list_production(id).await?;
    Ok(ResponseJson(ApiResponse::success(rows)))
}

/// POST /api/sites/{id}/energy
pub async fn record_production(
    State(deployment): State<DeploymentImpl>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(payload): ApiJson<CreateEnergyProduction>,
) -> Result<(StatusCode, ResponseJson<ApiResponse<EnergyProduction>>), ApiError> {
    let row = deployment.sites()?.record_production(id, payload).await?;
    Ok((StatusCode::CREATED, ResponseJson(ApiResponse::success(row))))
}

/// DELETE /api/sites/{id}/energy
pub async fn delete_production(
    State(deployment): State<DeploymentImpl>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<ResponseJson<ApiResponse<ProductionCleanup>>, ApiError> {
    let deleted = deployment.sites()?.delete_production(id).await?;
    Ok(ResponseJson(ApiResponse::success(ProductionCleanup { deleted })))
}

pub fn router(_deployment: &DeploymentImpl) -> Router<DeploymentImpl> {
    Router::new().nest(
        "/sites",
        Router::new()
            .route("/", get(list_sites).post(create_site))
            .route("/stats", get(get_sites_with_stats))
            .route("/{id}", get(get_site).patch(update_site).delete(delete_site))
            .route("/{id}/payback", get(get_site_payback))
            .route(
                "/{id}/energy",
                get(list_production)
                    .post(record_production)
                    .delete(delete_production),
            ),
    )
}
